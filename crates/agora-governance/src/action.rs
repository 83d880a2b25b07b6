//! Proposal actions and the engine's system call surface.
//!
//! An action is a `(target, value, payload)` triple. Targets that are one of
//! the engine's system addresses carry a borsh-encoded call for that
//! component. Any other target receives `value` in native funds from the
//! treasury, and a non-empty payload is handed to the [`CallForwarder`].

use agora_ledger::{ContributionType, Role};
use agora_types::{Address, CallContext, Hash, U256};
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::error::{GovernanceError, GovernanceResult};

/// Governance itself: parameter setters and role administration.
pub const GOVERNOR: Address = Address::system(1);
/// Treasury account holding captured fees and native funds.
pub const TREASURY: Address = Address::system(2);
/// The governance token ledger.
pub const TOKEN: Address = Address::system(3);
/// The reputation ledger.
pub const REPUTATION: Address = Address::system(4);

#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
pub struct Action {
    pub target: Address,
    pub value: U256,
    #[serde(with = "hex_bytes")]
    pub payload: Vec<u8>,
}

impl Action {
    pub fn new(target: Address, value: U256, payload: Vec<u8>) -> Self {
        Self {
            target,
            value,
            payload,
        }
    }

    /// Action carrying an encoded system call.
    pub fn system<C: BorshSerialize>(target: Address, call: &C) -> GovernanceResult<Self> {
        let payload = borsh::to_vec(call)
            .map_err(|e| GovernanceError::InvalidProposal(format!("encode call: {e}")))?;
        Ok(Self::new(target, U256::ZERO, payload))
    }

    pub fn payload_hash(&self) -> Hash {
        Hash::compute(&self.payload)
    }

    /// Decode and check the action without running it.
    pub fn decode(&self) -> GovernanceResult<DecodedAction> {
        let system = |call: SystemCall| {
            if self.value.is_zero() {
                Ok(DecodedAction::System(call))
            } else {
                Err(GovernanceError::InvalidProposal(format!(
                    "system target {:x} cannot receive value",
                    self.target
                )))
            }
        };

        match self.target {
            t if t == GOVERNOR => system(SystemCall::Governor(decode_payload(&self.payload)?)),
            t if t == TREASURY => system(SystemCall::Treasury(decode_payload(&self.payload)?)),
            t if t == TOKEN => system(SystemCall::Token(decode_payload(&self.payload)?)),
            t if t == REPUTATION => {
                system(SystemCall::Reputation(decode_payload(&self.payload)?))
            }
            t if t.is_system() => Err(GovernanceError::InvalidProposal(format!(
                "unknown system target {t:x}"
            ))),
            t if t.is_zero() => Err(GovernanceError::InvalidProposal(
                "zero address target".to_string(),
            )),
            target => Ok(DecodedAction::External(ExternalCall {
                target,
                value: self.value,
                payload: self.payload.clone(),
            })),
        }
    }
}

fn decode_payload<T: BorshDeserialize>(payload: &[u8]) -> GovernanceResult<T> {
    borsh::from_slice(payload)
        .map_err(|e| GovernanceError::InvalidProposal(format!("malformed system call: {e}")))
}

/// Calls to [`GOVERNOR`]. Run with `GOVERNOR` as caller, so each needs the
/// role the equivalent direct call needs (`Admin` at genesis).
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum GovernorCall {
    SetReputationWeightFactor(u16),
    SetQuadraticVotingFactor(u16),
    SetProposalStake(U256),
    SetQuorum(u16),
    SetVotingDelay(u64),
    SetVotingPeriod(u64),
    GrantRole { role: Role, account: Address },
    RevokeRole { role: Role, account: Address },
}

/// Calls to [`TREASURY`].
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TreasuryCall {
    AllocateFunds {
        to: Address,
        amount: U256,
        memo: String,
    },
    AllocateTokens {
        token: Address,
        to: Address,
        amount: U256,
        memo: String,
    },
    SetTransactionFee(u16),
    SetBurnPercent(u8),
    SetReservePercent(u8),
}

/// Calls to [`TOKEN`], made from `GOVERNOR`'s own account.
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TokenCall {
    Transfer { to: Address, amount: U256 },
    Approve { spender: Address, amount: U256 },
    Mint { to: Address, amount: U256 },
    Burn { amount: U256 },
}

/// Calls to [`REPUTATION`].
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ReputationCall {
    AddReputation {
        principal: Address,
        contribution: ContributionType,
        amount: U256,
    },
    SetDecayRate {
        principal: Address,
        rate_bps: u16,
    },
    SetDefaultDecayRate(u16),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SystemCall {
    Governor(GovernorCall),
    Treasury(TreasuryCall),
    Token(TokenCall),
    Reputation(ReputationCall),
}

/// Call leaving the engine: native value already moved, payload still to
/// deliver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalCall {
    pub target: Address,
    pub value: U256,
    #[serde(with = "hex_bytes")]
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedAction {
    System(SystemCall),
    External(ExternalCall),
}

/// Delivers opaque payloads to targets outside the engine.
///
/// Receives every external call of one execution as a single batch, before
/// the execution commits. An error aborts the execution and nothing is
/// committed.
pub trait CallForwarder: Send {
    fn deliver(&mut self, ctx: &CallContext, calls: &[ExternalCall]) -> Result<(), String>;
}

/// Accepts value-only calls and rejects any payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct RejectPayloads;

impl CallForwarder for RejectPayloads {
    fn deliver(&mut self, _ctx: &CallContext, calls: &[ExternalCall]) -> Result<(), String> {
        match calls.iter().find(|c| !c.payload.is_empty()) {
            Some(call) => Err(format!(
                "no forwarder for payload to {:x} ({} bytes)",
                call.target,
                call.payload.len()
            )),
            None => Ok(()),
        }
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        hex::decode(s.strip_prefix("0x").unwrap_or(&s)).map_err(serde::de::Error::custom)
    }
}
