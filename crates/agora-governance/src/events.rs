//! Event log entries.
//!
//! Every committed state change appends one or more [`Event`]s, stamped with
//! the block and timestamp of the call that produced them. The log is enough
//! for an outside observer to rebuild the engine's history.

use agora_ledger::events as ledger;
use agora_types::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::proposal::{ProposalId, VoteSupport};
use crate::treasury::StreamId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalCreated {
    pub proposal_id: ProposalId,
    pub proposer: Address,
    pub start_block: u64,
    pub end_block: u64,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCast {
    pub proposal_id: ProposalId,
    pub voter: Address,
    pub support: VoteSupport,
    pub weight: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenueCaptured {
    pub stream: StreamId,
    pub source: Address,
    pub fee: U256,
    pub burned: U256,
    pub reserved: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrowdfundingProcessed {
    pub from: Address,
    pub to: Address,
    pub amount: U256,
    pub fee: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundsAllocated {
    pub to: Address,
    pub amount: U256,
    pub memo: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokensAllocated {
    pub token: Address,
    pub to: Address,
    pub amount: U256,
    pub memo: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deposited {
    pub from: Address,
    pub amount: U256,
}

/// Tunable parameter named in [`ParameterChanged`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parameter {
    ReputationWeightFactor,
    QuadraticVotingFactor,
    ProposalStake,
    Quorum,
    VotingDelay,
    VotingPeriod,
    TransactionFee,
    BurnPercent,
    ReservePercent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterChanged {
    pub parameter: Parameter,
    pub old_value: U256,
    pub new_value: U256,
    pub sender: Address,
}

impl ParameterChanged {
    pub fn new(parameter: Parameter, old: impl Into<U256>, new: impl Into<U256>, sender: Address) -> Self {
        Self {
            parameter,
            old_value: old.into(),
            new_value: new.into(),
            sender,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    RoleGranted(ledger::RoleGranted),
    RoleRevoked(ledger::RoleRevoked),
    ReputationAdded(ledger::ReputationAdded),
    DecayRateChanged(ledger::DecayRateChanged),
    DefaultDecayRateChanged(ledger::DefaultDecayRateChanged),
    Transfer(ledger::Transfer),
    Approval(ledger::Approval),
    Minted(ledger::Minted),
    Burned(ledger::Burned),
    Staked(ledger::Staked),
    Unstaked(ledger::Unstaked),
    RewardsClaimed(ledger::RewardsClaimed),
    DelegateChanged(ledger::DelegateChanged),
    NativeTransfer(ledger::NativeTransfer),
    ProposalCreated(ProposalCreated),
    VoteCast(VoteCast),
    ProposalCanceled { proposal_id: ProposalId, sender: Address },
    ProposalExecuted { proposal_id: ProposalId, sender: Address },
    RevenueCaptured(RevenueCaptured),
    CrowdfundingProcessed(CrowdfundingProcessed),
    FundsAllocated(FundsAllocated),
    TokensAllocated(TokensAllocated),
    Deposited(Deposited),
    ParameterChanged(ParameterChanged),
}

impl Event {
    /// Stable snake_case name, as used in the serialized `event` tag.
    pub fn name(&self) -> &'static str {
        match self {
            Event::RoleGranted(_) => "role_granted",
            Event::RoleRevoked(_) => "role_revoked",
            Event::ReputationAdded(_) => "reputation_added",
            Event::DecayRateChanged(_) => "decay_rate_changed",
            Event::DefaultDecayRateChanged(_) => "default_decay_rate_changed",
            Event::Transfer(_) => "transfer",
            Event::Approval(_) => "approval",
            Event::Minted(_) => "minted",
            Event::Burned(_) => "burned",
            Event::Staked(_) => "staked",
            Event::Unstaked(_) => "unstaked",
            Event::RewardsClaimed(_) => "rewards_claimed",
            Event::DelegateChanged(_) => "delegate_changed",
            Event::NativeTransfer(_) => "native_transfer",
            Event::ProposalCreated(_) => "proposal_created",
            Event::VoteCast(_) => "vote_cast",
            Event::ProposalCanceled { .. } => "proposal_canceled",
            Event::ProposalExecuted { .. } => "proposal_executed",
            Event::RevenueCaptured(_) => "revenue_captured",
            Event::CrowdfundingProcessed(_) => "crowdfunding_processed",
            Event::FundsAllocated(_) => "funds_allocated",
            Event::TokensAllocated(_) => "tokens_allocated",
            Event::Deposited(_) => "deposited",
            Event::ParameterChanged(_) => "parameter_changed",
        }
    }
}

macro_rules! impl_from_event {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Event {
                fn from(e: $ty) -> Self {
                    Event::$variant(e)
                }
            }
        )*
    };
}

impl_from_event! {
    RoleGranted => ledger::RoleGranted,
    RoleRevoked => ledger::RoleRevoked,
    ReputationAdded => ledger::ReputationAdded,
    DecayRateChanged => ledger::DecayRateChanged,
    DefaultDecayRateChanged => ledger::DefaultDecayRateChanged,
    Transfer => ledger::Transfer,
    Approval => ledger::Approval,
    Minted => ledger::Minted,
    Burned => ledger::Burned,
    Staked => ledger::Staked,
    Unstaked => ledger::Unstaked,
    RewardsClaimed => ledger::RewardsClaimed,
    DelegateChanged => ledger::DelegateChanged,
    NativeTransfer => ledger::NativeTransfer,
    ProposalCreated => ProposalCreated,
    VoteCast => VoteCast,
    RevenueCaptured => RevenueCaptured,
    CrowdfundingProcessed => CrowdfundingProcessed,
    FundsAllocated => FundsAllocated,
    TokensAllocated => TokensAllocated,
    Deposited => Deposited,
    ParameterChanged => ParameterChanged,
}

/// Event stamped with the clock of the call that emitted it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub block: u64,
    pub timestamp: u64,
    #[serde(flatten)]
    pub event: Event,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_is_tagged() {
        let record = EventRecord {
            block: 3,
            timestamp: 30,
            event: Event::from(ledger::Transfer {
                from: Address::from_bytes([1u8; 20]),
                to: Address::from_bytes([2u8; 20]),
                amount: U256::from(5u64),
            }),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["event"], "transfer");
        assert_eq!(json["block"], 3);
        assert_eq!(json["amount"], "5");
        assert_eq!(record.event.name(), "transfer");
    }

    #[test]
    fn test_parameter_changed_values() {
        let e = ParameterChanged::new(Parameter::TransactionFee, 50u64, 75u64, Address::ZERO);
        assert_eq!(e.old_value, U256::from(50u64));
        assert_eq!(e.new_value, U256::from(75u64));
    }
}
