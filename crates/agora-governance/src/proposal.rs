//! Proposal lifecycle.
//!
//! Proposals go through states: Pending -> Active -> Succeeded/Defeated ->
//! Executed, with Canceled reachable from Pending and Active. Only the
//! terminal flags (executed, canceled) are stored; every other state is
//! derived from the block number and the tallies.

use std::collections::BTreeMap;
use std::fmt;

use agora_types::{Address, Hash, U256};
use borsh::BorshSerialize;
use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::error::{GovernanceError, GovernanceResult};
use crate::weight::{apply_bps, WeightParams};

pub type ProposalId = Hash;

/// Proposal state in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalState {
    /// Created, voting not yet open
    Pending,
    /// Voting is open
    Active,
    /// Canceled before voting closed
    Canceled,
    /// Voting closed without majority or quorum
    Defeated,
    /// Voting closed with majority and quorum; executable
    Succeeded,
    /// Effects applied
    Executed,
}

impl ProposalState {
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            ProposalState::Canceled | ProposalState::Defeated | ProposalState::Executed
        )
    }
}

impl fmt::Display for ProposalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProposalState::Pending => "pending",
            ProposalState::Active => "active",
            ProposalState::Canceled => "canceled",
            ProposalState::Defeated => "defeated",
            ProposalState::Succeeded => "succeeded",
            ProposalState::Executed => "executed",
        };
        f.write_str(s)
    }
}

/// Vote support type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteSupport {
    Against,
    For,
    Abstain,
}

impl fmt::Display for VoteSupport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VoteSupport::Against => "against",
            VoteSupport::For => "for",
            VoteSupport::Abstain => "abstain",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteReceipt {
    pub support: VoteSupport,
    pub weight: U256,
}

/// Canonical content hashed into the proposal id.
#[derive(BorshSerialize)]
struct ProposalContent {
    proposer: Address,
    targets: Vec<Address>,
    values: Vec<U256>,
    payload_hashes: Vec<Hash>,
    description_hash: Hash,
}

/// Deterministic id: blake3 over the borsh encoding of the proposer, the
/// targets, the values, the payload hashes and the description hash.
pub fn compute_proposal_id(
    proposer: &Address,
    actions: &[Action],
    description: &str,
) -> GovernanceResult<ProposalId> {
    let content = ProposalContent {
        proposer: *proposer,
        targets: actions.iter().map(|a| a.target).collect(),
        values: actions.iter().map(|a| a.value).collect(),
        payload_hashes: actions.iter().map(Action::payload_hash).collect(),
        description_hash: Hash::compute(description.as_bytes()),
    };
    let encoded = borsh::to_vec(&content)
        .map_err(|e| GovernanceError::InvalidProposal(format!("encode proposal: {e}")))?;
    Ok(Hash::compute(&encoded))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub proposer: Address,
    pub actions: Vec<Action>,
    pub description: String,
    /// Block and timestamp voting weights are read at
    pub creation_block: u64,
    pub creation_timestamp: u64,
    pub start_block: u64,
    pub end_block: u64,
    /// `quorum_bps * total_supply / 10000`, total supply as of creation
    pub quorum: U256,
    /// Blend factors in force at creation; every vote uses these
    pub weight_params: WeightParams,
    pub for_votes: U256,
    pub against_votes: U256,
    pub abstain_votes: U256,
    pub voters: BTreeMap<Address, VoteReceipt>,
    pub executed: bool,
    pub canceled: bool,
}

impl Proposal {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: ProposalId,
        proposer: Address,
        actions: Vec<Action>,
        description: String,
        creation_block: u64,
        creation_timestamp: u64,
        voting_delay: u64,
        voting_period: u64,
        snapshot_supply: &U256,
        quorum_bps: u16,
        weight_params: WeightParams,
    ) -> GovernanceResult<Self> {
        let start_block = creation_block
            .checked_add(voting_delay)
            .ok_or_else(|| GovernanceError::InvalidParameter("voting delay overflows".into()))?;
        let end_block = start_block
            .checked_add(voting_period)
            .ok_or_else(|| GovernanceError::InvalidParameter("voting period overflows".into()))?;

        Ok(Self {
            id,
            proposer,
            actions,
            description,
            creation_block,
            creation_timestamp,
            start_block,
            end_block,
            quorum: apply_bps(snapshot_supply, quorum_bps),
            weight_params,
            for_votes: U256::ZERO,
            against_votes: U256::ZERO,
            abstain_votes: U256::ZERO,
            voters: BTreeMap::new(),
            executed: false,
            canceled: false,
        })
    }

    pub fn total_votes(&self) -> U256 {
        // each tally is bounded by the sum, which is checked on every vote
        self.for_votes
            .checked_add(&self.against_votes)
            .and_then(|v| v.checked_add(&self.abstain_votes))
            .unwrap_or(U256::MAX)
    }

    pub fn quorum_reached(&self) -> bool {
        self.total_votes() >= self.quorum
    }

    /// State at `block`.
    pub fn state(&self, block: u64) -> ProposalState {
        if self.executed {
            ProposalState::Executed
        } else if self.canceled {
            ProposalState::Canceled
        } else if block < self.start_block {
            ProposalState::Pending
        } else if block < self.end_block {
            ProposalState::Active
        } else if self.for_votes > self.against_votes && self.quorum_reached() {
            ProposalState::Succeeded
        } else {
            ProposalState::Defeated
        }
    }

    pub fn has_voted(&self, voter: &Address) -> bool {
        self.voters.contains_key(voter)
    }

    /// Record a vote. The caller has already checked the proposal is
    /// active.
    pub fn record_vote(
        &mut self,
        voter: Address,
        support: VoteSupport,
        weight: U256,
    ) -> GovernanceResult<()> {
        if self.has_voted(&voter) {
            return Err(GovernanceError::AlreadyVoted);
        }
        if weight.is_zero() {
            return Err(GovernanceError::InsufficientVotingPower {
                have: U256::ZERO,
                need: U256::ONE,
            });
        }

        let overflow = || GovernanceError::Ledger(agora_ledger::LedgerError::Overflow("vote tally"));
        // keep the three-way sum representable
        self.total_votes().checked_add(&weight).ok_or_else(overflow)?;
        let tally = match support {
            VoteSupport::For => &mut self.for_votes,
            VoteSupport::Against => &mut self.against_votes,
            VoteSupport::Abstain => &mut self.abstain_votes,
        };
        *tally = tally.checked_add(&weight).ok_or_else(overflow)?;

        self.voters.insert(voter, VoteReceipt { support, weight });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proposer() -> Address {
        Address::from_bytes([1u8; 20])
    }

    fn voter(n: u8) -> Address {
        Address::from_bytes([n; 20])
    }

    fn proposal() -> Proposal {
        let actions = vec![Action::new(voter(9), U256::ONE, vec![])];
        let id = compute_proposal_id(&proposer(), &actions, "fund").unwrap();
        // quorum 4% of 10_000 = 400
        let weight = WeightParams {
            reputation_weight_factor_bps: 5_000,
            quadratic_voting_factor_bps: 0,
        };
        Proposal::new(
            id,
            proposer(),
            actions,
            "fund".into(),
            10,
            1_000,
            1,
            5,
            &U256::from(10_000u64),
            400,
            weight,
        )
        .unwrap()
    }

    #[test]
    fn test_state_transitions() {
        let mut p = proposal();
        assert_eq!(p.start_block, 11);
        assert_eq!(p.end_block, 16);
        assert_eq!(p.state(10), ProposalState::Pending);
        assert_eq!(p.state(11), ProposalState::Active);
        assert_eq!(p.state(15), ProposalState::Active);
        assert_eq!(p.state(16), ProposalState::Defeated);

        p.record_vote(voter(2), VoteSupport::For, U256::from(400u64)).unwrap();
        assert_eq!(p.state(16), ProposalState::Succeeded);

        p.executed = true;
        assert_eq!(p.state(16), ProposalState::Executed);
    }

    #[test]
    fn test_quorum_is_inclusive() {
        let mut p = proposal();
        assert_eq!(p.quorum, U256::from(400u64));
        p.record_vote(voter(2), VoteSupport::For, U256::from(200u64)).unwrap();
        p.record_vote(voter(3), VoteSupport::Against, U256::from(100u64)).unwrap();
        p.record_vote(voter(4), VoteSupport::Abstain, U256::from(99u64)).unwrap();
        assert_eq!(p.state(16), ProposalState::Defeated);

        let mut p = proposal();
        p.record_vote(voter(2), VoteSupport::For, U256::from(200u64)).unwrap();
        p.record_vote(voter(3), VoteSupport::Against, U256::from(100u64)).unwrap();
        p.record_vote(voter(4), VoteSupport::Abstain, U256::from(100u64)).unwrap();
        assert_eq!(p.state(16), ProposalState::Succeeded);
    }

    #[test]
    fn test_tie_is_defeated() {
        let mut p = proposal();
        p.record_vote(voter(2), VoteSupport::For, U256::from(500u64)).unwrap();
        p.record_vote(voter(3), VoteSupport::Against, U256::from(500u64)).unwrap();
        assert_eq!(p.state(16), ProposalState::Defeated);
    }

    #[test]
    fn test_double_vote() {
        let mut p = proposal();
        p.record_vote(voter(2), VoteSupport::For, U256::ONE).unwrap();
        assert_eq!(
            p.record_vote(voter(2), VoteSupport::Against, U256::ONE),
            Err(GovernanceError::AlreadyVoted)
        );
        assert_eq!(p.against_votes, U256::ZERO);
    }

    #[test]
    fn test_id_depends_on_content() {
        let actions = vec![Action::new(voter(9), U256::ONE, vec![1])];
        let a = compute_proposal_id(&proposer(), &actions, "x").unwrap();
        let b = compute_proposal_id(&proposer(), &actions, "x").unwrap();
        let c = compute_proposal_id(&proposer(), &actions, "y").unwrap();
        let d = compute_proposal_id(&voter(2), &actions, "x").unwrap();
        let other_payload = vec![Action::new(voter(9), U256::ONE, vec![2])];
        let e = compute_proposal_id(&proposer(), &other_payload, "x").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        assert_ne!(a, e);
    }
}
