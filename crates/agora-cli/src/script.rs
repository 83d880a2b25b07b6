//! Scripted replay.
//!
//! A script is a JSON array of steps. Each step names the caller, the block
//! and the timestamp of the call, plus the operation under an `op` tag:
//!
//! ```json
//! [
//!   { "caller": "0x01...", "block": 1, "timestamp": 12, "op": "transfer",
//!     "to": "0x02...", "amount": "1000" },
//!   { "caller": "0x01...", "block": 2, "timestamp": 24, "op": "propose",
//!     "description": "raise fee",
//!     "actions": [{ "target": "treasury", "call": { "set_transaction_fee": 75 } }] },
//!   { "caller": "0x02...", "block": 3, "timestamp": 36, "op": "cast_vote",
//!     "proposal": 0, "support": "for" }
//! ]
//! ```
//!
//! Proposals are referenced either by id or by their creation index within
//! the script.

use std::path::Path;

use agora_governance::{
    Action, Dao, GovernorCall, ProposalId, ReputationCall, StreamId, TokenCall, TreasuryCall,
    VoteSupport, GOVERNOR, REPUTATION, TOKEN, TREASURY,
};
use agora_ledger::{ContributionType, Role};
use agora_types::{Address, CallContext, U256};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub caller: Address,
    pub block: u64,
    #[serde(default)]
    pub timestamp: u64,
    #[serde(flatten)]
    pub op: Op,
}

impl Step {
    pub fn context(&self) -> CallContext {
        CallContext::new(self.caller, self.block, self.timestamp)
    }
}

/// Proposal reference: creation index within the script, or id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProposalRef {
    Index(usize),
    Id(ProposalId),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "target", rename_all = "snake_case")]
pub enum ActionSpec {
    Governor { call: GovernorCall },
    Treasury { call: TreasuryCall },
    Token { call: TokenCall },
    Reputation { call: ReputationCall },
    External {
        to: Address,
        #[serde(default)]
        value: U256,
        /// Hex, with or without `0x`
        #[serde(default)]
        payload: Option<String>,
    },
}

impl ActionSpec {
    pub fn to_action(&self) -> anyhow::Result<Action> {
        let action = match self {
            ActionSpec::Governor { call } => Action::system(GOVERNOR, call)?,
            ActionSpec::Treasury { call } => Action::system(TREASURY, call)?,
            ActionSpec::Token { call } => Action::system(TOKEN, call)?,
            ActionSpec::Reputation { call } => Action::system(REPUTATION, call)?,
            ActionSpec::External { to, value, payload } => {
                let payload = match payload {
                    Some(p) => hex::decode(p.strip_prefix("0x").unwrap_or(p))
                        .context("invalid payload hex")?,
                    None => Vec::new(),
                };
                Action::new(*to, *value, payload)
            }
        };
        Ok(action)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    GrantRole { role: Role, account: Address },
    RevokeRole { role: Role, account: Address },
    RenounceRole { role: Role },
    AddReputation { principal: Address, contribution: ContributionType, amount: U256 },
    SetDecayRate { principal: Address, rate_bps: u16 },
    SetDefaultDecayRate { rate_bps: u16 },
    Transfer { to: Address, amount: U256 },
    Approve { spender: Address, amount: U256 },
    TransferFrom { from: Address, to: Address, amount: U256 },
    Mint { to: Address, amount: U256 },
    Burn { amount: U256 },
    Stake { amount: U256 },
    Unstake { amount: U256 },
    ClaimStakingRewards,
    Delegate { delegatee: Address },
    Deposit { amount: U256 },
    CaptureRevenue { stream: StreamId, amount: U256 },
    ProcessCrowdfunding { token: Address, from: Address, to: Address, amount: U256 },
    AllocateFunds { to: Address, amount: U256, #[serde(default)] memo: String },
    AllocateTokens { token: Address, to: Address, amount: U256, #[serde(default)] memo: String },
    SetTransactionFee { fee_bps: u16 },
    SetBurnPercent { percent: u8 },
    SetReservePercent { percent: u8 },
    SetReputationWeightFactor { bps: u16 },
    SetQuadraticVotingFactor { bps: u16 },
    SetProposalStake { stake: U256 },
    SetQuorum { bps: u16 },
    SetVotingDelay { blocks: u64 },
    SetVotingPeriod { blocks: u64 },
    Propose { actions: Vec<ActionSpec>, description: String },
    CastVote { proposal: ProposalRef, support: VoteSupport },
    Cancel { proposal: ProposalRef },
    Execute { proposal: ProposalRef },
}

impl Op {
    pub fn name(&self) -> &'static str {
        match self {
            Op::GrantRole { .. } => "grant_role",
            Op::RevokeRole { .. } => "revoke_role",
            Op::RenounceRole { .. } => "renounce_role",
            Op::AddReputation { .. } => "add_reputation",
            Op::SetDecayRate { .. } => "set_decay_rate",
            Op::SetDefaultDecayRate { .. } => "set_default_decay_rate",
            Op::Transfer { .. } => "transfer",
            Op::Approve { .. } => "approve",
            Op::TransferFrom { .. } => "transfer_from",
            Op::Mint { .. } => "mint",
            Op::Burn { .. } => "burn",
            Op::Stake { .. } => "stake",
            Op::Unstake { .. } => "unstake",
            Op::ClaimStakingRewards => "claim_staking_rewards",
            Op::Delegate { .. } => "delegate",
            Op::Deposit { .. } => "deposit",
            Op::CaptureRevenue { .. } => "capture_revenue",
            Op::ProcessCrowdfunding { .. } => "process_crowdfunding",
            Op::AllocateFunds { .. } => "allocate_funds",
            Op::AllocateTokens { .. } => "allocate_tokens",
            Op::SetTransactionFee { .. } => "set_transaction_fee",
            Op::SetBurnPercent { .. } => "set_burn_percent",
            Op::SetReservePercent { .. } => "set_reserve_percent",
            Op::SetReputationWeightFactor { .. } => "set_reputation_weight_factor",
            Op::SetQuadraticVotingFactor { .. } => "set_quadratic_voting_factor",
            Op::SetProposalStake { .. } => "set_proposal_stake",
            Op::SetQuorum { .. } => "set_quorum",
            Op::SetVotingDelay { .. } => "set_voting_delay",
            Op::SetVotingPeriod { .. } => "set_voting_period",
            Op::Propose { .. } => "propose",
            Op::CastVote { .. } => "cast_vote",
            Op::Cancel { .. } => "cancel",
            Op::Execute { .. } => "execute",
        }
    }
}

pub fn load(path: &Path) -> anyhow::Result<Vec<Step>> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read script '{}': {}", path.display(), e))?;
    serde_json::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("Failed to parse script '{}': {}", path.display(), e))
}

/// Failed step, kept when replay continues past errors.
#[derive(Debug)]
pub struct StepFailure {
    pub index: usize,
    pub op: &'static str,
    pub error: anyhow::Error,
}

/// Replays steps against one engine.
pub struct Replayer {
    dao: Dao,
    proposals: Vec<ProposalId>,
}

impl Replayer {
    pub fn new(dao: Dao) -> Self {
        Self {
            dao,
            proposals: Vec::new(),
        }
    }

    pub fn dao(&self) -> &Dao {
        &self.dao
    }

    /// Proposal ids in creation order.
    pub fn proposals(&self) -> &[ProposalId] {
        &self.proposals
    }

    /// Run every step. Stops at the first failure unless `keep_going`.
    pub fn run(&mut self, steps: &[Step], keep_going: bool) -> anyhow::Result<Vec<StepFailure>> {
        let mut failures = Vec::new();
        for (index, step) in steps.iter().enumerate() {
            if let Err(error) = self.apply(step) {
                let op = step.op.name();
                if !keep_going {
                    return Err(error.context(format!("step {index} ({op}) failed")));
                }
                warn!(index, op, error = %error, "step failed, continuing");
                failures.push(StepFailure { index, op, error });
            }
        }
        info!(steps = steps.len(), failed = failures.len(), "replay finished");
        Ok(failures)
    }

    fn resolve(&self, proposal: &ProposalRef) -> anyhow::Result<ProposalId> {
        match proposal {
            ProposalRef::Id(id) => Ok(*id),
            ProposalRef::Index(i) => self
                .proposals
                .get(*i)
                .copied()
                .ok_or_else(|| anyhow::anyhow!("no proposal #{i} created yet")),
        }
    }

    pub fn apply(&mut self, step: &Step) -> anyhow::Result<()> {
        let ctx = step.context();
        let dao = &mut self.dao;
        match &step.op {
            Op::GrantRole { role, account } => dao.grant_role(&ctx, *role, *account)?,
            Op::RevokeRole { role, account } => dao.revoke_role(&ctx, *role, *account)?,
            Op::RenounceRole { role } => dao.renounce_role(&ctx, *role)?,
            Op::AddReputation {
                principal,
                contribution,
                amount,
            } => dao.add_reputation(&ctx, *principal, *contribution, *amount)?,
            Op::SetDecayRate {
                principal,
                rate_bps,
            } => dao.set_decay_rate(&ctx, *principal, *rate_bps)?,
            Op::SetDefaultDecayRate { rate_bps } => dao.set_default_decay_rate(&ctx, *rate_bps)?,
            Op::Transfer { to, amount } => dao.transfer(&ctx, *to, *amount)?,
            Op::Approve { spender, amount } => dao.approve(&ctx, *spender, *amount)?,
            Op::TransferFrom { from, to, amount } => dao.transfer_from(&ctx, *from, *to, *amount)?,
            Op::Mint { to, amount } => dao.mint(&ctx, *to, *amount)?,
            Op::Burn { amount } => dao.burn(&ctx, *amount)?,
            Op::Stake { amount } => dao.stake(&ctx, *amount)?,
            Op::Unstake { amount } => dao.unstake(&ctx, *amount)?,
            Op::ClaimStakingRewards => {
                dao.claim_staking_rewards(&ctx)?;
            }
            Op::Delegate { delegatee } => dao.delegate(&ctx, *delegatee)?,
            Op::Deposit { amount } => dao.deposit(&ctx, *amount)?,
            Op::CaptureRevenue { stream, amount } => {
                dao.capture_revenue(&ctx, stream.clone(), *amount)?
            }
            Op::ProcessCrowdfunding {
                token,
                from,
                to,
                amount,
            } => dao.process_crowdfunding(&ctx, *token, *from, *to, *amount)?,
            Op::AllocateFunds { to, amount, memo } => {
                dao.allocate_funds(&ctx, *to, *amount, memo.clone())?
            }
            Op::AllocateTokens {
                token,
                to,
                amount,
                memo,
            } => dao.allocate_tokens(&ctx, *token, *to, *amount, memo.clone())?,
            Op::SetTransactionFee { fee_bps } => dao.set_transaction_fee(&ctx, *fee_bps)?,
            Op::SetBurnPercent { percent } => dao.set_burn_percent(&ctx, *percent)?,
            Op::SetReservePercent { percent } => dao.set_reserve_percent(&ctx, *percent)?,
            Op::SetReputationWeightFactor { bps } => dao.set_reputation_weight_factor(&ctx, *bps)?,
            Op::SetQuadraticVotingFactor { bps } => dao.set_quadratic_voting_factor(&ctx, *bps)?,
            Op::SetProposalStake { stake } => dao.set_proposal_stake(&ctx, *stake)?,
            Op::SetQuorum { bps } => dao.set_quorum(&ctx, *bps)?,
            Op::SetVotingDelay { blocks } => dao.set_voting_delay(&ctx, *blocks)?,
            Op::SetVotingPeriod { blocks } => dao.set_voting_period(&ctx, *blocks)?,
            Op::Propose {
                actions,
                description,
            } => {
                let actions = actions
                    .iter()
                    .map(ActionSpec::to_action)
                    .collect::<anyhow::Result<Vec<_>>>()?;
                let id = dao.propose(&ctx, actions, description.clone())?;
                self.proposals.push(id);
            }
            Op::CastVote { proposal, support } => {
                let id = self.resolve(proposal)?;
                self.dao.cast_vote(&ctx, &id, *support)?;
            }
            Op::Cancel { proposal } => {
                let id = self.resolve(proposal)?;
                self.dao.cancel(&ctx, &id)?;
            }
            Op::Execute { proposal } => {
                let id = self.resolve(proposal)?;
                self.dao.execute(&ctx, &id)?;
            }
        }
        Ok(())
    }
}
