//! Complete engine state and the operations that act on it.
//!
//! [`DaoState`] owns every ledger. Each method validates before it writes,
//! so a returned error leaves the state as it was. Proposal execution runs
//! the same methods on a staged copy (see [`crate::transaction`]).

use std::collections::BTreeMap;

use agora_ledger::{NativeLedger, ReputationLedger, Role, RoleTable, TokenLedger, TokenParams};
use agora_types::{Address, CallContext, BPS_DENOMINATOR, U256};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::action::{Action, GovernorCall, ReputationCall, SystemCall, TokenCall, TreasuryCall};
use crate::action::{GOVERNOR, TREASURY};
use crate::config::DaoConfig;
use crate::error::{GovernanceError, GovernanceResult};
use crate::events::{Event, Parameter, ParameterChanged, ProposalCreated, VoteCast};
use crate::proposal::{compute_proposal_id, Proposal, ProposalId, ProposalState, VoteSupport};
use crate::treasury::Treasury;
use crate::weight::{check_bps, voting_weight, WeightParams};

/// Voting parameters in force.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceParams {
    pub quorum_bps: u16,
    pub voting_delay: u64,
    pub voting_period: u64,
    pub proposal_stake: U256,
    pub weight: WeightParams,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaoState {
    pub(crate) roles: RoleTable,
    pub(crate) reputation: ReputationLedger,
    pub(crate) token: TokenLedger,
    pub(crate) native: NativeLedger,
    pub(crate) treasury: Treasury,
    pub(crate) params: GovernanceParams,
    pub(crate) proposals: BTreeMap<ProposalId, Proposal>,
}

impl DaoState {
    /// Build the genesis state. Governance ([`GOVERNOR`]) holds `Admin` and
    /// `Governor`; the treasury holds `Burner` so captured fees can be
    /// burned.
    pub fn from_config(config: &DaoConfig) -> GovernanceResult<Self> {
        config.validate()?;

        let mut roles = RoleTable::new()
            .with_grant(Role::Admin, config.genesis.admin)
            .with_grant(Role::Admin, GOVERNOR)
            .with_grant(Role::Governor, GOVERNOR)
            .with_grant(Role::Burner, TREASURY);
        for grant in &config.genesis.roles {
            roles = roles.with_grant(grant.role, grant.account);
        }

        let mut token = TokenLedger::new(TokenParams {
            name: config.token.name.clone(),
            symbol: config.token.symbol.clone(),
            max_supply: config.token.max_supply,
            staking_reward_rate_bps: config.token.staking_reward_rate_bps,
        });
        for alloc in &config.genesis.token_allocations {
            if !alloc.amount.is_zero() {
                token.mint_genesis(alloc.account, alloc.amount)?;
            }
        }

        let mut native = NativeLedger::new();
        for alloc in &config.genesis.native_allocations {
            native.credit_genesis(alloc.account, alloc.amount)?;
        }

        let gov = &config.governance;
        Ok(Self {
            roles,
            reputation: ReputationLedger::new(config.reputation.default_decay_rate_bps),
            token,
            native,
            treasury: Treasury::new(config.treasury.fee_params())?,
            params: GovernanceParams {
                quorum_bps: gov.quorum_bps,
                voting_delay: gov.voting_delay,
                voting_period: gov.voting_period,
                proposal_stake: gov.proposal_stake,
                weight: gov.weight_params(),
            },
            proposals: BTreeMap::new(),
        })
    }

    pub fn roles(&self) -> &RoleTable {
        &self.roles
    }

    pub fn reputation(&self) -> &ReputationLedger {
        &self.reputation
    }

    pub fn token(&self) -> &TokenLedger {
        &self.token
    }

    pub fn native(&self) -> &NativeLedger {
        &self.native
    }

    pub fn treasury(&self) -> &Treasury {
        &self.treasury
    }

    pub fn params(&self) -> &GovernanceParams {
        &self.params
    }

    pub fn proposal(&self, id: &ProposalId) -> GovernanceResult<&Proposal> {
        self.proposals
            .get(id)
            .ok_or(GovernanceError::ProposalNotFound(*id))
    }

    pub fn proposals(&self) -> impl Iterator<Item = &Proposal> {
        self.proposals.values()
    }

    /// Weight from the live token votes and reputation at `now`.
    pub fn current_weight(&self, account: &Address, now: u64) -> GovernanceResult<U256> {
        voting_weight(
            &self.token.get_votes(account),
            &self.reputation.reputation(account, now),
            &self.params.weight,
        )
    }

    /// Weight as of a proposal's creation point: token votes from before the
    /// creation block, reputation from before the creation block decayed to
    /// the creation timestamp, blended with the factors the proposal was
    /// created under.
    pub fn snapshot_weight(&self, account: &Address, proposal: &Proposal) -> GovernanceResult<U256> {
        let tokens = self
            .token
            .get_past_votes(account, proposal.creation_block);
        let reputation = self.reputation.reputation_at(
            account,
            proposal.creation_block,
            proposal.creation_timestamp,
        );
        voting_weight(&tokens, &reputation, &proposal.weight_params)
    }

    // --- proposals ---

    pub fn propose(
        &mut self,
        ctx: &CallContext,
        actions: Vec<Action>,
        description: String,
    ) -> GovernanceResult<(ProposalId, Event)> {
        if actions.is_empty() {
            return Err(GovernanceError::InvalidProposal("no actions".into()));
        }
        for action in &actions {
            action.decode()?;
        }

        let weight = self.current_weight(&ctx.caller, ctx.timestamp)?;
        if weight < self.params.proposal_stake {
            return Err(GovernanceError::InsufficientVotingPower {
                have: weight,
                need: self.params.proposal_stake,
            });
        }

        let id = compute_proposal_id(&ctx.caller, &actions, &description)?;
        if self.proposals.contains_key(&id) {
            return Err(GovernanceError::DuplicateProposal(id));
        }

        let snapshot_supply = self.token.past_total_supply(ctx.block);
        let proposal = Proposal::new(
            id,
            ctx.caller,
            actions,
            description,
            ctx.block,
            ctx.timestamp,
            self.params.voting_delay,
            self.params.voting_period,
            &snapshot_supply,
            self.params.quorum_bps,
            self.params.weight,
        )?;
        let event = ProposalCreated {
            proposal_id: id,
            proposer: ctx.caller,
            start_block: proposal.start_block,
            end_block: proposal.end_block,
            description: proposal.description.clone(),
        };
        info!(
            proposal = %id.short(),
            proposer = ?ctx.caller,
            start = proposal.start_block,
            end = proposal.end_block,
            quorum = %proposal.quorum,
            "proposal created"
        );
        self.proposals.insert(id, proposal);
        Ok((id, event.into()))
    }

    pub fn cast_vote(
        &mut self,
        ctx: &CallContext,
        id: &ProposalId,
        support: VoteSupport,
    ) -> GovernanceResult<VoteCast> {
        let proposal = self.proposal(id)?;
        let state = proposal.state(ctx.block);
        if state != ProposalState::Active {
            return Err(GovernanceError::NotActive(state));
        }
        if proposal.has_voted(&ctx.caller) {
            return Err(GovernanceError::AlreadyVoted);
        }
        let weight = self.snapshot_weight(&ctx.caller, proposal)?;
        if weight.is_zero() {
            return Err(GovernanceError::InsufficientVotingPower {
                have: weight,
                need: U256::ONE,
            });
        }

        let proposal = self
            .proposals
            .get_mut(id)
            .ok_or(GovernanceError::ProposalNotFound(*id))?;
        proposal.record_vote(ctx.caller, support, weight)?;

        info!(proposal = %id.short(), voter = ?ctx.caller, %support, %weight, "vote cast");
        Ok(VoteCast {
            proposal_id: *id,
            voter: ctx.caller,
            support,
            weight,
        })
    }

    /// Cancel a pending or active proposal. Proposer or `Admin` only.
    pub fn cancel(&mut self, ctx: &CallContext, id: &ProposalId) -> GovernanceResult<Event> {
        let proposal = self.proposal(id)?;
        let state = proposal.state(ctx.block);
        if !matches!(state, ProposalState::Pending | ProposalState::Active) {
            return Err(GovernanceError::NotCancelable(state));
        }
        if proposal.proposer != ctx.caller {
            self.roles.ensure(Role::Admin, &ctx.caller)?;
        }

        if let Some(p) = self.proposals.get_mut(id) {
            p.canceled = true;
        }
        info!(proposal = %id.short(), sender = ?ctx.caller, "proposal canceled");
        Ok(Event::ProposalCanceled {
            proposal_id: *id,
            sender: ctx.caller,
        })
    }

    pub(crate) fn mark_executed(&mut self, id: &ProposalId) -> GovernanceResult<()> {
        let proposal = self
            .proposals
            .get_mut(id)
            .ok_or(GovernanceError::ProposalNotFound(*id))?;
        if proposal.executed {
            return Err(GovernanceError::AlreadyExecuted);
        }
        proposal.executed = true;
        Ok(())
    }

    // --- governance parameters (Admin) ---

    pub fn set_reputation_weight_factor(
        &mut self,
        ctx: &CallContext,
        bps: u16,
    ) -> GovernanceResult<Event> {
        self.roles.ensure(Role::Admin, &ctx.caller)?;
        check_bps("reputation_weight_factor_bps", bps)?;
        let old = std::mem::replace(&mut self.params.weight.reputation_weight_factor_bps, bps);
        Ok(self.changed(Parameter::ReputationWeightFactor, old, bps, ctx))
    }

    pub fn set_quadratic_voting_factor(
        &mut self,
        ctx: &CallContext,
        bps: u16,
    ) -> GovernanceResult<Event> {
        self.roles.ensure(Role::Admin, &ctx.caller)?;
        check_bps("quadratic_voting_factor_bps", bps)?;
        let old = std::mem::replace(&mut self.params.weight.quadratic_voting_factor_bps, bps);
        Ok(self.changed(Parameter::QuadraticVotingFactor, old, bps, ctx))
    }

    pub fn set_proposal_stake(&mut self, ctx: &CallContext, stake: U256) -> GovernanceResult<Event> {
        self.roles.ensure(Role::Admin, &ctx.caller)?;
        let old = std::mem::replace(&mut self.params.proposal_stake, stake);
        Ok(self.changed(Parameter::ProposalStake, old, stake, ctx))
    }

    pub fn set_quorum(&mut self, ctx: &CallContext, bps: u16) -> GovernanceResult<Event> {
        self.roles.ensure(Role::Admin, &ctx.caller)?;
        if u64::from(bps) > BPS_DENOMINATOR {
            return Err(GovernanceError::InvalidParameter(format!(
                "quorum_bps = {bps} exceeds {BPS_DENOMINATOR}"
            )));
        }
        let old = std::mem::replace(&mut self.params.quorum_bps, bps);
        Ok(self.changed(Parameter::Quorum, old, bps, ctx))
    }

    pub fn set_voting_delay(&mut self, ctx: &CallContext, blocks: u64) -> GovernanceResult<Event> {
        self.roles.ensure(Role::Admin, &ctx.caller)?;
        let old = std::mem::replace(&mut self.params.voting_delay, blocks);
        Ok(self.changed(Parameter::VotingDelay, old, blocks, ctx))
    }

    pub fn set_voting_period(&mut self, ctx: &CallContext, blocks: u64) -> GovernanceResult<Event> {
        self.roles.ensure(Role::Admin, &ctx.caller)?;
        if blocks == 0 {
            return Err(GovernanceError::InvalidParameter(
                "voting period cannot be 0".into(),
            ));
        }
        let old = std::mem::replace(&mut self.params.voting_period, blocks);
        Ok(self.changed(Parameter::VotingPeriod, old, blocks, ctx))
    }

    fn changed(
        &self,
        parameter: Parameter,
        old: impl Into<U256>,
        new: impl Into<U256>,
        ctx: &CallContext,
    ) -> Event {
        let event = ParameterChanged::new(parameter, old, new, ctx.caller);
        info!(?parameter, old = %event.old_value, new = %event.new_value, "governance parameter set");
        event.into()
    }

    // --- system calls made by executed proposals ---

    /// Run one decoded system call. `ctx.caller` is [`GOVERNOR`].
    pub(crate) fn apply_system_call(
        &mut self,
        ctx: &CallContext,
        call: SystemCall,
    ) -> GovernanceResult<Vec<Event>> {
        debug!(?call, "system call");
        let events: Vec<Event> = match call {
            SystemCall::Governor(call) => match call {
                GovernorCall::SetReputationWeightFactor(bps) => {
                    vec![self.set_reputation_weight_factor(ctx, bps)?]
                }
                GovernorCall::SetQuadraticVotingFactor(bps) => {
                    vec![self.set_quadratic_voting_factor(ctx, bps)?]
                }
                GovernorCall::SetProposalStake(stake) => vec![self.set_proposal_stake(ctx, stake)?],
                GovernorCall::SetQuorum(bps) => vec![self.set_quorum(ctx, bps)?],
                GovernorCall::SetVotingDelay(blocks) => vec![self.set_voting_delay(ctx, blocks)?],
                GovernorCall::SetVotingPeriod(blocks) => vec![self.set_voting_period(ctx, blocks)?],
                GovernorCall::GrantRole { role, account } => self
                    .roles
                    .grant_role(ctx, role, account)?
                    .map(Event::from)
                    .into_iter()
                    .collect(),
                GovernorCall::RevokeRole { role, account } => self
                    .roles
                    .revoke_role(ctx, role, account)?
                    .map(Event::from)
                    .into_iter()
                    .collect(),
            },
            SystemCall::Treasury(call) => match call {
                TreasuryCall::AllocateFunds { to, amount, memo } => vec![self
                    .treasury
                    .allocate_funds(&self.roles, &mut self.native, ctx, to, amount, memo)?
                    .into()],
                TreasuryCall::AllocateTokens {
                    token,
                    to,
                    amount,
                    memo,
                } => vec![self
                    .treasury
                    .allocate_tokens(&self.roles, &mut self.token, ctx, token, to, amount, memo)?
                    .into()],
                TreasuryCall::SetTransactionFee(bps) => {
                    vec![self.treasury.set_transaction_fee(&self.roles, ctx, bps)?.into()]
                }
                TreasuryCall::SetBurnPercent(p) => {
                    vec![self.treasury.set_burn_percent(&self.roles, ctx, p)?.into()]
                }
                TreasuryCall::SetReservePercent(p) => {
                    vec![self.treasury.set_reserve_percent(&self.roles, ctx, p)?.into()]
                }
            },
            SystemCall::Token(call) => match call {
                TokenCall::Transfer { to, amount } => vec![self.token.transfer(ctx, to, amount)?.into()],
                TokenCall::Approve { spender, amount } => {
                    vec![self.token.approve(ctx, spender, amount)?.into()]
                }
                TokenCall::Mint { to, amount } => {
                    vec![self.token.mint(&self.roles, ctx, to, amount)?.into()]
                }
                TokenCall::Burn { amount } => vec![self.token.burn(&self.roles, ctx, amount)?.into()],
            },
            SystemCall::Reputation(call) => match call {
                ReputationCall::AddReputation {
                    principal,
                    contribution,
                    amount,
                } => vec![self
                    .reputation
                    .add_reputation(&self.roles, ctx, principal, contribution, amount)?
                    .into()],
                ReputationCall::SetDecayRate {
                    principal,
                    rate_bps,
                } => vec![self
                    .reputation
                    .set_decay_rate(&self.roles, ctx, principal, rate_bps)?
                    .into()],
                ReputationCall::SetDefaultDecayRate(rate_bps) => vec![self
                    .reputation
                    .set_default_decay_rate(&self.roles, ctx, rate_bps)?
                    .into()],
            },
        };
        Ok(events)
    }

    /// Pay `value` native funds from the treasury to an outside target.
    pub(crate) fn pay_from_treasury(
        &mut self,
        ctx: &CallContext,
        to: Address,
        value: U256,
    ) -> GovernanceResult<Option<Event>> {
        if value.is_zero() {
            return Ok(None);
        }
        let transfer = self.native.transfer(&ctx.as_caller(TREASURY), to, value)?;
        Ok(Some(transfer.into()))
    }
}
