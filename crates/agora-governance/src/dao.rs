//! The engine facade.
//!
//! [`Dao`] serializes every call: it refuses system callers, checks the
//! caller's clock against the last committed one, runs the operation, and
//! appends the emitted events to the log stamped with the call's block and
//! timestamp. A failed call leaves state, log and clock untouched.

use std::sync::Arc;

use agora_ledger::{ContributionType, Role};
use agora_types::{Address, CallContext, U256};
use parking_lot::Mutex;
use tracing::{info, warn};

use crate::action::{Action, CallForwarder, RejectPayloads, GOVERNOR};
use crate::config::DaoConfig;
use crate::error::{GovernanceError, GovernanceResult};
use crate::events::{Event, EventRecord};
use crate::proposal::{Proposal, ProposalId, ProposalState, VoteSupport};
use crate::state::{DaoState, GovernanceParams};
use crate::transaction::StateTransaction;
use crate::treasury::{StreamId, Treasury};

/// Engine behind the single lock used off a serialized host.
pub type SharedDao = Arc<Mutex<Dao>>;

pub struct Dao {
    state: DaoState,
    log: Vec<EventRecord>,
    last_block: u64,
    last_timestamp: u64,
    forwarder: Box<dyn CallForwarder>,
}

impl Dao {
    /// Create an engine from `config` with the default forwarder, which
    /// rejects external payloads.
    pub fn new(config: &DaoConfig) -> GovernanceResult<Self> {
        Self::with_forwarder(config, Box::new(RejectPayloads))
    }

    pub fn with_forwarder(
        config: &DaoConfig,
        forwarder: Box<dyn CallForwarder>,
    ) -> GovernanceResult<Self> {
        let state = DaoState::from_config(config)?;
        info!(
            token = %config.token.symbol,
            supply = %state.token().total_supply(),
            "dao initialized"
        );
        Ok(Self {
            state,
            log: Vec::new(),
            last_block: 0,
            last_timestamp: 0,
            forwarder,
        })
    }

    pub fn into_shared(self) -> SharedDao {
        Arc::new(Mutex::new(self))
    }

    /// System accounts act only through [`Dao::execute`]; the clock never
    /// moves backwards.
    fn check_call(&self, ctx: &CallContext) -> GovernanceResult<()> {
        if ctx.caller.is_system() {
            warn!(caller = ?ctx.caller, "call from reserved address");
            return Err(GovernanceError::ReservedCaller(ctx.caller));
        }
        if ctx.block < self.last_block || ctx.timestamp < self.last_timestamp {
            warn!(
                block = ctx.block,
                timestamp = ctx.timestamp,
                last_block = self.last_block,
                last_timestamp = self.last_timestamp,
                "clock regression"
            );
            return Err(GovernanceError::ClockRegression {
                block: ctx.block,
                timestamp: ctx.timestamp,
                last_block: self.last_block,
                last_timestamp: self.last_timestamp,
            });
        }
        Ok(())
    }

    fn commit(&mut self, ctx: &CallContext, events: Vec<Event>) {
        self.last_block = ctx.block;
        self.last_timestamp = ctx.timestamp;
        self.log.extend(events.into_iter().map(|event| EventRecord {
            block: ctx.block,
            timestamp: ctx.timestamp,
            event,
        }));
    }

    /// Run an operation that validates before it writes.
    fn run<T>(
        &mut self,
        ctx: &CallContext,
        op: impl FnOnce(&mut DaoState) -> GovernanceResult<(T, Vec<Event>)>,
    ) -> GovernanceResult<T> {
        self.check_call(ctx)?;
        let (value, events) = op(&mut self.state)?;
        self.commit(ctx, events);
        Ok(value)
    }

    fn run_event<E, X>(
        &mut self,
        ctx: &CallContext,
        op: impl FnOnce(&mut DaoState) -> Result<E, X>,
    ) -> GovernanceResult<()>
    where
        E: Into<Event>,
        GovernanceError: From<X>,
    {
        self.run(ctx, |state| Ok(((), vec![op(state)?.into()])))
    }

    // --- roles ---

    pub fn grant_role(&mut self, ctx: &CallContext, role: Role, account: Address) -> GovernanceResult<()> {
        self.run(ctx, |s| {
            let granted = s.roles.grant_role(ctx, role, account)?;
            Ok(((), granted.into_iter().map(Event::from).collect()))
        })
    }

    pub fn revoke_role(&mut self, ctx: &CallContext, role: Role, account: Address) -> GovernanceResult<()> {
        self.run(ctx, |s| {
            let revoked = s.roles.revoke_role(ctx, role, account)?;
            Ok(((), revoked.into_iter().map(Event::from).collect()))
        })
    }

    pub fn renounce_role(&mut self, ctx: &CallContext, role: Role) -> GovernanceResult<()> {
        self.run(ctx, |s| {
            let revoked = s.roles.renounce_role(ctx, role)?;
            Ok(((), revoked.into_iter().map(Event::from).collect()))
        })
    }

    pub fn has_role(&self, role: Role, account: &Address) -> bool {
        self.state.roles.has_role(role, account)
    }

    // --- reputation ---

    pub fn add_reputation(
        &mut self,
        ctx: &CallContext,
        principal: Address,
        contribution: ContributionType,
        amount: U256,
    ) -> GovernanceResult<()> {
        self.run_event(ctx, |s| {
            s.reputation
                .add_reputation(&s.roles, ctx, principal, contribution, amount)
        })
    }

    pub fn set_decay_rate(&mut self, ctx: &CallContext, principal: Address, rate_bps: u16) -> GovernanceResult<()> {
        self.run_event(ctx, |s| {
            s.reputation.set_decay_rate(&s.roles, ctx, principal, rate_bps)
        })
    }

    pub fn set_default_decay_rate(&mut self, ctx: &CallContext, rate_bps: u16) -> GovernanceResult<()> {
        self.run_event(ctx, |s| {
            s.reputation.set_default_decay_rate(&s.roles, ctx, rate_bps)
        })
    }

    // --- token ---

    pub fn transfer(&mut self, ctx: &CallContext, to: Address, amount: U256) -> GovernanceResult<()> {
        self.run_event(ctx, |s| s.token.transfer(ctx, to, amount))
    }

    pub fn approve(&mut self, ctx: &CallContext, spender: Address, amount: U256) -> GovernanceResult<()> {
        self.run_event(ctx, |s| s.token.approve(ctx, spender, amount))
    }

    pub fn transfer_from(
        &mut self,
        ctx: &CallContext,
        from: Address,
        to: Address,
        amount: U256,
    ) -> GovernanceResult<()> {
        self.run_event(ctx, |s| s.token.transfer_from(ctx, from, to, amount))
    }

    pub fn mint(&mut self, ctx: &CallContext, to: Address, amount: U256) -> GovernanceResult<()> {
        self.run_event(ctx, |s| s.token.mint(&s.roles, ctx, to, amount))
    }

    pub fn burn(&mut self, ctx: &CallContext, amount: U256) -> GovernanceResult<()> {
        self.run_event(ctx, |s| s.token.burn(&s.roles, ctx, amount))
    }

    pub fn stake(&mut self, ctx: &CallContext, amount: U256) -> GovernanceResult<()> {
        self.run_event(ctx, |s| s.token.stake(ctx, amount))
    }

    pub fn unstake(&mut self, ctx: &CallContext, amount: U256) -> GovernanceResult<()> {
        self.run_event(ctx, |s| s.token.unstake(ctx, amount))
    }

    /// Mint accrued staking rewards to the caller. Returns the amount.
    pub fn claim_staking_rewards(&mut self, ctx: &CallContext) -> GovernanceResult<U256> {
        self.run(ctx, |s| {
            let claimed = s.token.claim_staking_rewards(ctx)?;
            Ok((claimed.reward, vec![claimed.into()]))
        })
    }

    pub fn calculate_staking_rewards(&self, owner: &Address, now: u64) -> GovernanceResult<U256> {
        Ok(self.state.token.calculate_staking_rewards(owner, now)?)
    }

    pub fn delegate(&mut self, ctx: &CallContext, delegatee: Address) -> GovernanceResult<()> {
        self.run_event(ctx, |s| s.token.delegate(ctx, delegatee))
    }

    // --- treasury ---

    /// Move native funds from the caller into the treasury.
    pub fn deposit(&mut self, ctx: &CallContext, amount: U256) -> GovernanceResult<()> {
        self.run_event(ctx, |s| s.treasury.deposit(&mut s.native, ctx, amount))
    }

    pub fn capture_revenue(&mut self, ctx: &CallContext, stream: StreamId, gross: U256) -> GovernanceResult<()> {
        self.run(ctx, |s| {
            let events = s
                .treasury
                .capture_revenue(&s.roles, &mut s.token, ctx, stream, gross)?;
            Ok(((), events))
        })
    }

    pub fn process_crowdfunding(
        &mut self,
        ctx: &CallContext,
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> GovernanceResult<()> {
        self.run(ctx, |s| {
            let events = s
                .treasury
                .process_crowdfunding(&s.roles, &mut s.token, ctx, token, from, to, amount)?;
            Ok(((), events))
        })
    }

    pub fn allocate_funds(
        &mut self,
        ctx: &CallContext,
        to: Address,
        amount: U256,
        memo: String,
    ) -> GovernanceResult<()> {
        self.run_event(ctx, |s| {
            s.treasury
                .allocate_funds(&s.roles, &mut s.native, ctx, to, amount, memo)
        })
    }

    pub fn allocate_tokens(
        &mut self,
        ctx: &CallContext,
        token: Address,
        to: Address,
        amount: U256,
        memo: String,
    ) -> GovernanceResult<()> {
        self.run_event(ctx, |s| {
            s.treasury
                .allocate_tokens(&s.roles, &mut s.token, ctx, token, to, amount, memo)
        })
    }

    pub fn set_transaction_fee(&mut self, ctx: &CallContext, fee_bps: u16) -> GovernanceResult<()> {
        self.run_event(ctx, |s| s.treasury.set_transaction_fee(&s.roles, ctx, fee_bps))
    }

    pub fn set_burn_percent(&mut self, ctx: &CallContext, percent: u8) -> GovernanceResult<()> {
        self.run_event(ctx, |s| s.treasury.set_burn_percent(&s.roles, ctx, percent))
    }

    pub fn set_reserve_percent(&mut self, ctx: &CallContext, percent: u8) -> GovernanceResult<()> {
        self.run_event(ctx, |s| s.treasury.set_reserve_percent(&s.roles, ctx, percent))
    }

    // --- governance parameters ---

    pub fn set_reputation_weight_factor(&mut self, ctx: &CallContext, bps: u16) -> GovernanceResult<()> {
        self.run_event(ctx, |s| s.set_reputation_weight_factor(ctx, bps))
    }

    pub fn set_quadratic_voting_factor(&mut self, ctx: &CallContext, bps: u16) -> GovernanceResult<()> {
        self.run_event(ctx, |s| s.set_quadratic_voting_factor(ctx, bps))
    }

    pub fn set_proposal_stake(&mut self, ctx: &CallContext, stake: U256) -> GovernanceResult<()> {
        self.run_event(ctx, |s| s.set_proposal_stake(ctx, stake))
    }

    pub fn set_quorum(&mut self, ctx: &CallContext, bps: u16) -> GovernanceResult<()> {
        self.run_event(ctx, |s| s.set_quorum(ctx, bps))
    }

    pub fn set_voting_delay(&mut self, ctx: &CallContext, blocks: u64) -> GovernanceResult<()> {
        self.run_event(ctx, |s| s.set_voting_delay(ctx, blocks))
    }

    pub fn set_voting_period(&mut self, ctx: &CallContext, blocks: u64) -> GovernanceResult<()> {
        self.run_event(ctx, |s| s.set_voting_period(ctx, blocks))
    }

    // --- proposals ---

    pub fn propose(
        &mut self,
        ctx: &CallContext,
        actions: Vec<Action>,
        description: impl Into<String>,
    ) -> GovernanceResult<ProposalId> {
        let description = description.into();
        self.run(ctx, |s| {
            let (id, event) = s.propose(ctx, actions, description)?;
            Ok((id, vec![event]))
        })
    }

    /// Vote on an active proposal. Returns the weight counted.
    pub fn cast_vote(
        &mut self,
        ctx: &CallContext,
        id: &ProposalId,
        support: VoteSupport,
    ) -> GovernanceResult<U256> {
        self.run(ctx, |s| {
            let vote = s.cast_vote(ctx, id, support)?;
            Ok((vote.weight, vec![vote.into()]))
        })
    }

    pub fn cancel(&mut self, ctx: &CallContext, id: &ProposalId) -> GovernanceResult<()> {
        self.run_event(ctx, |s| s.cancel(ctx, id))
    }

    /// Execute a succeeded proposal.
    ///
    /// Every action runs as [`GOVERNOR`] against a staged copy; external
    /// calls are then handed to the forwarder in one batch. The staged state
    /// replaces the live one only if all of that succeeded. On failure the
    /// proposal stays `Succeeded` and can be executed again.
    pub fn execute(&mut self, ctx: &CallContext, id: &ProposalId) -> GovernanceResult<()> {
        self.check_call(ctx)?;

        let proposal = self.state.proposal(id)?;
        if proposal.executed {
            return Err(GovernanceError::AlreadyExecuted);
        }
        let state = proposal.state(ctx.block);
        if state != ProposalState::Succeeded {
            return Err(GovernanceError::NotSucceeded(state));
        }
        let actions = proposal.actions.clone();

        let gov = ctx.as_caller(GOVERNOR);
        let mut tx = StateTransaction::begin(&self.state);
        for (index, action) in actions.iter().enumerate() {
            if let Err(e) = tx.apply(&gov, action) {
                warn!(proposal = %id.short(), index, error = %e, "proposal action failed");
                return Err(GovernanceError::ExecutionFailed {
                    index,
                    reason: e.to_string(),
                });
            }
        }
        tx.state_mut().mark_executed(id)?;
        tx.emit(Event::ProposalExecuted {
            proposal_id: *id,
            sender: ctx.caller,
        });

        let (staged, events, outbox) = tx.into_parts();
        if !outbox.is_empty() {
            self.forwarder.deliver(&gov, &outbox).map_err(|e| {
                warn!(proposal = %id.short(), error = %e, "call forwarding failed");
                GovernanceError::ForwardingFailed(e)
            })?;
        }

        self.state = staged;
        info!(
            proposal = %id.short(),
            actions = actions.len(),
            external = outbox.len(),
            "proposal executed"
        );
        self.commit(ctx, events);
        Ok(())
    }

    // --- queries ---

    /// Proposal state at `block`.
    pub fn state(&self, id: &ProposalId, block: u64) -> GovernanceResult<ProposalState> {
        Ok(self.state.proposal(id)?.state(block))
    }

    pub fn proposal(&self, id: &ProposalId) -> GovernanceResult<&Proposal> {
        self.state.proposal(id)
    }

    pub fn proposals(&self) -> impl Iterator<Item = &Proposal> {
        self.state.proposals()
    }

    pub fn has_voted(&self, id: &ProposalId, voter: &Address) -> GovernanceResult<bool> {
        Ok(self.state.proposal(id)?.has_voted(voter))
    }

    pub fn quorum(&self, id: &ProposalId) -> GovernanceResult<U256> {
        Ok(self.state.proposal(id)?.quorum)
    }

    /// Live voting weight, as `propose` measures it.
    pub fn voting_weight(&self, account: &Address, now: u64) -> GovernanceResult<U256> {
        self.state.current_weight(account, now)
    }

    pub fn reputation(&self, principal: &Address, now: u64) -> U256 {
        self.state.reputation.reputation(principal, now)
    }

    pub fn contribution(&self, principal: &Address, kind: ContributionType, now: u64) -> U256 {
        self.state.reputation.contribution(principal, kind, now)
    }

    pub fn total_reputation(&self, now: u64) -> U256 {
        self.state.reputation.total_reputation(now)
    }

    pub fn balance_of(&self, owner: &Address) -> U256 {
        self.state.token.balance_of(owner)
    }

    pub fn staked_balance_of(&self, owner: &Address) -> U256 {
        self.state.token.staked_balance_of(owner)
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> U256 {
        self.state.token.allowance(owner, spender)
    }

    pub fn native_balance_of(&self, owner: &Address) -> U256 {
        self.state.native.balance_of(owner)
    }

    pub fn total_supply(&self) -> U256 {
        self.state.token.total_supply()
    }

    pub fn treasury(&self) -> &Treasury {
        &self.state.treasury
    }

    pub fn params(&self) -> &GovernanceParams {
        &self.state.params
    }

    pub fn events(&self) -> &[EventRecord] {
        &self.log
    }

    /// Block and timestamp of the last committed call.
    pub fn clock(&self) -> (u64, u64) {
        (self.last_block, self.last_timestamp)
    }
}
