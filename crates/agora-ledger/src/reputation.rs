//! Decaying, categorized reputation.
//!
//! Decay is linear and lazy: a stored balance shrinks by
//! `rate_bps / 10000` per 365 days since the account's `last_update`, and
//! is only written back when the account is next mutated. Reads are pure
//! functions of the stored baseline and the elapsed time.

use std::collections::BTreeMap;
use std::fmt;

use agora_types::{Address, CallContext, BPS_DENOMINATOR, SECONDS_PER_YEAR, U256};
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::checkpoints::Checkpoints;
use crate::error::{LedgerError, LedgerResult};
use crate::events::{DecayRateChanged, DefaultDecayRateChanged, ReputationAdded};
use crate::roles::{Role, RoleTable};

/// `10000 * SECONDS_PER_YEAR`: a rate of 1 bps over one second.
const DECAY_DENOMINATOR: u128 = BPS_DENOMINATOR as u128 * SECONDS_PER_YEAR as u128;

/// Category a contribution is booked under.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    BorshSerialize,
    BorshDeserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ContributionType {
    Code,
    Funding,
    Content,
    Governance,
}

impl ContributionType {
    pub const ALL: [ContributionType; 4] = [
        ContributionType::Code,
        ContributionType::Funding,
        ContributionType::Content,
        ContributionType::Governance,
    ];

    fn index(self) -> usize {
        match self {
            ContributionType::Code => 0,
            ContributionType::Funding => 1,
            ContributionType::Content => 2,
            ContributionType::Governance => 3,
        }
    }
}

impl fmt::Display for ContributionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContributionType::Code => "code",
            ContributionType::Funding => "funding",
            ContributionType::Content => "content",
            ContributionType::Governance => "governance",
        };
        f.write_str(name)
    }
}

/// Stored baseline of one principal's reputation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReputationAccount {
    /// Per-category balances as of `last_update`, indexed by `ContributionType`
    pub contributions: [U256; 4],
    /// Sum of `contributions`
    pub total: U256,
    pub last_update: u64,
    /// Account override; 0 falls back to the ledger default
    pub decay_rate_bps: u16,
}

impl ReputationAccount {
    pub fn contribution(&self, kind: ContributionType) -> U256 {
        self.contributions[kind.index()]
    }
}

/// Share of a balance left after `elapsed` seconds at `rate_bps` per year,
/// expressed over `DECAY_DENOMINATOR`.
fn remaining_factor(rate_bps: u16, elapsed: u64) -> u128 {
    let lost = (rate_bps as u128).saturating_mul(elapsed as u128);
    DECAY_DENOMINATOR - lost.min(DECAY_DENOMINATOR)
}

/// `floor(amount * remaining / DECAY_DENOMINATOR)` without widening past
/// 256 bits.
fn scale(amount: &U256, remaining: u128) -> U256 {
    if remaining == DECAY_DENOMINATOR {
        return *amount;
    }
    if remaining == 0 || amount.is_zero() {
        return U256::ZERO;
    }
    let denom = U256::from(DECAY_DENOMINATOR);
    // denominator is non-zero
    let (q, r) = amount.div_rem(&denom).unwrap_or_default();
    let r = u128::try_from(r).unwrap_or_default();
    // q * remaining <= amount; r * remaining < DECAY_DENOMINATOR^2 < 2^128
    let whole = q.checked_mul(&U256::from(remaining)).unwrap_or(*amount);
    let frac = U256::from(r * remaining / DECAY_DENOMINATOR);
    whole.checked_add(&frac).unwrap_or(*amount)
}

/// Decay every category so that the parts sum exactly to the decayed total.
///
/// Each category is floored, then the units lost to flooring are handed back
/// one at a time to categories with a fractional remainder, in declaration
/// order.
fn rebase(account: &ReputationAccount, remaining: u128) -> ([U256; 4], U256) {
    let total = scale(&account.total, remaining);
    if remaining == DECAY_DENOMINATOR {
        return (account.contributions, total);
    }

    let mut parts = [U256::ZERO; 4];
    let mut floored = U256::ZERO;
    let mut has_fraction = [false; 4];
    for (i, c) in account.contributions.iter().enumerate() {
        parts[i] = scale(c, remaining);
        // exact iff scaling the floor back up gives the original
        let scaled_back = c.checked_mul(&U256::from(remaining));
        has_fraction[i] = match scaled_back {
            Some(v) => v.checked_rem(&U256::from(DECAY_DENOMINATOR)) != Some(U256::ZERO),
            None => true,
        };
        floored = floored.checked_add(&parts[i]).unwrap_or(total);
    }

    let mut leftover = total.saturating_sub(&floored);
    for (i, part) in parts.iter_mut().enumerate() {
        if leftover.is_zero() {
            break;
        }
        if has_fraction[i] {
            *part = part.checked_add(&U256::ONE).unwrap_or(*part);
            leftover = leftover.saturating_sub(&U256::ONE);
        }
    }
    (parts, total)
}

/// Per-principal decaying reputation, plus the history needed to read it
/// back as of an earlier block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReputationLedger {
    default_decay_rate_bps: u16,
    accounts: BTreeMap<Address, ReputationAccount>,
    /// Sum of stored (not yet decayed) account totals
    recorded_total: U256,
    history: BTreeMap<Address, Checkpoints<ReputationAccount>>,
    default_rate_history: Checkpoints<u16>,
}

impl ReputationLedger {
    pub fn new(default_decay_rate_bps: u16) -> Self {
        let mut default_rate_history = Checkpoints::new();
        default_rate_history.push(0, default_decay_rate_bps);
        Self {
            default_decay_rate_bps,
            accounts: BTreeMap::new(),
            recorded_total: U256::ZERO,
            history: BTreeMap::new(),
            default_rate_history,
        }
    }

    pub fn default_decay_rate_bps(&self) -> u16 {
        self.default_decay_rate_bps
    }

    pub fn account(&self, principal: &Address) -> Option<&ReputationAccount> {
        self.accounts.get(principal)
    }

    fn effective_rate(account: &ReputationAccount, default_rate: u16) -> u16 {
        if account.decay_rate_bps == 0 {
            default_rate
        } else {
            account.decay_rate_bps
        }
    }

    fn decayed(account: &ReputationAccount, default_rate: u16, now: u64) -> U256 {
        let rate = Self::effective_rate(account, default_rate);
        let elapsed = now.saturating_sub(account.last_update);
        scale(&account.total, remaining_factor(rate, elapsed))
    }

    /// Decayed reputation of `principal` at time `now`.
    pub fn reputation(&self, principal: &Address, now: u64) -> U256 {
        self.accounts
            .get(principal)
            .map(|a| Self::decayed(a, self.default_decay_rate_bps, now))
            .unwrap_or(U256::ZERO)
    }

    /// Decayed balance of a single category. Categories are floored
    /// independently and may sum to slightly less than `reputation`.
    pub fn contribution(&self, principal: &Address, kind: ContributionType, now: u64) -> U256 {
        let Some(account) = self.accounts.get(principal) else {
            return U256::ZERO;
        };
        let rate = Self::effective_rate(account, self.default_decay_rate_bps);
        let elapsed = now.saturating_sub(account.last_update);
        scale(&account.contribution(kind), remaining_factor(rate, elapsed))
    }

    /// Reputation as the account stood before `block`, decayed to
    /// `timestamp` at the rates in force before `block`.
    pub fn reputation_at(&self, principal: &Address, block: u64, timestamp: u64) -> U256 {
        let Some(account) = self
            .history
            .get(principal)
            .and_then(|cp| cp.value_before(block))
        else {
            return U256::ZERO;
        };
        let default_rate = self
            .default_rate_history
            .value_before(block)
            .copied()
            .unwrap_or(self.default_decay_rate_bps);
        Self::decayed(account, default_rate, timestamp)
    }

    /// Exact sum of every account's decayed balance at `now`.
    pub fn total_reputation(&self, now: u64) -> U256 {
        self.accounts
            .values()
            .map(|a| Self::decayed(a, self.default_decay_rate_bps, now))
            // bounded by recorded_total
            .fold(U256::ZERO, |acc, v| acc.checked_add(&v).unwrap_or(U256::MAX))
    }

    /// Incrementally maintained sum of stored balances. Never below
    /// `total_reputation(now)`.
    pub fn recorded_total(&self) -> U256 {
        self.recorded_total
    }

    /// Rebase `principal` to `ctx.timestamp`, then credit `amount` under
    /// `kind`.
    pub fn add_reputation(
        &mut self,
        roles: &RoleTable,
        ctx: &CallContext,
        principal: Address,
        kind: ContributionType,
        amount: U256,
    ) -> LedgerResult<ReputationAdded> {
        roles.ensure(Role::ReputationManager, &ctx.caller)?;
        if principal.is_zero() {
            return Err(LedgerError::ZeroAddress);
        }

        let current = self.accounts.get(&principal).cloned().unwrap_or_default();
        let rate = Self::effective_rate(&current, self.default_decay_rate_bps);
        let elapsed = ctx.timestamp.saturating_sub(current.last_update);
        let (mut parts, decayed_total) = rebase(&current, remaining_factor(rate, elapsed));

        let idx = kind.index();
        parts[idx] = parts[idx]
            .checked_add(&amount)
            .ok_or(LedgerError::Overflow("reputation category"))?;
        let new_total = decayed_total
            .checked_add(&amount)
            .ok_or(LedgerError::Overflow("reputation total"))?;
        let recorded_total = self
            .recorded_total
            .checked_sub(&current.total)
            .ok_or(LedgerError::Underflow("recorded reputation"))?
            .checked_add(&new_total)
            .ok_or(LedgerError::Overflow("recorded reputation"))?;

        let decay_applied = current.total.saturating_sub(&decayed_total);
        let updated = ReputationAccount {
            contributions: parts,
            total: new_total,
            last_update: ctx.timestamp,
            decay_rate_bps: current.decay_rate_bps,
        };

        self.history
            .entry(principal)
            .or_default()
            .push(ctx.block, updated.clone());
        self.accounts.insert(principal, updated);
        self.recorded_total = recorded_total;

        info!(
            principal = ?principal,
            contribution = %kind,
            %amount,
            %decay_applied,
            %new_total,
            "reputation added"
        );
        Ok(ReputationAdded {
            principal,
            contribution: kind,
            amount,
            decay_applied,
            new_total,
        })
    }

    /// Set a per-account decay rate. Takes effect on the next read; the
    /// stored baseline is not rebased.
    pub fn set_decay_rate(
        &mut self,
        roles: &RoleTable,
        ctx: &CallContext,
        principal: Address,
        rate_bps: u16,
    ) -> LedgerResult<DecayRateChanged> {
        roles.ensure(Role::ReputationManager, &ctx.caller)?;
        if principal.is_zero() {
            return Err(LedgerError::ZeroAddress);
        }

        let account = self.accounts.entry(principal).or_insert_with(|| ReputationAccount {
            last_update: ctx.timestamp,
            ..Default::default()
        });
        let old_rate_bps = account.decay_rate_bps;
        account.decay_rate_bps = rate_bps;
        let snapshot = account.clone();
        self.history
            .entry(principal)
            .or_default()
            .push(ctx.block, snapshot);

        debug!(principal = ?principal, old_rate_bps, rate_bps, "decay rate set");
        Ok(DecayRateChanged {
            principal,
            old_rate_bps,
            new_rate_bps: rate_bps,
        })
    }

    /// Set the rate used by accounts without an override.
    pub fn set_default_decay_rate(
        &mut self,
        roles: &RoleTable,
        ctx: &CallContext,
        rate_bps: u16,
    ) -> LedgerResult<DefaultDecayRateChanged> {
        roles.ensure(Role::ReputationManager, &ctx.caller)?;
        let old_rate_bps = self.default_decay_rate_bps;
        self.default_decay_rate_bps = rate_bps;
        self.default_rate_history.push(ctx.block, rate_bps);

        info!(old_rate_bps, rate_bps, "default decay rate set");
        Ok(DefaultDecayRateChanged {
            old_rate_bps,
            new_rate_bps: rate_bps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_types::SECONDS_PER_DAY;
    use proptest::prelude::*;

    const START: u64 = 1_700_000_000;

    fn manager() -> Address {
        Address::from_bytes([7u8; 20])
    }

    fn alice() -> Address {
        Address::from_bytes([1u8; 20])
    }

    fn setup() -> (ReputationLedger, RoleTable) {
        let roles = RoleTable::new().with_grant(Role::ReputationManager, manager());
        (ReputationLedger::new(1_000), roles)
    }

    fn at(block: u64, timestamp: u64) -> CallContext {
        CallContext::new(manager(), block, timestamp)
    }

    #[test]
    fn test_half_year_decay() {
        let (mut rep, roles) = setup();
        rep.add_reputation(&roles, &at(1, START), alice(), ContributionType::Code, U256::from(100u64))
            .unwrap();

        // 182.5 days
        let half = START + 365 * SECONDS_PER_DAY / 2;
        assert_eq!(rep.reputation(&alice(), half), U256::from(95u64));
        assert_eq!(rep.reputation(&alice(), START + SECONDS_PER_YEAR), U256::from(90u64));
    }

    #[test]
    fn test_add_after_one_year() {
        let (mut rep, roles) = setup();
        rep.add_reputation(&roles, &at(1, START), alice(), ContributionType::Code, U256::from(100u64))
            .unwrap();

        let year = START + SECONDS_PER_YEAR;
        let event = rep
            .add_reputation(&roles, &at(2, year), alice(), ContributionType::Code, U256::from(100u64))
            .unwrap();
        assert_eq!(event.decay_applied, U256::from(10u64));
        assert_eq!(event.new_total, U256::from(190u64));
        assert_eq!(rep.reputation(&alice(), year), U256::from(190u64));
        assert_eq!(rep.recorded_total(), U256::from(190u64));
    }

    #[test]
    fn test_custom_rate() {
        let (mut rep, roles) = setup();
        rep.add_reputation(&roles, &at(1, START), alice(), ContributionType::Funding, U256::from(100u64))
            .unwrap();
        rep.set_decay_rate(&roles, &at(1, START), alice(), 2_000).unwrap();

        assert_eq!(rep.reputation(&alice(), START + SECONDS_PER_YEAR), U256::from(80u64));
    }

    #[test]
    fn test_decay_clamps_at_zero() {
        let (mut rep, roles) = setup();
        rep.add_reputation(&roles, &at(1, START), alice(), ContributionType::Content, U256::from(100u64))
            .unwrap();
        let eleven_years = START + 11 * SECONDS_PER_YEAR;
        assert_eq!(rep.reputation(&alice(), eleven_years), U256::ZERO);
    }

    #[test]
    fn test_default_rate_change_is_lazy() {
        let (mut rep, roles) = setup();
        rep.add_reputation(&roles, &at(1, START), alice(), ContributionType::Code, U256::from(100u64))
            .unwrap();
        rep.set_default_decay_rate(&roles, &at(2, START + 1), 5_000).unwrap();

        // the new rate applies to the whole elapsed span
        assert_eq!(rep.reputation(&alice(), START + SECONDS_PER_YEAR), U256::from(50u64));
        // snapshot before block 2 still sees the old rate
        assert_eq!(
            rep.reputation_at(&alice(), 2, START + SECONDS_PER_YEAR),
            U256::from(90u64)
        );
    }

    #[test]
    fn test_requires_manager() {
        let (mut rep, roles) = setup();
        let ctx = CallContext::new(alice(), 1, START);
        let err = rep
            .add_reputation(&roles, &ctx, alice(), ContributionType::Code, U256::from(1u64))
            .unwrap_err();
        assert!(matches!(err, LedgerError::Unauthorized { .. }));
        assert!(rep.account(&alice()).is_none());
    }

    #[test]
    fn test_category_overflow() {
        let (mut rep, roles) = setup();
        rep.add_reputation(&roles, &at(1, START), alice(), ContributionType::Code, U256::MAX)
            .unwrap();
        let err = rep
            .add_reputation(&roles, &at(1, START), alice(), ContributionType::Governance, U256::ONE)
            .unwrap_err();
        assert_eq!(err, LedgerError::Overflow("reputation total"));
        assert_eq!(rep.reputation(&alice(), START), U256::MAX);
    }

    #[test]
    fn test_rebased_categories_sum_to_total() {
        let (mut rep, roles) = setup();
        for kind in ContributionType::ALL {
            rep.add_reputation(&roles, &at(1, START), alice(), kind, U256::from(33u64))
                .unwrap();
        }
        let later = START + 100 * SECONDS_PER_DAY;
        rep.add_reputation(&roles, &at(2, later), alice(), ContributionType::Code, U256::ZERO)
            .unwrap();

        let account = rep.account(&alice()).unwrap();
        let sum = account
            .contributions
            .iter()
            .fold(U256::ZERO, |acc, c| acc.checked_add(c).unwrap());
        assert_eq!(sum, account.total);
    }

    #[test]
    fn test_reputation_at_uses_prior_block() {
        let (mut rep, roles) = setup();
        rep.add_reputation(&roles, &at(5, START), alice(), ContributionType::Code, U256::from(100u64))
            .unwrap();
        assert_eq!(rep.reputation_at(&alice(), 5, START), U256::ZERO);
        assert_eq!(rep.reputation_at(&alice(), 6, START), U256::from(100u64));
    }

    proptest! {
        #[test]
        fn prop_decay_is_monotone(amount in 0u64..u64::MAX, a in 0u64..(20 * SECONDS_PER_YEAR), b in 0u64..(20 * SECONDS_PER_YEAR)) {
            let (mut rep, roles) = setup();
            rep.add_reputation(&roles, &at(1, START), alice(), ContributionType::Code, U256::from(amount)).unwrap();
            let (early, late) = if a <= b { (a, b) } else { (b, a) };
            let r_early = rep.reputation(&alice(), START + early);
            let r_late = rep.reputation(&alice(), START + late);
            prop_assert!(r_late <= r_early);
            prop_assert!(r_early <= U256::from(amount));
            prop_assert!(rep.total_reputation(START + late) <= rep.recorded_total());
        }
    }
}
