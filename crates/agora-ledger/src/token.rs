//! Governance token: balances, allowances, capped mint/burn, staking with
//! linear rewards, and delegated voting units.
//!
//! A principal's voting units are `balance + staked`. They count toward the
//! principal's delegate, which is the principal itself until `delegate` is
//! called. Votes and total supply are checkpointed per block so proposals
//! can read them as of their creation point.

use std::collections::BTreeMap;

use agora_types::{Address, CallContext, BPS_DENOMINATOR, SECONDS_PER_DAY, U256};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::checkpoints::Checkpoints;
use crate::error::{LedgerError, LedgerResult};
use crate::events::{
    Approval, Burned, DelegateChanged, Minted, RewardsClaimed, Staked, Transfer, Unstaked,
};
use crate::roles::{Role, RoleTable};

/// `10000 bps * 365 days`
const REWARD_DENOMINATOR: u64 = BPS_DENOMINATOR * 365;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAccount {
    pub balance: U256,
    pub staked: U256,
    /// Start of the current accrual period
    pub stake_start: u64,
    /// Rewards settled from earlier accrual periods, not yet claimed
    pub pending_rewards: U256,
}

/// Token metadata and economic parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenParams {
    pub name: String,
    pub symbol: String,
    pub max_supply: U256,
    /// Annual reward rate on staked balances
    pub staking_reward_rate_bps: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenLedger {
    params: TokenParams,
    total_supply: U256,
    total_staked: U256,
    accounts: BTreeMap<Address, TokenAccount>,
    /// owner -> spender -> remaining allowance
    allowances: BTreeMap<Address, BTreeMap<Address, U256>>,
    delegates: BTreeMap<Address, Address>,
    votes: BTreeMap<Address, U256>,
    vote_history: BTreeMap<Address, Checkpoints<U256>>,
    supply_history: Checkpoints<U256>,
}

impl TokenLedger {
    pub fn new(params: TokenParams) -> Self {
        let mut supply_history = Checkpoints::new();
        supply_history.push(0, U256::ZERO);
        Self {
            params,
            total_supply: U256::ZERO,
            total_staked: U256::ZERO,
            accounts: BTreeMap::new(),
            allowances: BTreeMap::new(),
            delegates: BTreeMap::new(),
            votes: BTreeMap::new(),
            vote_history: BTreeMap::new(),
            supply_history,
        }
    }

    pub fn params(&self) -> &TokenParams {
        &self.params
    }

    pub fn total_supply(&self) -> U256 {
        self.total_supply
    }

    pub fn total_staked(&self) -> U256 {
        self.total_staked
    }

    pub fn account(&self, owner: &Address) -> Option<&TokenAccount> {
        self.accounts.get(owner)
    }

    pub fn balance_of(&self, owner: &Address) -> U256 {
        self.accounts.get(owner).map(|a| a.balance).unwrap_or_default()
    }

    pub fn staked_balance_of(&self, owner: &Address) -> U256 {
        self.accounts.get(owner).map(|a| a.staked).unwrap_or_default()
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> U256 {
        self.allowances
            .get(owner)
            .and_then(|m| m.get(spender))
            .copied()
            .unwrap_or_default()
    }

    pub fn delegate_of(&self, account: &Address) -> Address {
        self.delegates.get(account).copied().unwrap_or(*account)
    }

    /// Current voting units delegated to `account`.
    pub fn get_votes(&self, account: &Address) -> U256 {
        self.votes.get(account).copied().unwrap_or_default()
    }

    /// Voting units delegated to `account` as of the end of `block - 1`.
    pub fn get_past_votes(&self, account: &Address, block: u64) -> U256 {
        self.vote_history
            .get(account)
            .and_then(|cp| cp.value_before(block))
            .copied()
            .unwrap_or_default()
    }

    /// Total supply as of the end of `block - 1`.
    pub fn past_total_supply(&self, block: u64) -> U256 {
        self.supply_history
            .value_before(block)
            .copied()
            .unwrap_or_default()
    }

    /// Credit an initial allocation. Construction only; not role gated.
    pub fn mint_genesis(&mut self, to: Address, amount: U256) -> LedgerResult<Minted> {
        self.credit_new_supply(0, to, amount)
    }

    pub fn transfer(
        &mut self,
        ctx: &CallContext,
        to: Address,
        amount: U256,
    ) -> LedgerResult<Transfer> {
        self.move_balance(ctx.block, ctx.caller, to, amount)
    }

    /// Set `spender`'s allowance over the caller's balance. `U256::MAX`
    /// never decreases.
    pub fn approve(
        &mut self,
        ctx: &CallContext,
        spender: Address,
        amount: U256,
    ) -> LedgerResult<Approval> {
        if spender.is_zero() {
            return Err(LedgerError::ZeroAddress);
        }
        let owner = ctx.caller;
        let entry = self.allowances.entry(owner).or_default();
        if amount.is_zero() {
            entry.remove(&spender);
        } else {
            entry.insert(spender, amount);
        }
        debug!(owner = ?owner, spender = ?spender, %amount, "approval set");
        Ok(Approval {
            owner,
            spender,
            amount,
        })
    }

    /// Move `amount` from `from` to `to` against the caller's allowance.
    pub fn transfer_from(
        &mut self,
        ctx: &CallContext,
        from: Address,
        to: Address,
        amount: U256,
    ) -> LedgerResult<Transfer> {
        let spender = ctx.caller;
        let available = self.allowance(&from, &spender);
        if available < amount {
            return Err(LedgerError::InsufficientAllowance {
                required: amount,
                available,
            });
        }

        let event = self.move_balance(ctx.block, from, to, amount)?;
        if available != U256::MAX {
            let remaining = available.saturating_sub(&amount);
            let entry = self.allowances.entry(from).or_default();
            if remaining.is_zero() {
                entry.remove(&spender);
            } else {
                entry.insert(spender, remaining);
            }
        }
        Ok(event)
    }

    /// Mint new supply to `to`. Requires `Minter`.
    pub fn mint(
        &mut self,
        roles: &RoleTable,
        ctx: &CallContext,
        to: Address,
        amount: U256,
    ) -> LedgerResult<Minted> {
        roles.ensure(Role::Minter, &ctx.caller)?;
        self.credit_new_supply(ctx.block, to, amount)
    }

    /// Destroy `amount` of the caller's own balance. Requires `Burner`.
    pub fn burn(
        &mut self,
        roles: &RoleTable,
        ctx: &CallContext,
        amount: U256,
    ) -> LedgerResult<Burned> {
        roles.ensure(Role::Burner, &ctx.caller)?;
        if amount.is_zero() {
            return Err(LedgerError::ZeroAmount);
        }

        let from = ctx.caller;
        let balance = self.balance_of(&from);
        let new_balance = balance
            .checked_sub(&amount)
            .ok_or(LedgerError::InsufficientBalance {
                required: amount,
                available: balance,
            })?;
        let total_supply = self
            .total_supply
            .checked_sub(&amount)
            .ok_or(LedgerError::Underflow("total supply"))?;

        let delegate = self.delegate_of(&from);
        self.move_votes(ctx.block, Some(delegate), None, &amount)?;
        self.accounts.entry(from).or_default().balance = new_balance;
        self.total_supply = total_supply;
        self.supply_history.push(ctx.block, total_supply);

        info!(from = ?from, %amount, %total_supply, "tokens burned");
        Ok(Burned {
            from,
            amount,
            total_supply,
        })
    }

    /// Lock `amount` of the caller's balance. Rewards accrued on the
    /// previous stake are settled into `pending_rewards` and the accrual
    /// clock restarts.
    pub fn stake(&mut self, ctx: &CallContext, amount: U256) -> LedgerResult<Staked> {
        if amount.is_zero() {
            return Err(LedgerError::ZeroAmount);
        }
        let account = self.accounts.get(&ctx.caller).cloned().unwrap_or_default();
        let balance = account
            .balance
            .checked_sub(&amount)
            .ok_or(LedgerError::InsufficientBalance {
                required: amount,
                available: account.balance,
            })?;
        let staked = account
            .staked
            .checked_add(&amount)
            .ok_or(LedgerError::Overflow("staked balance"))?;
        let total_staked = self
            .total_staked
            .checked_add(&amount)
            .ok_or(LedgerError::Overflow("total staked"))?;
        let pending_rewards = self.settled_rewards(&account, ctx.timestamp)?;

        self.accounts.insert(
            ctx.caller,
            TokenAccount {
                balance,
                staked,
                stake_start: ctx.timestamp,
                pending_rewards,
            },
        );
        self.total_staked = total_staked;

        info!(account = ?ctx.caller, %amount, %staked, "tokens staked");
        Ok(Staked {
            account: ctx.caller,
            amount,
            staked_balance: staked,
        })
    }

    /// Release `amount` of staked balance back to the caller's balance.
    pub fn unstake(&mut self, ctx: &CallContext, amount: U256) -> LedgerResult<Unstaked> {
        if amount.is_zero() {
            return Err(LedgerError::ZeroAmount);
        }
        let account = self.accounts.get(&ctx.caller).cloned().unwrap_or_default();
        let staked = account
            .staked
            .checked_sub(&amount)
            .ok_or(LedgerError::InsufficientStaked {
                requested: amount,
                staked: account.staked,
            })?;
        let balance = account
            .balance
            .checked_add(&amount)
            .ok_or(LedgerError::Overflow("balance"))?;
        let total_staked = self
            .total_staked
            .checked_sub(&amount)
            .ok_or(LedgerError::Underflow("total staked"))?;
        let pending_rewards = self.settled_rewards(&account, ctx.timestamp)?;

        self.accounts.insert(
            ctx.caller,
            TokenAccount {
                balance,
                staked,
                stake_start: ctx.timestamp,
                pending_rewards,
            },
        );
        self.total_staked = total_staked;

        info!(account = ?ctx.caller, %amount, %staked, "tokens unstaked");
        Ok(Unstaked {
            account: ctx.caller,
            amount,
            staked_balance: staked,
        })
    }

    /// Rewards claimable by `owner` at `now`: settled rewards plus
    /// `staked * rate_bps * whole_days / (10000 * 365)`, floored.
    pub fn calculate_staking_rewards(&self, owner: &Address, now: u64) -> LedgerResult<U256> {
        match self.accounts.get(owner) {
            Some(account) => self.settled_rewards(account, now),
            None => Ok(U256::ZERO),
        }
    }

    /// Mint the caller's claimable rewards and restart accrual.
    pub fn claim_staking_rewards(&mut self, ctx: &CallContext) -> LedgerResult<RewardsClaimed> {
        let reward = self.calculate_staking_rewards(&ctx.caller, ctx.timestamp)?;
        if reward.is_zero() {
            return Err(LedgerError::NothingToClaim);
        }

        self.credit_new_supply(ctx.block, ctx.caller, reward)?;
        let account = self.accounts.entry(ctx.caller).or_default();
        account.pending_rewards = U256::ZERO;
        account.stake_start = ctx.timestamp;

        info!(account = ?ctx.caller, %reward, "staking rewards claimed");
        Ok(RewardsClaimed {
            account: ctx.caller,
            reward,
        })
    }

    /// Point the caller's voting units at `delegatee`.
    pub fn delegate(
        &mut self,
        ctx: &CallContext,
        delegatee: Address,
    ) -> LedgerResult<DelegateChanged> {
        if delegatee.is_zero() {
            return Err(LedgerError::ZeroAddress);
        }
        let delegator = ctx.caller;
        let from_delegate = self.delegate_of(&delegator);
        let units = self
            .balance_of(&delegator)
            .checked_add(&self.staked_balance_of(&delegator))
            .ok_or(LedgerError::Overflow("voting units"))?;

        self.move_votes(ctx.block, Some(from_delegate), Some(delegatee), &units)?;
        self.delegates.insert(delegator, delegatee);

        info!(delegator = ?delegator, to = ?delegatee, %units, "delegate changed");
        Ok(DelegateChanged {
            delegator,
            from_delegate,
            to_delegate: delegatee,
        })
    }

    fn settled_rewards(&self, account: &TokenAccount, now: u64) -> LedgerResult<U256> {
        let days = now.saturating_sub(account.stake_start) / SECONDS_PER_DAY;
        let factor = U256::from(self.params.staking_reward_rate_bps as u128 * days as u128);
        let accrued = account
            .staked
            .mul_div(&factor, &U256::from(REWARD_DENOMINATOR))
            .ok_or(LedgerError::Overflow("staking rewards"))?;
        account
            .pending_rewards
            .checked_add(&accrued)
            .ok_or(LedgerError::Overflow("staking rewards"))
    }

    fn credit_new_supply(&mut self, block: u64, to: Address, amount: U256) -> LedgerResult<Minted> {
        if to.is_zero() {
            return Err(LedgerError::ZeroAddress);
        }
        if amount.is_zero() {
            return Err(LedgerError::ZeroAmount);
        }
        let exceeds = || LedgerError::ExceedsMaxSupply {
            requested: amount,
            supply: self.total_supply,
            max_supply: self.params.max_supply,
        };
        let total_supply = self.total_supply.checked_add(&amount).ok_or_else(exceeds)?;
        if total_supply > self.params.max_supply {
            return Err(exceeds());
        }
        let balance = self
            .balance_of(&to)
            .checked_add(&amount)
            .ok_or(LedgerError::Overflow("balance"))?;

        let delegate = self.delegate_of(&to);
        self.move_votes(block, None, Some(delegate), &amount)?;
        self.accounts.entry(to).or_default().balance = balance;
        self.total_supply = total_supply;
        self.supply_history.push(block, total_supply);

        info!(to = ?to, %amount, %total_supply, "tokens minted");
        Ok(Minted {
            to,
            amount,
            total_supply,
        })
    }

    fn move_balance(
        &mut self,
        block: u64,
        from: Address,
        to: Address,
        amount: U256,
    ) -> LedgerResult<Transfer> {
        if to.is_zero() || from.is_zero() {
            return Err(LedgerError::ZeroAddress);
        }
        let from_balance = self.balance_of(&from);
        let new_from = from_balance
            .checked_sub(&amount)
            .ok_or(LedgerError::InsufficientBalance {
                required: amount,
                available: from_balance,
            })?;

        if from != to {
            let new_to = self
                .balance_of(&to)
                .checked_add(&amount)
                .ok_or(LedgerError::Overflow("balance"))?;
            let (src, dst) = (self.delegate_of(&from), self.delegate_of(&to));
            self.move_votes(block, Some(src), Some(dst), &amount)?;
            self.accounts.entry(from).or_default().balance = new_from;
            self.accounts.entry(to).or_default().balance = new_to;
        }

        debug!(from = ?from, to = ?to, %amount, "transfer");
        Ok(Transfer { from, to, amount })
    }

    /// Shift `amount` votes between delegates. Validates both sides before
    /// writing either.
    fn move_votes(
        &mut self,
        block: u64,
        src: Option<Address>,
        dst: Option<Address>,
        amount: &U256,
    ) -> LedgerResult<()> {
        if amount.is_zero() || src == dst {
            return Ok(());
        }
        let src_votes = match src {
            Some(s) => Some(
                self.get_votes(&s)
                    .checked_sub(amount)
                    .ok_or(LedgerError::Underflow("delegated votes"))?,
            ),
            None => None,
        };
        let dst_votes = match dst {
            Some(d) => Some(
                self.get_votes(&d)
                    .checked_add(amount)
                    .ok_or(LedgerError::Overflow("delegated votes"))?,
            ),
            None => None,
        };

        for (who, votes) in [(src, src_votes), (dst, dst_votes)] {
            if let (Some(who), Some(votes)) = (who, votes) {
                self.votes.insert(who, votes);
                self.vote_history.entry(who).or_default().push(block, votes);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const START: u64 = 1_700_000_000;

    fn alice() -> Address {
        Address::from_bytes([1u8; 20])
    }

    fn bob() -> Address {
        Address::from_bytes([2u8; 20])
    }

    fn minter() -> Address {
        Address::from_bytes([8u8; 20])
    }

    fn tokens(n: u64) -> U256 {
        U256::from(n)
    }

    fn setup() -> (TokenLedger, RoleTable) {
        let mut token = TokenLedger::new(TokenParams {
            name: "Agora".into(),
            symbol: "AGR".into(),
            max_supply: tokens(1_000_000),
            staking_reward_rate_bps: 1_000,
        });
        token.mint_genesis(alice(), tokens(10_000)).unwrap();
        let roles = RoleTable::new()
            .with_grant(Role::Minter, minter())
            .with_grant(Role::Burner, alice());
        (token, roles)
    }

    fn ctx(caller: Address, timestamp: u64) -> CallContext {
        CallContext::new(caller, 1, timestamp)
    }

    #[test]
    fn test_transfer() {
        let (mut token, _) = setup();
        let event = token.transfer(&ctx(alice(), START), bob(), tokens(400)).unwrap();
        assert_eq!(event.amount, tokens(400));
        assert_eq!(token.balance_of(&alice()), tokens(9_600));
        assert_eq!(token.balance_of(&bob()), tokens(400));
        assert_eq!(token.get_votes(&bob()), tokens(400));

        let err = token
            .transfer(&ctx(bob(), START), alice(), tokens(401))
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientBalance { .. }));
        assert_eq!(
            token.transfer(&ctx(alice(), START), Address::ZERO, tokens(1)),
            Err(LedgerError::ZeroAddress)
        );
    }

    #[test]
    fn test_transfer_from_spends_allowance() {
        let (mut token, _) = setup();
        token.approve(&ctx(alice(), START), bob(), tokens(100)).unwrap();

        token
            .transfer_from(&ctx(bob(), START), alice(), bob(), tokens(60))
            .unwrap();
        assert_eq!(token.allowance(&alice(), &bob()), tokens(40));

        let err = token
            .transfer_from(&ctx(bob(), START), alice(), bob(), tokens(41))
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientAllowance {
                required: tokens(41),
                available: tokens(40)
            }
        );
    }

    #[test]
    fn test_infinite_allowance() {
        let (mut token, _) = setup();
        token.approve(&ctx(alice(), START), bob(), U256::MAX).unwrap();
        token
            .transfer_from(&ctx(bob(), START), alice(), bob(), tokens(500))
            .unwrap();
        assert_eq!(token.allowance(&alice(), &bob()), U256::MAX);
    }

    #[test]
    fn test_mint_respects_cap_and_role() {
        let (mut token, roles) = setup();
        let err = token
            .mint(&roles, &ctx(alice(), START), alice(), tokens(1))
            .unwrap_err();
        assert!(matches!(err, LedgerError::Unauthorized { .. }));

        token
            .mint(&roles, &ctx(minter(), START), bob(), tokens(990_000))
            .unwrap();
        assert_eq!(token.total_supply(), tokens(1_000_000));

        let err = token
            .mint(&roles, &ctx(minter(), START), bob(), tokens(1))
            .unwrap_err();
        assert!(matches!(err, LedgerError::ExceedsMaxSupply { .. }));
        assert_eq!(token.total_supply(), tokens(1_000_000));
    }

    #[test]
    fn test_burn_own_balance() {
        let (mut token, roles) = setup();
        let event = token.burn(&roles, &ctx(alice(), START), tokens(1_000)).unwrap();
        assert_eq!(event.total_supply, tokens(9_000));
        assert_eq!(token.balance_of(&alice()), tokens(9_000));
        assert_eq!(token.get_votes(&alice()), tokens(9_000));

        let err = token.burn(&roles, &ctx(bob(), START), tokens(1)).unwrap_err();
        assert!(matches!(err, LedgerError::Unauthorized { .. }));
    }

    #[test]
    fn test_staking_rewards_one_year() {
        let (mut token, _) = setup();
        token.stake(&ctx(alice(), START), tokens(1_000)).unwrap();
        let year = START + 365 * SECONDS_PER_DAY;

        assert_eq!(
            token.calculate_staking_rewards(&alice(), year).unwrap(),
            tokens(100)
        );
        let claimed = token.claim_staking_rewards(&ctx(alice(), year)).unwrap();
        assert_eq!(claimed.reward, tokens(100));
        assert_eq!(token.balance_of(&alice()), tokens(9_100));
        assert_eq!(token.calculate_staking_rewards(&alice(), year).unwrap(), U256::ZERO);
        assert_eq!(
            token.claim_staking_rewards(&ctx(alice(), year)),
            Err(LedgerError::NothingToClaim)
        );
    }

    #[test]
    fn test_partial_days_truncate() {
        let (mut token, _) = setup();
        token.stake(&ctx(alice(), START), tokens(3_650)).unwrap();
        assert_eq!(
            token
                .calculate_staking_rewards(&alice(), START + SECONDS_PER_DAY - 1)
                .unwrap(),
            U256::ZERO
        );
        assert_eq!(
            token
                .calculate_staking_rewards(&alice(), START + SECONDS_PER_DAY)
                .unwrap(),
            tokens(1)
        );
    }

    #[test]
    fn test_second_stake_restarts_clock_without_losing_rewards() {
        let (mut token, _) = setup();
        token.stake(&ctx(alice(), START), tokens(1_000)).unwrap();

        let half = START + 182 * SECONDS_PER_DAY;
        token.stake(&ctx(alice(), half), tokens(1_000)).unwrap();
        let account = token.account(&alice()).unwrap();
        // 1000 * 10% * 182 / 365
        assert_eq!(account.pending_rewards, tokens(49));
        assert_eq!(account.stake_start, half);

        // new stake earns only from `half` onward
        let later = half + 365 * SECONDS_PER_DAY;
        assert_eq!(
            token.calculate_staking_rewards(&alice(), later).unwrap(),
            tokens(49 + 200)
        );
    }

    #[test]
    fn test_unstake_settles_then_claim_pays_both_periods() {
        let (mut token, _) = setup();
        token.stake(&ctx(alice(), START), tokens(1_000)).unwrap();

        let half = START + 182 * SECONDS_PER_DAY;
        token.unstake(&ctx(alice(), half), tokens(600)).unwrap();
        let account = token.account(&alice()).unwrap();
        assert_eq!(account.pending_rewards, tokens(49));
        assert_eq!(account.stake_start, half);
        assert_eq!(account.staked, tokens(400));
        assert_eq!(token.balance_of(&alice()), tokens(9_600));

        // remaining 400 earns 40 over the next year
        let later = half + 365 * SECONDS_PER_DAY;
        token.unstake(&ctx(alice(), later), tokens(400)).unwrap();
        assert_eq!(token.account(&alice()).unwrap().pending_rewards, tokens(89));

        // nothing staked, nothing more accrues
        let claim_at = later + 100 * SECONDS_PER_DAY;
        assert_eq!(
            token.calculate_staking_rewards(&alice(), claim_at).unwrap(),
            tokens(89)
        );
        let claimed = token.claim_staking_rewards(&ctx(alice(), claim_at)).unwrap();
        assert_eq!(claimed.reward, tokens(89));
        assert_eq!(token.balance_of(&alice()), tokens(10_089));
        assert_eq!(token.account(&alice()).unwrap().pending_rewards, U256::ZERO);
    }

    #[test]
    fn test_unstake_more_than_staked() {
        let (mut token, _) = setup();
        token.stake(&ctx(alice(), START), tokens(10)).unwrap();
        let err = token.unstake(&ctx(alice(), START), tokens(11)).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientStaked {
                requested: tokens(11),
                staked: tokens(10)
            }
        );
    }

    #[test]
    fn test_delegation_moves_votes() {
        let (mut token, _) = setup();
        token.stake(&ctx(alice(), START), tokens(2_000)).unwrap();
        assert_eq!(token.get_votes(&alice()), tokens(10_000));

        let event = token.delegate(&CallContext::new(alice(), 3, START), bob()).unwrap();
        assert_eq!(event.from_delegate, alice());
        assert_eq!(token.get_votes(&alice()), U256::ZERO);
        assert_eq!(token.get_votes(&bob()), tokens(10_000));

        // history before block 3 still credits alice
        assert_eq!(token.get_past_votes(&alice(), 3), tokens(10_000));
        assert_eq!(token.get_past_votes(&bob(), 3), U256::ZERO);
        assert_eq!(token.get_past_votes(&bob(), 4), tokens(10_000));
    }

    #[test]
    fn test_past_total_supply() {
        let (mut token, roles) = setup();
        token
            .mint(&roles, &CallContext::new(minter(), 5, START), bob(), tokens(500))
            .unwrap();
        assert_eq!(token.past_total_supply(1), tokens(10_000));
        assert_eq!(token.past_total_supply(5), tokens(10_000));
        assert_eq!(token.past_total_supply(6), tokens(10_500));
    }

    proptest! {
        #[test]
        fn prop_stake_unstake_round_trip(x in 0u64..=10_000, days in 0u64..1_000) {
            let (mut token, _) = setup();
            let before = token.account(&alice()).cloned().unwrap();
            let staked_at = ctx(alice(), START);
            let released_at = ctx(alice(), START + days * SECONDS_PER_DAY);

            match token.stake(&staked_at, tokens(x)) {
                Ok(_) => {
                    token.unstake(&released_at, tokens(x)).unwrap();
                }
                Err(err) => {
                    prop_assert_eq!(err, LedgerError::ZeroAmount);
                }
            }

            let after = token.account(&alice()).unwrap();
            prop_assert_eq!(after.balance, before.balance);
            prop_assert_eq!(after.staked, before.staked);
            prop_assert_eq!(token.total_staked(), U256::ZERO);
            prop_assert_eq!(token.get_votes(&alice()), tokens(10_000));
        }
    }
}
