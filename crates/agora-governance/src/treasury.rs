//! Treasury: fee capture, burn/reserve split and governed disbursement.
//!
//! Fees are collected in governance tokens into the [`TREASURY`] account.
//! The burn share is destroyed immediately through the token ledger, the
//! reserve share is earmarked in `reserve_fund`, and the remainder stays in
//! the treasury balance as unallocated revenue. Native funds sit in the
//! treasury's native balance and are only paid out by `Governor` calls.

use std::collections::BTreeMap;
use std::fmt;

use agora_ledger::{LedgerError, NativeLedger, Role, RoleTable, TokenLedger};
use agora_types::{Address, CallContext, U256};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::action::{TOKEN, TREASURY};
use crate::error::{GovernanceError, GovernanceResult};
use crate::events::{
    CrowdfundingProcessed, Deposited, Event, FundsAllocated, Parameter, ParameterChanged,
    RevenueCaptured, TokensAllocated,
};
use crate::weight::apply_bps;

/// Highest accepted `transaction_fee_bps` (1%).
pub const MAX_TRANSACTION_FEE_BPS: u16 = 100;

/// Revenue stream tag.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamId(pub String);

impl StreamId {
    pub fn transaction_fee() -> Self {
        Self("transaction_fee".to_string())
    }

    pub fn crowdfunding_fee() -> Self {
        Self("crowdfunding_fee".to_string())
    }
}

impl From<&str> for StreamId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fee parameters. `burn_percent + reserve_percent <= 100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeParams {
    pub transaction_fee_bps: u16,
    pub burn_percent: u8,
    pub reserve_percent: u8,
}

impl FeeParams {
    pub fn validate(&self) -> GovernanceResult<()> {
        if self.transaction_fee_bps > MAX_TRANSACTION_FEE_BPS {
            return Err(GovernanceError::FeeTooHigh(self.transaction_fee_bps));
        }
        if u16::from(self.burn_percent) + u16::from(self.reserve_percent) > 100 {
            return Err(GovernanceError::PercentagesExceed100 {
                burn: self.burn_percent,
                reserve: self.reserve_percent,
            });
        }
        Ok(())
    }
}

/// Fee split for one capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSplit {
    pub fee: U256,
    pub burn: U256,
    pub reserve: U256,
}

fn percent_of(value: &U256, percent: u8) -> U256 {
    // percent <= 100 so this is value * percent / 100
    apply_bps(value, u16::from(percent) * 100)
}

/// Treasury accounting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Treasury {
    params: FeeParams,
    total_revenue: U256,
    reserve_fund: U256,
    total_burned: U256,
    revenue_by_stream: BTreeMap<StreamId, U256>,
}

impl Treasury {
    pub fn new(params: FeeParams) -> GovernanceResult<Self> {
        params.validate()?;
        Ok(Self {
            params,
            total_revenue: U256::ZERO,
            reserve_fund: U256::ZERO,
            total_burned: U256::ZERO,
            revenue_by_stream: BTreeMap::new(),
        })
    }

    pub fn params(&self) -> &FeeParams {
        &self.params
    }

    pub fn total_revenue(&self) -> U256 {
        self.total_revenue
    }

    pub fn reserve_fund(&self) -> U256 {
        self.reserve_fund
    }

    pub fn total_burned(&self) -> U256 {
        self.total_burned
    }

    pub fn revenue_by_stream(&self) -> &BTreeMap<StreamId, U256> {
        &self.revenue_by_stream
    }

    pub fn stream_revenue(&self, stream: &StreamId) -> U256 {
        self.revenue_by_stream.get(stream).copied().unwrap_or_default()
    }

    /// Fee and its burn/reserve shares for a gross amount.
    pub fn split(&self, gross: &U256) -> FeeSplit {
        let fee = apply_bps(gross, self.params.transaction_fee_bps);
        FeeSplit {
            fee,
            burn: percent_of(&fee, self.params.burn_percent),
            reserve: percent_of(&fee, self.params.reserve_percent),
        }
    }

    /// Take the fee on `gross` from the calling revenue source.
    ///
    /// The fee moves from the caller to the treasury in governance tokens;
    /// the burn share is then burned by the treasury. The net amount stays
    /// with the caller.
    pub fn capture_revenue(
        &mut self,
        roles: &RoleTable,
        token: &mut TokenLedger,
        ctx: &CallContext,
        stream: StreamId,
        gross: U256,
    ) -> GovernanceResult<Vec<Event>> {
        roles.ensure(Role::RevenueManager, &ctx.caller)?;
        let split = self.split(&gross);
        let available = token.balance_of(&ctx.caller);
        if available < split.fee {
            return Err(LedgerError::InsufficientBalance {
                required: split.fee,
                available,
            }
            .into());
        }
        let counters = self.credited(&stream, &split)?;
        if !split.burn.is_zero() {
            roles.ensure(Role::Burner, &TREASURY)?;
        }

        let mut events: Vec<Event> = Vec::new();
        if !split.fee.is_zero() {
            events.push(token.transfer(ctx, TREASURY, split.fee)?.into());
        }
        events.extend(self.burn_share(roles, token, ctx, &split)?);
        self.apply(stream.clone(), counters);

        info!(
            %stream,
            source = ?ctx.caller,
            fee = %split.fee,
            burned = %split.burn,
            reserved = %split.reserve,
            "revenue captured"
        );
        events.push(
            RevenueCaptured {
                stream,
                source: ctx.caller,
                fee: split.fee,
                burned: split.burn,
                reserved: split.reserve,
            }
            .into(),
        );
        Ok(events)
    }

    /// Move `amount` from `from` (which approved the treasury) to `to`,
    /// keeping the fee under the crowdfunding stream.
    #[allow(clippy::too_many_arguments)]
    pub fn process_crowdfunding(
        &mut self,
        roles: &RoleTable,
        token_ledger: &mut TokenLedger,
        ctx: &CallContext,
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> GovernanceResult<Vec<Event>> {
        roles.ensure(Role::RevenueManager, &ctx.caller)?;
        if token != TOKEN {
            return Err(GovernanceError::UnknownToken(token));
        }
        if to.is_zero() || from.is_zero() {
            return Err(LedgerError::ZeroAddress.into());
        }

        let split = self.split(&amount);
        let net = amount.saturating_sub(&split.fee);
        let allowance = token_ledger.allowance(&from, &TREASURY);
        if allowance < amount {
            return Err(LedgerError::InsufficientAllowance {
                required: amount,
                available: allowance,
            }
            .into());
        }
        let balance = token_ledger.balance_of(&from);
        if balance < amount {
            return Err(LedgerError::InsufficientBalance {
                required: amount,
                available: balance,
            }
            .into());
        }
        let stream = StreamId::crowdfunding_fee();
        let counters = self.credited(&stream, &split)?;
        if !split.burn.is_zero() {
            roles.ensure(Role::Burner, &TREASURY)?;
        }

        let as_treasury = ctx.as_caller(TREASURY);
        let mut events: Vec<Event> =
            vec![token_ledger.transfer_from(&as_treasury, from, to, net)?.into()];
        if !split.fee.is_zero() {
            events.push(
                token_ledger
                    .transfer_from(&as_treasury, from, TREASURY, split.fee)?
                    .into(),
            );
        }
        events.extend(self.burn_share(roles, token_ledger, ctx, &split)?);
        self.apply(stream.clone(), counters);

        info!(from = ?from, to = ?to, %amount, fee = %split.fee, "crowdfunding processed");
        events.push(
            CrowdfundingProcessed {
                from,
                to,
                amount,
                fee: split.fee,
            }
            .into(),
        );
        events.push(
            RevenueCaptured {
                stream,
                source: from,
                fee: split.fee,
                burned: split.burn,
                reserved: split.reserve,
            }
            .into(),
        );
        Ok(events)
    }

    /// Move native value from the caller into the treasury.
    pub fn deposit(
        &mut self,
        native: &mut NativeLedger,
        ctx: &CallContext,
        amount: U256,
    ) -> GovernanceResult<Deposited> {
        if amount.is_zero() {
            return Err(LedgerError::ZeroAmount.into());
        }
        native.transfer(ctx, TREASURY, amount)?;
        info!(from = ?ctx.caller, %amount, "treasury deposit");
        Ok(Deposited {
            from: ctx.caller,
            amount,
        })
    }

    /// Pay native funds out of the treasury. Requires `Governor`.
    pub fn allocate_funds(
        &mut self,
        roles: &RoleTable,
        native: &mut NativeLedger,
        ctx: &CallContext,
        to: Address,
        amount: U256,
        memo: String,
    ) -> GovernanceResult<FundsAllocated> {
        roles.ensure(Role::Governor, &ctx.caller)?;
        native.transfer(&ctx.as_caller(TREASURY), to, amount)?;
        info!(to = ?to, %amount, %memo, "funds allocated");
        Ok(FundsAllocated { to, amount, memo })
    }

    /// Pay governance tokens out of the treasury. Requires `Governor`.
    #[allow(clippy::too_many_arguments)]
    pub fn allocate_tokens(
        &mut self,
        roles: &RoleTable,
        token_ledger: &mut TokenLedger,
        ctx: &CallContext,
        token: Address,
        to: Address,
        amount: U256,
        memo: String,
    ) -> GovernanceResult<TokensAllocated> {
        roles.ensure(Role::Governor, &ctx.caller)?;
        if token != TOKEN {
            return Err(GovernanceError::UnknownToken(token));
        }
        token_ledger.transfer(&ctx.as_caller(TREASURY), to, amount)?;
        info!(to = ?to, %amount, %memo, "tokens allocated");
        Ok(TokensAllocated {
            token,
            to,
            amount,
            memo,
        })
    }

    /// Requires `Governor`. Rejects fees above 100 bps.
    pub fn set_transaction_fee(
        &mut self,
        roles: &RoleTable,
        ctx: &CallContext,
        fee_bps: u16,
    ) -> GovernanceResult<ParameterChanged> {
        roles.ensure(Role::Governor, &ctx.caller)?;
        let next = FeeParams {
            transaction_fee_bps: fee_bps,
            ..self.params
        };
        next.validate()?;
        let old = std::mem::replace(&mut self.params, next);
        info!(old = old.transaction_fee_bps, new = fee_bps, "transaction fee set");
        Ok(ParameterChanged::new(
            Parameter::TransactionFee,
            old.transaction_fee_bps,
            fee_bps,
            ctx.caller,
        ))
    }

    /// Requires `Governor`. Rejects a burn share that pushes the split over 100%.
    pub fn set_burn_percent(
        &mut self,
        roles: &RoleTable,
        ctx: &CallContext,
        percent: u8,
    ) -> GovernanceResult<ParameterChanged> {
        roles.ensure(Role::Governor, &ctx.caller)?;
        let next = FeeParams {
            burn_percent: percent,
            ..self.params
        };
        next.validate()?;
        let old = std::mem::replace(&mut self.params, next);
        info!(old = old.burn_percent, new = percent, "burn percent set");
        Ok(ParameterChanged::new(
            Parameter::BurnPercent,
            old.burn_percent,
            percent,
            ctx.caller,
        ))
    }

    /// Requires `Governor`. Rejects a reserve share that pushes the split over 100%.
    pub fn set_reserve_percent(
        &mut self,
        roles: &RoleTable,
        ctx: &CallContext,
        percent: u8,
    ) -> GovernanceResult<ParameterChanged> {
        roles.ensure(Role::Governor, &ctx.caller)?;
        let next = FeeParams {
            reserve_percent: percent,
            ..self.params
        };
        next.validate()?;
        let old = std::mem::replace(&mut self.params, next);
        info!(old = old.reserve_percent, new = percent, "reserve percent set");
        Ok(ParameterChanged::new(
            Parameter::ReservePercent,
            old.reserve_percent,
            percent,
            ctx.caller,
        ))
    }

    fn burn_share(
        &mut self,
        roles: &RoleTable,
        token: &mut TokenLedger,
        ctx: &CallContext,
        split: &FeeSplit,
    ) -> GovernanceResult<Option<Event>> {
        if split.burn.is_zero() {
            return Ok(None);
        }
        let burned = token.burn(roles, &ctx.as_caller(TREASURY), split.burn)?;
        Ok(Some(burned.into()))
    }

    /// Counter values after crediting `split`, computed without writing.
    fn credited(&self, stream: &StreamId, split: &FeeSplit) -> GovernanceResult<Counters> {
        let overflow = |what| GovernanceError::Ledger(LedgerError::Overflow(what));
        Ok(Counters {
            total_revenue: self
                .total_revenue
                .checked_add(&split.fee)
                .ok_or_else(|| overflow("total revenue"))?,
            reserve_fund: self
                .reserve_fund
                .checked_add(&split.reserve)
                .ok_or_else(|| overflow("reserve fund"))?,
            total_burned: self
                .total_burned
                .checked_add(&split.burn)
                .ok_or_else(|| overflow("total burned"))?,
            stream: self
                .stream_revenue(stream)
                .checked_add(&split.fee)
                .ok_or_else(|| overflow("stream revenue"))?,
        })
    }

    fn apply(&mut self, stream: StreamId, counters: Counters) {
        self.total_revenue = counters.total_revenue;
        self.reserve_fund = counters.reserve_fund;
        self.total_burned = counters.total_burned;
        self.revenue_by_stream.insert(stream, counters.stream);
    }
}

struct Counters {
    total_revenue: U256,
    reserve_fund: U256,
    total_burned: U256,
    stream: U256,
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_ledger::TokenParams;

    fn governor() -> Address {
        Address::from_bytes([5u8; 20])
    }

    fn source() -> Address {
        Address::from_bytes([6u8; 20])
    }

    fn params() -> FeeParams {
        FeeParams {
            transaction_fee_bps: 50,
            burn_percent: 30,
            reserve_percent: 20,
        }
    }

    fn setup() -> (Treasury, RoleTable, TokenLedger) {
        let roles = RoleTable::new()
            .with_grant(Role::Governor, governor())
            .with_grant(Role::RevenueManager, source())
            .with_grant(Role::Burner, TREASURY);
        let mut token = TokenLedger::new(TokenParams {
            name: "Agora".into(),
            symbol: "AGR".into(),
            max_supply: U256::from(1_000_000u64),
            staking_reward_rate_bps: 0,
        });
        token.mint_genesis(source(), U256::from(100_000u64)).unwrap();
        (Treasury::new(params()).unwrap(), roles, token)
    }

    fn ctx(caller: Address) -> CallContext {
        CallContext::new(caller, 1, 0)
    }

    #[test]
    fn test_fee_split() {
        let (treasury, _, _) = setup();
        let split = treasury.split(&U256::from(10_000u64));
        assert_eq!(split.fee, U256::from(50u64));
        assert_eq!(split.burn, U256::from(15u64));
        assert_eq!(split.reserve, U256::from(10u64));
    }

    #[test]
    fn test_capture_revenue() {
        let (mut treasury, roles, mut token) = setup();
        let events = treasury
            .capture_revenue(&roles, &mut token, &ctx(source()), StreamId::transaction_fee(), U256::from(10_000u64))
            .unwrap();

        let names: Vec<_> = events.iter().map(Event::name).collect();
        assert_eq!(names, vec!["transfer", "burned", "revenue_captured"]);
        match events.last() {
            Some(Event::RevenueCaptured(e)) => {
                assert_eq!(e.fee, U256::from(50u64));
                assert_eq!(e.burned, U256::from(15u64));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(treasury.total_revenue(), U256::from(50u64));
        assert_eq!(treasury.total_burned(), U256::from(15u64));
        assert_eq!(treasury.reserve_fund(), U256::from(10u64));
        assert_eq!(treasury.stream_revenue(&StreamId::transaction_fee()), U256::from(50u64));
        // 50 collected, 15 burned
        assert_eq!(token.balance_of(&TREASURY), U256::from(35u64));
        assert_eq!(token.total_supply(), U256::from(99_985u64));
    }

    #[test]
    fn test_capture_requires_revenue_manager() {
        let (mut treasury, roles, mut token) = setup();
        let err = treasury
            .capture_revenue(&roles, &mut token, &ctx(governor()), StreamId::transaction_fee(), U256::from(10_000u64))
            .unwrap_err();
        assert!(matches!(err, GovernanceError::Ledger(LedgerError::Unauthorized { .. })));
        assert_eq!(treasury.total_revenue(), U256::ZERO);
    }

    #[test]
    fn test_fee_too_high_keeps_old_value() {
        let (mut treasury, roles, _) = setup();
        assert_eq!(
            treasury.set_transaction_fee(&roles, &ctx(governor()), 101),
            Err(GovernanceError::FeeTooHigh(101))
        );
        assert_eq!(treasury.params().transaction_fee_bps, 50);
        treasury.set_transaction_fee(&roles, &ctx(governor()), 100).unwrap();
        assert_eq!(treasury.params().transaction_fee_bps, 100);
    }

    #[test]
    fn test_percentages_exceed_100() {
        let (mut treasury, roles, _) = setup();
        assert_eq!(
            treasury.set_burn_percent(&roles, &ctx(governor()), 81),
            Err(GovernanceError::PercentagesExceed100 { burn: 81, reserve: 20 })
        );
        assert_eq!(treasury.params().burn_percent, 30);
        treasury.set_burn_percent(&roles, &ctx(governor()), 80).unwrap();
        assert!(treasury.set_reserve_percent(&roles, &ctx(governor()), 21).is_err());
    }

    #[test]
    fn test_crowdfunding() {
        let (mut treasury, roles, mut token) = setup();
        let backer = source();
        let creator = Address::from_bytes([7u8; 20]);
        token.approve(&ctx(backer), TREASURY, U256::from(20_000u64)).unwrap();

        let events = treasury
            .process_crowdfunding(&roles, &mut token, &ctx(source()), TOKEN, backer, creator, U256::from(20_000u64))
            .unwrap();
        let names: Vec<_> = events.iter().map(Event::name).collect();
        assert_eq!(
            names,
            vec!["transfer", "transfer", "burned", "crowdfunding_processed", "revenue_captured"]
        );
        assert_eq!(treasury.total_revenue(), U256::from(100u64));
        assert_eq!(token.balance_of(&creator), U256::from(19_900u64));
        assert_eq!(treasury.stream_revenue(&StreamId::crowdfunding_fee()), U256::from(100u64));
        assert_eq!(token.allowance(&backer, &TREASURY), U256::ZERO);
    }

    #[test]
    fn test_crowdfunding_unknown_token() {
        let (mut treasury, roles, mut token) = setup();
        let other = Address::from_bytes([9u8; 20]);
        let err = treasury
            .process_crowdfunding(&roles, &mut token, &ctx(source()), other, source(), other, U256::ONE)
            .unwrap_err();
        assert_eq!(err, GovernanceError::UnknownToken(other));
    }

    #[test]
    fn test_allocate_tokens_insufficient() {
        let (mut treasury, roles, mut token) = setup();
        let err = treasury
            .allocate_tokens(&roles, &mut token, &ctx(governor()), TOKEN, source(), U256::ONE, "grant".into())
            .unwrap_err();
        assert!(matches!(
            err,
            GovernanceError::Ledger(LedgerError::InsufficientBalance { .. })
        ));
    }

    #[test]
    fn test_allocate_funds() {
        let (mut treasury, roles, _) = setup();
        let mut native = NativeLedger::new();
        native.credit_genesis(TREASURY, U256::from(1_000u64)).unwrap();

        let err = treasury
            .allocate_funds(&roles, &mut native, &ctx(source()), source(), U256::ONE, "x".into())
            .unwrap_err();
        assert!(matches!(err, GovernanceError::Ledger(LedgerError::Unauthorized { .. })));

        treasury
            .allocate_funds(&roles, &mut native, &ctx(governor()), source(), U256::from(400u64), "grant".into())
            .unwrap();
        assert_eq!(native.balance_of(&TREASURY), U256::from(600u64));
        assert_eq!(native.balance_of(&source()), U256::from(400u64));
    }
}
