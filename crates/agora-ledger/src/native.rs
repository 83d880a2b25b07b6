//! Native value held outside the governance token.

use std::collections::BTreeMap;

use agora_types::{Address, CallContext, U256};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{LedgerError, LedgerResult};
use crate::events::NativeTransfer;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NativeLedger {
    balances: BTreeMap<Address, U256>,
}

impl NativeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance_of(&self, owner: &Address) -> U256 {
        self.balances.get(owner).copied().unwrap_or_default()
    }

    /// Seed a balance at construction.
    pub fn credit_genesis(&mut self, to: Address, amount: U256) -> LedgerResult<()> {
        let balance = self
            .balance_of(&to)
            .checked_add(&amount)
            .ok_or(LedgerError::Overflow("native balance"))?;
        self.balances.insert(to, balance);
        Ok(())
    }

    /// Move native value from the caller to `to`.
    pub fn transfer(
        &mut self,
        ctx: &CallContext,
        to: Address,
        amount: U256,
    ) -> LedgerResult<NativeTransfer> {
        if to.is_zero() {
            return Err(LedgerError::ZeroAddress);
        }
        let from = ctx.caller;
        let available = self.balance_of(&from);
        let new_from = available
            .checked_sub(&amount)
            .ok_or(LedgerError::InsufficientBalance {
                required: amount,
                available,
            })?;
        if from != to {
            let new_to = self
                .balance_of(&to)
                .checked_add(&amount)
                .ok_or(LedgerError::Overflow("native balance"))?;
            self.balances.insert(from, new_from);
            self.balances.insert(to, new_to);
        }

        debug!(from = ?from, to = ?to, %amount, "native transfer");
        Ok(NativeTransfer { from, to, amount })
    }
}
