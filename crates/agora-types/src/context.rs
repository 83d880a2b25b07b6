use crate::address::Address;

/// The environment's view of one call: who is calling, and where the
/// external clock and block counter stand.
///
/// The engine never reads a wall clock. All time-dependent behavior
/// (reputation decay, staking accrual, voting windows) is measured
/// against the values carried here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CallContext {
    /// Authenticated principal making the call
    pub caller: Address,
    /// Current block number
    pub block: u64,
    /// Current timestamp, seconds
    pub timestamp: u64,
}

impl CallContext {
    pub const fn new(caller: Address, block: u64, timestamp: u64) -> Self {
        Self { caller, block, timestamp }
    }

    /// Same point in time, different caller. Used when the engine acts
    /// through one of its own system accounts.
    pub const fn as_caller(&self, caller: Address) -> Self {
        Self {
            caller,
            block: self.block,
            timestamp: self.timestamp,
        }
    }
}
