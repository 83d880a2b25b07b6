use agora_types::{Address, U256};
use thiserror::Error;

use crate::roles::Role;

/// Errors that can occur in ledger operations.
///
/// Every variant is raised before the ledger is mutated.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Unauthorized: {caller:x} lacks role {role}")]
    Unauthorized { caller: Address, role: Role },

    #[error("Mint of {requested} exceeds max supply {max_supply} (current supply {supply})")]
    ExceedsMaxSupply {
        requested: U256,
        supply: U256,
        max_supply: U256,
    },

    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: U256, available: U256 },

    #[error("Insufficient allowance: required {required}, available {available}")]
    InsufficientAllowance { required: U256, available: U256 },

    #[error("Insufficient staked balance: requested {requested}, staked {staked}")]
    InsufficientStaked { requested: U256, staked: U256 },

    #[error("No staking rewards to claim")]
    NothingToClaim,

    #[error("Zero address not allowed")]
    ZeroAddress,

    #[error("Amount must be greater than zero")]
    ZeroAmount,

    #[error("Cannot remove the last admin")]
    LastAdmin,

    #[error("Arithmetic overflow: {0}")]
    Overflow(&'static str),

    #[error("Arithmetic underflow: {0}")]
    Underflow(&'static str),
}

pub type LedgerResult<T> = Result<T, LedgerError>;
