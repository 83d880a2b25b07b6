//! Agora Types - Core type definitions for the Agora governance engine.
//!
//! This crate provides the fundamental types shared by every ledger:
//! - Addresses (20-byte principals, Bech32m encoded)
//! - Hashes (32-byte, blake3 digests)
//! - U256 (256-bit unsigned integer, checked arithmetic only)
//! - CallContext (caller plus the externally supplied clock)

pub mod address;
pub mod hash;
pub mod u256;
pub mod context;
pub mod error;

#[cfg(any(feature = "serde", feature = "borsh"))]
mod serialization;

pub use address::Address;
pub use hash::Hash;
pub use u256::U256;
pub use context::CallContext;
pub use error::TypesError;

/// Denominator for every basis-point parameter.
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Seconds in a day.
pub const SECONDS_PER_DAY: u64 = 86_400;

/// Seconds in the 365-day year used by decay and staking formulas.
pub const SECONDS_PER_YEAR: u64 = 365 * SECONDS_PER_DAY;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{Address, CallContext, Hash, TypesError, U256};
    pub use crate::{BPS_DENOMINATOR, SECONDS_PER_DAY, SECONDS_PER_YEAR};
}
