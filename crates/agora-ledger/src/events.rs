//! Records returned by ledger operations.
//!
//! Each mutating call hands back what it did; the governance layer stamps
//! the record with block and timestamp and appends it to the event log.

use agora_types::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::reputation::ContributionType;
use crate::roles::Role;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleGranted {
    pub role: Role,
    pub account: Address,
    pub sender: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRevoked {
    pub role: Role,
    pub account: Address,
    pub sender: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReputationAdded {
    pub principal: Address,
    pub contribution: ContributionType,
    pub amount: U256,
    /// Decay realized by the rebase that preceded the addition
    pub decay_applied: U256,
    pub new_total: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecayRateChanged {
    pub principal: Address,
    pub old_rate_bps: u16,
    pub new_rate_bps: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultDecayRateChanged {
    pub old_rate_bps: u16,
    pub new_rate_bps: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub from: Address,
    pub to: Address,
    pub amount: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approval {
    pub owner: Address,
    pub spender: Address,
    pub amount: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Minted {
    pub to: Address,
    pub amount: U256,
    pub total_supply: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Burned {
    pub from: Address,
    pub amount: U256,
    pub total_supply: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Staked {
    pub account: Address,
    pub amount: U256,
    pub staked_balance: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unstaked {
    pub account: Address,
    pub amount: U256,
    pub staked_balance: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardsClaimed {
    pub account: Address,
    pub reward: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegateChanged {
    pub delegator: Address,
    pub from_delegate: Address,
    pub to_delegate: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeTransfer {
    pub from: Address,
    pub to: Address,
    pub amount: U256,
}
