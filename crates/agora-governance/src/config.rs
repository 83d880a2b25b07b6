//! Construction-time configuration.
//!
//! Every tunable is fixed here when the engine is built and afterwards only
//! changes through the role-gated setters.

use agora_ledger::Role;
use agora_types::{Address, BPS_DENOMINATOR, U256};
use serde::{Deserialize, Serialize};

use crate::error::{GovernanceError, GovernanceResult};
use crate::treasury::FeeParams;
use crate::weight::WeightParams;

/// Engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaoConfig {
    pub token: TokenConfig,
    pub reputation: ReputationConfig,
    pub governance: GovernanceConfig,
    pub treasury: TreasuryConfig,
    pub genesis: GenesisConfig,
}

/// Governance token configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConfig {
    pub name: String,
    pub symbol: String,
    /// Hard cap on total supply
    pub max_supply: U256,
    /// Annual staking reward rate
    pub staking_reward_rate_bps: u16,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            name: "Agora Governance".to_string(),
            symbol: "AGR".to_string(),
            max_supply: U256::from(1_000_000_000u64),
            staking_reward_rate_bps: 500, // 5%
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReputationConfig {
    /// Annual linear decay applied to accounts without an override
    pub default_decay_rate_bps: u16,
}

impl Default for ReputationConfig {
    fn default() -> Self {
        Self {
            default_decay_rate_bps: 1_000, // 10% per year
        }
    }
}

/// Voting configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceConfig {
    /// Share of total supply that must vote
    pub quorum_bps: u16,
    /// Blocks between creation and the start of voting
    pub voting_delay: u64,
    /// Blocks voting stays open
    pub voting_period: u64,
    /// Minimum live voting weight to propose
    pub proposal_stake: U256,
    pub reputation_weight_factor_bps: u16,
    pub quadratic_voting_factor_bps: u16,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            quorum_bps: 400, // 4%
            voting_delay: 1,
            voting_period: 50_400,
            proposal_stake: U256::from(1_000u64),
            reputation_weight_factor_bps: 5_000,
            quadratic_voting_factor_bps: 0,
        }
    }
}

impl GovernanceConfig {
    pub fn weight_params(&self) -> WeightParams {
        WeightParams {
            reputation_weight_factor_bps: self.reputation_weight_factor_bps,
            quadratic_voting_factor_bps: self.quadratic_voting_factor_bps,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreasuryConfig {
    pub transaction_fee_bps: u16,
    pub burn_percent: u8,
    pub reserve_percent: u8,
}

impl Default for TreasuryConfig {
    fn default() -> Self {
        Self {
            transaction_fee_bps: 50,
            burn_percent: 30,
            reserve_percent: 20,
        }
    }
}

impl TreasuryConfig {
    pub fn fee_params(&self) -> FeeParams {
        FeeParams {
            transaction_fee_bps: self.transaction_fee_bps,
            burn_percent: self.burn_percent,
            reserve_percent: self.reserve_percent,
        }
    }
}

/// Balance credited at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub account: Address,
    pub amount: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleGrant {
    pub role: Role,
    pub account: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisConfig {
    /// Bootstrap administrator. Governance also holds `Admin`, so this
    /// account can later be revoked by proposal.
    pub admin: Address,
    #[serde(default)]
    pub roles: Vec<RoleGrant>,
    #[serde(default)]
    pub token_allocations: Vec<Allocation>,
    #[serde(default)]
    pub native_allocations: Vec<Allocation>,
}

impl Default for GenesisConfig {
    fn default() -> Self {
        let admin = Address::from_bytes([0x01; 20]);
        Self {
            admin,
            roles: [Role::ReputationManager, Role::RevenueManager]
                .into_iter()
                .map(|role| RoleGrant {
                    role,
                    account: admin,
                })
                .collect(),
            token_allocations: vec![Allocation {
                account: admin,
                amount: U256::from(1_000_000u64),
            }],
            native_allocations: Vec::new(),
        }
    }
}

impl DaoConfig {
    /// Validate configuration.
    pub fn validate(&self) -> GovernanceResult<()> {
        let invalid = |msg: String| Err(GovernanceError::InvalidConfig(msg));

        if self.token.symbol.is_empty() {
            return invalid("token symbol cannot be empty".into());
        }
        if self.governance.voting_period == 0 {
            return invalid("voting period cannot be 0".into());
        }
        if u64::from(self.governance.quorum_bps) > BPS_DENOMINATOR {
            return invalid(format!(
                "quorum_bps {} exceeds {BPS_DENOMINATOR}",
                self.governance.quorum_bps
            ));
        }
        self.governance
            .weight_params()
            .validate()
            .or_else(|e| invalid(e.to_string()))?;
        self.treasury
            .fee_params()
            .validate()
            .or_else(|e| invalid(e.to_string()))?;

        if self.genesis.admin.is_zero() {
            return invalid("genesis admin cannot be the zero address".into());
        }
        if self.genesis.roles.iter().any(|g| g.account.is_zero()) {
            return invalid("role grant to the zero address".into());
        }

        let mut allocated = U256::ZERO;
        for alloc in &self.genesis.token_allocations {
            if alloc.account.is_zero() {
                return invalid("token allocation to the zero address".into());
            }
            allocated = match allocated.checked_add(&alloc.amount) {
                Some(v) => v,
                None => return invalid("token allocations overflow".into()),
            };
        }
        if allocated > self.token.max_supply {
            return invalid(format!(
                "token allocations {allocated} exceed max supply {}",
                self.token.max_supply
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DaoConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.treasury.transaction_fee_bps, 50);
        assert_eq!(config.reputation.default_decay_rate_bps, 1_000);
    }

    #[test]
    fn test_config_validation() {
        let mut config = DaoConfig::default();
        config.governance.voting_period = 0;
        assert!(config.validate().is_err());

        let mut config = DaoConfig::default();
        config.treasury.transaction_fee_bps = 101;
        assert!(matches!(config.validate(), Err(GovernanceError::InvalidConfig(_))));

        let mut config = DaoConfig::default();
        config.treasury.burn_percent = 90;
        assert!(config.validate().is_err());

        let mut config = DaoConfig::default();
        config.governance.quadratic_voting_factor_bps = 10_001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_allocations_over_cap() {
        let mut config = DaoConfig::default();
        config.token.max_supply = U256::from(10u64);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("exceed max supply"));
    }

    #[test]
    fn test_config_json_round_trip() {
        let config = DaoConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("reputation_manager"));
        let back: DaoConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
