//! Vote weight: token holdings blended with reputation, dampened toward
//! the square root.
//!
//! ```text
//! combined  = tokens + reputation * reputation_weight_factor_bps / 10000
//! quadratic = isqrt(combined)
//! weight    = (quadratic * qf + combined * (10000 - qf)) / 10000
//! ```
//!
//! `qf` (quadratic_voting_factor_bps) interpolates between linear (0) and
//! pure square-root (10000) voting power.

use agora_types::{BPS_DENOMINATOR, U256};
use serde::{Deserialize, Serialize};

use crate::error::{GovernanceError, GovernanceResult};

/// Blend parameters. Both factors are at most 10000.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightParams {
    pub reputation_weight_factor_bps: u16,
    pub quadratic_voting_factor_bps: u16,
}

impl WeightParams {
    pub fn validate(&self) -> GovernanceResult<()> {
        check_bps("reputation_weight_factor_bps", self.reputation_weight_factor_bps)?;
        check_bps("quadratic_voting_factor_bps", self.quadratic_voting_factor_bps)
    }
}

pub(crate) fn check_bps(name: &str, value: u16) -> GovernanceResult<()> {
    if u64::from(value) > BPS_DENOMINATOR {
        return Err(GovernanceError::InvalidParameter(format!(
            "{name} = {value} exceeds {BPS_DENOMINATOR}"
        )));
    }
    Ok(())
}

/// `floor(value * bps / 10000)` for `bps <= 10000`, never overflowing.
pub fn apply_bps(value: &U256, bps: u16) -> U256 {
    let denom = U256::from(BPS_DENOMINATOR);
    let bps = U256::from(bps);
    let (q, r) = value.div_rem(&denom).unwrap_or_default();
    // q * bps <= value; r * bps < 10^8
    let whole = q.checked_mul(&bps).unwrap_or(*value);
    let frac = r
        .checked_mul(&bps)
        .and_then(|v| v.checked_div(&denom))
        .unwrap_or_default();
    whole.checked_add(&frac).unwrap_or(*value)
}

/// Combine a token balance and a reputation into a voting weight.
pub fn voting_weight(tokens: &U256, reputation: &U256, params: &WeightParams) -> GovernanceResult<U256> {
    params.validate()?;
    let reputation_part = apply_bps(reputation, params.reputation_weight_factor_bps);
    let combined = tokens
        .checked_add(&reputation_part)
        .ok_or(GovernanceError::Ledger(agora_ledger::LedgerError::Overflow("vote weight")))?;
    Ok(blend(&combined, params.quadratic_voting_factor_bps))
}

/// `floor((isqrt(c) * qf + c * (10000 - qf)) / 10000)` in one rounding step.
fn blend(combined: &U256, qf: u16) -> U256 {
    let denom = U256::from(BPS_DENOMINATOR);
    let linear_bps = U256::from(BPS_DENOMINATOR - u64::from(qf));
    let quadratic = combined.isqrt();

    // combined = a * 10000 + b
    let (a, b) = combined.div_rem(&denom).unwrap_or_default();
    // isqrt(c) < 2^128, so every term below fits
    let whole = a.checked_mul(&linear_bps).unwrap_or(*combined);
    let tail = b
        .checked_mul(&linear_bps)
        .and_then(|lin| {
            quadratic
                .checked_mul(&U256::from(qf))
                .and_then(|quad| quad.checked_add(&lin))
        })
        .and_then(|n| n.checked_div(&denom))
        .unwrap_or_default();
    whole.checked_add(&tail).unwrap_or(*combined)
}
