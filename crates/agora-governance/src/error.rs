use agora_ledger::LedgerError;
use agora_types::{Address, Hash, U256};
use thiserror::Error;

use crate::proposal::ProposalState;

/// Errors that can occur in governance operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GovernanceError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Invalid proposal: {0}")]
    InvalidProposal(String),

    #[error("Proposal not found: {0}")]
    ProposalNotFound(Hash),

    #[error("Duplicate proposal: {0}")]
    DuplicateProposal(Hash),

    #[error("Proposal not active (state {0})")]
    NotActive(ProposalState),

    #[error("Already voted")]
    AlreadyVoted,

    #[error("Proposal has not succeeded (state {0})")]
    NotSucceeded(ProposalState),

    #[error("Proposal already executed")]
    AlreadyExecuted,

    #[error("Proposal cannot be canceled (state {0})")]
    NotCancelable(ProposalState),

    #[error("Insufficient voting power: have {have}, need {need}")]
    InsufficientVotingPower { have: U256, need: U256 },

    #[error("Fee too high: {0} bps exceeds 100 bps")]
    FeeTooHigh(u16),

    #[error("Percentages exceed 100%: burn {burn}% + reserve {reserve}%")]
    PercentagesExceed100 { burn: u8, reserve: u8 },

    #[error("Unknown token: {0:x}")]
    UnknownToken(agora_types::Address),

    #[error("Execution failed at action {index}: {reason}")]
    ExecutionFailed { index: usize, reason: String },

    #[error("Call forwarding failed: {0}")]
    ForwardingFailed(String),

    #[error("Reserved caller: {0:?} acts only through executed proposals")]
    ReservedCaller(Address),

    #[error("Clock regression: block {block} / timestamp {timestamp} precede block {last_block} / timestamp {last_timestamp}")]
    ClockRegression {
        block: u64,
        timestamp: u64,
        last_block: u64,
        last_timestamp: u64,
    },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

pub type GovernanceResult<T> = Result<T, GovernanceError>;
