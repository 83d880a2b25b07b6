//! Agora Governance - reputation-weighted DAO governance.
//!
//! This crate provides:
//! - Vote weight blending token votes, reputation and a quadratic factor
//! - Proposal lifecycle with snapshot voting and atomic execution
//! - Treasury fee capture, burn and reserve accounting
//! - The [`Dao`] facade serializing calls and recording events

pub mod action;
pub mod config;
pub mod dao;
pub mod error;
pub mod events;
pub mod proposal;
pub mod state;
pub mod transaction;
pub mod treasury;
pub mod weight;

pub use action::{
    Action, CallForwarder, ExternalCall, GovernorCall, RejectPayloads, ReputationCall, TokenCall,
    TreasuryCall, GOVERNOR, REPUTATION, TOKEN, TREASURY,
};
pub use config::DaoConfig;
pub use dao::{Dao, SharedDao};
pub use error::{GovernanceError, GovernanceResult};
pub use events::{Event, EventRecord};
pub use proposal::{Proposal, ProposalId, ProposalState, VoteSupport};
pub use state::{DaoState, GovernanceParams};
pub use treasury::{FeeParams, StreamId, Treasury};
pub use weight::{voting_weight, WeightParams};
