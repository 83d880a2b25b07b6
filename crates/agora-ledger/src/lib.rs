//! Agora Ledger - account-level state of the Agora governance engine.
//!
//! - [`RoleTable`]: capability grants checked by every privileged call
//! - [`ReputationLedger`]: categorized reputation with lazy linear decay
//! - [`TokenLedger`]: capped governance token with staking and delegation
//! - [`NativeLedger`]: native value used for treasury disbursements
//!
//! Ledgers never read a clock; every mutating call takes a
//! [`CallContext`](agora_types::CallContext).

pub mod checkpoints;
pub mod error;
pub mod events;
pub mod native;
pub mod reputation;
pub mod roles;
pub mod token;

pub use checkpoints::Checkpoints;
pub use error::{LedgerError, LedgerResult};
pub use native::NativeLedger;
pub use reputation::{ContributionType, ReputationAccount, ReputationLedger};
pub use roles::{Role, RoleTable};
pub use token::{TokenAccount, TokenLedger, TokenParams};
