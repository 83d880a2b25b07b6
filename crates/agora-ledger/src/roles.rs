//! Capability table.
//!
//! Every privileged operation names the role it needs and looks it up here
//! before touching any state. There is no implicit inheritance: holding
//! `Admin` does not imply `Minter`.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use agora_types::{Address, CallContext};
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{LedgerError, LedgerResult};
use crate::events::{RoleGranted, RoleRevoked};

/// Named capability.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    BorshSerialize,
    BorshDeserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Grants and revokes roles, sets governance parameters
    Admin,
    /// Mints governance tokens
    Minter,
    /// Burns its own governance tokens
    Burner,
    /// Adds reputation and sets decay rates
    ReputationManager,
    /// Registered revenue source / crowdfunding processor
    RevenueManager,
    /// Disburses treasury funds and sets fee parameters
    Governor,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Admin,
        Role::Minter,
        Role::Burner,
        Role::ReputationManager,
        Role::RevenueManager,
        Role::Governor,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Minter => "minter",
            Role::Burner => "burner",
            Role::ReputationManager => "reputation_manager",
            Role::RevenueManager => "revenue_manager",
            Role::Governor => "governor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `role -> set of principal`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleTable {
    members: BTreeMap<Role, BTreeSet<Address>>,
}

impl RoleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a grant at construction time, without an authorizing caller.
    pub fn with_grant(mut self, role: Role, account: Address) -> Self {
        self.members.entry(role).or_default().insert(account);
        self
    }

    pub fn has_role(&self, role: Role, account: &Address) -> bool {
        self.members
            .get(&role)
            .map(|set| set.contains(account))
            .unwrap_or(false)
    }

    /// Fail with `Unauthorized` unless `caller` holds `role`.
    pub fn ensure(&self, role: Role, caller: &Address) -> LedgerResult<()> {
        if self.has_role(role, caller) {
            Ok(())
        } else {
            warn!(caller = ?caller, %role, "unauthorized call rejected");
            Err(LedgerError::Unauthorized {
                caller: *caller,
                role,
            })
        }
    }

    pub fn members(&self, role: Role) -> Vec<Address> {
        self.members
            .get(&role)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Grant `role` to `account`. Admin only. Returns `None` if already held.
    pub fn grant_role(
        &mut self,
        ctx: &CallContext,
        role: Role,
        account: Address,
    ) -> LedgerResult<Option<RoleGranted>> {
        self.ensure(Role::Admin, &ctx.caller)?;
        if account.is_zero() {
            return Err(LedgerError::ZeroAddress);
        }

        if !self.members.entry(role).or_default().insert(account) {
            return Ok(None);
        }

        info!(%role, account = ?account, "role granted");
        Ok(Some(RoleGranted {
            role,
            account,
            sender: ctx.caller,
        }))
    }

    /// Revoke `role` from `account`. Admin only.
    pub fn revoke_role(
        &mut self,
        ctx: &CallContext,
        role: Role,
        account: Address,
    ) -> LedgerResult<Option<RoleRevoked>> {
        self.ensure(Role::Admin, &ctx.caller)?;
        self.remove(ctx, role, account)
    }

    /// Drop one of the caller's own roles.
    pub fn renounce_role(
        &mut self,
        ctx: &CallContext,
        role: Role,
    ) -> LedgerResult<Option<RoleRevoked>> {
        self.remove(ctx, role, ctx.caller)
    }

    fn remove(
        &mut self,
        ctx: &CallContext,
        role: Role,
        account: Address,
    ) -> LedgerResult<Option<RoleRevoked>> {
        if !self.has_role(role, &account) {
            return Ok(None);
        }
        if role == Role::Admin && self.members(Role::Admin).len() == 1 {
            return Err(LedgerError::LastAdmin);
        }

        if let Some(set) = self.members.get_mut(&role) {
            set.remove(&account);
        }

        info!(%role, account = ?account, "role revoked");
        Ok(Some(RoleRevoked {
            role,
            account,
            sender: ctx.caller,
        }))
    }
}
