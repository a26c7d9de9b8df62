//! Permission Store: administrator and issuer role sets
//!
//! Mutations are guarded by an explicit caller identity. Only administrators
//! may grant or revoke, and the store refuses any revoke that would leave it
//! without an administrator.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::types::{Address, CertificateError, Result, Role};

/// Outcome of a grant or revoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleChange {
    /// Membership changed
    Applied,
    /// Account already had (or already lacked) the role
    Unchanged,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PermissionStore {
    members: BTreeMap<Role, BTreeSet<Address>>,
}

impl PermissionStore {
    /// Bootstrap: the deployer holds both roles.
    pub fn bootstrap(deployer: Address) -> Self {
        let mut store = Self::default();
        for role in Role::ALL {
            store.members.entry(role).or_default().insert(deployer);
        }
        store
    }

    pub fn has_role(&self, role: Role, account: &Address) -> bool {
        self.members
            .get(&role)
            .is_some_and(|set| set.contains(account))
    }

    /// Guard clause for privileged operations.
    pub fn require(&self, role: Role, caller: &Address) -> Result<()> {
        if self.has_role(role, caller) {
            Ok(())
        } else {
            Err(CertificateError::AccessDenied {
                role,
                account: *caller,
            })
        }
    }

    pub fn members(&self, role: Role) -> Vec<Address> {
        self.members
            .get(&role)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn admin_count(&self) -> usize {
        self.members.get(&Role::Admin).map_or(0, |set| set.len())
    }

    /// Check a grant without applying it.
    pub fn check_grant(&self, role: Role, account: &Address, caller: &Address) -> Result<RoleChange> {
        self.require(Role::Admin, caller)?;
        if self.has_role(role, account) {
            Ok(RoleChange::Unchanged)
        } else {
            Ok(RoleChange::Applied)
        }
    }

    /// Check a revoke without applying it.
    pub fn check_revoke(&self, role: Role, account: &Address, caller: &Address) -> Result<RoleChange> {
        self.require(Role::Admin, caller)?;
        if !self.has_role(role, account) {
            return Ok(RoleChange::Unchanged);
        }
        if role == Role::Admin && self.admin_count() <= 1 {
            return Err(CertificateError::LastAdministrator(*account));
        }
        Ok(RoleChange::Applied)
    }

    pub fn grant(&mut self, role: Role, account: Address, caller: &Address) -> Result<RoleChange> {
        let change = self.check_grant(role, &account, caller)?;
        if change == RoleChange::Applied {
            self.members.entry(role).or_default().insert(account);
        }
        Ok(change)
    }

    pub fn revoke(&mut self, role: Role, account: &Address, caller: &Address) -> Result<RoleChange> {
        let change = self.check_revoke(role, account, caller)?;
        if change == RoleChange::Applied {
            if let Some(set) = self.members.get_mut(&role) {
                set.remove(account);
            }
        }
        Ok(change)
    }
}
