//! Role membership table.
//!
//! Every role is administered by another role (by default [`Role::ADMIN`],
//! which also administers itself). Only members of a role's admin role may
//! grant or revoke it. At least one account holds `ADMIN` at all times.

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, info};

use crate::errors::{AtlaError, Result};
use crate::state::{Account, Role};

static DEFAULT_ADMIN_ROLE: Role = Role::ADMIN;

#[derive(Debug, Clone)]
pub struct AccessControl {
    members: HashMap<Role, BTreeSet<Account>>,
    /// Overrides of the default admin role; absent entries fall back to `ADMIN`.
    admins: HashMap<Role, Role>,
}

impl AccessControl {
    /// Create the table with `admin` as the sole `ADMIN` member.
    pub fn new(admin: Account) -> Self {
        Self::with_roles(admin, std::iter::empty())
    }

    /// Create the table with `admin` holding `ADMIN` and each of `roles`.
    pub fn with_roles(admin: Account, roles: impl IntoIterator<Item = Role>) -> Self {
        let mut members: HashMap<Role, BTreeSet<Account>> = HashMap::new();
        for role in std::iter::once(Role::ADMIN).chain(roles) {
            members.entry(role).or_default().insert(admin.clone());
        }
        Self {
            members,
            admins: HashMap::new(),
        }
    }

    pub fn has_role(&self, role: &Role, account: &Account) -> bool {
        self.members
            .get(role)
            .is_some_and(|set| set.contains(account))
    }

    /// Fail with [`AtlaError::Unauthorized`] unless `account` holds `role`.
    pub fn check_role(&self, role: &Role, account: &Account) -> Result<()> {
        if self.has_role(role, account) {
            Ok(())
        } else {
            debug!(role = %role, account = %account, "Role check failed");
            Err(AtlaError::Unauthorized {
                role: role.clone(),
                account: account.clone(),
            })
        }
    }

    /// The role whose members administer `role`.
    pub fn admin_role_of(&self, role: &Role) -> &Role {
        self.admins.get(role).unwrap_or(&DEFAULT_ADMIN_ROLE)
    }

    /// Add `account` to `role`. Returns `false` if it was already a member.
    pub fn grant_role(&mut self, role: &Role, account: Account, caller: &Account) -> Result<bool> {
        self.check_role(self.admin_role_of(role), caller)?;

        let added = self
            .members
            .entry(role.clone())
            .or_default()
            .insert(account.clone());
        if added {
            info!(role = %role, account = %account, sender = %caller, "Role granted");
        }
        Ok(added)
    }

    /// Remove `account` from `role`. Returns `false` if it was not a member.
    pub fn revoke_role(&mut self, role: &Role, account: &Account, caller: &Account) -> Result<bool> {
        self.check_role(self.admin_role_of(role), caller)?;
        let removed = self.remove_member(role, account)?;
        if removed {
            info!(role = %role, account = %account, sender = %caller, "Role revoked");
        }
        Ok(removed)
    }

    /// Drop the caller's own membership. No admin rights required.
    pub fn renounce_role(&mut self, role: &Role, caller: &Account) -> Result<bool> {
        let removed = self.remove_member(role, caller)?;
        if removed {
            info!(role = %role, account = %caller, "Role renounced");
        }
        Ok(removed)
    }

    /// Reassign the role that administers `role`.
    ///
    /// The caller must hold the current admin role of `role`.
    pub fn set_role_admin(&mut self, role: &Role, admin_role: Role, caller: &Account) -> Result<()> {
        self.check_role(self.admin_role_of(role), caller)?;
        info!(role = %role, admin_role = %admin_role, sender = %caller, "Role admin changed");
        if admin_role == Role::ADMIN {
            self.admins.remove(role);
        } else {
            self.admins.insert(role.clone(), admin_role);
        }
        Ok(())
    }

    /// Sorted snapshot of the accounts holding `role`.
    pub fn members(&self, role: &Role) -> Vec<Account> {
        self.members
            .get(role)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn remove_member(&mut self, role: &Role, account: &Account) -> Result<bool> {
        let Some(set) = self.members.get_mut(role) else {
            return Ok(false);
        };
        if !set.contains(account) {
            return Ok(false);
        }
        if *role == Role::ADMIN && set.len() == 1 {
            return Err(AtlaError::LastAdmin);
        }
        Ok(set.remove(account))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acct(name: &str) -> Account {
        Account::from(name)
    }

    #[test]
    fn creator_holds_admin() {
        let acl = AccessControl::new(acct("alice"));
        assert!(acl.has_role(&Role::ADMIN, &acct("alice")));
        assert!(!acl.has_role(&Role::MINTER, &acct("alice")));
    }

    #[test]
    fn creator_seeded_with_extra_roles() {
        let acl = AccessControl::with_roles(acct("alice"), [Role::MINTER]);
        assert!(acl.has_role(&Role::ADMIN, &acct("alice")));
        assert!(acl.has_role(&Role::MINTER, &acct("alice")));
        assert_eq!(acl.members(&Role::MINTER), vec![acct("alice")]);
        assert!(acl.members(&Role::ORACLE).is_empty());
    }

    #[test]
    fn admin_grants_and_revokes() {
        let mut acl = AccessControl::new(acct("alice"));

        assert!(acl.grant_role(&Role::MINTER, acct("bob"), &acct("alice")).unwrap());
        assert!(acl.has_role(&Role::MINTER, &acct("bob")));

        assert!(acl.revoke_role(&Role::MINTER, &acct("bob"), &acct("alice")).unwrap());
        assert!(!acl.has_role(&Role::MINTER, &acct("bob")));
    }

    #[test]
    fn grant_is_idempotent() {
        let mut acl = AccessControl::new(acct("alice"));
        assert!(acl.grant_role(&Role::MINTER, acct("bob"), &acct("alice")).unwrap());
        assert!(!acl.grant_role(&Role::MINTER, acct("bob"), &acct("alice")).unwrap());
        assert_eq!(acl.members(&Role::MINTER), vec![acct("bob")]);
    }

    #[test]
    fn non_admin_cannot_grant_or_revoke() {
        let mut acl = AccessControl::new(acct("alice"));
        acl.grant_role(&Role::MINTER, acct("bob"), &acct("alice")).unwrap();

        let err = acl
            .grant_role(&Role::MINTER, acct("carol"), &acct("bob"))
            .unwrap_err();
        assert_eq!(
            err,
            AtlaError::Unauthorized {
                role: Role::ADMIN,
                account: acct("bob"),
            }
        );
        assert!(acl.revoke_role(&Role::MINTER, &acct("bob"), &acct("bob")).is_err());
        assert!(acl.has_role(&Role::MINTER, &acct("bob")));
        assert!(!acl.has_role(&Role::MINTER, &acct("carol")));
    }

    #[test]
    fn last_admin_cannot_be_removed() {
        let mut acl = AccessControl::new(acct("alice"));

        assert_eq!(
            acl.revoke_role(&Role::ADMIN, &acct("alice"), &acct("alice")),
            Err(AtlaError::LastAdmin)
        );
        assert_eq!(acl.renounce_role(&Role::ADMIN, &acct("alice")), Err(AtlaError::LastAdmin));

        acl.grant_role(&Role::ADMIN, acct("bob"), &acct("alice")).unwrap();
        assert!(acl.renounce_role(&Role::ADMIN, &acct("alice")).unwrap());
        assert!(acl.has_role(&Role::ADMIN, &acct("bob")));
    }

    #[test]
    fn reassigned_admin_role_takes_over() {
        let mut acl = AccessControl::new(acct("alice"));
        let auditor = Role::from("AUDITOR");
        let auditor_admin = Role::from("AUDITOR_ADMIN");

        acl.grant_role(&auditor_admin, acct("dave"), &acct("alice")).unwrap();
        acl.set_role_admin(&auditor, auditor_admin.clone(), &acct("alice")).unwrap();
        assert_eq!(acl.admin_role_of(&auditor), &auditor_admin);

        assert!(acl.grant_role(&auditor, acct("erin"), &acct("alice")).is_err());
        assert!(acl.grant_role(&auditor, acct("erin"), &acct("dave")).unwrap());
    }

    #[test]
    fn renounce_without_membership_is_noop() {
        let mut acl = AccessControl::new(acct("alice"));
        assert!(!acl.renounce_role(&Role::MINTER, &acct("zed")).unwrap());
    }
}
