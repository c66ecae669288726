use std::collections::HashMap;

use tracing::info;

use crate::access_control::AccessControl;
use crate::errors::{AtlaError, Result};
use crate::state::{Account, Item, ItemId, Role};

/// Catalogue of issued items.
///
/// Item ids are the index into `owners`, so allocation is sequential from
/// zero with no gaps and no reuse.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    owners: Vec<Account>,
    balances: HashMap<Account, u64>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next item to `to`.
    ///
    /// `caller` must hold [`Role::MINTER`]. Id allocation, ownership and the
    /// balance update happen together or not at all.
    pub fn mint(&mut self, access: &AccessControl, to: Account, caller: &Account) -> Result<ItemId> {
        access.check_role(&Role::MINTER, caller)?;

        let item_id = self.total_supply();
        let balance = self
            .balance_of(&to)
            .checked_add(1)
            .ok_or(AtlaError::CounterOverflow)?;

        self.balances.insert(to.clone(), balance);
        self.owners.push(to.clone());

        info!(item_id, to = %to, minter = %caller, "Item minted");
        Ok(item_id)
    }

    pub fn balance_of(&self, account: &Account) -> u64 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    pub fn owner_of(&self, item_id: ItemId) -> Result<&Account> {
        usize::try_from(item_id)
            .ok()
            .and_then(|index| self.owners.get(index))
            .ok_or(AtlaError::NotFound(item_id))
    }

    pub fn item(&self, item_id: ItemId) -> Result<Item> {
        Ok(Item {
            id: item_id,
            owner: self.owner_of(item_id)?.clone(),
        })
    }

    /// Number of items issued so far, which is also the next id.
    pub fn total_supply(&self) -> u64 {
        self.owners.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (AccessControl, Ledger) {
        let mut acl = AccessControl::new(Account::from("admin"));
        acl.grant_role(&Role::MINTER, Account::from("minter"), &Account::from("admin"))
            .unwrap();
        (acl, Ledger::new())
    }

    #[test]
    fn ids_are_sequential_from_zero() {
        let (acl, mut ledger) = setup();
        let minter = Account::from("minter");

        for expected in 0..5 {
            let id = ledger.mint(&acl, Account::from("alice"), &minter).unwrap();
            assert_eq!(id, expected);
        }
        assert_eq!(ledger.total_supply(), 5);
        assert_eq!(ledger.balance_of(&Account::from("alice")), 5);
    }

    #[test]
    fn mint_without_role_issues_nothing() {
        let (acl, mut ledger) = setup();

        let err = ledger
            .mint(&acl, Account::from("alice"), &Account::from("mallory"))
            .unwrap_err();
        assert!(matches!(err, AtlaError::Unauthorized { role, .. } if role == Role::MINTER));
        assert_eq!(ledger.total_supply(), 0);
        assert_eq!(ledger.balance_of(&Account::from("alice")), 0);
    }

    #[test]
    fn owner_lookup() {
        let (acl, mut ledger) = setup();
        let minter = Account::from("minter");
        ledger.mint(&acl, Account::from("alice"), &minter).unwrap();
        ledger.mint(&acl, Account::from("bob"), &minter).unwrap();

        assert_eq!(ledger.owner_of(0).unwrap(), &Account::from("alice"));
        assert_eq!(ledger.item(1).unwrap().owner, Account::from("bob"));
        assert_eq!(ledger.owner_of(2), Err(AtlaError::NotFound(2)));
    }

    #[test]
    fn unknown_account_has_zero_balance() {
        let (_, ledger) = setup();
        assert_eq!(ledger.balance_of(&Account::from("nobody")), 0);
    }
}
