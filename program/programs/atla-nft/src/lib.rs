//! Role-gated item issuance with oracle-backed reward selection.
//!
//! [`AtlaNft`] issues sequentially numbered items to accounts and, on
//! request, picks a reward item using randomness delivered by an external
//! oracle.
//!
//! ## Request lifecycle
//!
//! 1. **Fund**: an external top-up credits the fee account.
//! 2. **Request**: any account calls [`AtlaNft::request_randomness`]; the fee
//!    is debited, a pending entry is recorded under a fresh [`RequestId`],
//!    and a [`RandomnessRequested`] record is handed to the
//!    [`OracleBoundary`]. The call returns immediately.
//! 3. **Fulfill**: later, the oracle calls [`AtlaNft::fulfill_randomness`]
//!    with the same id. The pending entry is consumed and the reward slot is
//!    set to `randomness mod total_supply`.
//!
//! All state lives in one table guarded by a single lock, so each mutating
//! operation commits atomically with respect to every other.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

pub mod access_control;
pub mod coordinator;
pub mod errors;
pub mod events;
pub mod fee_account;
pub mod ledger;
pub mod reward;
pub mod state;

pub use errors::{AtlaError, Result};
pub use events::{OracleBoundary, RandomnessFulfilled, RandomnessRequested};
pub use state::{Account, Item, ItemId, PendingRequest, RandomValue, RequestId, RewardState, Role};

use access_control::AccessControl;
use coordinator::RandomnessCoordinator;
use fee_account::FeeAccount;
use ledger::Ledger;
use reward::RewardSlot;

/// Construction parameters for [`AtlaNft`].
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Initial holder of `ADMIN` and `MINTER`.
    pub admin: Account,
    /// Fee debited per randomness request.
    pub request_fee: u64,
}

struct Tables {
    access: AccessControl,
    ledger: Ledger,
    fees: FeeAccount,
    coordinator: RandomnessCoordinator,
    reward: RewardSlot,
    /// Logical clock: number of committed mutations.
    commits: u64,
}

impl Tables {
    fn commit(&mut self) -> u64 {
        self.commits = self.commits.wrapping_add(1);
        self.commits
    }
}

/// The issuance service.
pub struct AtlaNft {
    tables: Mutex<Tables>,
    oracle: Arc<dyn OracleBoundary>,
}

impl AtlaNft {
    pub fn new(config: ServiceConfig, oracle: Arc<dyn OracleBoundary>) -> Self {
        Self {
            tables: Mutex::new(Tables {
                access: AccessControl::with_roles(config.admin, [Role::MINTER]),
                ledger: Ledger::new(),
                fees: FeeAccount::new(),
                coordinator: RandomnessCoordinator::new(config.request_fee),
                reward: RewardSlot::new(),
                commits: 0,
            }),
            oracle,
        }
    }

    // -- Access control -----------------------------------------------------

    pub fn has_role(&self, role: &Role, account: &Account) -> bool {
        self.tables.lock().access.has_role(role, account)
    }

    pub fn grant_role(&self, role: &Role, account: Account, caller: &Account) -> Result<bool> {
        let mut t = self.tables.lock();
        let changed = t.access.grant_role(role, account, caller)?;
        if changed {
            t.commit();
        }
        Ok(changed)
    }

    pub fn revoke_role(&self, role: &Role, account: &Account, caller: &Account) -> Result<bool> {
        let mut t = self.tables.lock();
        let changed = t.access.revoke_role(role, account, caller)?;
        if changed {
            t.commit();
        }
        Ok(changed)
    }

    pub fn renounce_role(&self, role: &Role, caller: &Account) -> Result<bool> {
        let mut t = self.tables.lock();
        let changed = t.access.renounce_role(role, caller)?;
        if changed {
            t.commit();
        }
        Ok(changed)
    }

    pub fn set_role_admin(&self, role: &Role, admin_role: Role, caller: &Account) -> Result<()> {
        let mut t = self.tables.lock();
        t.access.set_role_admin(role, admin_role, caller)?;
        t.commit();
        Ok(())
    }

    pub fn role_members(&self, role: &Role) -> Vec<Account> {
        self.tables.lock().access.members(role)
    }

    // -- Ledger -------------------------------------------------------------

    /// Issue the next item to `to`. `caller` must hold `MINTER`.
    pub fn mint(&self, to: Account, caller: &Account) -> Result<ItemId> {
        let mut t = self.tables.lock();
        let Tables { access, ledger, .. } = &mut *t;
        let item_id = ledger.mint(access, to, caller)?;
        t.commit();
        Ok(item_id)
    }

    pub fn balance_of(&self, account: &Account) -> u64 {
        self.tables.lock().ledger.balance_of(account)
    }

    pub fn owner_of(&self, item_id: ItemId) -> Result<Account> {
        self.tables.lock().ledger.owner_of(item_id).cloned()
    }

    pub fn item(&self, item_id: ItemId) -> Result<Item> {
        self.tables.lock().ledger.item(item_id)
    }

    pub fn total_supply(&self) -> u64 {
        self.tables.lock().ledger.total_supply()
    }

    // -- Fees ---------------------------------------------------------------

    /// External fee top-up. Returns the new balance.
    pub fn credit_fees(&self, amount: u64) -> Result<u64> {
        let mut t = self.tables.lock();
        let balance = t.fees.credit(amount)?;
        t.commit();
        Ok(balance)
    }

    pub fn fee_balance(&self) -> u64 {
        self.tables.lock().fees.balance()
    }

    pub fn request_fee(&self) -> u64 {
        self.tables.lock().coordinator.fee()
    }

    /// Change the per-request fee. `caller` must hold `ADMIN`.
    pub fn set_request_fee(&self, fee: u64, caller: &Account) -> Result<()> {
        let mut t = self.tables.lock();
        t.access.check_role(&Role::ADMIN, caller)?;
        t.coordinator.set_fee(fee);
        t.commit();
        Ok(())
    }

    // -- Randomness ---------------------------------------------------------

    /// Pay the fee, record a pending request, and notify the oracle.
    ///
    /// The oracle is notified after the lock is released; the caller gets
    /// the correlation id without waiting for fulfillment.
    pub fn request_randomness(&self, requester: Account) -> Result<RequestId> {
        let record = {
            let mut t = self.tables.lock();
            let now = t.commits.wrapping_add(1);
            let Tables {
                fees, coordinator, ..
            } = &mut *t;
            let record = coordinator.request_randomness(fees, requester, now)?;
            t.commit();
            record
        };

        debug!(request_id = %record.request_id, "Submitting request to oracle");
        self.oracle.submit(&record);
        Ok(record.request_id)
    }

    /// Oracle callback. `caller` must hold `ORACLE`.
    pub fn fulfill_randomness(
        &self,
        caller: &Account,
        request_id: RequestId,
        randomness: RandomValue,
    ) -> Result<RandomnessFulfilled> {
        let mut t = self.tables.lock();
        t.access.check_role(&Role::ORACLE, caller)?;
        let Tables {
            ledger,
            coordinator,
            reward,
            ..
        } = &mut *t;
        let fulfilled = coordinator.fulfill_randomness(request_id, randomness, ledger, reward)?;
        t.commit();
        Ok(fulfilled)
    }

    pub fn pending_count(&self) -> usize {
        self.tables.lock().coordinator.pending_count()
    }

    pub fn pending_requests(&self) -> Vec<PendingRequest> {
        self.tables.lock().coordinator.pending_requests()
    }

    // -- Reward -------------------------------------------------------------

    pub fn reward(&self) -> RewardState {
        self.tables.lock().reward.current()
    }
}
