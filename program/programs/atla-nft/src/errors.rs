use thiserror::Error;

use crate::state::{Account, ItemId, RequestId, Role};

/// Errors reported by the issuance service.
///
/// Every variant is a caller-correctable precondition violation: the failing
/// operation leaves all state untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AtlaError {
    /// The caller does not hold the role the operation requires.
    #[error("account {account} is missing role {role}")]
    Unauthorized { role: Role, account: Account },
    /// The fee balance cannot cover a randomness request.
    #[error("insufficient fee balance: required {required}, available {available}")]
    InsufficientFunds { required: u64, available: u64 },
    /// Fulfillment for a correlation id that is not pending (never issued or already consumed).
    #[error("unknown randomness request {0}")]
    UnknownRequest(RequestId),
    /// The item id was never allocated.
    #[error("item {0} not found")]
    NotFound(ItemId),
    /// Removing this membership would leave no account holding `ADMIN`.
    #[error("cannot remove the last admin")]
    LastAdmin,
    /// A counter or balance would overflow u64 (practically unreachable).
    #[error("counter overflow")]
    CounterOverflow,
}

pub type Result<T> = std::result::Result<T, AtlaError>;
