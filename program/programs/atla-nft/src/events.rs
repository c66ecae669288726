use serde::Serialize;

use crate::state::{Account, ItemId, RandomValue, RequestId};

/// Emitted to the oracle boundary when a new randomness request is recorded.
///
/// The oracle answers, at some later time, with a fulfillment carrying the
/// same `request_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RandomnessRequested {
    pub request_id: RequestId,
    pub requester: Account,
    pub created_at: u64,
}

/// Result of a successful fulfillment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RandomnessFulfilled {
    pub request_id: RequestId,
    pub requester: Account,
    pub randomness: RandomValue,
    /// Item chosen as reward, `None` when no items had been issued yet.
    pub reward_item: Option<ItemId>,
}

/// Receiver of randomness request records (the off-process oracle).
///
/// `submit` is fire-and-forget: it must not block and it is never called
/// while the service lock is held.
pub trait OracleBoundary: Send + Sync {
    fn submit(&self, request: &RandomnessRequested);
}
