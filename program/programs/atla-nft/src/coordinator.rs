//! Randomness request/fulfillment state machine.
//!
//! Per request: `NONE -> PENDING -> FULFILLED`. A pending entry exists from
//! the moment its fee is debited until the oracle fulfills it; fulfillment
//! removes the entry before applying the result, so each correlation id is
//! consumed at most once. Requests that are never fulfilled stay pending
//! and show up in [`RandomnessCoordinator::pending_count`].

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::errors::{AtlaError, Result};
use crate::events::{RandomnessFulfilled, RandomnessRequested};
use crate::fee_account::FeeAccount;
use crate::ledger::Ledger;
use crate::reward::RewardSlot;
use crate::state::{Account, PendingRequest, RandomValue, RequestId};

#[derive(Debug, Clone)]
pub struct RandomnessCoordinator {
    /// Fee debited from the fee account per request.
    fee: u64,
    /// Next correlation id to hand out.
    request_counter: u64,
    pending: BTreeMap<RequestId, PendingRequest>,
}

impl RandomnessCoordinator {
    pub fn new(fee: u64) -> Self {
        Self {
            fee,
            request_counter: 0,
            pending: BTreeMap::new(),
        }
    }

    pub fn fee(&self) -> u64 {
        self.fee
    }

    pub fn set_fee(&mut self, fee: u64) {
        info!(old_fee = self.fee, new_fee = fee, "Request fee updated");
        self.fee = fee;
    }

    /// Pay the fee and record a pending request.
    ///
    /// Fails with [`AtlaError::InsufficientFunds`] without touching any
    /// state when the fee account cannot cover the fee. The returned record
    /// is what the oracle boundary receives.
    pub fn request_randomness(
        &mut self,
        fees: &mut FeeAccount,
        requester: Account,
        now: u64,
    ) -> Result<RandomnessRequested> {
        let next_counter = self
            .request_counter
            .checked_add(1)
            .ok_or(AtlaError::CounterOverflow)?;

        if !fees.try_debit(self.fee) {
            warn!(
                requester = %requester,
                required = self.fee,
                available = fees.balance(),
                "Randomness request rejected: insufficient fee balance"
            );
            return Err(AtlaError::InsufficientFunds {
                required: self.fee,
                available: fees.balance(),
            });
        }

        let request_id = RequestId::new(self.request_counter);
        self.request_counter = next_counter;
        self.pending.insert(
            request_id,
            PendingRequest {
                request_id,
                requester: requester.clone(),
                created_at: now,
            },
        );

        info!(
            request_id = %request_id,
            requester = %requester,
            fee = self.fee,
            created_at = now,
            "Randomness requested"
        );

        Ok(RandomnessRequested {
            request_id,
            requester,
            created_at: now,
        })
    }

    /// Resolve the pending request `request_id` with `randomness`.
    ///
    /// The reward is `randomness mod total_supply`. With no items issued the
    /// request is still consumed but the reward slot is left unchanged.
    pub fn fulfill_randomness(
        &mut self,
        request_id: RequestId,
        randomness: RandomValue,
        ledger: &Ledger,
        reward: &mut RewardSlot,
    ) -> Result<RandomnessFulfilled> {
        let Some(pending) = self.pending.remove(&request_id) else {
            warn!(request_id = %request_id, "Fulfillment for unknown or consumed request");
            return Err(AtlaError::UnknownRequest(request_id));
        };

        let reward_item = randomness.reduce(ledger.total_supply());
        match reward_item {
            Some(item_id) => reward.assign(item_id),
            None => warn!(request_id = %request_id, "No items issued, reward left unchanged"),
        }

        info!(
            request_id = %request_id,
            requester = %pending.requester,
            randomness = %randomness,
            reward_item = ?reward_item,
            "Randomness fulfilled"
        );

        Ok(RandomnessFulfilled {
            request_id,
            requester: pending.requester,
            randomness,
            reward_item,
        })
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Pending entries ordered by correlation id.
    pub fn pending_requests(&self) -> Vec<PendingRequest> {
        self.pending.values().cloned().collect()
    }
}
