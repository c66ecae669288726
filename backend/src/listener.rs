//! Oracle boundary: delivery of randomness requests to the fulfiller.
//!
//! Two complementary paths ensure no request is lost:
//!
//! 1. **Live queue** ([`ChannelOracle`]): the service hands every new
//!    request record to a bounded channel without blocking. A full queue
//!    drops the record; the request stays pending in the service.
//!
//! 2. **Catch-up sweep** ([`catch_up_pending_requests`]): periodically
//!    re-queues every request still pending. A record delivered twice is
//!    harmless: the second fulfillment is rejected as already consumed.

use atla_nft::{AtlaNft, OracleBoundary, RandomnessRequested};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, info, warn};

use crate::metrics::Metrics;

/// Forwards request records from the service into the fulfiller queue.
pub struct ChannelOracle {
    tx: mpsc::Sender<RandomnessRequested>,
    metrics: Arc<Metrics>,
}

impl ChannelOracle {
    pub fn new(tx: mpsc::Sender<RandomnessRequested>, metrics: Arc<Metrics>) -> Self {
        Self { tx, metrics }
    }
}

impl OracleBoundary for ChannelOracle {
    fn submit(&self, request: &RandomnessRequested) {
        match self.tx.try_send(request.clone()) {
            Ok(()) => {
                self.metrics.record_queued();
                debug!(request_id = %request.request_id, "Queued randomness request");
            }
            Err(TrySendError::Full(_)) => {
                self.metrics.record_dropped();
                warn!(
                    request_id = %request.request_id,
                    "Request queue full, leaving request for catch-up"
                );
            }
            Err(TrySendError::Closed(_)) => {
                self.metrics.record_dropped();
                error!(request_id = %request.request_id, "Request queue closed");
            }
        }
    }
}

/// Queue every request that is still pending. Returns how many were queued.
pub async fn catch_up_pending_requests(
    service: &AtlaNft,
    tx: &mpsc::Sender<RandomnessRequested>,
    metrics: &Metrics,
) -> usize {
    let pending = service.pending_requests();
    if pending.is_empty() {
        return 0;
    }
    info!(count = pending.len(), "Re-queuing pending requests");

    let mut queued = 0;
    for request in pending {
        let event = RandomnessRequested {
            request_id: request.request_id,
            requester: request.requester,
            created_at: request.created_at,
        };
        if tx.send(event).await.is_err() {
            error!("Channel closed while catching up pending requests");
            break;
        }
        metrics.record_queued();
        queued += 1;
    }
    queued
}

/// Run [`catch_up_pending_requests`] every `period` until the queue closes.
pub async fn run_catch_up(
    service: Arc<AtlaNft>,
    tx: mpsc::Sender<RandomnessRequested>,
    metrics: Arc<Metrics>,
    period: Duration,
) {
    let mut ticker = tokio::time::interval(period);
    // The first tick completes immediately; nothing can be pending yet.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        if tx.is_closed() {
            info!("Request queue closed, stopping catch-up");
            return;
        }
        catch_up_pending_requests(&service, &tx, &metrics).await;
    }
}
