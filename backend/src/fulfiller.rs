//! Fulfillment engine: consumes randomness request records and answers
//! each one with an HMAC-derived random value as the oracle account.
//!
//! Fulfillment is never retried. A record rejected as unknown was already
//! consumed (typically a duplicate delivered by the catch-up sweep) and is
//! skipped; any other rejection is counted as a failure.

use atla_nft::{AtlaError, AtlaNft, RandomnessFulfilled, RandomnessRequested, RequestId};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::{Semaphore, mpsc};
use tracing::{error, info, instrument, warn};

use crate::config::AppConfig;
use crate::metrics::Metrics;
use crate::vrf::compute_randomness;

/// Main fulfiller loop.
pub async fn run_fulfiller(
    config: AppConfig,
    service: Arc<AtlaNft>,
    mut rx: mpsc::Receiver<RandomnessRequested>,
    in_flight: Arc<AtomicU64>,
    metrics: Arc<Metrics>,
) {
    let semaphore = Arc::new(Semaphore::new(config.fulfillment_concurrency));

    while let Some(request) = rx.recv().await {
        in_flight.fetch_add(1, Ordering::Relaxed);

        let permit = match semaphore.clone().acquire_owned().await {
            Ok(p) => p,
            Err(_) => {
                error!("Semaphore closed, stopping fulfiller");
                break;
            }
        };
        let svc = service.clone();
        let cfg = config.clone();
        let pending = in_flight.clone();
        let met = metrics.clone();

        tokio::spawn(async move {
            let _permit = permit;
            let start = Instant::now();

            if !cfg.fulfillment_delay.is_zero() {
                tokio::time::sleep(cfg.fulfillment_delay).await;
            }

            match fulfill_request(&svc, &cfg, &request) {
                Ok(fulfilled) => {
                    let latency_ms = start.elapsed().as_millis() as u64;
                    met.record_fulfillment(latency_ms);
                    info!(
                        request_id = %fulfilled.request_id,
                        reward_item = ?fulfilled.reward_item,
                        latency_ms,
                        "Fulfilled successfully"
                    );
                }
                Err(e) => handle_fulfillment_error(request.request_id, e, &met),
            }

            pending.fetch_sub(1, Ordering::Relaxed);
        });
    }

    info!("Fulfiller channel closed, shutting down");
}

fn handle_fulfillment_error(request_id: RequestId, error: AtlaError, metrics: &Metrics) {
    match error {
        AtlaError::UnknownRequest(_) => {
            metrics.record_duplicate();
            warn!(%request_id, "Skipping request (already fulfilled)");
        }
        other => {
            metrics.record_failure();
            error!(%request_id, error = %other, "Failed to fulfill");
        }
    }
}

/// Derive the random value for `request` and deliver it to the service.
#[instrument(skip_all, fields(request_id = %request.request_id))]
fn fulfill_request(
    service: &AtlaNft,
    config: &AppConfig,
    request: &RandomnessRequested,
) -> Result<RandomnessFulfilled, AtlaError> {
    let randomness = compute_randomness(&config.hmac_secret, request);
    service.fulfill_randomness(&config.oracle_account, request.request_id, randomness)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::ChannelOracle;
    use atla_nft::{Account, Role, ServiceConfig};
    use std::time::Duration;

    fn config() -> AppConfig {
        AppConfig::from_lookup(|key| match key {
            "ADMIN_ACCOUNT" => Some("alice".into()),
            "HMAC_SECRET" => Some("test-secret".into()),
            "REQUEST_FEE" => Some("5".into()),
            _ => None,
        })
        .unwrap()
    }

    struct Harness {
        config: AppConfig,
        service: Arc<AtlaNft>,
        tx: mpsc::Sender<RandomnessRequested>,
        in_flight: Arc<AtomicU64>,
        metrics: Arc<Metrics>,
    }

    fn start() -> Harness {
        let config = config();
        let metrics = Arc::new(Metrics::new());
        let in_flight = Arc::new(AtomicU64::new(0));
        let (tx, rx) = mpsc::channel(16);
        let oracle = Arc::new(ChannelOracle::new(tx.clone(), metrics.clone()));
        let service = Arc::new(AtlaNft::new(
            ServiceConfig {
                admin: config.admin_account.clone(),
                request_fee: config.request_fee,
            },
            oracle,
        ));
        service
            .grant_role(&Role::ORACLE, config.oracle_account.clone(), &config.admin_account)
            .unwrap();

        tokio::spawn(run_fulfiller(
            config.clone(),
            service.clone(),
            rx,
            in_flight.clone(),
            metrics.clone(),
        ));

        Harness {
            config,
            service,
            tx,
            in_flight,
            metrics,
        }
    }

    async fn wait_for(mut done: impl FnMut() -> bool) {
        for _ in 0..200 {
            if done() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test]
    async fn fulfills_queued_requests() {
        let h = start();
        let alice = h.config.admin_account.clone();
        for _ in 0..3 {
            h.service.mint(alice.clone(), &alice).unwrap();
        }
        h.service.credit_fees(10).unwrap();

        h.service.request_randomness(alice.clone()).unwrap();
        h.service.request_randomness(alice.clone()).unwrap();

        let metrics = h.metrics.clone();
        wait_for(|| metrics.requests_fulfilled.load(Ordering::Relaxed) == 2).await;
        assert_eq!(h.service.pending_count(), 0);
        assert!(h.service.reward().set);
        assert!(h.service.reward().value < 3);
        wait_for(|| h.in_flight.load(Ordering::Relaxed) == 0).await;
    }

    #[tokio::test]
    async fn duplicate_delivery_is_skipped() {
        let h = start();
        let alice = h.config.admin_account.clone();
        h.service.mint(alice.clone(), &alice).unwrap();
        h.service.credit_fees(5).unwrap();
        let id = h.service.request_randomness(alice.clone()).unwrap();

        h.tx.send(RandomnessRequested {
            request_id: id,
            requester: alice,
            created_at: 0,
        })
        .await
        .unwrap();

        let metrics = h.metrics.clone();
        wait_for(|| {
            metrics.requests_fulfilled.load(Ordering::Relaxed)
                + metrics.duplicates_skipped.load(Ordering::Relaxed)
                == 2
        })
        .await;
        assert_eq!(metrics.requests_fulfilled.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.duplicates_skipped.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.requests_failed.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn unauthorized_oracle_is_a_failure() {
        let h = start();
        let alice = h.config.admin_account.clone();
        h.service
            .revoke_role(&Role::ORACLE, &h.config.oracle_account, &alice)
            .unwrap();
        h.service.credit_fees(5).unwrap();
        h.service.request_randomness(Account::from("bob")).unwrap();

        let metrics = h.metrics.clone();
        wait_for(|| metrics.requests_failed.load(Ordering::Relaxed) == 1).await;
        assert_eq!(h.service.pending_count(), 1);
    }
}
