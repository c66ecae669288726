//! Application configuration loaded from environment variables.
//!
//! Required: `ADMIN_ACCOUNT`, `HMAC_SECRET`
//! Optional: `ORACLE_ACCOUNT`, `REQUEST_FEE`, `HTTP_PORT`,
//!           `FULFILLMENT_CONCURRENCY`, `FULFILLMENT_DELAY_MS`,
//!           `REQUEST_QUEUE_CAPACITY`, `CATCH_UP_INTERVAL_SECS`

use anyhow::{Context, Result};
use atla_nft::Account;
use std::str::FromStr;
use std::time::Duration;

/// 0.1 of an 18-decimal fee token.
const DEFAULT_REQUEST_FEE: u64 = 100_000_000_000_000_000;

/// Application configuration for the issuance backend.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Account that receives `ADMIN` and `MINTER` at startup.
    pub admin_account: Account,
    /// Account the in-process oracle fulfills as; granted `ORACLE` at startup.
    pub oracle_account: Account,
    /// Secret key for HMAC-SHA256 randomness generation.
    pub hmac_secret: Vec<u8>,
    /// Fee debited per randomness request.
    pub request_fee: u64,
    /// HTTP server port.
    pub http_port: u16,
    /// Maximum concurrent fulfillment tasks.
    pub fulfillment_concurrency: usize,
    /// Simulated oracle latency before each fulfillment.
    pub fulfillment_delay: Duration,
    /// Capacity of the request queue between the service and the fulfiller.
    pub request_queue_capacity: usize,
    /// Period of the sweep that re-queues requests still pending.
    pub catch_up_interval: Duration,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let admin_account = lookup("ADMIN_ACCOUNT")
            .map(Account::new)
            .context("ADMIN_ACCOUNT env var must be set")?;

        let oracle_account = Account::new(lookup("ORACLE_ACCOUNT").unwrap_or_else(|| "oracle".into()));

        let hmac_secret = lookup("HMAC_SECRET")
            .context("HMAC_SECRET env var must be set")?
            .into_bytes();

        let request_fee: u64 = parse_or(&lookup, "REQUEST_FEE", DEFAULT_REQUEST_FEE)?;
        let http_port: u16 = parse_or(&lookup, "HTTP_PORT", 8080)?;
        let fulfillment_concurrency: usize = parse_or(&lookup, "FULFILLMENT_CONCURRENCY", 4)?;
        let fulfillment_delay_ms: u64 = parse_or(&lookup, "FULFILLMENT_DELAY_MS", 0)?;
        let request_queue_capacity: usize = parse_or(&lookup, "REQUEST_QUEUE_CAPACITY", 256)?;
        let catch_up_interval_secs: u64 = parse_or(&lookup, "CATCH_UP_INTERVAL_SECS", 30)?;

        anyhow::ensure!(fulfillment_concurrency > 0, "FULFILLMENT_CONCURRENCY must be positive");
        anyhow::ensure!(request_queue_capacity > 0, "REQUEST_QUEUE_CAPACITY must be positive");
        anyhow::ensure!(catch_up_interval_secs > 0, "CATCH_UP_INTERVAL_SECS must be positive");

        Ok(Self {
            admin_account,
            oracle_account,
            hmac_secret,
            request_fee,
            http_port,
            fulfillment_concurrency,
            fulfillment_delay: Duration::from_millis(fulfillment_delay_ms),
            request_queue_capacity,
            catch_up_interval: Duration::from_secs(catch_up_interval_secs),
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid {key}: {raw}")),
        None => Ok(default),
    }
}
