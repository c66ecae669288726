//! Issuance backend
//!
//! Hosts the issuance service in memory together with its oracle. Runs three
//! concurrent subsystems:
//!
//! - **Catch-up sweep**: periodically re-queues requests still pending.
//! - **Fulfiller**: consumes request records and delivers randomness.
//! - **HTTP server**: minting, roles, fees, randomness requests, and the
//!   liveness (`/health`) and readiness (`/status`) probes.

use actix_web::{App, HttpServer, web};
use anyhow::Context;
use atla_nft::{AtlaNft, Role, ServiceConfig};
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

mod api;
mod config;
mod fulfiller;
mod listener;
mod metrics;
mod vrf;

use api::AppState;
use config::AppConfig;
use listener::ChannelOracle;
use metrics::Metrics;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,actix_web=warn,actix_server=warn")),
        )
        .with_target(true)
        .with_ansi(true)
        .init();

    let config = AppConfig::from_env().context("invalid configuration")?;

    info!(
        admin = %config.admin_account,
        oracle = %config.oracle_account,
        request_fee = config.request_fee,
        "Starting issuance backend"
    );

    let metrics = Arc::new(Metrics::new());
    let in_flight = Arc::new(AtomicU64::new(0));
    let (tx, rx) = mpsc::channel(config.request_queue_capacity);

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
        .context("failed to register oracle account")?;

    // Background: re-queue requests the live queue dropped.
    tokio::spawn(listener::run_catch_up(
        service.clone(),
        tx,
        metrics.clone(),
        config.catch_up_interval,
    ));

    // Background: consume request records and fulfill them.
    tokio::spawn(fulfiller::run_fulfiller(
        config.clone(),
        service.clone(),
        rx,
        in_flight.clone(),
        metrics.clone(),
    ));

    let state = web::Data::new(AppState {
        service,
        in_flight,
        metrics,
    });

    let addr = ("0.0.0.0", config.http_port);
    info!(port = config.http_port, "Starting HTTP server");

    HttpServer::new(move || App::new().app_data(state.clone()).configure(api::configure))
        .bind(addr)?
        .run()
        .await?;

    Ok(())
}
