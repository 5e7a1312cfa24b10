use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use jobboard::config::AppConfig;
use jobboard::error::AppError;
use jobboard::marketplace::{InMemoryStore, Marketplace};
use jobboard::telemetry;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::cli::ServeArgs;
use crate::infra::{seed_demo_directory, AppState, Market};
use crate::routes::with_marketplace_routes;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(InMemoryStore::new());
    if args.seed_demo {
        let directory = seed_demo_directory(&store).await?;
        info!(
            seeker = %directory.seeker.id,
            employer = %directory.employer.id,
            rival = %directory.rival.id,
            admin = %directory.admin.id,
            posting = %directory.posting.id,
            "demo directory seeded"
        );
    }
    let market = Arc::new(Marketplace::new(store, config.integrity));

    match config.integrity.reconcile_interval() {
        Some(period) => {
            spawn_reconciler(market.clone(), period);
        }
        None => info!("scheduled reconciliation disabled"),
    }

    let app = with_marketplace_routes(market)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "job marketplace service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Periodic reconciliation pass. The first tick is skipped so a fresh process
/// does not sweep before it has served anything.
fn spawn_reconciler(market: Arc<Market>, period: Duration) -> JoinHandle<()> {
    info!(period_secs = period.as_secs(), "scheduled reconciliation enabled");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if let Err(err) = market.reconciler.reconcile().await {
                error!(error = ?err, "scheduled reconciliation failed");
            }
        }
    })
}
