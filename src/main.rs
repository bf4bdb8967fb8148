//! Ripple binary entry point

use ripple::{config, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application entry point
///
/// # Setup
/// 1. Initialize tracing/logging
/// 2. Initialize metrics
/// 3. Load configuration from file and environment
/// 4. Initialize AppState
/// 5. Build Axum router
/// 6. Start background tasks (counter reconciliation)
/// 7. Start HTTP server
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize tracing/logging
    let log_format =
        std::env::var("RIPPLE__LOGGING__FORMAT").unwrap_or_else(|_| "pretty".to_string());

    if log_format == "json" {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "ripple=info,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "ripple=info,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }

    tracing::info!("Starting Ripple...");

    // 2. Initialize metrics
    ripple::metrics::init_metrics();

    // 3. Load configuration
    let config = config::AppConfig::load()?;
    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        "Configuration loaded"
    );

    // 4. Initialize application state
    let state = AppState::new(config.clone()).await?;

    // 5. Build Axum router
    let app = ripple::build_router(state.clone());

    // 6. Start background tasks
    if config.reconcile.enabled {
        spawn_reconcile_task(state.clone());
    }

    // 7. Start HTTP server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Spawn background counter reconciliation task
///
/// Recounts follower/following and like counters from their source tables
/// on an interval, repairing any drift.
fn spawn_reconcile_task(state: AppState) {
    tokio::spawn(async move {
        let interval_secs = state.config.reconcile.interval_seconds.max(1);
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(interval_secs));

        // Consume the immediate first tick so the first run waits one interval.
        interval.tick().await;

        loop {
            interval.tick().await;

            tracing::debug!("Running scheduled counter reconciliation...");
            match state.graph.reconcile_counters().await {
                Ok(repaired) => {
                    if repaired > 0 {
                        tracing::info!(repaired, "Counter reconciliation repaired drift");
                    }
                }
                Err(error) => {
                    tracing::error!(%error, "Counter reconciliation failed");
                }
            }
        }
    });

    tracing::info!("Counter reconciliation task spawned");
}
