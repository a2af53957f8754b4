//! Rankvote daemon entry point.
//!
//! Wires the store, the webhook dispatcher, the services, and the
//! lifecycle scheduler, then runs until a shutdown signal. The web
//! request layer is a separate collaborator; this binary only hosts
//! the scheduler side of the system.

use std::sync::Arc;

use rankvote_common::Config;
use rankvote_core::notify::NotificationDispatcher;
use rankvote_core::services::ContestService;
use rankvote_core::webhook::WebhookDispatcher;
use rankvote_sched::Scheduler;
use rankvote_store::{ContestStore, MemoryStore};
use tokio::signal;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
#[allow(clippy::expect_used)]
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rankvote=debug".into()),
        )
        .init();

    info!("Starting rankvote daemon...");

    // Load configuration
    let config = Config::load()?;

    // The persistence collaborator; the in-memory reference store keeps
    // the daemon self-contained.
    let store: Arc<dyn ContestStore> = Arc::new(MemoryStore::new());

    // The delivery collaborator.
    let dispatcher: Arc<dyn NotificationDispatcher> =
        Arc::new(WebhookDispatcher::new(&config.notify));

    let contests = ContestService::new(
        Arc::clone(&store),
        Arc::clone(&dispatcher),
        &config.instance.url,
        config.scheduler.max_active_groups,
    );

    let scheduler = Arc::new(Scheduler::new(
        store,
        dispatcher,
        contests,
        config.scheduler.clone(),
        &config.instance.url,
    ));
    scheduler.start();
    info!(
        tick_seconds = config.scheduler.tick_seconds,
        "Lifecycle scheduler running"
    );

    shutdown_signal().await;

    scheduler.stop();
    info!("Shutdown complete");
    Ok(())
}
