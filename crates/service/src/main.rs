//! Allocation worker entry point.
//!
//! Wires both buses over the in-memory store and serves commands arriving on
//! the external bus until shutdown. The HTTP edge is a separate deployment;
//! this process is the message-driven core.

use service::{App, Config};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_filter.clone())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install the Prometheus exporter
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], config.metrics_port))
        .install()
        .expect("failed to install Prometheus exporter");

    // 3. Wire the application and subscribe all handlers
    let (app, _handles) = App::in_memory(&config);
    app.start().await;

    tracing::info!(
        metrics_port = config.metrics_port,
        "allocation worker ready"
    );

    // 4. Run until asked to stop. In-flight background handlers are
    // best-effort and may be dropped here.
    shutdown_signal().await;

    tracing::info!("worker shut down gracefully");
}
