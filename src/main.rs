use anyhow::{Context, Result};
use clap::Parser; // for cli
use content_counter::config::Args;
use content_counter::flush::FlushScheduler;
use content_counter::handlers::router;
use content_counter::state::AppState;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // parse cli arguments
    let args = Args::parse();
    let state = Arc::new(AppState::from_args(&args).context("Invalid configuration")?);

    // spawn the background flusher
    let scheduler = Arc::new(FlushScheduler::new(
        Arc::clone(&state.aggregator),
        state.store.clone(),
        args.flush_interval(),
    ));
    let flush_task = scheduler.spawn(CancellationToken::new());

    let app = router(Arc::clone(&state));

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Content counter running on http://localhost:{}", args.port);
    info!("Flush interval: {} seconds", args.flush_interval_secs);
    info!(
        "Rate limit on /stats: {} requests per {} seconds",
        args.rate_limit, args.rate_window_secs
    );
    info!("Time bucket width: {} seconds", args.bucket_secs);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    let last = flush_task.shutdown().await;
    info!(
        "Shutdown flush wrote {} buckets ({} failed), {} records in store",
        last.written,
        last.failed,
        state.store.len()
    );
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received, draining");
}
