use clap::Parser; // for cli
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use spending_api::config::Args;
use spending_api::handlers::router;
use spending_api::rate_limit::Registry;
use spending_api::state::AppState;
use spending_api::sweeper::spawn_sweeper;

// this is main async function with tokio
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // parse cli arguments
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let limiter_config = args.limiter_config()?;

    // limiter and sweeper live exactly as long as the server
    let registry = Arc::new(Registry::new(limiter_config.clone()));
    let sweeper = spawn_sweeper(Arc::clone(&registry));

    let state = Arc::new(AppState::new(registry));
    let app = router(state);

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("API running on http://{}", addr);
    info!(
        rate = limiter_config.rate,
        burst = limiter_config.burst,
        sweep_interval_secs = limiter_config.sweep_interval.as_secs(),
        idle_threshold_secs = limiter_config.idle_threshold.as_secs(),
        "Rate limiter configured"
    );

    let served = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await;

    sweeper.abort();
    info!("Server stopped");
    served?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        // keep serving; the process can still be killed
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
