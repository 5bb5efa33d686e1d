use std::sync::Arc;

use sea_orm::Database;
use tracing::{error, info, warn};
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use uptime_backend::db::services::region_service;
use uptime_backend::dispatch::probe::Prober;
use uptime_backend::dispatch::queue::RegionQueue;
use uptime_backend::dispatch::worker;
use uptime_backend::server::config::ServerConfig;
use uptime_backend::web::create_axum_router;

fn init_logging() {
    // Log to a file: JSON format, daily rotation
    let file_appender = rolling::daily("logs", "server.log");
    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .json();

    // Log to stdout: human-readable format
    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    // Default to `info` level if RUST_LOG is not set.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "Failed to listen for shutdown signal.");
    }
    info!("Shutdown signal received.");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    init_logging();

    let config = Arc::new(ServerConfig::from_env()?);
    let db = Database::connect(config.database_url.as_str()).await?;
    let queue = Arc::new(RegionQueue::new());
    let prober = Arc::new(Prober::new()?);

    // The queue lives in this process, so groups do not survive restarts
    // the way the catalog does. Recreate one per known region up front.
    for region in region_service::get_all_regions(&db).await? {
        if let Err(err) = queue.create_group(region.id).await {
            warn!(region_id = %region.id, error = %err, "Skipping queue group creation.");
        }
    }

    for resident in &config.resident_workers {
        let db = db.clone();
        let queue = queue.clone();
        let prober = prober.clone();
        let resident = resident.clone();
        tokio::spawn(async move {
            worker::run_worker_loop(
                &db,
                prober.as_ref(),
                &queue,
                resident.region_id,
                &resident.worker_id,
            )
            .await;
        });
    }

    let app_router = create_axum_router(db, queue, prober, config.clone());

    info!(addr = %config.listen_addr, "HTTP server listening.");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app_router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
