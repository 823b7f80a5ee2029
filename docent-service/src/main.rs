use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::net::TcpListener;
use tracing::info;

mod api;
mod config;
mod credentials;
mod db;
mod error;
mod flow;
mod i18n;
mod ollama;
mod rag;
mod service;

use crate::config::AppConfig;
use crate::db::Database;
use crate::service::DocentService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    init_logging();

    info!("Starting Docent service v{}", env!("CARGO_PKG_VERSION"));

    let config = Arc::new(AppConfig::load()?);
    info!(
        host = %config.server.host,
        port = config.server.port,
        model = %config.ollama.model,
        "Configuration loaded"
    );

    // Ensure data directory exists
    std::fs::create_dir_all(&config.storage.data_dir)?;

    // Initialize database
    let db_path = config.storage.database_path();
    let db = Arc::new(Database::open(&db_path)?);
    info!(path = %db_path.display(), "Database initialized");

    let metrics = PrometheusBuilder::new().install_recorder()?;

    // Initialize the service
    let service = Arc::new(DocentService::new(db, config.clone()).await?);

    // Start expired-session cleanup background task
    let cleanup_service = service.clone();
    let cleanup_interval = config.auth.session_cleanup_interval();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(cleanup_interval);
        loop {
            interval.tick().await;
            match cleanup_service.cleanup_expired_sessions() {
                Ok(count) if count > 0 => {
                    info!(removed = count, "Cleaned up expired sessions");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Session cleanup failed");
                }
                _ => {}
            }
        }
    });

    let app = api::router(service, Some(metrics));

    // Start the server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let format = fmt::format()
        .with_target(true)
        .with_thread_ids(true)
        .compact();

    // Use RUST_LOG if set, otherwise default to info level for our crate
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("docent_service=info"));

    tracing_subscriber::registry()
        .with(fmt::layer().event_format(format))
        .with(filter)
        .init();
}
