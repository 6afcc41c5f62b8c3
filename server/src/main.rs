use anyhow::Context;
use catalog_server::{config, router, shutdown_signal, AppState};
use catalog_store::Database;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing with span durations
    use tracing_subscriber::fmt::format::FmtSpan;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_span_events(FmtSpan::CLOSE)
        .init();

    tracing::info!("Starting Steam catalog API server");

    let db_path = config::get_db_path();
    tracing::info!("Using catalog database: {}", db_path.display());
    let db = Database::open(&db_path)
        .await
        .with_context(|| format!("failed to open catalog database at {}", db_path.display()))?;

    let app = router(AppState::new(&db));

    let addr = format!("{}:{}", config::get_bind_addr(), config::get_port());
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    tracing::info!("Server stopped");
    Ok(())
}
