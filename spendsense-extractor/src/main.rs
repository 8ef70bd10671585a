use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let addr = std::env::var("SPENDSENSE_EXTRACTOR_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:8788".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("extraction function listening on {addr}");
    axum::serve(listener, spendsense_extractor::router()).await?;

    Ok(())
}
