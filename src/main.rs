use std::env;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use apocalypse_academy::{app, config::Config, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            env::var("RUST_LOG").unwrap_or_else(|_| "apocalypse_academy=info,tower_http=info".into())
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let state = AppState::build(&config).await?;
    tracing::info!(
        provider = %config.video_provider,
        latency_ms = config.simulated_latency.as_millis() as u64,
        "services ready"
    );

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("listening on http://0.0.0.0:{}", config.port);

    axum::serve(listener, app(state)).await?;
    Ok(())
}
