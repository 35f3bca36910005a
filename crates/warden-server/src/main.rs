use clap::Parser;
use std::time::Duration;
use tracing::info;
use warden_server::{create_router, logging, AppConfig, AppState};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = AppConfig::load(&args.config)?;
    logging::init(&config.logging.level)?;

    info!("Starting warden server with config: {}", args.config);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let reap_interval = Duration::from_secs(config.session.reap_interval_secs.max(1));

    let state = AppState::connect(config).await?;
    let reaper = state.sessions.clone().spawn_reaper(reap_interval);

    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    reaper.abort();
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
