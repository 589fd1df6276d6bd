//! # Voyage Server
//!
//! Main binary: loads configuration, prepares the store and image backend,
//! and serves the REST API until Ctrl-C.

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use voyage_api::{build_router, AppState};
use voyage_common::config::AppConfig;
use voyage_db::{images::ImageAssetManager, Database};

#[derive(Parser, Debug)]
#[command(name = "voyage", version, about = "Vacation catalog with consistent follower counts")]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, env = "VOYAGE_LOG_JSON", default_value_t = false)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run migrations and serve the API (default)
    Serve,
    /// Run database migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = voyage_common::config::load()?;

    init_tracing(cli.log_json);
    tracing::info!("Starting Voyage v{}", env!("CARGO_PKG_VERSION"));

    let db = Database::connect(&config.database).await?;
    db.migrate().await?;

    let result = match cli.command.unwrap_or(Command::Serve) {
        Command::Migrate => Ok(()),
        Command::Serve => serve(&config, db.clone()).await,
    };

    db.close().await;
    tracing::info!("Voyage stopped");
    result
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "voyage=debug,tower_http=debug".into());

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn serve(config: &AppConfig, db: Database) -> anyhow::Result<()> {
    if config.auth.jwt_secret.is_empty() {
        anyhow::bail!("auth.jwt_secret must be set (VOYAGE__AUTH__JWT_SECRET)");
    }

    let images = ImageAssetManager::from_config(&config.storage, config.limits.max_image_bytes).await?;
    let state = AppState::new(db, images, &config.limits, config.auth.jwt_secret.clone());
    let router = build_router(state);

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("REST API listening on http://{addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
