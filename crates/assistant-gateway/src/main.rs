//! Assistant gateway server
//!
//! Serves the staking assistant chat endpoint, the calculator API and gas-price
//! lookups.

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use assistant_gateway::{
    AppState, Config, FileConfig, Gateway, MarketClient, OllamaClient, RateLimiter, cors_layer, router,
};

/// Config file picked up from the working directory when `--config` is not given
const CONFIG_FILE: &str = "gateway.toml";

#[derive(Parser, Debug)]
#[command(name = "assistant-gateway")]
#[command(about = "Rate-limited staking assistant and calculator API")]
struct Args {
    /// Path to a TOML config file (default: ./gateway.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on, overrides [server] bind
    #[arg(short, long)]
    bind: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let file = FileConfig::load_or_default(args.config.as_deref(), Path::new(CONFIG_FILE))?;
    let config = Config::from_env(&file, args.bind.as_deref())?;
    debug!("resolved config: {:?}", config);

    let generator =
        OllamaClient::new(&config.api_url, &config.model).context("Failed to build generation client")?;
    info!("generation endpoint: {} (model {})", generator.api_url(), config.model);

    let gateway = Gateway::new(
        generator,
        RateLimiter::new(config.rate_limit),
        &config.api_url,
        config.upstream_timeout,
    );
    let market = MarketClient::public()?;
    let state = Arc::new(AppState { gateway, market });

    let limits = state.gateway.limiter().config();
    info!(
        "rate limit: {} requests per {}s per client, swept every {}s",
        limits.limit,
        limits.window.as_secs(),
        config.sweep_interval.as_secs()
    );
    state.gateway.spawn_sweeper(config.sweep_interval);

    let app = router(Arc::clone(&state), cors_layer(&config.allowed_origins)?);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    info!("listening on http://{}", config.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
