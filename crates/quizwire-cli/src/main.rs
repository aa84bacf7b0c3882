//! Quizwire terminal client entry point.

use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use quizwire_app::{Runtime, Session, SessionEvent};
use quizwire_cli::LineDriver;
use quizwire_client::{ClientConfig, HttpResultFetcher, ResultCache, ResultFetcher, SystemEnv};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Quizwire terminal client
#[derive(Parser, Debug)]
#[command(name = "quizwire")]
#[command(about = "Play live quiz rooms from the terminal")]
#[command(version)]
struct Args {
    /// Broker WebSocket URL
    #[arg(long, env = "QUIZWIRE_URL", default_value = "ws://localhost:8080/ws")]
    url: String,

    /// Bearer token for the broker and the results API
    #[arg(long, env = "QUIZWIRE_TOKEN", hide_env_values = true)]
    token: String,

    /// Your user id
    #[arg(long)]
    user_id: String,

    /// Room to follow once connected
    #[arg(long)]
    room_id: Option<String>,

    /// Base URL of the REST API. Final results are not fetched without it.
    #[arg(long)]
    api_base: Option<String>,

    /// JSON client configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the number of reconnect attempts
    #[arg(long)]
    max_reconnect_attempts: Option<u32>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn load_config(args: &Args) -> Result<ClientConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => ClientConfig::default(),
    };
    if let Some(attempts) = args.max_reconnect_attempts {
        config.connection.max_reconnect_attempts = attempts;
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = load_config(&args)?;
    let env = SystemEnv::new();
    let session = Session::new(env, &args.user_id, &config);

    let mut driver = LineDriver::new(&args.url, &args.token);
    if let Some(room_id) = &args.room_id {
        driver.queue(SessionEvent::EnterRoom { room_id: room_id.clone() });
    }

    let mut runtime = Runtime::new(driver, session, &args.token);
    if let Some(base) = &args.api_base {
        let fetcher: Arc<dyn ResultFetcher> = Arc::new(HttpResultFetcher::new(base, &args.token));
        let cache =
            ResultCache::new(fetcher, env, config.result_cache_capacity, config.fetch_timeout)?;
        runtime = runtime.with_results(cache);
    }

    tracing::info!(url = %args.url, user = %args.user_id, "starting");
    Ok(runtime.run().await?)
}
