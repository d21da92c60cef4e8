//! Kith terminal client entry point.
//!
//! # Usage
//!
//! ```bash
//! kith --base-url https://social.example --user 7 --session 'session_id=abc123'
//! ```

use clap::Parser;
use kith_cli::Runtime;
use kith_client::{ClientConfig, SessionCredential};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

/// Kith messaging client
#[derive(Parser, Debug)]
#[command(name = "kith")]
#[command(about = "Terminal client for Kith real-time messaging")]
#[command(version)]
struct Args {
    /// Origin of the Kith API, e.g. `https://social.example`
    #[arg(short, long)]
    base_url: Url,

    /// Your user ID
    #[arg(short, long)]
    user: u64,

    /// Session cookie header (`session_id=...; other=...`) or raw session ID
    #[arg(short, long)]
    session: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Do not reconnect after the connection drops
    #[arg(long)]
    no_reconnect: bool,
}

fn credential(raw: &str) -> SessionCredential {
    SessionCredential::from_cookie_header(raw).unwrap_or_else(|| SessionCredential::new(raw.trim()))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    // stdout belongs to the chat view.
    tracing_subscriber::registry().with(fmt::layer().with_writer(std::io::stderr)).with(filter).init();

    let mut config = ClientConfig::new(args.base_url).with_auto_reconnect(!args.no_reconnect);
    if let Some(raw) = args.session.as_deref() {
        config = config.with_session(credential(raw));
    }

    tracing::info!(user = args.user, endpoint = ?config.websocket_url().ok(), "kith starting");

    Runtime::new(&config, args.user)?.run().await?;

    Ok(())
}
