//! Agenticlaw Gateway — process entry point: loads `Config` from the
//! environment once and starts the streaming HTTP gateway.

use agenticlaw_core::Config;
use agenticlaw_gateway::start_gateway;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "agenticlaw", about = "Agenticlaw agent gateway")]
struct Cli {
    /// Print the version and exit
    #[arg(long)]
    version: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!("agenticlaw v{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agenticlaw=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    start_gateway(config).await
}
