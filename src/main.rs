//! orderflow CLI entrypoint

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use orderflow::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Thread names show which pool worker ran each stage
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_names(true),
        )
        .init();

    let cli = Cli::parse();
    cli.execute().await
}
