mod cli;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_cli_tracing();

    let (config, config_path) = cli::load_config()?;
    tracing::debug!(config = %config_path, "config loaded");
    let config = cli::resolve(config, &cli);

    match cli.command {
        Command::Version { json } => cli::version(&config, json).await,
        Command::Cards { json } => cli::cards(&config, json).await,
        Command::Watch { .. } => cli::watch(&config).await,
    }
}

/// Compact stderr logging, `warn` unless `RUST_LOG` says otherwise.
fn init_cli_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
