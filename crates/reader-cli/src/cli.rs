//! Argument parsing, config loading and the subcommand bodies.

use clap::{Parser, Subcommand};
use scl_client::{CardRecord, ConnectionState, ReaderClient, ReaderClientBuilder};
use scl_domain::config::ReaderConfig;

/// scl: query and watch a local smart-card reader service.
#[derive(Debug, Parser)]
#[command(name = "scl", version, about)]
pub struct Cli {
    /// Reader service base URL (overrides the config file).
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the reader service version.
    Version {
        /// Print the full version record as JSON.
        #[arg(long)]
        json: bool,
    },
    /// List the cards currently inserted.
    Cards {
        /// Print the card list as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Stream card-list pushes until Ctrl-C.
    Watch {
        /// Push interval in seconds (defaults to the config file's).
        #[arg(long)]
        interval: Option<u32>,
        /// Give up after this many consecutive reconnect attempts.
        #[arg(long)]
        max_retries: Option<u32>,
    },
}

/// Load the client config from `$SCL_CONFIG` (default `scl.toml`).
///
/// A missing file means defaults; an unreadable or invalid one is an error.
pub fn load_config() -> anyhow::Result<(ReaderConfig, String)> {
    let config_path = std::env::var("SCL_CONFIG").unwrap_or_else(|_| "scl.toml".into());

    let config = if std::path::Path::new(&config_path).exists() {
        let raw = std::fs::read_to_string(&config_path)
            .map_err(|e| anyhow::anyhow!("reading {config_path}: {e}"))?;
        parse_config(&raw).map_err(|e| anyhow::anyhow!("parsing {config_path}: {e}"))?
    } else {
        ReaderConfig::default()
    };

    Ok((config, config_path))
}

fn parse_config(raw: &str) -> Result<ReaderConfig, toml::de::Error> {
    toml::from_str(raw)
}

/// Apply command-line overrides on top of the loaded config.
pub fn resolve(mut config: ReaderConfig, cli: &Cli) -> ReaderConfig {
    if let Some(url) = &cli.base_url {
        config.base_url = url.clone();
    }
    if let Command::Watch {
        interval,
        max_retries,
    } = &cli.command
    {
        if interval.is_some() {
            config.interval_secs = *interval;
            config.server_default_interval = false;
        }
        if max_retries.is_some() {
            config.max_retries = *max_retries;
        }
    }
    config
}

// ── Subcommands ──────────────────────────────────────────────────────

pub async fn version(config: &ReaderConfig, json: bool) -> anyhow::Result<()> {
    let client = ReaderClientBuilder::from_config(config).build()?;
    let v = client.version().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&v)?);
    } else {
        println!("{}", v.text);
    }
    Ok(())
}

pub async fn cards(config: &ReaderConfig, json: bool) -> anyhow::Result<()> {
    let client = ReaderClientBuilder::from_config(config).build()?;
    let cards = client.card_list().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&cards)?);
    } else {
        print_cards(&cards);
    }
    Ok(())
}

pub async fn watch(config: &ReaderConfig) -> anyhow::Result<()> {
    let mut builder = ReaderClientBuilder::from_config(config).on_update(|cards| {
        print_cards(&cards);
        Ok(())
    });
    if let Some(max) = config.max_retries {
        builder = builder.retry_policy(move |attempt: u32| attempt <= max);
    }
    let client = builder.build()?;

    client.open(config.open_interval().map(f64::from)).await?;
    tracing::info!(base_url = %config.base_url, "watching for card changes");

    wait_for_stop(&client).await?;
    client.close();
    Ok(())
}

/// Block until Ctrl-C or until the channel gives up on its own.
async fn wait_for_stop(client: &ReaderClient) -> anyhow::Result<()> {
    let mut state = client.state_receiver();
    tokio::select! {
        r = tokio::signal::ctrl_c() => r?,
        _ = state.wait_for(|s| *s == ConnectionState::Closed) => {
            tracing::warn!("live-update channel closed, giving up");
        }
    }
    Ok(())
}

fn print_cards(cards: &[CardRecord]) {
    if cards.is_empty() {
        println!("(no cards)");
        return;
    }
    for line in cards.iter().map(card_line) {
        println!("{line}");
    }
}

fn card_line(card: &CardRecord) -> String {
    format!(
        "{}\t{}\t{}\t{}\tborn {}\tissued {}",
        card.reader_name,
        card.full_name,
        card.sex,
        card.id_no,
        card.birthday.format("%Y-%m-%d"),
        card.issue_date.format("%Y-%m-%d"),
    )
}
