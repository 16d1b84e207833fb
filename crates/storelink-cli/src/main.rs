//! storelink - live store configuration from the command line
//!
//! Usage:
//!   storelink init               Write a default config file
//!   storelink show               Fetch and print the current store config
//!   storelink set --open true    Update store flags (needs STORELINK_TOKEN)
//!   storelink watch              Follow live updates until Ctrl-C

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use storelink_client::{ApiClient, LiveConfigController, MemoryTokenStore, TokenStore};
use storelink_core::config::DEFAULT_CONFIG_PATH;
use storelink_core::{RepositoryState, StoreConfigPatch, StoreLinkConfig};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "storelink")]
#[command(author, version, about = "Live store configuration sync")]
struct Cli {
    /// Config file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Override the API base URL
    #[arg(long, global = true, value_name = "URL")]
    base_url: Option<String>,

    /// Bearer token; takes precedence over STORELINK_TOKEN
    #[arg(long, global = true, value_name = "TOKEN")]
    token: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Fetch and print the current store configuration
    Show,

    /// Update store flags and messages
    Set(SetArgs),

    /// Follow live updates until Ctrl-C
    Watch,
}

#[derive(clap::Args, Default)]
struct SetArgs {
    /// Shop open for orders
    #[arg(long, value_name = "BOOL")]
    open: Option<bool>,

    /// Kitchen currently cooking
    #[arg(long, value_name = "BOOL")]
    cooking: Option<bool>,

    /// Holiday mode
    #[arg(long, value_name = "BOOL")]
    holiday: Option<bool>,

    #[arg(long)]
    holiday_message: Option<String>,

    /// Show the notice banner
    #[arg(long, value_name = "BOOL")]
    notice: Option<bool>,

    #[arg(long)]
    notice_message: Option<String>,

    #[arg(long)]
    description: Option<String>,
}

impl SetArgs {
    fn into_patch(self) -> StoreConfigPatch {
        StoreConfigPatch {
            is_shop_open: self.open,
            is_cooking: self.cooking,
            is_holiday: self.holiday,
            holiday_message: self.holiday_message,
            is_notice_active: self.notice,
            notice_message: self.notice_message,
            description: self.description,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging; RUST_LOG wins over --verbose
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Init { force } => cmd_init(cli.config, force),
        Commands::Show => {
            cmd_show(load_config(&cli.config, cli.base_url)?, tokens(cli.token)).await
        }
        Commands::Set(args) => {
            cmd_set(load_config(&cli.config, cli.base_url)?, tokens(cli.token), args).await
        }
        Commands::Watch => {
            cmd_watch(load_config(&cli.config, cli.base_url)?, tokens(cli.token)).await
        }
    }
}

fn load_config(path: &Path, base_url: Option<String>) -> Result<StoreLinkConfig> {
    let mut config = StoreLinkConfig::load_or_default(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;

    if let Some(base_url) = base_url {
        config.api.base_url = base_url;
        config.validate()?;
    }
    Ok(config)
}

fn tokens(token: Option<String>) -> Arc<MemoryTokenStore> {
    let store = MemoryTokenStore::from_env();
    if let Some(token) = token {
        store.store(token);
    }
    Arc::new(store)
}

fn cmd_init(path: PathBuf, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    StoreLinkConfig::write_default(&path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Wrote default config to {}", path.display());
    Ok(())
}

async fn cmd_show(config: StoreLinkConfig, tokens: Arc<MemoryTokenStore>) -> Result<()> {
    let client = ApiClient::new(config.api, tokens)?;
    let snapshot = client
        .get_config()
        .await
        .context("Failed to load store status")?;

    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

async fn cmd_set(
    config: StoreLinkConfig,
    tokens: Arc<MemoryTokenStore>,
    args: SetArgs,
) -> Result<()> {
    let patch = args.into_patch();
    if patch.is_empty() {
        bail!("Nothing to update; pass at least one flag (see `storelink set --help`)");
    }

    let client = ApiClient::new(config.api, tokens)?;
    let updated = client
        .update_config(&patch)
        .await
        .context("Failed to update store status")?;

    info!("Store is now {}", updated.status_line());
    println!("{}", serde_json::to_string_pretty(&updated)?);
    Ok(())
}

async fn cmd_watch(config: StoreLinkConfig, tokens: Arc<MemoryTokenStore>) -> Result<()> {
    let mut controller = LiveConfigController::from_config(&config, tokens)?;
    let mut changes = controller.subscribe();

    controller.start();
    info!("Watching {} (Ctrl-C to stop)", config.api.stream_url());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = changes.borrow_and_update().clone();
                info!("{}", describe(&state));
            }
        }
    }

    controller.stop();
    controller.shutdown().await;
    Ok(())
}

/// One log line per repository change
fn describe(state: &RepositoryState) -> String {
    let dot = if state.connected { "●" } else { "○" };
    let mut line = match &state.config {
        Some(config) => format!("{} {}", dot, config.status_line()),
        None => format!("{} (no data yet)", dot),
    };

    if let Some(error) = &state.error {
        line.push_str(&format!(" [{}]", error));
    }
    if let Some(at) = state.last_updated {
        line.push_str(&format!(" (updated {} UTC)", at.format("%H:%M:%S")));
    }
    line
}
