use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use panelcmp::transport;
use panelcmp::Config;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    env!("PANELCMP_VERSION_SUFFIX")
);

#[derive(Parser)]
#[command(name = "panelcmp")]
#[command(author, version = VERSION, about = "Compare LLM replies side by side", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// OpenRouter API key (never written to disk)
    #[arg(long, global = true, env = "OPENROUTER_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Configuration file (default: platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List panels in display order (pinned first)
    Panels,

    /// Add a panel
    Add {
        /// Model to assign right away
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Remove a panel (by position or id)
    Remove { panel: String },

    /// Assign a model to a panel; omit the model to clear it
    Model {
        panel: String,
        model: Option<String>,
    },

    /// Toggle a panel's pinned flag
    Pin { panel: String },

    /// Toggle whether a panel takes part in sends
    Activate { panel: String },

    /// Put panels in a new order (every panel, by position or id)
    Reorder {
        #[arg(required = true)]
        panels: Vec<String>,
    },

    /// Set the system prompt; an empty string clears it
    Prompt { text: String },

    /// Clear every panel's conversation
    Clear,

    /// List models available upstream
    Models {
        /// Output format (table, json)
        #[arg(short, long, default_value = "table")]
        format: String,

        /// Only show models whose id or name contains this text
        #[arg(long)]
        filter: Option<String>,
    },

    /// Send a query to every active panel with a model
    Send { query: String },

    /// Run the forwarding proxy for browser clients
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,
    },

    /// Show the effective configuration
    Config {
        /// Write the defaults to the configuration file
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "panelcmp=debug"
    } else {
        "panelcmp=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match cli.config {
        Some(ref path) if path.exists() => Config::load_from(path)?,
        // `config --init` creates the file
        Some(_) if matches!(cli.command, Commands::Config { init: true }) => Config::default(),
        Some(ref path) => bail!("Config file {} not found", path.display()),
        None => Config::load()?,
    };

    match cli.command {
        Commands::Serve { port, host } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            transport::http::run_proxy_server(&host, port, &config).await?;
        }
        Commands::Config { init } => {
            transport::cli::run_config(&config, cli.config.as_deref(), init)?;
        }
        command => {
            let store = transport::cli::open_store(&config, cli.api_key)?;
            match command {
                Commands::Panels => transport::cli::run_panels(&store)?,
                Commands::Add { model } => transport::cli::run_add(&store, model.as_deref())?,
                Commands::Remove { panel } => transport::cli::run_remove(&store, &panel)?,
                Commands::Model { panel, model } => {
                    transport::cli::run_set_model(&store, &panel, model.as_deref())?
                }
                Commands::Pin { panel } => transport::cli::run_toggle_pin(&store, &panel)?,
                Commands::Activate { panel } => {
                    transport::cli::run_toggle_active(&store, &panel)?
                }
                Commands::Reorder { panels } => transport::cli::run_reorder(&store, &panels)?,
                Commands::Prompt { text } => transport::cli::run_prompt(&store, &text)?,
                Commands::Clear => transport::cli::run_clear(&store)?,
                Commands::Models { format, filter } => {
                    transport::cli::run_models(&store, &format, filter.as_deref()).await?
                }
                Commands::Send { query } => transport::cli::run_send(&store, &query).await?,
                Commands::Serve { .. } | Commands::Config { .. } => {}
            }
        }
    }

    Ok(())
}
