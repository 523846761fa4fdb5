mod chat_cmd;
mod config;
mod config_cmd;
mod generate_cmd;
mod terminal_output;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use parley_config::{load_and_prepare, resolve_config_path};
use parley_logging::init_logger;
use parley_session::Session;

#[derive(Parser)]
#[command(name = "parley")]
#[command(about = "Parley: chat with the study assistant and generate learning articles")]
#[command(version)]
struct Cli {
    /// Config file (defaults to $PARLEY_CONFIG_DIR/config.yaml or ~/.parley/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use canned replies instead of the backend
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the assistant
    Chat {
        /// Send one message and exit instead of starting a prompt
        #[arg(short, long)]
        message: Option<String>,
    },
    /// Generate an article from a learner profile
    Generate {
        /// Profile JSON file (name, age, profession, interests, ...)
        #[arg(short, long)]
        profile: PathBuf,

        /// Ask for a fresh article once the first one arrives
        #[arg(long)]
        regenerate: bool,
    },
    /// Inspect or create the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective config with secrets masked
    Show,
    /// Print the config file location
    Path,
    /// Write a config file with every default filled in
    Init {
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = resolve_config_path(cli.config.as_deref());

    let command = match cli.command {
        Commands::Config { action } => {
            return match action {
                ConfigAction::Show => config_cmd::show(&config_path).await,
                ConfigAction::Path => {
                    config_cmd::print_path(&config_path);
                    Ok(())
                }
                ConfigAction::Init { force } => config_cmd::init(&config_path, force).await,
            };
        }
        other => other,
    };

    let parley_config = load_and_prepare(&config_path).await?;
    init_logger(&config::logger_options(&parley_config))
        .context("failed to initialise logging")?;

    let settings = config::session_settings(&parley_config);
    let transport = config::build_transport(&parley_config, &settings, cli.offline)?;
    let mut session = Session::new(transport, settings);
    if let Some(credential) = config::credential(&parley_config) {
        session = session.with_credential(credential);
    }
    info!(
        session = %session.id(),
        offline = cli.offline,
        base_url = parley_config.base_url().unwrap_or_default(),
        "Session ready"
    );

    match command {
        Commands::Chat { message } => chat_cmd::run(&session, message).await,
        Commands::Generate {
            profile,
            regenerate,
        } => generate_cmd::run(&session, &profile, regenerate).await,
        Commands::Config { .. } => Ok(()),
    }
}
