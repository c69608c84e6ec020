//! # escape-room
//!
//! Terminal front end for the escape room game.
//!
//! ## Commands
//!
//! - `play`: Play the current session (optionally starting a new one)
//! - `config`: Show, create or locate the client configuration
//!
//! ## Example
//!
//! ```bash
//! # Start a new session and play it
//! escape-room play --theme haunted_library --difficulty 3
//!
//! # Start a custom session generated from a photo
//! escape-room play --image ./office.jpg
//!
//! # Resume the session the server already holds
//! escape-room play
//!
//! # Write a default config file to edit
//! escape-room config init
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod terminal;

use commands::{config as config_cmd, play};

/// Terminal front end for the escape room game.
#[derive(Parser, Debug)]
#[command(name = "escape-room")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the client configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Game server base URL (overrides the config file)
    #[arg(long, global = true)]
    server: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play the current session
    Play {
        /// Start a new session with this theme first
        #[arg(long, short)]
        theme: Option<String>,

        /// Difficulty of the new session (1-5)
        #[arg(long, short, default_value = "3", value_parser = clap::value_parser!(u8).range(1..=5))]
        difficulty: u8,

        /// Start a custom session generated from this image first
        #[arg(long, short, conflicts_with = "theme")]
        image: Option<PathBuf>,
    },

    /// Manage the client configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the effective configuration
    Show,

    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the configuration file path
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so the game text on stdout stays readable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,escape_room_client=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => config::default_config_path()?,
    };

    match cli.command {
        Commands::Play {
            theme,
            difficulty,
            image,
        } => {
            let config = config::load(&config_path, cli.server.as_deref())
                .context("Failed to load configuration")?;
            let new_game = match (theme, image) {
                (Some(theme), _) => Some(play::NewGame::Theme { theme, difficulty }),
                (None, Some(path)) => Some(play::NewGame::Image(path)),
                (None, None) => None,
            };
            play::run(&config, new_game).await?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let config = config::load(&config_path, cli.server.as_deref())
                    .context("Failed to load configuration")?;
                config_cmd::show(&config_path, &config)?;
            }
            ConfigAction::Init { force } => {
                config_cmd::init(&config_path, force).await?;
            }
            ConfigAction::Path => {
                println!("{}", config_path.display());
            }
        },
    }

    Ok(())
}
