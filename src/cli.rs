//! CLI surface for the okulo binary

use anyhow::Context;
use clap::{Parser, Subcommand};
use okulo_core::OkuloConfig;
use std::path::PathBuf;
use tracing::info;

/// Okulo voice companion
#[derive(Parser, Debug)]
#[command(name = "okulo")]
#[command(about = "Voice companion with motorized eyes")]
#[command(version)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "okulo.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the device loop (default)
    Run,
    /// Print the effective configuration as TOML
    Config,
}

/// Run the CLI command
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli.config)?;

    match cli.command {
        Some(Commands::Config) => {
            let rendered = toml::to_string_pretty(&config)?;
            println!("{rendered}");
            Ok(())
        }
        Some(Commands::Run) | None => crate::app::run(config).await,
    }
}

fn load_config(path: &PathBuf) -> anyhow::Result<OkuloConfig> {
    if path.exists() {
        OkuloConfig::load(path).with_context(|| format!("loading {}", path.display()))
    } else {
        info!(path = %path.display(), "no configuration file, using defaults");
        let config = OkuloConfig::default();
        config.validate()?;
        Ok(config)
    }
}
