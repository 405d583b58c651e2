//! Configuration management command

use clap::Subcommand;
use elicit_core::{error::Result, ElicitConfig, ElicitError};
use std::path::Path;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration (file plus environment overrides)
    Show,

    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Handle configuration management command
pub async fn handle(action: ConfigAction, path: &Path) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = ElicitConfig::load(path)?;
            let rendered = toml::to_string_pretty(&config)
                .map_err(|e| ElicitError::Other(format!("Failed to render config: {}", e)))?;

            println!("# {}", path.display());
            println!("{}", rendered);

            match config.api_key() {
                Ok(_) => println!("✓ API key found in {}", config.llm.api_key_env),
                Err(_) => println!("✗ API key not set ({})", config.llm.api_key_env),
            }
            Ok(())
        }
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                println!(
                    "✗ {} already exists (use --force to overwrite)",
                    path.display()
                );
                return Ok(());
            }

            ElicitConfig::default().save(path)?;
            println!("✓ Wrote default configuration to {}", path.display());
            Ok(())
        }
    }
}
