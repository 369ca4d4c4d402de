use clap::{Args, Subcommand};

use super::OutputFormat;
use crate::config::Config;

#[derive(Debug, Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

impl ConfigCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => match format {
                OutputFormat::Json => {
                    let mut shown = config.clone();
                    shown.sync.api_key = shown.sync.api_key.as_deref().map(mask);
                    println!("{}", serde_json::to_string_pretty(&shown)?);
                }
                OutputFormat::Text => show_text(config),
            },
        }
        Ok(())
    }
}

fn show_text(config: &Config) {
    println!("Configuration");
    println!("=============\n");

    if let Some(path) = &config.config_file {
        println!("Config file: {}", path.display());
    } else {
        println!(
            "Config file: {} (not found)",
            Config::default_config_path().display()
        );
    }
    println!();

    println!("database_path: {}", config.database_path.value.display());
    println!("  source: {}", config.database_path.source);
    println!();

    println!(
        "device_id: {}",
        config
            .device_id
            .value
            .as_deref()
            .unwrap_or("(generated per install)")
    );
    println!("  source: {}", config.device_id.source);
    println!();

    let sync = &config.sync;
    println!("sync:");
    match &sync.server_url {
        Some(url) => println!("  server_url: {}", url),
        None => println!("  server_url: (not configured)"),
    }
    if let Some(key) = &sync.api_key {
        println!("  api_key: {}", mask(key));
    }
    println!("  collection: {}", sync.collection);
    println!("  push_timeout_secs: {}", sync.push_timeout_secs);
    println!("  max_concurrent_pushes: {}", sync.max_concurrent_pushes);
    println!();

    let connectivity = &config.connectivity;
    println!("connectivity:");
    println!(
        "  probe_url: {}",
        config.probe_url().unwrap_or("(none, always offline)")
    );
    println!("  poll_interval_secs: {}", connectivity.poll_interval_secs);
    println!("  probe_timeout_secs: {}", connectivity.probe_timeout_secs);
}

const MASK_PREFIX: usize = 4;
/// Shorter secrets are hidden entirely.
const MASK_MIN_LEN: usize = 12;

/// Keep the first few characters of a long secret.
fn mask(secret: &str) -> String {
    if secret.chars().count() < MASK_MIN_LEN {
        return "****".to_string();
    }
    let shown: String = secret.chars().take(MASK_PREFIX).collect();
    format!("{}...", shown)
}
