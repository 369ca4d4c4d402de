use clap::Args;
use std::error::Error;
use tokio::sync::watch;

use huevault_core::{ColorRecord, Connectivity, HexCode, TriggerCoordinator, Vault};

use super::{print_report, OutputFormat};
use crate::app::App;

/// Generate a random color
#[derive(Debug, Args)]
pub struct GenerateCommand {
    /// How many colors to generate
    #[arg(long, short = 'n', default_value_t = 1)]
    count: usize,
}

/// Store a specific color
#[derive(Debug, Args)]
pub struct AddCommand {
    /// Hex color, e.g. "#FF8800" or "ff8800"
    hex: String,
}

/// List stored colors, newest first
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Only show colors not yet synced
    #[arg(long)]
    unsynced: bool,

    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    format: OutputFormat,
}

/// Show how many colors are waiting to sync and whether we are online
#[derive(Debug, Args)]
pub struct StatusCommand;

impl GenerateCommand {
    pub async fn run(&self, app: &App) -> Result<(), Box<dyn Error>> {
        let colors: Vec<HexCode> = (0..self.count.max(1)).map(|_| HexCode::random()).collect();
        store_and_sync(app, colors).await
    }
}

impl AddCommand {
    pub async fn run(&self, app: &App) -> Result<(), Box<dyn Error>> {
        let hex: HexCode = self.hex.parse()?;
        store_and_sync(app, vec![hex]).await
    }
}

impl ListCommand {
    pub async fn run(&self, app: &App) -> Result<(), Box<dyn Error>> {
        let colors = if self.unsynced {
            app.repo.list_unsynced().await?
        } else {
            app.repo.list_all().await?
        };

        if colors.is_empty() {
            println!("No colors found");
            return Ok(());
        }

        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&colors)?);
            }
            OutputFormat::Text => {
                println!("{:<36}  {:<7}  {:<19}  STATUS", "ID", "COLOR", "CREATED");
                println!("{}", "-".repeat(80));
                for color in &colors {
                    print_row(color);
                }
                println!("\nTotal: {} color(s)", colors.len());
            }
        }
        Ok(())
    }
}

impl StatusCommand {
    pub async fn run(&self, app: &App) -> Result<(), Box<dyn Error>> {
        let total = app.repo.list_all().await?.len();
        let unsynced = app.repo.count_unsynced().await?;

        println!("Colors:   {}", total);
        println!("Unsynced: {}", unsynced);

        if !app.config.sync.is_configured() {
            println!("Sync:     not configured");
            return Ok(());
        }

        match app.check_connectivity().await {
            Some(Connectivity::Online) => println!("Network:  ✓ online"),
            Some(Connectivity::Offline) => println!("Network:  ✗ offline"),
            None => println!("Network:  unknown"),
        }
        Ok(())
    }
}

fn print_row(color: &ColorRecord) {
    let status = if color.synced { "synced" } else { "unsynced" };
    println!(
        "{:<36}  {:<7}  {:<19}  {}",
        color.id,
        color.hex_code,
        color.created_at.format("%Y-%m-%d %H:%M:%S"),
        status
    );
}

/// Store the colors and, when a remote is configured and reachable, push
/// them before returning.
async fn store_and_sync(app: &App, colors: Vec<HexCode>) -> Result<(), Box<dyn Error>> {
    let Some(reconciler) = app.reconciler().await? else {
        for hex in colors {
            let record = app.repo.create(hex).await?;
            println!("Generated color: {}", record.hex_code);
        }
        println!("Sync not configured; colors kept locally.");
        return Ok(());
    };

    let (_connectivity_tx, connectivity) = watch::channel(app.check_connectivity().await);
    let coordinator = TriggerCoordinator::spawn(reconciler, connectivity);
    let mut runs = coordinator.subscribe();
    let vault = Vault::new(app.repo.clone(), coordinator);

    let mut scheduled = false;
    for hex in colors {
        let created = vault.add(hex).await?;
        println!("Generated color: {}", created.record.hex_code);
        scheduled |= created.sync.is_some();
    }

    if !scheduled {
        println!("Offline - color(s) marked as unsynced");
        return Ok(());
    }

    vault.coordinator().wait_idle().await;
    let mut printed = false;
    while let Ok(run) = runs.try_recv() {
        print_report(&run.report);
        printed = true;
    }
    if !printed {
        println!("Sync finished.");
    }
    Ok(())
}
