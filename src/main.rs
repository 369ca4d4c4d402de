use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod app;
mod commands;
mod config;

use app::App;
use commands::{
    AddCommand, ConfigCommand, GenerateCommand, ListCommand, StatusCommand, SyncCommand,
    WatchCommand,
};
use config::Config;

#[derive(Parser)]
#[command(name = "huevault")]
#[command(version)]
#[command(about = "Offline-first color store that syncs when the network is back", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate and store random colors
    Generate(GenerateCommand),

    /// Store a specific color
    Add(AddCommand),

    /// List stored colors
    List(ListCommand),

    /// Show unsynced count and network status
    Status(StatusCommand),

    /// Push unsynced colors now
    Sync(SyncCommand),

    /// Keep running and sync whenever the network comes back
    Watch(WatchCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "huevault=info,huevault_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = Config::load(cli.config)?;

    let Some(command) = cli.command else {
        println!("Use --help to see available commands");
        return Ok(());
    };

    if let Commands::Config(cmd) = &command {
        return cmd.run(&config);
    }

    let app = App::open(config).await?;
    match command {
        Commands::Generate(cmd) => cmd.run(&app).await?,
        Commands::Add(cmd) => cmd.run(&app).await?,
        Commands::List(cmd) => cmd.run(&app).await?,
        Commands::Status(cmd) => cmd.run(&app).await?,
        Commands::Sync(cmd) => cmd.run(&app).await?,
        Commands::Watch(cmd) => cmd.run(&app).await?,
        Commands::Config(_) => {}
    }

    Ok(())
}
