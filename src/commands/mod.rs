mod color;
mod config_cmd;
mod sync_cmd;

use clap::ValueEnum;
use huevault_core::SyncReport;

pub use color::{AddCommand, GenerateCommand, ListCommand, StatusCommand};
pub use config_cmd::ConfigCommand;
pub use sync_cmd::{SyncCommand, WatchCommand};

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

pub(crate) fn print_report(report: &SyncReport) {
    if let Some(error) = &report.store_error {
        println!("✗ could not read local colors: {}", error);
        return;
    }

    if report.attempted == 0 {
        println!("Nothing to sync.");
        return;
    }

    println!(
        "Synced {} of {} color(s) in {:.2}s",
        report.succeeded,
        report.attempted,
        report.elapsed.as_secs_f64()
    );
    if report.skipped > 0 {
        println!("  {} already synced elsewhere", report.skipped);
    }
    for failure in &report.failures {
        println!("  ✗ {} {}: {}", failure.hex_code, failure.id, failure.reason);
    }
}
