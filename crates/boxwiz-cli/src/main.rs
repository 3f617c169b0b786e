//! boxwiz CLI entry point.

use anyhow::{Context, Result};
use boxwiz_core::WizardSettings;
use clap::Parser;
use colored::Colorize;

mod cli;
mod commands;
mod ui;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = match load_settings(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    };

    // Held until exit so the file writer is flushed.
    let _guard = match boxwiz_core::log::init(&settings.log) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    };

    match cli.execute(settings).await {
        Ok(_) => Ok(()),
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}

fn load_settings(cli: &Cli) -> Result<WizardSettings> {
    let mut settings = WizardSettings::load(cli.config.as_deref()).context("Failed to load settings")?;
    cli.apply_overrides(&mut settings);
    Ok(settings)
}
