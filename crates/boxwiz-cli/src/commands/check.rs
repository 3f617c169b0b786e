//! Check subscription URLs and links without applying them.

use anyhow::{bail, Context, Result};
use boxwiz_parser::{check_input_with_progress, FetchConfig, HttpFetcher, SchemeClassifier};
use colored::Colorize;
use std::path::Path;
use std::time::Duration;

use super::{read_input, App};
use crate::ui::progress;

pub async fn execute(app: &App, input: &Path) -> Result<()> {
    let input = read_input(input)?;

    let fetcher = HttpFetcher::new(FetchConfig {
        user_agent: app.settings.user_agent.clone(),
        timeout: Duration::from_secs(app.settings.fetch_timeout_secs),
        ..FetchConfig::default()
    })
    .context("Failed to create subscription fetcher")?;

    let lines = input.lines().filter(|l| !l.trim().is_empty()).count() as u64;
    let pb = progress::bar(lines, "checking");
    let report = check_input_with_progress(&input, &SchemeClassifier, &fetcher, |done, total| {
        pb.set_length(total as u64);
        pb.set_position(done as u64);
    })
    .await;
    pb.finish_and_clear();
    let report = report.context("Failed to check input")?;

    if report.is_ok() {
        println!("{} {}", "✓".green().bold(), report.summary());
        println!("{}", report.preview_text());
    } else {
        println!("{} {}", "✗".red().bold(), report.summary());
    }

    for error in &report.errors {
        println!("  {} {}", "!".yellow(), error);
    }

    if !report.is_ok() {
        bail!("No usable proxy links in input");
    }
    Ok(())
}
