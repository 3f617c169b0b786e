//! Recover the parser config from an existing sing-box config.

use anyhow::{Context, Result};
use boxwiz_document::WizardModel;
use boxwiz_parser::{load_existing, ConfigOrigin};
use boxwiz_state::StateManager;
use colored::Colorize;
use std::path::Path;

use super::App;

pub async fn execute(app: &App, from: Option<&Path>, save_state: bool) -> Result<()> {
    let template = app.load_template()?;
    let path = from.unwrap_or(&app.settings.config_path);

    println!("{} parser config from: {}", "Importing".green().bold(), path.display().to_string().cyan());

    let existing = load_existing(path, &template.parser_config)
        .with_context(|| format!("Failed to import {}", path.display()))?;

    match existing.origin {
        ConfigOrigin::Document => println!("  {} Found @ParserConfig block", "→".yellow()),
        ConfigOrigin::Template => println!("  {} No config file, using the template's parser config", "!".yellow()),
        ConfigOrigin::Empty => {
            println!("  {} Nothing to import", "!".yellow());
            return Ok(());
        }
    }

    if !existing.source_lines.is_empty() {
        println!("\n{}", "Sources:".bold());
        for line in existing.source_lines.lines() {
            println!("  {}", line);
        }
    }
    println!("\n{}", existing.parser_config);

    if save_state {
        let mut model = WizardModel::from_template(&template);
        model.apply_existing(&existing);
        model.refresh_outbound_choices(&template.default_final);
        let path = StateManager::save_model(&app.store(), &model, &template, None, "imported")
            .context("Failed to save wizard state")?;
        println!("\n{} State written to: {}", "✓".green().bold(), path.display().to_string().cyan());
    }

    Ok(())
}
