//! Rebuild proxy sources from subscription URLs and links.

use anyhow::{Context, Result};
use boxwiz_document::WizardSession;
use boxwiz_parser::SchemeClassifier;
use boxwiz_state::StateManager;
use colored::Colorize;
use std::path::Path;
use std::sync::Arc;

use super::{read_input, state_id, App};

pub async fn execute(app: &App, input: &Path, state: Option<&str>, save: bool) -> Result<()> {
    let id = state_id(state)?;
    let template = Arc::new(app.load_template()?);
    let model = app.initial_model(&template, id.as_ref())?;
    let input = read_input(input)?;

    let session = WizardSession::with_model(Arc::clone(&template), model);
    let Some(text) = session
        .reconcile(&input, &SchemeClassifier)
        .await
        .context("Failed to reconcile sources")?
    else {
        // Only one reconcile runs per invocation, so it is never replaced.
        return Ok(());
    };

    let model = session.snapshot();
    let sources = model.parser_config.as_ref().map_or(0, |c| c.proxies.len());
    println!("{} {} source(s)", "Reconciled".green().bold(), sources);
    println!("{}", text);

    if save {
        let path = StateManager::save_model(&app.store(), &model, &template, id.as_ref(), "")
            .context("Failed to save wizard state")?;
        println!("{} State written to: {}", "✓".green().bold(), path.display().to_string().cyan());
    }

    Ok(())
}
