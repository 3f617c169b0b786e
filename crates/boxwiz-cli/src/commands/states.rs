//! Manage saved wizard states.

use anyhow::{bail, Context, Result};
use boxwiz_core::time::fuzzy_time;
use boxwiz_state::StateMetadata;
use colored::Colorize;
use dialoguer::Confirm;

use super::{state_id, App, CURRENT_STATE};

pub async fn list(app: &App) -> Result<()> {
    let store = app.store();
    println!("{} states in: {}", "Listing".green().bold(), store.dir().display().to_string().cyan());

    let states = store.list().context("Failed to list states")?;
    if states.is_empty() {
        println!("  {} No saved states", "!".yellow());
        return Ok(());
    }

    for meta in &states {
        println!("{}", describe(meta));
    }
    Ok(())
}

fn describe(meta: &StateMetadata) -> String {
    let name = if meta.is_current {
        CURRENT_STATE.bold().to_string()
    } else {
        meta.id.cyan().to_string()
    };
    let mut line = format!("  {:<24} updated {}", name, fuzzy_time(meta.updated_at));
    if !meta.comment.is_empty() {
        line.push_str(&format!("  {}", meta.comment.dimmed()));
    }
    line
}

pub async fn show(app: &App, id: &str) -> Result<()> {
    let id = state_id(Some(id))?;
    let store = app.store();
    let state = match &id {
        Some(id) => store.load(id),
        None => store.load_current(),
    }
    .context("Failed to load state")?;

    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}

pub async fn save(app: &App, id: &str, comment: &str) -> Result<()> {
    let Some(id) = state_id(Some(id))? else {
        bail!("'{}' is reserved for the working state", CURRENT_STATE);
    };
    let store = app.store();

    let mut state = store.load_current().context("No current state to save")?;
    if !comment.is_empty() {
        state.comment = comment.to_string();
    }
    state.created_at.clear();
    let path = store.save(&mut state, &id).context("Failed to save state")?;

    println!("{} State saved to: {}", "✓".green().bold(), path.display().to_string().cyan());
    Ok(())
}

pub async fn restore(app: &App, id: &str) -> Result<()> {
    let Some(id) = state_id(Some(id))? else {
        bail!("'{}' is already the working state", CURRENT_STATE);
    };
    let store = app.store();

    let mut state = store.load(&id).context("Failed to load state")?;
    state.id = None;
    store.save_current(&mut state).context("Failed to write the working state")?;

    println!("{} Restored state: {}", "✓".green().bold(), id.to_string().cyan());
    Ok(())
}

pub async fn delete(app: &App, id: &str, yes: bool) -> Result<()> {
    let Some(id) = state_id(Some(id))? else {
        bail!("The working state cannot be deleted");
    };

    if !yes {
        let confirmed = Confirm::new()
            .with_prompt(format!("Are you sure you want to delete state '{}'?", id))
            .default(false)
            .interact()?;

        if !confirmed {
            println!("{}", "Cancelled".yellow());
            return Ok(());
        }
    }

    app.store().delete(&id).context("Failed to delete state")?;
    println!("{} State deleted: {}", "✓".green().bold(), id.to_string().cyan());
    Ok(())
}
