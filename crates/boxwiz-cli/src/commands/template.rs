//! Show the template's sections and rule catalog.

use anyhow::{Context, Result};
use colored::Colorize;

use super::App;

pub async fn execute(app: &App, sections: bool) -> Result<()> {
    let template = app.load_template()?;

    println!(
        "{} {} ({})",
        "Template".green().bold(),
        app.settings.template.display().to_string().cyan(),
        template.platform.as_str()
    );
    println!("  Sections: {}", template.sections.order().collect::<Vec<_>>().join(", "));
    if !template.default_final.is_empty() {
        println!("  Default final: {}", template.default_final.cyan());
    }
    if !template.overlays.is_empty() {
        println!("  Platform overlays: {}", template.overlays.len());
    }

    println!("\n{} ({}):", "Rules".bold(), template.rules.len());
    for rule in &template.rules {
        let marker = if rule.is_default { "*".green() } else { " ".normal() };
        let outbound = if rule.has_outbound {
            format!("-> {}", rule.default_outbound)
        } else {
            rule.default_outbound.clone()
        };
        println!("  {} {:<32} {}", marker, rule.label, outbound.dimmed());
        if !rule.description.is_empty() {
            println!("      {}", rule.description.dimmed());
        }
    }

    if sections {
        let effective = template
            .sections_for_build(app.settings.enable_tun)
            .context("Failed to apply platform overlays")?;
        for (name, raw) in effective.iter() {
            println!("\n{}", format!("\"{}\":", name).cyan());
            println!("{}", raw);
        }
    }

    Ok(())
}
