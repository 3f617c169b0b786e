//! Build the sing-box config.

use anyhow::{Context, Result};
use boxwiz_core::time::pretty_duration;
use boxwiz_core::util::{run_async, write_atomic};
use boxwiz_document::{WizardModel, WizardSession};
use boxwiz_parser::{PregeneratedOutbounds, SchemeClassifier};
use boxwiz_state::StateManager;
use boxwiz_types::{LinkClassifier, WizardError};
use colored::Colorize;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{read_input, state_id, App};
use crate::cli::BuildArgs;
use crate::ui::progress;

pub async fn execute(app: &App, args: &BuildArgs) -> Result<()> {
    let id = state_id(args.state.as_deref())?;
    let template = Arc::new(app.load_template()?);
    let mut model = app.initial_model(&template, id.as_ref())?;
    apply_choices(&mut model, args, &template.default_final)?;

    let generator = match &args.outbounds {
        Some(path) => PregeneratedOutbounds::load(path)
            .with_context(|| format!("Failed to load outbounds from {}", path.display()))?,
        None => PregeneratedOutbounds::default(),
    };

    let session = Arc::new(
        WizardSession::with_model(Arc::clone(&template), model)
            .with_debounce(Duration::from_millis(app.settings.debounce_ms))
            .with_preview_limit(app.settings.preview_node_limit),
    );

    match &args.watch {
        Some(sources) => watch(app, &session, &generator, args, sources).await,
        None => run_build(app, &session, &generator, args).await,
    }
}

/// Apply command-line rule, section and final-outbound choices.
pub fn apply_choices(model: &mut WizardModel, args: &BuildArgs, default_final: &str) -> Result<()> {
    if args.no_tun {
        model.enable_tun = false;
    }
    for label in &args.enable {
        model.set_rule_enabled(label, true).context("Cannot enable rule")?;
    }
    for label in &args.disable {
        model.set_rule_enabled(label, false).context("Cannot disable rule")?;
    }
    for section in &args.skip_section {
        model.set_section_selected(section, false);
    }
    if let Some(tag) = &args.r#final {
        model.selected_final = tag.clone();
    }

    model.refresh_outbound_choices(default_final);
    if let Some(tag) = &args.r#final {
        if &model.selected_final != tag {
            warn!(requested = %tag, using = %model.selected_final, "final outbound not available");
        }
    }
    Ok(())
}

async fn run_build(
    app: &App,
    session: &WizardSession,
    generator: &PregeneratedOutbounds,
    args: &BuildArgs,
) -> Result<()> {
    let pb = progress::spinner("Building config");
    let start = Instant::now();
    let result = if args.preview {
        session.preview(generator).await
    } else {
        session.save(generator).await
    };
    pb.finish_and_clear();

    let Some(document) = result.context("Failed to build config")? else {
        debug!("build superseded");
        return Ok(());
    };

    if args.preview {
        println!("{}", document);
        return Ok(());
    }

    if let Some(bin) = &args.check_with {
        check_with(bin, &document).await?;
        println!("  {} {} check passed", "→".yellow(), bin);
    }

    let output = args.output.as_deref().unwrap_or(&app.settings.config_path);
    write_atomic(output, &document).with_context(|| format!("Failed to write {}", output.display()))?;
    println!(
        "{} Config written to: {} ({})",
        "✓".green().bold(),
        output.display().to_string().cyan(),
        pretty_duration(start.elapsed())
    );

    if let Err(e) = StateManager::save_model(&app.store(), &session.snapshot(), session.template(), None, "") {
        warn!(error = %e, "failed to save the current wizard state");
    }
    Ok(())
}

/// Run `<bin> check -c <file>` on the document.
pub async fn check_with(bin: &str, document: &str) -> Result<()> {
    let file = tempfile::Builder::new()
        .prefix("boxwiz-")
        .suffix(".json")
        .tempfile()
        .context("Failed to create temporary config")?;
    std::fs::write(file.path(), document).context("Failed to write temporary config")?;

    let path = file.path().to_string_lossy().to_string();
    let output = run_async(bin, &["check", "-c", &path])
        .await
        .with_context(|| format!("Failed to run {}", bin))?;

    if !output.success() {
        let detail = if output.stderr.trim().is_empty() {
            output.stdout.trim()
        } else {
            output.stderr.trim()
        };
        return Err(WizardError::Validation(format!(
            "{} check failed (exit {}): {}",
            bin, output.code, detail
        ))
        .into());
    }
    Ok(())
}

async fn watch(
    app: &App,
    session: &Arc<WizardSession>,
    generator: &PregeneratedOutbounds,
    args: &BuildArgs,
    sources: &Path,
) -> Result<()> {
    let (changes_tx, mut changes) = mpsc::unbounded_channel();
    let _watcher = watch_sources(sources, changes_tx)?;
    println!(
        "{} {} (Ctrl-C to stop)",
        "Watching".green().bold(),
        sources.display().to_string().cyan()
    );

    let classifier: Arc<dyn LinkClassifier> = Arc::new(SchemeClassifier);
    let (built_tx, mut built) = mpsc::unbounded_channel();
    let reconcile = |input: String| {
        let handle = session.schedule_reconcile(input, Arc::clone(&classifier));
        let tx = built_tx.clone();
        tokio::spawn(async move {
            if matches!(handle.await, Ok(true)) {
                let _ = tx.send(());
            }
        });
    };

    match read_input(sources) {
        Ok(input) => reconcile(input),
        Err(e) => warn!(error = %e, "cannot read sources"),
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("{}", "Stopped".yellow());
                return Ok(());
            }
            Some(()) = changes.recv() => {
                match read_input(sources) {
                    Ok(input) => reconcile(input),
                    Err(e) => warn!(error = %e, "cannot read sources"),
                }
            }
            Some(()) = built.recv() => {
                if let Err(e) = run_build(app, session, generator, args).await {
                    eprintln!("{} {:#}", "Error:".red().bold(), e);
                }
            }
        }
    }
}

/// Watch the directory holding `sources` and signal writes to that file.
///
/// The directory is watched rather than the file so that editors which
/// save by renaming over the original keep producing events.
fn watch_sources(sources: &Path, tx: mpsc::UnboundedSender<()>) -> Result<RecommendedWatcher> {
    let dir = sources
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    let file_name = sources
        .file_name()
        .map(|n| n.to_os_string())
        .with_context(|| format!("Not a file: {}", sources.display()))?;

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) if is_change_to(&event, &file_name) => {
                debug!(paths = ?event.paths, "sources changed");
                let _ = tx.send(());
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "watch error"),
        },
        Config::default(),
    )
    .context("Failed to create file watcher")?;
    watcher
        .watch(&dir, RecursiveMode::NonRecursive)
        .with_context(|| format!("Failed to watch {}", dir.display()))?;
    Ok(watcher)
}

fn is_change_to(event: &Event, file_name: &OsStr) -> bool {
    matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
        && event.paths.iter().any(|p| p.file_name() == Some(file_name))
}
