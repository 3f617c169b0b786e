//! CLI command implementations.

pub mod template;
pub mod import;
pub mod reconcile;
pub mod check;
pub mod build;
pub mod states;

use anyhow::{bail, Context, Result};
use boxwiz_core::util::expand_path;
use boxwiz_core::WizardSettings;
use boxwiz_document::WizardModel;
use boxwiz_parser::load_existing;
use boxwiz_state::{StateManager, StateStore};
use boxwiz_template::TemplateData;
use boxwiz_types::StateId;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Name accepted wherever a state ID is expected to mean `state.json`.
pub const CURRENT_STATE: &str = "current";

/// Settings plus the helpers every command needs.
pub struct App {
    pub settings: WizardSettings,
}

impl App {
    pub fn new(mut settings: WizardSettings) -> Self {
        settings.template = expand_path(&settings.template);
        settings.config_path = expand_path(&settings.config_path);
        settings.state_dir = expand_path(&settings.state_dir);
        Self { settings }
    }

    pub fn load_template(&self) -> Result<TemplateData> {
        TemplateData::load(&self.settings.template, &self.settings.platform)
            .with_context(|| format!("Failed to load template {}", self.settings.template.display()))
    }

    pub fn store(&self) -> StateStore {
        StateStore::new(&self.settings.state_dir)
    }

    /// Model to start from: the named state, else the current state, else
    /// the template seeded from the existing config file.
    pub fn initial_model(&self, template: &TemplateData, state: Option<&StateId>) -> Result<WizardModel> {
        let store = self.store();
        let mut model = if store.exists(state) {
            debug!(state = ?state, "restoring wizard state");
            StateManager::restore_model(&store, template, state).context("Failed to restore wizard state")?
        } else if let Some(id) = state {
            bail!("State not found: {}", id);
        } else {
            let existing = load_existing(&self.settings.config_path, &template.parser_config)
                .context("Failed to read the existing config")?;
            let mut model = WizardModel::from_template(template);
            model.apply_existing(&existing);
            model.refresh_outbound_choices(&template.default_final);
            model
        };
        model.enable_tun = self.settings.enable_tun;
        Ok(model)
    }
}

/// Parse a state ID argument; `current` selects the working state.
pub fn state_id(arg: Option<&str>) -> Result<Option<StateId>> {
    match arg {
        None | Some(CURRENT_STATE) => Ok(None),
        Some(id) => Ok(Some(StateId::new(id).context("Invalid state ID")?)),
    }
}

/// Read a file, or stdin for `-`.
pub fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text).context("Failed to read stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}
