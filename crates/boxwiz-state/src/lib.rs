//! # boxwiz State
//!
//! Saving and restoring wizard sessions:
//! - `WizardStateFile`: the versioned on-disk record
//! - `StateStore`: the current state plus named states in one directory

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod file;
pub mod store;

pub use file::{ConfigParam, PersistedRule, PersistedRuleState, PersistedSelection, WizardStateFile, ROUTE_FINAL_PARAM};
pub use store::{StateMetadata, StateStore};

use boxwiz_document::WizardModel;
use boxwiz_template::TemplateData;
use boxwiz_types::{Result, StateId};
use std::path::PathBuf;

/// State facade for the common save/restore paths.
pub struct StateManager;

impl StateManager {
    /// Capture `model` and save it, as the current state when `id` is `None`.
    pub fn save_model(
        store: &StateStore,
        model: &WizardModel,
        template: &TemplateData,
        id: Option<&StateId>,
        comment: &str,
    ) -> Result<PathBuf> {
        let mut state = WizardStateFile::from_model(model, &template.default_final)?;
        state.comment = comment.to_string();
        match id {
            Some(id) => store.save(&mut state, id),
            None => store.save_current(&mut state),
        }
    }

    /// Load a state and rebuild the model for `template`.
    pub fn restore_model(store: &StateStore, template: &TemplateData, id: Option<&StateId>) -> Result<WizardModel> {
        let state = match id {
            Some(id) => store.load(id)?,
            None => store.load_current()?,
        };
        state.restore(template)
    }
}
