//! Directory-backed storage of wizard states.
//!
//! Layout of the state directory:
//!
//! ```text
//! <state_dir>/
//!   state.json      current working state
//!   <id>.json       named states
//! ```

use boxwiz_core::time::{now_rfc3339, parse_rfc3339};
use boxwiz_core::util::{slurp_limited, write_atomic};
use boxwiz_types::constants::{MAX_JSON_CONFIG_SIZE, MAX_STATE_FILE_SIZE, STATE_FILE_NAME, WIZARD_STATE_VERSION};
use boxwiz_types::{bail, Result, StateId, WizardError};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, warn};

use crate::file::WizardStateFile;

/// Summary of a stored state for listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateMetadata {
    /// State name; empty for the current state
    pub id: String,
    /// Free-text note
    pub comment: String,
    /// Creation time, or the file's modification time
    pub created_at: DateTime<Utc>,
    /// Last save, or the file's modification time
    pub updated_at: DateTime<Utc>,
    /// Whether this is `state.json`
    pub is_current: bool,
}

#[derive(Deserialize)]
struct MetadataFields {
    #[serde(default)]
    comment: String,
    #[serde(default)]
    created_at: String,
    #[serde(default)]
    updated_at: String,
}

/// Wizard state storage rooted at one directory.
#[derive(Debug, Clone)]
pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    /// Create a store; the directory is created on first write.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// The state directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: Option<&StateId>) -> PathBuf {
        match id {
            Some(id) => self.dir.join(id.file_name()),
            None => self.dir.join(STATE_FILE_NAME),
        }
    }

    /// Save `state` as the named state `id`.
    ///
    /// An unset `state.id` is filled in; a different one is an error.
    pub fn save(&self, state: &mut WizardStateFile, id: &StateId) -> Result<PathBuf> {
        if let Some(existing) = &state.id {
            if existing != id {
                bail!(
                    State,
                    "state ID mismatch: state has \"{}\", but requested \"{}\"",
                    existing,
                    id
                );
            }
        }
        state.id = Some(id.clone());
        self.write(state, Some(id))
    }

    /// Save `state` as the current state.
    pub fn save_current(&self, state: &mut WizardStateFile) -> Result<PathBuf> {
        self.write(state, None)
    }

    fn write(&self, state: &mut WizardStateFile, id: Option<&StateId>) -> Result<PathBuf> {
        if state.version == 0 {
            state.version = WIZARD_STATE_VERSION;
        }
        let now = now_rfc3339();
        if state.created_at.is_empty() {
            state.created_at = now.clone();
        }
        state.updated_at = now;

        let data = serde_json::to_string_pretty(state)?;
        if data.len() as u64 > MAX_STATE_FILE_SIZE {
            warn!(
                size = data.len(),
                limit = MAX_STATE_FILE_SIZE,
                "state file exceeds recommended maximum"
            );
        }

        let path = self.path_for(id);
        write_atomic(&path, data)
            .map_err(|e| WizardError::State(format!("failed to write state file {}: {}", path.display(), e)))?;
        info!(path = %path.display(), "wizard state saved");
        Ok(path)
    }

    /// Load the named state `id`.
    pub fn load(&self, id: &StateId) -> Result<WizardStateFile> {
        self.read(Some(id))
    }

    /// Load the current state.
    pub fn load_current(&self) -> Result<WizardStateFile> {
        self.read(None)
    }

    fn read(&self, id: Option<&StateId>) -> Result<WizardStateFile> {
        let path = self.path_for(id);
        if !path.exists() {
            bail!(State, "state file not found: {}", path.display());
        }

        let bytes = slurp_limited(&path, MAX_JSON_CONFIG_SIZE as u64)
            .map_err(|e| WizardError::State(format!("failed to read state file {}: {}", path.display(), e)))?;
        if bytes.len() as u64 > MAX_STATE_FILE_SIZE {
            warn!(
                path = %path.display(),
                size = bytes.len(),
                limit = MAX_STATE_FILE_SIZE,
                "state file exceeds recommended maximum"
            );
        }

        let state: WizardStateFile = serde_json::from_slice(&bytes)
            .map_err(|e| WizardError::State(format!("failed to parse state file {}: {}", path.display(), e)))?;
        if state.version != WIZARD_STATE_VERSION {
            bail!(
                State,
                "unsupported state file version: {} (expected {})",
                state.version,
                WIZARD_STATE_VERSION
            );
        }
        if let (Some(expected), Some(found)) = (id, &state.id) {
            if expected != found {
                warn!(expected = %expected, found = %found, "state ID does not match its file name");
            }
        }

        debug!(path = %path.display(), "wizard state loaded");
        Ok(state)
    }

    /// All stored states with their metadata, sorted by ID.
    ///
    /// Unreadable files are skipped with a warning. Missing or invalid
    /// timestamps fall back to the file's modification time.
    pub fn list(&self) -> Result<Vec<StateMetadata>> {
        let mut states = Vec::new();
        for (path, mut meta) in self.entries()? {
            let fields = fs::read(&path)
                .map_err(WizardError::from)
                .and_then(|bytes| serde_json::from_slice::<MetadataFields>(&bytes).map_err(WizardError::from));
            let fields = match fields {
                Ok(fields) => fields,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable state file");
                    continue;
                }
            };
            meta.comment = fields.comment;
            if let Some(t) = parse_rfc3339(&fields.created_at) {
                meta.created_at = t;
            }
            if let Some(t) = parse_rfc3339(&fields.updated_at) {
                meta.updated_at = t;
            }
            states.push(meta);
        }
        debug!(count = states.len(), "wizard states listed");
        Ok(states)
    }

    /// Stored states from file names and modification times only.
    pub fn list_names(&self) -> Result<Vec<StateMetadata>> {
        Ok(self.entries()?.into_iter().map(|(_, meta)| meta).collect())
    }

    fn entries(&self) -> Result<Vec<(PathBuf, StateMetadata)>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() || path.extension().map_or(true, |e| e != "json") {
                continue;
            }
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };

            let is_current = file_name == STATE_FILE_NAME;
            let id = if is_current {
                String::new()
            } else {
                file_name.trim_end_matches(".json").to_string()
            };
            let modified: DateTime<Utc> = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or_else(|_| SystemTime::now())
                .into();

            entries.push((
                path,
                StateMetadata {
                    id,
                    comment: String::new(),
                    created_at: modified,
                    updated_at: modified,
                    is_current,
                },
            ));
        }
        entries.sort_by(|a, b| a.1.id.cmp(&b.1.id));
        Ok(entries)
    }

    /// Delete the named state `id`.
    pub fn delete(&self, id: &StateId) -> Result<()> {
        let path = self.path_for(Some(id));
        if !path.exists() {
            bail!(State, "state file not found: {}", path.display());
        }
        fs::remove_file(&path)
            .map_err(|e| WizardError::State(format!("failed to delete state file {}: {}", path.display(), e)))?;
        info!(path = %path.display(), "wizard state deleted");
        Ok(())
    }

    /// Whether the named state, or the current one for `None`, exists.
    pub fn exists(&self, id: Option<&StateId>) -> bool {
        self.path_for(id).is_file()
    }
}
