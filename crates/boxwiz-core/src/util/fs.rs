//! Filesystem utilities.

use boxwiz_types::{WizardError, Result};
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Expand a leading `~` to the home directory.
pub fn expand_path(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();

    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }

    path.to_path_buf()
}

/// Read a file, refusing anything larger than `limit` bytes.
pub fn slurp_limited(path: impl AsRef<Path>, limit: u64) -> Result<Vec<u8>> {
    let path = path.as_ref();
    let file = fs::File::open(path)?;
    let size = file.metadata()?.len();
    if size > limit {
        return Err(WizardError::Validation(format!(
            "{} is {} bytes, exceeding the limit of {} bytes",
            path.display(),
            size,
            limit
        )));
    }

    let mut buf = Vec::with_capacity(size as usize);
    file.take(limit + 1).read_to_end(&mut buf)?;
    if buf.len() as u64 > limit {
        return Err(WizardError::Validation(format!(
            "{} grew beyond the limit of {} bytes",
            path.display(),
            limit
        )));
    }
    Ok(buf)
}

/// Write `contents` atomically through a temp file in the target directory.
///
/// The temp file is removed if any step fails.
pub fn write_atomic(path: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> Result<()> {
    let path = path.as_ref();
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;

    let mut temp_file = tempfile::NamedTempFile::new_in(dir)?;
    temp_file.write_all(contents.as_ref())?;
    temp_file.as_file().sync_all()?;
    temp_file.persist(path).map_err(|e| {
        WizardError::Other(format!("Failed to replace {}: {}", path.display(), e.error))
    })?;
    Ok(())
}
