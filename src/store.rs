//! Local persistence of the state file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::terraform::StateFile;

pub const STATE_FILE_NAME: &str = "terraform.tfstate.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read state {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write state {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("corrupt state {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// `<data-local-dir>/parsing-rules/terraform.tfstate.json`, falling back to
/// the working directory when the platform has no data directory.
pub fn default_state_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("parsing-rules"))
        .unwrap_or_default()
        .join(STATE_FILE_NAME)
}

/// Loads the state at `path`; a missing file is an empty state.
pub fn load(path: &Path) -> Result<StateFile, StoreError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no state file, starting empty");
            return Ok(StateFile::default());
        }
        Err(source) => {
            return Err(StoreError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    serde_json::from_str(&contents).map_err(|source| StoreError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes the state through a temporary sibling file and a rename, creating
/// parent directories.
pub fn save(path: &Path, state: &StateFile) -> Result<(), StoreError> {
    let write_err = |source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }

    let json = serde_json::to_string_pretty(state).map_err(|source| StoreError::Corrupt {
        path: path.to_path_buf(),
        source,
    })?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).map_err(write_err)?;
    fs::rename(&tmp, path).map_err(write_err)?;

    tracing::debug!(path = %path.display(), resources = state.resources.len(), "state saved");
    Ok(())
}
