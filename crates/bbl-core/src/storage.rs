//! State persistence
//!
//! Layout of a state directory:
//!
//! ```text
//! <state-dir>/
//!   bbl-state.json          root document (0600), keys sorted
//!   vars/                   engine blobs (0700 dir, 0600 files)
//!   .bbl/                   materialized credentials
//!   terraform/              infrastructure engine working directory
//! ```
//!
//! Blob files are written before the root document, so a crash mid-save leaves
//! either the previous root or a new root whose referenced files already exist.

use crate::error::{CoreError, Result};
use crate::fs::{
    DIR_MODE, FILE_MODE, Filesystem, remove_dir_if_exists, remove_file_if_exists, write_atomic,
};
use crate::state::{Blob, State};
use serde_json::{Map, Value};
use std::io;
use std::path::{Component, Path};
use std::sync::Arc;

pub const STATE_FILE: &str = "bbl-state.json";
const FILES_KEY: &str = "files";

/// Directories owned by bbl inside a state directory
pub const MANAGED_DIRS: [&str; 3] = ["vars", ".bbl", "terraform"];

/// Load and save the state document of a directory
pub trait StateStore: Send + Sync {
    /// Read `<dir>/bbl-state.json`; a missing file yields the zero state
    fn get(&self, dir: &Path) -> Result<State>;

    /// Persist `state`; the zero state removes the managed subtree
    fn set(&self, dir: &Path, state: &State) -> Result<()>;
}

/// Store backed by a [`Filesystem`]
pub struct FileStateStore {
    fs: Arc<dyn Filesystem>,
}

impl FileStateStore {
    pub fn new(fs: Arc<dyn Filesystem>) -> Self {
        Self { fs }
    }

    fn clear(&self, dir: &Path) -> Result<()> {
        let state_path = dir.join(STATE_FILE);
        remove_file_if_exists(self.fs.as_ref(), &state_path)
            .map_err(|e| CoreError::io(&state_path, e))?;

        for managed in MANAGED_DIRS {
            let path = dir.join(managed);
            remove_dir_if_exists(self.fs.as_ref(), &path).map_err(|e| CoreError::io(&path, e))?;
        }

        tracing::debug!("Removed state from {}", dir.display());
        Ok(())
    }

    fn write_blobs(&self, dir: &Path, state: &State) -> Result<Map<String, Value>> {
        let vars_dir = dir.join("vars");
        self.fs
            .create_dir_all(&vars_dir, DIR_MODE)
            .map_err(|e| CoreError::io(&vars_dir, e))?;

        let mut files = Map::new();
        for blob in Blob::ALL {
            let path = dir.join(blob.relative_path());
            let contents = state.blob(blob);
            if contents.is_empty() {
                remove_file_if_exists(self.fs.as_ref(), &path)
                    .map_err(|e| CoreError::io(&path, e))?;
                continue;
            }
            write_atomic(self.fs.as_ref(), &path, contents.as_bytes(), FILE_MODE)
                .map_err(|e| CoreError::io(&path, e))?;
            files.insert(
                blob.key().to_string(),
                Value::String(blob.relative_path().to_string()),
            );
        }
        Ok(files)
    }
}

impl StateStore for FileStateStore {
    fn get(&self, dir: &Path) -> Result<State> {
        let path = dir.join(STATE_FILE);
        let content = match self.fs.read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("State file not found, returning empty state");
                return Ok(State::default());
            }
            Err(e) => return Err(CoreError::io(&path, e)),
        };

        let corrupt = |reason: String| CoreError::Corrupt {
            path: path.clone(),
            reason,
        };

        let mut document: Value =
            serde_json::from_str(&content).map_err(|e| corrupt(e.to_string()))?;
        let files = match document.as_object_mut() {
            Some(object) => object.remove(FILES_KEY),
            None => return Err(corrupt("root is not a JSON object".to_string())),
        };
        let mut state: State =
            serde_json::from_value(document).map_err(|e| corrupt(e.to_string()))?;

        if let Some(files) = files {
            let files = files
                .as_object()
                .ok_or_else(|| corrupt("\"files\" is not an object".to_string()))?;
            for (key, relative) in files {
                let blob = Blob::from_key(key)
                    .ok_or_else(|| corrupt(format!("unknown file reference {:?}", key)))?;
                let relative = relative
                    .as_str()
                    .ok_or_else(|| corrupt(format!("file reference {:?} is not a string", key)))?;
                if !is_contained(relative) {
                    return Err(corrupt(format!(
                        "file reference {:?} escapes the state directory",
                        relative
                    )));
                }
                let blob_path = dir.join(relative);
                *state.blob_mut(blob) = self
                    .fs
                    .read_to_string(&blob_path)
                    .map_err(|e| CoreError::io(&blob_path, e))?;
            }
        }

        tracing::debug!(
            iaas = ?state.iaas,
            env_id = %state.env_id,
            version = state.version,
            "Loaded state"
        );
        Ok(state)
    }

    fn set(&self, dir: &Path, state: &State) -> Result<()> {
        if state.is_empty() {
            return self.clear(dir);
        }

        self.fs
            .create_dir_all(dir, DIR_MODE)
            .map_err(|e| CoreError::io(dir, e))?;

        let files = self.write_blobs(dir, state)?;

        // serde_json's default map is ordered, which gives sorted keys
        let mut document = serde_json::to_value(state)?;
        if !files.is_empty() {
            if let Some(object) = document.as_object_mut() {
                object.insert(FILES_KEY.to_string(), Value::Object(files));
            }
        }
        let content = serde_json::to_string_pretty(&document)?;

        let path = dir.join(STATE_FILE);
        write_atomic(self.fs.as_ref(), &path, content.as_bytes(), FILE_MODE)
            .map_err(|e| CoreError::io(&path, e))?;

        tracing::debug!(env_id = %state.env_id, "Saved state to {}", path.display());
        Ok(())
    }
}

fn is_contained(relative: &str) -> bool {
    Path::new(relative)
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::OsFilesystem;
    use crate::iaas::Iaas;
    use crate::migrate::CURRENT_VERSION;
    use std::fs;
    use tempfile::tempdir;

    fn store() -> FileStateStore {
        FileStateStore::new(Arc::new(OsFilesystem))
    }

    fn populated_state() -> State {
        let mut state = State {
            version: CURRENT_VERSION,
            iaas: Some(Iaas::Aws),
            env_id: "env1".to_string(),
            ..Default::default()
        };
        state.aws.access_key_id = "k".to_string();
        state.aws.secret_access_key = "s".to_string();
        state.aws.region = "r".to_string();
        state.jumpbox.url = "10.0.0.5:22".to_string();
        state.jumpbox.variables = "jumpbox_ssh:\n  private_key: abc\n".to_string();
        state.director_vm.address = "https://10.0.0.6:25555".to_string();
        state.director_vm.state = "{\"current_vm_cid\":\"i-1\"}".to_string();
        state.tf_state = "{\"version\":4}".to_string();
        state
    }

    #[test]
    fn test_missing_file_returns_zero_state() {
        let dir = tempdir().unwrap();
        let state = store().get(dir.path()).unwrap();
        assert_eq!(state, State::default());
    }

    #[test]
    fn test_set_then_get_round_trips() {
        let dir = tempdir().unwrap();
        let state = populated_state();

        store().set(dir.path(), &state).unwrap();
        let loaded = store().get(dir.path()).unwrap();

        assert_eq!(loaded, state);
        assert!(dir.path().join("vars/terraform.tfstate").is_file());
        assert!(!dir.path().join("vars/jumpbox-state.json").exists());
    }

    #[test]
    fn test_document_has_sorted_keys_and_file_references() {
        let dir = tempdir().unwrap();
        store().set(dir.path(), &populated_state()).unwrap();

        let raw = fs::read_to_string(dir.path().join(STATE_FILE)).unwrap();
        let aws = raw.find("\"aws\"").unwrap();
        let version = raw.find("\"version\"").unwrap();
        assert!(aws < version);
        assert!(!raw.lines().any(|l| l.ends_with(' ')));

        let value: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["files"]["tfState"], "vars/terraform.tfstate");
        assert!(value.get("tfState").is_none());
    }

    #[test]
    fn test_zero_state_removes_managed_subtree() {
        let dir = tempdir().unwrap();
        store().set(dir.path(), &populated_state()).unwrap();
        fs::create_dir_all(dir.path().join(".bbl")).unwrap();
        fs::write(dir.path().join(".bbl/key.json"), "{}").unwrap();
        fs::write(dir.path().join("unrelated.txt"), "keep").unwrap();

        store().set(dir.path(), &State::default()).unwrap();

        assert!(!dir.path().join(STATE_FILE).exists());
        assert!(!dir.path().join("vars").exists());
        assert!(!dir.path().join(".bbl").exists());
        assert!(dir.path().join("unrelated.txt").exists());
    }

    #[test]
    fn test_corrupt_document() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(STATE_FILE), "{not json").unwrap();
        let err = store().get(dir.path()).unwrap_err();
        assert!(matches!(err, CoreError::Corrupt { .. }));
    }

    #[test]
    fn test_file_reference_outside_state_dir_is_rejected() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(STATE_FILE),
            r#"{"version":14,"envID":"x","files":{"tfState":"../../etc/passwd"}}"#,
        )
        .unwrap();
        let err = store().get(dir.path()).unwrap_err();
        assert!(err.to_string().contains("escapes"));
    }

    #[test]
    fn test_missing_blob_file_is_an_io_error() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(STATE_FILE),
            r#"{"version":14,"envID":"x","files":{"tfState":"vars/terraform.tfstate"}}"#,
        )
        .unwrap();
        let err = store().get(dir.path()).unwrap_err();
        assert!(matches!(err, CoreError::Io { .. }));
    }
}
