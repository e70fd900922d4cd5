//! terraform CLI wrapper
//!
//! Runs in `<state-dir>/terraform`, which holds the templates. The recorded
//! state blob is materialized as `terraform.tfstate` before each run and read
//! back afterwards, whether or not the run succeeded.

use crate::error::{Result, TerraformError};
use crate::inputs::Inputs;
use async_trait::async_trait;
use bbl_core::Filesystem;
use bbl_core::fs::{DIR_MODE, FILE_MODE, write_atomic};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;

/// Variables file, relative to the state directory
pub const TFVARS_FILE: &str = "vars/bbl.tfvars.json";
/// Template and working directory, relative to the state directory
pub const TERRAFORM_DIR: &str = "terraform";
pub const BINARY_ENV: &str = "BBL_TERRAFORM_BINARY";
const STATE_FILE: &str = "terraform.tfstate";

/// Result of one engine run; the state and output are kept even on failure
#[derive(Debug)]
pub struct EngineRun {
    pub tf_state: String,
    pub output: String,
    pub result: Result<()>,
}

#[async_trait]
pub trait InfrastructureEngine: Send + Sync {
    async fn apply(&self, state_dir: &Path, inputs: &Inputs, tf_state: &str) -> EngineRun;

    async fn destroy(&self, state_dir: &Path, inputs: &Inputs, tf_state: &str) -> EngineRun;
}

/// Render `inputs` to `<state-dir>/vars/bbl.tfvars.json` (0600)
pub fn write_tfvars(fs: &dyn Filesystem, state_dir: &Path, inputs: &Inputs) -> Result<PathBuf> {
    let path = state_dir.join(TFVARS_FILE);
    if let Some(parent) = path.parent() {
        fs.create_dir_all(parent, DIR_MODE)?;
    }
    let rendered = serde_json::to_string_pretty(inputs)?;
    write_atomic(fs, &path, rendered.as_bytes(), FILE_MODE)?;
    tracing::debug!("Wrote engine inputs to {}", path.display());
    Ok(path)
}

pub struct TerraformCli {
    binary: String,
    fs: Arc<dyn Filesystem>,
}

impl TerraformCli {
    pub fn new(binary: impl Into<String>, fs: Arc<dyn Filesystem>) -> Self {
        Self {
            binary: binary.into(),
            fs,
        }
    }

    /// Binary from `BBL_TERRAFORM_BINARY`, defaulting to `terraform` on the PATH
    pub fn from_env(fs: Arc<dyn Filesystem>) -> Self {
        let binary = std::env::var(BINARY_ENV)
            .ok()
            .filter(|b| !b.is_empty())
            .unwrap_or_else(|| "terraform".to_string());
        Self::new(binary, fs)
    }

    async fn run(&self, work_dir: &Path, args: &[&str], output: &mut String) -> Result<()> {
        tracing::debug!("Running: {} {}", self.binary, args.join(" "));

        let result = Command::new(&self.binary)
            .args(args)
            .current_dir(work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await;

        let out = match result {
            Ok(out) => out,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TerraformError::BinaryNotFound {
                    binary: self.binary.clone(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let combined = format!(
            "{}{}",
            String::from_utf8_lossy(&out.stdout),
            String::from_utf8_lossy(&out.stderr)
        );
        output.push_str(&combined);

        if !out.status.success() {
            return Err(TerraformError::CommandFailed {
                command: args.first().copied().unwrap_or_default().to_string(),
                output: combined,
            });
        }
        Ok(())
    }

    async fn prepare(
        &self,
        state_dir: &Path,
        inputs: &Inputs,
        tf_state: &str,
    ) -> Result<(PathBuf, PathBuf)> {
        let work_dir = state_dir.join(TERRAFORM_DIR);
        if !has_templates(&work_dir).await {
            return Err(TerraformError::MissingTemplates(
                work_dir.display().to_string(),
            ));
        }

        if !tf_state.is_empty() {
            write_atomic(
                self.fs.as_ref(),
                &work_dir.join(STATE_FILE),
                tf_state.as_bytes(),
                FILE_MODE,
            )?;
        }
        let vars = write_tfvars(self.fs.as_ref(), state_dir, inputs)?;
        Ok((work_dir, vars))
    }

    async fn execute(
        &self,
        state_dir: &Path,
        inputs: &Inputs,
        tf_state: &str,
        command: &str,
    ) -> EngineRun {
        let mut output = String::new();

        let (work_dir, vars) = match self.prepare(state_dir, inputs, tf_state).await {
            Ok(prepared) => prepared,
            Err(e) => {
                return EngineRun {
                    tf_state: tf_state.to_string(),
                    output,
                    result: Err(e),
                };
            }
        };

        let var_file = format!("-var-file={}", vars.display());
        let mut result = self
            .run(&work_dir, &["init", "-input=false", "-no-color"], &mut output)
            .await;
        if result.is_ok() {
            result = self
                .run(
                    &work_dir,
                    &[command, "-auto-approve", "-input=false", "-no-color", var_file.as_str()],
                    &mut output,
                )
                .await;
        }

        let tf_state = match self.fs.read_to_string(&work_dir.join(STATE_FILE)) {
            Ok(new_state) => new_state,
            Err(_) => tf_state.to_string(),
        };

        EngineRun {
            tf_state,
            output,
            result,
        }
    }
}

async fn has_templates(dir: &Path) -> bool {
    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        return false;
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        if entry.path().extension().is_some_and(|ext| ext == "tf") {
            return true;
        }
    }
    false
}

#[async_trait]
impl InfrastructureEngine for TerraformCli {
    async fn apply(&self, state_dir: &Path, inputs: &Inputs, tf_state: &str) -> EngineRun {
        self.execute(state_dir, inputs, tf_state, "apply").await
    }

    async fn destroy(&self, state_dir: &Path, inputs: &Inputs, tf_state: &str) -> EngineRun {
        self.execute(state_dir, inputs, tf_state, "destroy").await
    }
}
