//! bosh CLI wrapper
//!
//! `create-env` and `delete-env` run in a scratch directory holding the
//! manifest, the deployment vars, the vars-store and the deployment state.
//! The vars-store and state are read back after the run whether or not it
//! succeeded, so a partially created VM is never forgotten.

use crate::error::{BoshError, Result};
use async_trait::async_trait;
use bbl_core::Filesystem;
use bbl_core::fs::{FILE_MODE, write_atomic};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;

pub const BINARY_ENV: &str = "BBL_BOSH_BINARY";
pub const DEPLOYMENT_DIR_ENV: &str = "BBL_BOSH_DEPLOYMENT_DIR";
/// Default manifest directory, relative to the state directory
pub const DEPLOYMENT_DIR: &str = "bosh-deployment";

const MANIFEST_FILE: &str = "manifest.yml";
const VARS_FILE: &str = "vars.yml";
const VARS_STORE_FILE: &str = "vars-store.yml";
const STATE_FILE: &str = "state.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deployment {
    Jumpbox,
    Director,
}

impl Deployment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Deployment::Jumpbox => "jumpbox",
            Deployment::Director => "director",
        }
    }

    /// Manifest file name inside the deployment directory
    pub fn manifest_file(&self) -> &'static str {
        match self {
            Deployment::Jumpbox => "jumpbox.yml",
            Deployment::Director => "bosh.yml",
        }
    }
}

/// Manifest directory from `BBL_BOSH_DEPLOYMENT_DIR`, defaulting to
/// `<state-dir>/bosh-deployment`
pub fn deployment_dir(state_dir: &Path) -> PathBuf {
    std::env::var(DEPLOYMENT_DIR_ENV)
        .ok()
        .filter(|d| !d.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| state_dir.join(DEPLOYMENT_DIR))
}

/// Everything one `create-env`/`delete-env` run needs
#[derive(Debug, Clone, Default)]
pub struct DeploymentInput {
    pub manifest: String,
    /// YAML map passed with `--vars-file`
    pub vars: String,
    /// Recorded vars-store blob
    pub variables: String,
    /// Recorded deployment state blob
    pub state: String,
    /// `BOSH_ALL_PROXY` for reaching a VM behind the jumpbox
    pub proxy: Option<String>,
}

/// Result of one engine run; the blobs and output are kept even on failure
#[derive(Debug)]
pub struct DeploymentRun {
    pub variables: String,
    pub state: String,
    pub output: String,
    pub result: Result<()>,
}

/// A running director and the credentials to talk to it
#[derive(Debug, Clone, Default)]
pub struct DirectorTarget {
    pub address: String,
    pub username: String,
    pub password: String,
    pub ca_cert: String,
    pub proxy: Option<String>,
}

#[async_trait]
pub trait DeploymentEngine: Send + Sync {
    async fn create_env(&self, deployment: Deployment, input: &DeploymentInput) -> DeploymentRun;

    async fn delete_env(&self, deployment: Deployment, input: &DeploymentInput) -> DeploymentRun;

    /// Apply `overlay` with `vars` to the base cloud-config on the director
    async fn update_cloud_config(
        &self,
        target: &DirectorTarget,
        base: &str,
        overlay: &str,
        vars: &str,
    ) -> Result<String>;
}

pub struct BoshCli {
    binary: String,
    fs: Arc<dyn Filesystem>,
}

impl BoshCli {
    pub fn new(binary: impl Into<String>, fs: Arc<dyn Filesystem>) -> Self {
        Self {
            binary: binary.into(),
            fs,
        }
    }

    /// Binary from `BBL_BOSH_BINARY`, defaulting to `bosh` on the PATH
    pub fn from_env(fs: Arc<dyn Filesystem>) -> Self {
        let binary = std::env::var(BINARY_ENV)
            .ok()
            .filter(|b| !b.is_empty())
            .unwrap_or_else(|| "bosh".to_string());
        Self::new(binary, fs)
    }

    async fn run(
        &self,
        work_dir: &Path,
        args: &[&str],
        envs: &[(&str, &str)],
        output: &mut String,
    ) -> Result<()> {
        tracing::debug!("Running: {} {}", self.binary, args.join(" "));

        let result = Command::new(&self.binary)
            .args(args)
            .envs(envs.iter().copied())
            .current_dir(work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await;

        let out = match result {
            Ok(out) => out,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(BoshError::BinaryNotFound {
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
            return Err(BoshError::CommandFailed {
                command: args
                    .iter()
                    .find(|a| !a.starts_with('-'))
                    .copied()
                    .unwrap_or_default()
                    .to_string(),
                output: combined,
            });
        }
        Ok(())
    }

    fn write(&self, dir: &Path, name: &str, contents: &str) -> Result<()> {
        write_atomic(self.fs.as_ref(), &dir.join(name), contents.as_bytes(), FILE_MODE)?;
        Ok(())
    }

    fn read_back(&self, dir: &Path, name: &str, previous: &str) -> String {
        self.fs
            .read_to_string(&dir.join(name))
            .ok()
            .filter(|contents| !contents.is_empty())
            .unwrap_or_else(|| previous.to_string())
    }

    async fn execute(
        &self,
        command: &str,
        deployment: Deployment,
        input: &DeploymentInput,
    ) -> DeploymentRun {
        let mut output = String::new();
        let failed = |e: BoshError, output: String| DeploymentRun {
            variables: input.variables.clone(),
            state: input.state.clone(),
            output,
            result: Err(e),
        };

        if input.manifest.trim().is_empty() {
            return failed(
                BoshError::MissingManifest(deployment.manifest_file().to_string()),
                output,
            );
        }

        let work_dir = match self.fs.scratch_dir(&format!("bbl-{}", deployment.as_str())) {
            Ok(dir) => dir,
            Err(e) => return failed(e.into(), output),
        };
        let prepared = [
            (MANIFEST_FILE, input.manifest.as_str()),
            (VARS_FILE, input.vars.as_str()),
            (VARS_STORE_FILE, input.variables.as_str()),
            (STATE_FILE, input.state.as_str()),
        ]
        .into_iter()
        .filter(|(_, contents)| !contents.is_empty())
        .try_for_each(|(name, contents)| self.write(work_dir.path(), name, contents));
        if let Err(e) = prepared {
            return failed(e, output);
        }

        let mut args = vec![
            command,
            MANIFEST_FILE,
            "--vars-store",
            VARS_STORE_FILE,
            "--state",
            STATE_FILE,
        ];
        if !input.vars.is_empty() {
            args.extend(["--vars-file", VARS_FILE]);
        }
        let envs: Vec<(&str, &str)> = input
            .proxy
            .as_deref()
            .map(|proxy| vec![("BOSH_ALL_PROXY", proxy)])
            .unwrap_or_default();

        tracing::info!("bosh {} for the {}", command, deployment.as_str());
        let result = self.run(work_dir.path(), &args, &envs, &mut output).await;

        DeploymentRun {
            variables: self.read_back(work_dir.path(), VARS_STORE_FILE, &input.variables),
            state: self.read_back(work_dir.path(), STATE_FILE, &input.state),
            output,
            result,
        }
    }
}

#[async_trait]
impl DeploymentEngine for BoshCli {
    async fn create_env(&self, deployment: Deployment, input: &DeploymentInput) -> DeploymentRun {
        self.execute("create-env", deployment, input).await
    }

    async fn delete_env(&self, deployment: Deployment, input: &DeploymentInput) -> DeploymentRun {
        self.execute("delete-env", deployment, input).await
    }

    async fn update_cloud_config(
        &self,
        target: &DirectorTarget,
        base: &str,
        overlay: &str,
        vars: &str,
    ) -> Result<String> {
        if target.address.is_empty() {
            return Err(BoshError::MissingDirector);
        }
        let work_dir = self.fs.scratch_dir("bbl-cloud-config")?;
        self.write(work_dir.path(), "cloud-config.yml", base)?;
        self.write(work_dir.path(), "ops.yml", overlay)?;
        self.write(work_dir.path(), VARS_FILE, vars)?;
        self.write(work_dir.path(), "ca.crt", &target.ca_cert)?;

        let mut envs = vec![
            ("BOSH_ENVIRONMENT", target.address.as_str()),
            ("BOSH_CLIENT", target.username.as_str()),
            ("BOSH_CLIENT_SECRET", target.password.as_str()),
            ("BOSH_CA_CERT", "ca.crt"),
        ];
        if let Some(proxy) = target.proxy.as_deref() {
            envs.push(("BOSH_ALL_PROXY", proxy));
        }

        let mut output = String::new();
        self.run(
            work_dir.path(),
            &[
                "-n",
                "update-cloud-config",
                "cloud-config.yml",
                "-o",
                "ops.yml",
                "-l",
                VARS_FILE,
            ],
            &envs,
            &mut output,
        )
        .await?;
        Ok(output)
    }
}
