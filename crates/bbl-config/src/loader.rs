//! Plan loading

use crate::args::split;
use crate::commands::{lookup, modifies_state, tears_down};
use crate::error::{ConfigError, Result};
use crate::flags::GlobalFlags;
use crate::merge::FlagMerger;
use crate::remote::StateDownloader;
use bbl_core::{Filesystem, State, StateMigrator, StateStore, StateValidator};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Everything the router needs to run one subcommand
#[derive(Debug)]
pub struct Plan {
    pub state: State,
    pub command: String,
    pub command_args: Vec<String>,
    pub global_flags: GlobalFlags,
    /// Absolute state directory
    pub state_dir: PathBuf,
    pub modifies_state: bool,
    /// Scratch state directory for remote state; removed when the plan drops
    scratch: Option<TempDir>,
}

impl Plan {
    pub fn new(command: impl Into<String>, state_dir: impl Into<PathBuf>) -> Self {
        let command = command.into();
        Self {
            modifies_state: modifies_state(&command),
            state: State::default(),
            command,
            command_args: Vec::new(),
            global_flags: GlobalFlags::default(),
            state_dir: state_dir.into(),
            scratch: None,
        }
    }

    pub fn with_state(mut self, state: State) -> Self {
        self.state = state;
        self
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.command_args = args;
        self
    }

    pub fn with_flags(mut self, flags: GlobalFlags) -> Self {
        self.global_flags = flags;
        self
    }

    pub fn uses_scratch_dir(&self) -> bool {
        self.scratch.is_some()
    }
}

pub struct ConfigurationLoader {
    fs: Arc<dyn Filesystem>,
    store: Arc<dyn StateStore>,
    downloader: Arc<dyn StateDownloader>,
    migrator: StateMigrator,
    merger: FlagMerger,
    validator: StateValidator,
}

impl ConfigurationLoader {
    pub fn new(
        fs: Arc<dyn Filesystem>,
        store: Arc<dyn StateStore>,
        downloader: Arc<dyn StateDownloader>,
    ) -> Self {
        Self {
            merger: FlagMerger::new(fs.clone()),
            fs,
            store,
            downloader,
            migrator: StateMigrator::new(),
            validator: StateValidator::new(),
        }
    }

    /// Build a [`Plan`] from `args` (without the binary name)
    #[tracing::instrument(skip_all)]
    pub async fn load(&self, args: &[String]) -> Result<Plan> {
        let split = split(args);
        let flags = GlobalFlags::try_parse_from(&split.global)
            .map_err(|e| ConfigError::InvalidFlags(e.render().to_string().trim().to_string()))?;

        let (command, command_args) = resolve_command(&flags, split.command, split.command_args);
        tracing::debug!(command = %command, "Resolved subcommand");

        let mut scratch = None;
        let state_dir = match (&flags.state_dir, &flags.state_bucket) {
            (Some(dir), _) => self.absolute(dir)?,
            (None, Some(_)) => {
                let dir = self
                    .fs
                    .scratch_dir("bbl-state")
                    .map_err(|e| ConfigError::io(std::env::temp_dir(), e))?;
                let path = dir.path().to_path_buf();
                scratch = Some(dir);
                path
            }
            (None, None) => self
                .fs
                .current_dir()
                .map_err(|e| ConfigError::io(".", e))?,
        };

        let mut plan = Plan {
            modifies_state: modifies_state(&command),
            state: State::default(),
            command,
            command_args,
            global_flags: flags,
            state_dir,
            scratch,
        };

        if lookup(&plan.command).is_some_and(|c| !c.needs_state) {
            return Ok(plan);
        }

        if !plan.modifies_state {
            if let Some(bucket) = &plan.global_flags.state_bucket {
                let env_name = plan
                    .global_flags
                    .env_name
                    .as_deref()
                    .filter(|n| !n.is_empty())
                    .ok_or_else(|| {
                        ConfigError::MissingRequiredField(
                            "--env-name (BBL_ENV_NAME) is required with --state-bucket"
                                .to_string(),
                        )
                    })?;
                self.downloader
                    .download(bucket, env_name, &plan.state_dir)
                    .await?;
            }
        }

        let loaded = self.store.get(&plan.state_dir)?;
        let was_empty = loaded.is_empty();
        let migrated = self.migrator.migrate(loaded)?;
        let merged = self
            .merger
            .merge(&plan.global_flags, migrated, &plan.state_dir)?;

        // tearing down a missing environment is decided by the handler
        if plan.modifies_state && !(was_empty && tears_down(&plan.command)) {
            self.validator.validate(&merged)?;
        }

        plan.state = merged;
        Ok(plan)
    }

    fn absolute(&self, dir: &Path) -> Result<PathBuf> {
        if dir.is_absolute() {
            return Ok(dir.to_path_buf());
        }
        let cwd = self
            .fs
            .current_dir()
            .map_err(|e| ConfigError::io(".", e))?;
        Ok(cwd.join(dir))
    }
}

/// `--help`/`--version` and a bare invocation map onto the help and version commands
fn resolve_command(
    flags: &GlobalFlags,
    command: Option<String>,
    command_args: Vec<String>,
) -> (String, Vec<String>) {
    if flags.help {
        let topic = command.into_iter().collect();
        return ("help".to_string(), topic);
    }
    if flags.version {
        return ("version".to_string(), Vec::new());
    }
    match command {
        Some(command) => (command, command_args),
        None => ("help".to_string(), Vec::new()),
    }
}
