//! Subcommand handlers
//!
//! A handler receives the merged state and returns the state to persist
//! together with its result. Progress made before a failure is kept in the
//! returned state so the router can save it.

mod down;
mod help;
mod leftovers;
mod lbs;
mod outputs;
mod print_env;
mod query;
mod rotate;
mod up;

pub use help::{Help, Version};
pub use leftovers::{LeftoversCli, LeftoversRunner};

use crate::logger::Logger;
use async_trait::async_trait;
use bbl_bosh::{Deployment, DeploymentEngine, DeploymentInput, deployment_dir, variable};
use bbl_cloud::EnvironmentValidator;
use bbl_cloudconfig::CloudConfigOverlayGenerator;
use bbl_config::GlobalFlags;
use bbl_config::merge::CREDENTIALS_DIR;
use bbl_core::fs::{DIR_MODE, FILE_MODE, write_atomic};
use bbl_core::{Filesystem, State};
use bbl_terraform::{InfrastructureEngine, Outputs, ProviderInputProjector};
use clap::Parser;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub const JUMPBOX_KEY_FILE: &str = "jumpbox.key";

/// How often a dot is printed while an external engine runs
pub const PROGRESS_INTERVAL: Duration = Duration::from_secs(10);

/// State to persist plus the handler's result
#[derive(Debug)]
pub struct Outcome {
    pub state: State,
    pub result: anyhow::Result<()>,
}

impl Outcome {
    pub fn ok(state: State) -> Self {
        Self {
            state,
            result: Ok(()),
        }
    }

    pub fn failed(state: State, error: impl Into<anyhow::Error>) -> Self {
        Self {
            state,
            result: Err(error.into()),
        }
    }
}

/// Long-lived collaborators shared by every handler
pub struct Collaborators {
    pub fs: Arc<dyn Filesystem>,
    pub logger: Arc<Logger>,
    pub projector: ProviderInputProjector,
    pub infrastructure: Arc<dyn InfrastructureEngine>,
    pub deployment: Arc<dyn DeploymentEngine>,
    pub environment: EnvironmentValidator,
    pub overlay: CloudConfigOverlayGenerator,
    pub leftovers: Arc<dyn LeftoversRunner>,
}

/// What a handler sees of one invocation
pub struct Context<'a> {
    pub state_dir: &'a Path,
    pub flags: &'a GlobalFlags,
    pub collaborators: &'a Collaborators,
}

impl Context<'_> {
    pub fn logger(&self) -> &Logger {
        &self.collaborators.logger
    }

    pub fn fs(&self) -> &dyn Filesystem {
        self.collaborators.fs.as_ref()
    }

    /// Write a credential under `<state-dir>/.bbl` (0600)
    pub fn write_credential(&self, name: &str, contents: &str) -> anyhow::Result<PathBuf> {
        let dir = self.state_dir.join(CREDENTIALS_DIR);
        self.fs().create_dir_all(&dir, DIR_MODE)?;
        let path = dir.join(name);
        write_atomic(self.fs(), &path, contents.as_bytes(), FILE_MODE)?;
        Ok(path)
    }
}

#[async_trait]
pub trait Command: Send + Sync {
    async fn execute(&self, ctx: &Context<'_>, args: &[String], state: State) -> Outcome;

    /// One-line usage shown by `help <command>`
    fn usage(&self) -> String {
        String::new()
    }
}

/// Handlers keyed by command name
pub type CommandSet = BTreeMap<&'static str, Arc<dyn Command>>;

/// Every built-in subcommand
pub fn builtin() -> CommandSet {
    let mut set: CommandSet = BTreeMap::new();
    set.insert("up", Arc::new(up::Up::apply()));
    set.insert("plan", Arc::new(up::Up::plan_only()));
    set.insert("down", Arc::new(down::Down));
    set.insert("destroy", Arc::new(down::Down));
    set.insert("leftovers", Arc::new(leftovers::Leftovers));
    set.insert("cleanup-leftovers", Arc::new(leftovers::Leftovers));
    set.insert("rotate", Arc::new(rotate::Rotate));
    set.insert("lbs", Arc::new(lbs::Lbs));
    set.insert("outputs", Arc::new(outputs::PrintOutputs));
    set.insert("print-env", Arc::new(print_env::PrintEnv));
    set.insert("latest-error", Arc::new(query::LatestError));
    set.insert("help", Arc::new(Help));
    set.insert("version", Arc::new(Version));
    for query in query::Query::ALL {
        set.insert(query.command(), Arc::new(query));
    }
    set
}

/// Await `work`, printing a dot every `interval` until it finishes
pub(crate) async fn with_progress<F: std::future::Future>(
    logger: &Logger,
    interval: Duration,
    work: F,
) -> F::Output {
    tokio::pin!(work);
    let mut ticker = tokio::time::interval(interval);
    // the first tick completes immediately
    ticker.tick().await;
    loop {
        tokio::select! {
            output = &mut work => return output,
            _ = ticker.tick() => logger.dot(),
        }
    }
}

/// Parse subcommand flags with clap, reporting problems as plain errors
pub(crate) fn parse_args<T: Parser>(args: &[String]) -> anyhow::Result<T> {
    T::try_parse_from(args).map_err(|e| anyhow::anyhow!("{}", e.render().to_string().trim()))
}

/// Outputs recorded in the state's terraform blob
pub(crate) fn recorded_outputs(state: &State) -> anyhow::Result<Outputs> {
    Ok(bbl_terraform::outputs_from_state(&state.tf_state)?)
}

/// The jumpbox SSH private key, from the key pair or the jumpbox vars-store
pub(crate) fn jumpbox_private_key(state: &State) -> Option<String> {
    if !state.key_pair.private_key.is_empty() {
        return Some(state.key_pair.private_key.clone());
    }
    variable(&state.jumpbox.variables, &["jumpbox_ssh", "private_key"])
}

/// `BOSH_ALL_PROXY` value tunnelling through the jumpbox, writing its key
/// to `<state-dir>/.bbl/jumpbox.key`
pub(crate) fn jumpbox_proxy(ctx: &Context<'_>, state: &State) -> anyhow::Result<Option<String>> {
    let Some(key) = jumpbox_private_key(state) else {
        return Ok(None);
    };
    if state.jumpbox.url.is_empty() {
        return Ok(None);
    }
    let path = ctx.write_credential(JUMPBOX_KEY_FILE, &key)?;
    Ok(Some(format!(
        "ssh+socks5://jumpbox@{}?private-key={}",
        state.jumpbox.url,
        path.display()
    )))
}

/// Manifest for `deployment`: the recorded one, or the one shipped in the
/// deployment directory
pub(crate) fn manifest(
    ctx: &Context<'_>,
    deployment: Deployment,
    recorded: &str,
) -> anyhow::Result<String> {
    if !recorded.is_empty() {
        return Ok(recorded.to_string());
    }
    let path = deployment_dir(ctx.state_dir).join(deployment.manifest_file());
    ctx.fs()
        .read_to_string(&path)
        .map_err(|e| anyhow::anyhow!("Could not read the {} manifest {}: {}", deployment.as_str(), path.display(), e))
}

/// Deployment vars for `create-env`: every engine output plus the names the
/// manifests expect
pub(crate) fn deployment_vars(state: &State, outputs: &Outputs) -> anyhow::Result<String> {
    let mut vars = serde_yaml::Mapping::new();
    for (name, value) in outputs.rendered() {
        vars.insert(name.into(), value.into());
    }
    vars.insert("env_id".into(), state.env_id.clone().into());
    if let Some(iaas) = state.iaas {
        vars.insert("iaas".into(), iaas.as_str().into());
    }
    if !state.director_vm.name.is_empty() {
        vars.insert("director_name".into(), state.director_vm.name.clone().into());
    }
    Ok(serde_yaml::to_string(&vars)?)
}

pub(crate) fn deployment_input(
    manifest: String,
    vars: String,
    variables: &str,
    deployment_state: &str,
    proxy: Option<String>,
) -> DeploymentInput {
    DeploymentInput {
        manifest,
        vars,
        variables: variables.to_string(),
        state: deployment_state.to_string(),
        proxy,
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Fakes for handler tests

    use super::*;
    use crate::logger::Buffer;
    use bbl_bosh::{BoshError, DeploymentRun, DirectorTarget};
    use bbl_cloud::{
        ConventionalZoneRetriever, DirectorClient, DirectorClientFactory, DirectorInfo,
        DomainZoneLookup, RecordedInfrastructureChecker,
    };
    use bbl_core::OsFilesystem;
    use bbl_terraform::{EngineRun, Inputs, TerraformError};
    use std::sync::Mutex;

    /// Every engine call in the order it was made, shared by the fakes
    pub type CallLog = Arc<Mutex<Vec<String>>>;

    pub const TF_STATE: &str = r#"{"version":4,"outputs":{"jumpbox_url":{"value":"35.1.2.3:22"},"director_address":{"value":"https://10.0.0.6:25555"},"internal_cidr":{"value":"10.0.0.0/16"},"network_name":{"value":"env1-network"},"subnetwork_name":{"value":"env1-subnet"},"internal_tag_name":{"value":"env1-internal"}},"resources":[{"type":"google_compute_network"}]}"#;

    #[derive(Default)]
    pub struct FakeTerraform {
        pub fail: bool,
        pub calls: CallLog,
    }

    #[async_trait]
    impl InfrastructureEngine for FakeTerraform {
        async fn apply(&self, _dir: &Path, _inputs: &Inputs, _tf_state: &str) -> EngineRun {
            self.calls.lock().unwrap().push("apply".to_string());
            EngineRun {
                tf_state: TF_STATE.to_string(),
                output: "Apply complete!".to_string(),
                result: if self.fail {
                    Err(TerraformError::CommandFailed {
                        command: "apply".to_string(),
                        output: "quota exceeded".to_string(),
                    })
                } else {
                    Ok(())
                },
            }
        }

        async fn destroy(&self, _dir: &Path, _inputs: &Inputs, _tf_state: &str) -> EngineRun {
            self.calls.lock().unwrap().push("destroy".to_string());
            EngineRun {
                tf_state: String::new(),
                output: "Destroy complete!".to_string(),
                result: if self.fail {
                    Err(TerraformError::CommandFailed {
                        command: "destroy".to_string(),
                        output: "in use".to_string(),
                    })
                } else {
                    Ok(())
                },
            }
        }
    }

    #[derive(Default)]
    pub struct FakeBosh {
        pub fail_on: Option<(&'static str, Deployment)>,
        pub calls: CallLog,
    }

    impl FakeBosh {
        fn run(&self, command: &'static str, deployment: Deployment, input: &DeploymentInput) -> DeploymentRun {
            self.calls
                .lock()
                .unwrap()
                .push(format!("{} {}", command, deployment.as_str()));
            let failed = self.fail_on == Some((command, deployment));
            let variables = match deployment {
                Deployment::Jumpbox => "jumpbox_ssh:\n  private_key: JUMPBOX-KEY\n  public_key: JUMPBOX-PUB\n",
                Deployment::Director => "admin_password: s3cret\ndirector_ssl:\n  ca: DIRECTOR-CA\n",
            };
            DeploymentRun {
                variables: if input.variables.is_empty() || command == "create-env" {
                    variables.to_string()
                } else {
                    input.variables.clone()
                },
                state: format!("{}-{}", deployment.as_str(), command),
                output: String::new(),
                result: if failed {
                    Err(BoshError::CommandFailed {
                        command: command.to_string(),
                        output: "boom".to_string(),
                    })
                } else {
                    Ok(())
                },
            }
        }
    }

    #[async_trait]
    impl DeploymentEngine for FakeBosh {
        async fn create_env(&self, deployment: Deployment, input: &DeploymentInput) -> DeploymentRun {
            self.run("create-env", deployment, input)
        }

        async fn delete_env(&self, deployment: Deployment, input: &DeploymentInput) -> DeploymentRun {
            self.run("delete-env", deployment, input)
        }

        async fn update_cloud_config(
            &self,
            target: &DirectorTarget,
            _base: &str,
            _overlay: &str,
            _vars: &str,
        ) -> bbl_bosh::Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("update-cloud-config {}", target.address));
            Ok(String::new())
        }
    }

    pub struct ReachableDirector;

    #[async_trait]
    impl DirectorClient for ReachableDirector {
        async fn info(&self) -> bbl_cloud::Result<DirectorInfo> {
            Ok(DirectorInfo {
                name: "bosh-env1".to_string(),
                uuid: "uuid".to_string(),
                version: "270.0.0".to_string(),
            })
        }
    }

    impl DirectorClientFactory for ReachableDirector {
        fn client(&self, _state: &State) -> bbl_cloud::Result<Box<dyn DirectorClient>> {
            Ok(Box::new(ReachableDirector))
        }
    }

    #[derive(Default)]
    pub struct FakeLeftovers {
        pub calls: Mutex<Vec<Vec<String>>>,
    }

    #[async_trait]
    impl LeftoversRunner for FakeLeftovers {
        async fn run(&self, args: &[String], _env: &[(String, String)]) -> anyhow::Result<String> {
            self.calls.lock().unwrap().push(args.to_vec());
            Ok("nothing to delete".to_string())
        }
    }

    pub struct Harness {
        pub dir: tempfile::TempDir,
        pub flags: GlobalFlags,
        pub output: Buffer,
        pub log: CallLog,
        pub leftovers: Arc<FakeLeftovers>,
        pub collaborators: Collaborators,
    }

    impl Harness {
        pub fn new() -> Self {
            Self::with(FakeTerraform::default(), FakeBosh::default())
        }

        pub fn with(terraform: FakeTerraform, mut bosh: FakeBosh) -> Self {
            let output = Buffer::default();
            let log = terraform.calls.clone();
            bosh.calls = log.clone();
            let leftovers = Arc::new(FakeLeftovers::default());
            let collaborators = Collaborators {
                fs: Arc::new(OsFilesystem),
                logger: Arc::new(Logger::new(output.clone())),
                projector: ProviderInputProjector::new(
                    Arc::new(ConventionalZoneRetriever),
                    Arc::new(DomainZoneLookup),
                ),
                infrastructure: Arc::new(terraform),
                deployment: Arc::new(bosh),
                environment: EnvironmentValidator::new(
                    Arc::new(RecordedInfrastructureChecker),
                    Arc::new(ReachableDirector),
                ),
                overlay: CloudConfigOverlayGenerator::new(),
                leftovers: leftovers.clone(),
            };
            let flags = GlobalFlags {
                no_confirm: true,
                ..Default::default()
            };
            Self {
                dir: tempfile::TempDir::new().unwrap(),
                flags,
                output,
                log,
                leftovers,
                collaborators,
            }
        }

        pub fn ctx(&self) -> Context<'_> {
            Context {
                state_dir: self.dir.path(),
                flags: &self.flags,
                collaborators: &self.collaborators,
            }
        }

        /// Manifests for both deployments in the default deployment directory
        pub fn with_manifests(self) -> Self {
            let dir = self.dir.path().join(bbl_bosh::cli::DEPLOYMENT_DIR);
            std::fs::create_dir_all(&dir).unwrap();
            std::fs::write(dir.join("jumpbox.yml"), "name: jumpbox\n").unwrap();
            std::fs::write(dir.join("bosh.yml"), "name: bosh\n").unwrap();
            self
        }

        pub fn calls(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    pub fn args(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    /// A built GCP environment with a jumpbox and director
    pub fn deployed_state() -> State {
        let mut state = State {
            iaas: Some(bbl_core::Iaas::Gcp),
            env_id: "env1".to_string(),
            tf_state: TF_STATE.to_string(),
            ..Default::default()
        };
        state.gcp.region = "us-west1".to_string();
        state.gcp.zone = "us-west1-a".to_string();
        state.gcp.zones = vec!["us-west1-a".to_string()];
        state.gcp.project_id = "proj".to_string();
        state.jumpbox.url = "35.1.2.3:22".to_string();
        state.jumpbox.manifest = "name: jumpbox\n".to_string();
        state.jumpbox.variables =
            "jumpbox_ssh:\n  private_key: JUMPBOX-KEY\n  public_key: JUMPBOX-PUB\n".to_string();
        state.jumpbox.state = "{}".to_string();
        state.director_vm.name = "bosh-env1".to_string();
        state.director_vm.address = "https://10.0.0.6:25555".to_string();
        state.director_vm.username = "admin".to_string();
        state.director_vm.password = "s3cret".to_string();
        state.director_vm.ca_cert = "DIRECTOR-CA".to_string();
        state.director_vm.manifest = "name: bosh\n".to_string();
        state.director_vm.state = "{}".to_string();
        state.key_pair.private_key = "JUMPBOX-KEY".to_string();
        state
    }
}
