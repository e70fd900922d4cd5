use super::{
    Command, Context, Outcome, PROGRESS_INTERVAL, deployment_input, deployment_vars,
    jumpbox_proxy, manifest, parse_args, recorded_outputs, with_progress,
};
use anyhow::Context as _;
use async_trait::async_trait;
use bbl_bosh::{Deployment, DirectorTarget, variable};
use bbl_cloudconfig::BASE_CLOUD_CONFIG;
use bbl_core::{LbType, State};
use bbl_terraform::write_tfvars;
use clap::Parser;

const DIRECTOR_PORT: u16 = 25555;
const DEFAULT_USERNAME: &str = "admin";

#[derive(Parser, Debug, Default)]
#[command(name = "up", no_binary_name = true)]
struct UpArgs {
    /// Name to assign to your BOSH director (optional, will be randomly generated)
    #[arg(long)]
    name: Option<String>,

    /// Skips creating BOSH environment
    #[arg(long)]
    no_director: bool,

    /// Load balancer(s) type: "concourse" or "cf"
    #[arg(long)]
    lb_type: Option<String>,

    /// Path to SSL certificate (supported when type="cf")
    #[arg(long)]
    lb_cert: Option<String>,

    /// Path to SSL certificate key (supported when type="cf")
    #[arg(long)]
    lb_key: Option<String>,

    /// Path to SSL certificate chain (supported when iaas="aws")
    #[arg(long)]
    lb_chain: Option<String>,

    /// Creates a DNS zone and records for the given domain (supported when type="cf")
    #[arg(long)]
    lb_domain: Option<String>,
}

/// `up`, or `plan` when `apply` is false
pub struct Up {
    apply: bool,
}

impl Up {
    pub fn apply() -> Self {
        Self { apply: true }
    }

    pub fn plan_only() -> Self {
        Self { apply: false }
    }
}

#[async_trait]
impl Command for Up {
    async fn execute(&self, ctx: &Context<'_>, args: &[String], state: State) -> Outcome {
        let mut state = match prepare(ctx, args, state.clone()) {
            Ok(prepared) => prepared,
            Err(e) => return Outcome::failed(state, e),
        };
        if let Err(e) = ctx.collaborators.projector.record_zones(&mut state).await {
            return Outcome::failed(state, e);
        }

        if !self.apply {
            return match plan(ctx, &state).await {
                Ok(()) => Outcome::ok(state),
                Err(e) => Outcome::failed(state, e),
            };
        }
        up(ctx, state).await
    }

    fn usage(&self) -> String {
        let name = if self.apply { "up" } else { "plan" };
        format!(
            "{} [--name <env-name>] [--no-director] [--lb-type <type>] [--lb-cert <path>] [--lb-key <path>] [--lb-chain <path>] [--lb-domain <domain>]",
            name
        )
    }
}

/// Apply the subcommand flags to the state
fn prepare(ctx: &Context<'_>, args: &[String], mut state: State) -> anyhow::Result<State> {
    let args: UpArgs = parse_args(args)?;

    match (&args.name, state.env_id.is_empty()) {
        (Some(name), false) if *name != state.env_id => anyhow::bail!(
            "The env name cannot be changed for an existing environment. The current env name is {}.",
            state.env_id
        ),
        (Some(name), true) => state.env_id = name.clone(),
        (None, true) => state.env_id = generate_env_id(),
        _ => {}
    }

    if args.no_director {
        if !state.director_vm.address.is_empty() && !state.no_director {
            anyhow::bail!(
                "Director already exists, you must re-create your environment to use \"--no-director\""
            );
        }
        state.no_director = true;
    }
    if !state.no_director && state.director_vm.name.is_empty() {
        state.director_vm.name = format!("bosh-{}", state.env_id);
    }

    if let Some(lb_type) = &args.lb_type {
        let lb_type: LbType = lb_type.parse().map_err(anyhow::Error::msg)?;
        if lb_type != LbType::None {
            let cert = args
                .lb_cert
                .as_deref()
                .context("--lb-cert is required when --lb-type is set")?;
            let key = args
                .lb_key
                .as_deref()
                .context("--lb-key is required when --lb-type is set")?;
            state.lb.cert = read_file(ctx, cert)?;
            state.lb.key = read_file(ctx, key)?;
            if let Some(chain) = &args.lb_chain {
                state.lb.chain = read_file(ctx, chain)?;
            }
            if let Some(domain) = &args.lb_domain {
                state.lb.domain = domain.clone();
            }
        }
        state.lb.lb_type = lb_type;
    }

    Ok(state)
}

fn read_file(ctx: &Context<'_>, path: &str) -> anyhow::Result<String> {
    ctx.fs()
        .read_to_string(std::path::Path::new(path))
        .with_context(|| format!("Could not read {}", path))
}

/// `bbl-env-<word>-<UTC timestamp>`
fn generate_env_id() -> String {
    const WORDS: [&str; 8] = [
        "amazon", "danube", "ganges", "hudson", "indus", "nile", "volga", "yukon",
    ];
    let now = chrono::Utc::now();
    let word = WORDS[now.timestamp_subsec_nanos() as usize % WORDS.len()];
    format!("bbl-env-{}-{}", word, now.format("%Y-%m-%dt%H-%Mz"))
}

async fn plan(ctx: &Context<'_>, state: &State) -> anyhow::Result<()> {
    ctx.logger().step("generating terraform variables");
    let inputs = ctx.collaborators.projector.generate(state).await?;
    let path = write_tfvars(ctx.fs(), ctx.state_dir, &inputs)?;
    ctx.logger().println(&format!("wrote {}", path.display()));
    Ok(())
}

async fn up(ctx: &Context<'_>, mut state: State) -> Outcome {
    let inputs = match ctx.collaborators.projector.generate(&state).await {
        Ok(inputs) => inputs,
        Err(e) => return Outcome::failed(state, e),
    };

    ctx.logger().step("applying infrastructure");
    let run = with_progress(
        ctx.logger(),
        PROGRESS_INTERVAL,
        ctx.collaborators.infrastructure.apply(ctx.state_dir, &inputs, &state.tf_state),
    )
    .await;
    state.tf_state = run.tf_state;
    state.latest_tf_output = run.output;
    if let Err(e) = run.result {
        return Outcome::failed(state, e);
    }
    ctx.logger().step("applied infrastructure");

    if state.no_director {
        ctx.logger().step("skipping director creation");
        return Outcome::ok(state);
    }

    if let Err(e) = create_jumpbox(ctx, &mut state).await {
        return Outcome::failed(state, e);
    }
    if let Err(e) = create_director(ctx, &mut state).await {
        return Outcome::failed(state, e);
    }
    match update_cloud_config(ctx, &state).await {
        Ok(()) => Outcome::ok(state),
        Err(e) => Outcome::failed(state, e),
    }
}

pub(super) async fn create_jumpbox(ctx: &Context<'_>, state: &mut State) -> anyhow::Result<()> {
    let outputs = recorded_outputs(state)?;
    let manifest = manifest(ctx, Deployment::Jumpbox, &state.jumpbox.manifest)?;
    let input = deployment_input(
        manifest.clone(),
        deployment_vars(state, &outputs)?,
        &state.jumpbox.variables,
        &state.jumpbox.state,
        None,
    );

    ctx.logger().step("creating jumpbox");
    let run = with_progress(
        ctx.logger(),
        PROGRESS_INTERVAL,
        ctx.collaborators.deployment.create_env(Deployment::Jumpbox, &input),
    )
    .await;
    state.jumpbox.variables = run.variables;
    state.jumpbox.state = run.state;
    state.jumpbox.manifest = manifest;
    if let Some(url) = outputs.string("jumpbox_url") {
        state.jumpbox.url = url;
    }
    run.result?;

    state.key_pair.private_key =
        variable(&state.jumpbox.variables, &["jumpbox_ssh", "private_key"]).unwrap_or_default();
    state.key_pair.public_key =
        variable(&state.jumpbox.variables, &["jumpbox_ssh", "public_key"]).unwrap_or_default();
    ctx.logger().step("created jumpbox");
    Ok(())
}

async fn create_director(ctx: &Context<'_>, state: &mut State) -> anyhow::Result<()> {
    let outputs = recorded_outputs(state)?;
    let manifest = manifest(ctx, Deployment::Director, &state.director_vm.manifest)?;
    let input = deployment_input(
        manifest.clone(),
        deployment_vars(state, &outputs)?,
        &state.director_vm.variables,
        &state.director_vm.state,
        jumpbox_proxy(ctx, state)?,
    );

    ctx.logger().step("creating bosh director");
    let run = with_progress(
        ctx.logger(),
        PROGRESS_INTERVAL,
        ctx.collaborators.deployment.create_env(Deployment::Director, &input),
    )
    .await;
    state.director_vm.variables = run.variables;
    state.director_vm.state = run.state;
    state.director_vm.manifest = manifest;
    run.result?;

    let vm = &mut state.director_vm;
    vm.address = outputs
        .string("director_address")
        .or_else(|| {
            outputs
                .string("internal_ip")
                .map(|ip| format!("https://{}:{}", ip, DIRECTOR_PORT))
        })
        .unwrap_or_default();
    if vm.username.is_empty() {
        vm.username = DEFAULT_USERNAME.to_string();
    }
    vm.password = variable(&vm.variables, &["admin_password"]).unwrap_or_default();
    vm.ca_cert = variable(&vm.variables, &["director_ssl", "ca"]).unwrap_or_default();
    ctx.logger().step("created bosh director");
    Ok(())
}

async fn update_cloud_config(ctx: &Context<'_>, state: &State) -> anyhow::Result<()> {
    ctx.logger().step("generating cloud config");
    let overlay = ctx.collaborators.overlay.generate(state)?;
    let vars = ctx.collaborators.overlay.generate_vars(state)?;

    let target = DirectorTarget {
        address: state.director_vm.address.clone(),
        username: state.director_vm.username.clone(),
        password: state.director_vm.password.clone(),
        ca_cert: state.director_vm.ca_cert.clone(),
        proxy: jumpbox_proxy(ctx, state)?,
    };
    ctx.logger().step("applying cloud config");
    ctx.collaborators
        .deployment
        .update_cloud_config(&target, BASE_CLOUD_CONFIG, &overlay, &vars)
        .await?;
    tracing::debug!(address = %target.address, "Cloud config updated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{FakeBosh, FakeTerraform, Harness, args};
    use bbl_core::Iaas;

    fn gcp_state() -> State {
        let mut state = State {
            iaas: Some(Iaas::Gcp),
            ..Default::default()
        };
        state.gcp.region = "us-west1".to_string();
        state.gcp.zone = "us-west1-a".to_string();
        state.gcp.zones = vec!["us-west1-a".to_string()];
        state.gcp.project_id = "proj".to_string();
        state
    }

    #[tokio::test]
    async fn test_up_creates_everything_in_order() {
        let harness = Harness::new().with_manifests();
        let outcome = Up::apply()
            .execute(&harness.ctx(), &args(&["--name", "env1"]), gcp_state())
            .await;
        outcome.result.unwrap();

        assert_eq!(
            harness.calls(),
            vec![
                "apply",
                "create-env jumpbox",
                "create-env director",
                "update-cloud-config https://10.0.0.6:25555",
            ]
        );
        let state = outcome.state;
        assert_eq!(state.env_id, "env1");
        assert_eq!(state.director_vm.name, "bosh-env1");
        assert_eq!(state.director_vm.username, "admin");
        assert_eq!(state.director_vm.password, "s3cret");
        assert_eq!(state.director_vm.ca_cert, "DIRECTOR-CA");
        assert_eq!(state.jumpbox.url, "35.1.2.3:22");
        assert_eq!(state.key_pair.private_key, "JUMPBOX-KEY");
        assert_eq!(state.latest_tf_output, "Apply complete!");
        assert!(harness.dir.path().join(".bbl/jumpbox.key").is_file());
        assert!(harness.output.contents().contains("step: creating jumpbox\n"));
    }

    #[tokio::test]
    async fn test_failed_apply_keeps_engine_state() {
        let harness = Harness::with(
            FakeTerraform {
                fail: true,
                ..Default::default()
            },
            FakeBosh::default(),
        );
        let outcome = Up::apply()
            .execute(&harness.ctx(), &args(&["--name", "env1"]), gcp_state())
            .await;
        assert!(outcome.result.is_err());
        assert!(!outcome.state.tf_state.is_empty());
        assert_eq!(outcome.state.env_id, "env1");
        assert_eq!(harness.calls(), vec!["apply"]);
    }

    #[tokio::test]
    async fn test_failed_director_keeps_jumpbox() {
        let harness = Harness::with(
            FakeTerraform::default(),
            FakeBosh {
                fail_on: Some(("create-env", Deployment::Director)),
                ..Default::default()
            },
        )
        .with_manifests();
        let outcome = Up::apply()
            .execute(&harness.ctx(), &args(&["--name", "env1"]), gcp_state())
            .await;
        assert!(outcome.result.is_err());
        assert_eq!(outcome.state.jumpbox.state, "jumpbox-create-env");
        assert_eq!(outcome.state.director_vm.state, "director-create-env");
        assert!(outcome.state.director_vm.address.is_empty());
    }

    #[tokio::test]
    async fn test_no_director() {
        let harness = Harness::new();
        let outcome = Up::apply()
            .execute(
                &harness.ctx(),
                &args(&["--name", "env1", "--no-director"]),
                gcp_state(),
            )
            .await;
        outcome.result.unwrap();
        assert!(outcome.state.no_director);
        assert_eq!(harness.calls(), vec!["apply"]);
    }

    #[tokio::test]
    async fn test_env_name_is_immutable() {
        let harness = Harness::new();
        let mut state = gcp_state();
        state.env_id = "existing".to_string();
        let outcome = Up::apply()
            .execute(&harness.ctx(), &args(&["--name", "other"]), state)
            .await;
        assert_eq!(
            outcome.result.unwrap_err().to_string(),
            "The env name cannot be changed for an existing environment. The current env name is existing."
        );
        assert_eq!(outcome.state.env_id, "existing");
        assert!(harness.calls().is_empty());
    }

    #[tokio::test]
    async fn test_generated_env_id() {
        let harness = Harness::new();
        let outcome = Up::plan_only()
            .execute(&harness.ctx(), &[], gcp_state())
            .await;
        outcome.result.unwrap();
        assert!(outcome.state.env_id.starts_with("bbl-env-"));
    }

    #[tokio::test]
    async fn test_plan_writes_variables_only() {
        let harness = Harness::new();
        let outcome = Up::plan_only()
            .execute(&harness.ctx(), &args(&["--name", "env1"]), gcp_state())
            .await;
        outcome.result.unwrap();
        assert!(harness.calls().is_empty());

        let written = std::fs::read_to_string(harness.dir.path().join("vars/bbl.tfvars.json")).unwrap();
        let inputs: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(inputs["env_id"], "env1");
        assert_eq!(inputs["project_id"], "proj");
    }

    #[tokio::test]
    async fn test_plan_then_up_resumes() {
        let harness = Harness::new().with_manifests();
        let mut state = gcp_state();
        state.gcp.service_account_key = r#"{"project_id":"proj"}"#.to_string();
        let planned = Up::plan_only()
            .execute(&harness.ctx(), &args(&["--name", "env1"]), state)
            .await;
        planned.result.unwrap();
        assert_eq!(planned.state.director_vm.name, "bosh-env1");

        bbl_core::StateValidator::new()
            .validate(&planned.state)
            .unwrap();
        let outcome = Up::apply()
            .execute(&harness.ctx(), &[], planned.state)
            .await;
        outcome.result.unwrap();
        assert_eq!(outcome.state.env_id, "env1");
        assert!(outcome.state.director_vm.is_deployed());
    }

    #[tokio::test]
    async fn test_up_records_retrieved_gcp_zones() {
        let harness = Harness::new().with_manifests();
        let mut state = gcp_state();
        state.gcp.zone.clear();
        state.gcp.zones.clear();
        let outcome = Up::apply()
            .execute(&harness.ctx(), &args(&["--name", "env1"]), state)
            .await;
        outcome.result.unwrap();
        assert_eq!(outcome.state.gcp.zone, "us-west1-b");
        assert_eq!(
            outcome.state.gcp.zones,
            vec!["us-west1-b", "us-west1-c", "us-west1-d"]
        );
    }

    #[tokio::test]
    async fn test_lb_flags() {
        let harness = Harness::new();
        let cert = harness.dir.path().join("cert.pem");
        let key = harness.dir.path().join("key.pem");
        std::fs::write(&cert, "CERT").unwrap();
        std::fs::write(&key, "KEY").unwrap();
        let outcome = Up::plan_only()
            .execute(
                &harness.ctx(),
                &args(&[
                    "--name",
                    "env1",
                    "--lb-type",
                    "cf",
                    "--lb-cert",
                    cert.to_str().unwrap(),
                    "--lb-key",
                    key.to_str().unwrap(),
                    "--lb-domain",
                    "cf.example.com",
                ]),
                gcp_state(),
            )
            .await;
        outcome.result.unwrap();
        assert_eq!(outcome.state.lb.lb_type, LbType::Cf);
        assert_eq!(outcome.state.lb.cert, "CERT");
        assert_eq!(outcome.state.lb.domain, "cf.example.com");
    }

    #[tokio::test]
    async fn test_lb_type_requires_cert() {
        let harness = Harness::new();
        let outcome = Up::plan_only()
            .execute(
                &harness.ctx(),
                &args(&["--name", "env1", "--lb-type", "concourse"]),
                gcp_state(),
            )
            .await;
        assert!(
            outcome
                .result
                .unwrap_err()
                .to_string()
                .contains("--lb-cert")
        );
    }
}
