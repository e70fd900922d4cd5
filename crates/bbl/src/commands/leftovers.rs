use super::{Command, Context, Outcome, parse_args};
use async_trait::async_trait;
use bbl_core::{Iaas, State};
use clap::Parser;
use std::process::Stdio;
use tokio::process;

pub const BINARY_ENV: &str = "BBL_LEFTOVERS_BINARY";

#[derive(Parser, Debug)]
#[command(name = "cleanup-leftovers", no_binary_name = true)]
struct LeftoversArgs {
    /// Filters resources by name; defaults to the environment ID
    #[arg(long)]
    filter: Option<String>,

    /// List resources without deleting them
    #[arg(long)]
    dry_run: bool,
}

/// Runs the external `leftovers` binary
#[async_trait]
pub trait LeftoversRunner: Send + Sync {
    async fn run(&self, args: &[String], env: &[(String, String)]) -> anyhow::Result<String>;
}

pub struct LeftoversCli {
    binary: String,
}

impl LeftoversCli {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Binary from `BBL_LEFTOVERS_BINARY`, defaulting to `leftovers` on the PATH
    pub fn from_env() -> Self {
        let binary = std::env::var(BINARY_ENV)
            .ok()
            .filter(|b| !b.is_empty())
            .unwrap_or_else(|| "leftovers".to_string());
        Self::new(binary)
    }
}

#[async_trait]
impl LeftoversRunner for LeftoversCli {
    async fn run(&self, args: &[String], env: &[(String, String)]) -> anyhow::Result<String> {
        tracing::debug!("Running: {} {}", self.binary, args.join(" "));

        let output = process::Command::new(&self.binary)
            .args(args)
            .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    anyhow::anyhow!(
                        "{} not found in PATH; set {} to its location",
                        self.binary,
                        BINARY_ENV
                    )
                } else {
                    e.into()
                }
            })?;

        let combined = format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        if !output.status.success() {
            anyhow::bail!("leftovers failed:\n{}", combined.trim_end());
        }
        Ok(combined)
    }
}

/// Credentials for the provider, in the variables `leftovers` reads
fn credentials(state: &State, iaas: Iaas) -> Vec<(String, String)> {
    let pairs: Vec<(&str, &str)> = match iaas {
        Iaas::Aws => vec![
            ("BBL_AWS_ACCESS_KEY_ID", state.aws.access_key_id.as_str()),
            ("BBL_AWS_SECRET_ACCESS_KEY", state.aws.secret_access_key.as_str()),
            ("BBL_AWS_REGION", state.aws.region.as_str()),
        ],
        Iaas::Gcp => vec![(
            "BBL_GCP_SERVICE_ACCOUNT_KEY",
            state.gcp.service_account_key_path.as_str(),
        )],
        Iaas::Azure => vec![
            ("BBL_AZURE_CLIENT_ID", state.azure.client_id.as_str()),
            ("BBL_AZURE_CLIENT_SECRET", state.azure.client_secret.as_str()),
            ("BBL_AZURE_SUBSCRIPTION_ID", state.azure.subscription_id.as_str()),
            ("BBL_AZURE_TENANT_ID", state.azure.tenant_id.as_str()),
        ],
        Iaas::Vsphere => vec![
            ("BBL_VSPHERE_VCENTER_IP", state.vsphere.vcenter_ip.as_str()),
            ("BBL_VSPHERE_VCENTER_USER", state.vsphere.vcenter_user.as_str()),
            ("BBL_VSPHERE_VCENTER_PASSWORD", state.vsphere.vcenter_password.as_str()),
            ("BBL_VSPHERE_VCENTER_DC", state.vsphere.vcenter_dc.as_str()),
        ],
        Iaas::Openstack => vec![
            ("BBL_OPENSTACK_AUTH_URL", state.openstack.auth_url.as_str()),
            ("BBL_OPENSTACK_USERNAME", state.openstack.username.as_str()),
            ("BBL_OPENSTACK_PASSWORD", state.openstack.password.as_str()),
            ("BBL_OPENSTACK_PROJECT", state.openstack.project.as_str()),
            ("BBL_OPENSTACK_DOMAIN", state.openstack.domain.as_str()),
        ],
        Iaas::Cloudstack => vec![
            ("BBL_CLOUDSTACK_ENDPOINT", state.cloudstack.endpoint.as_str()),
            ("BBL_CLOUDSTACK_API_KEY", state.cloudstack.api_key.as_str()),
            ("BBL_CLOUDSTACK_SECRET_ACCESS_KEY", state.cloudstack.secret_access_key.as_str()),
        ],
    };
    pairs
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect()
}

/// `leftovers` and `cleanup-leftovers`; the state is returned unchanged
pub struct Leftovers;

#[async_trait]
impl Command for Leftovers {
    async fn execute(&self, ctx: &Context<'_>, args: &[String], state: State) -> Outcome {
        let args: LeftoversArgs = match parse_args(args) {
            Ok(args) => args,
            Err(e) => return Outcome::failed(state, e),
        };
        let Some(iaas) = state.iaas else {
            return Outcome::failed(state, bbl_core::CoreError::MissingIaas);
        };

        let filter = args.filter.unwrap_or_else(|| state.env_id.clone());
        let mut command = vec![
            "--iaas".to_string(),
            iaas.to_string(),
            "--filter".to_string(),
            filter,
            "--no-confirm".to_string(),
        ];
        if args.dry_run {
            command.push("--dry-run".to_string());
        }

        ctx.logger().step("cleaning up leftovers");
        let result = ctx
            .collaborators
            .leftovers
            .run(&command, &credentials(&state, iaas))
            .await
            .map(|output| {
                if !output.is_empty() {
                    ctx.logger().println(output.trim_end());
                }
            });
        Outcome { state, result }
    }

    fn usage(&self) -> String {
        "cleanup-leftovers [--filter <name-filter>] [--dry-run]".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{Harness, args, deployed_state};

    #[tokio::test]
    async fn test_defaults_filter_to_env_id() {
        let harness = Harness::new();
        let state = deployed_state();
        let outcome = Leftovers.execute(&harness.ctx(), &[], state.clone()).await;
        outcome.result.unwrap();
        assert_eq!(outcome.state, state);
        assert_eq!(
            harness.leftovers.calls.lock().unwrap()[0],
            args(&["--iaas", "gcp", "--filter", "env1", "--no-confirm"])
        );
        assert!(harness.output.contents().contains("nothing to delete"));
    }

    #[tokio::test]
    async fn test_filter_and_dry_run() {
        let harness = Harness::new();
        Leftovers
            .execute(
                &harness.ctx(),
                &args(&["--filter", "other", "--dry-run"]),
                deployed_state(),
            )
            .await
            .result
            .unwrap();
        assert_eq!(
            harness.leftovers.calls.lock().unwrap()[0],
            args(&["--iaas", "gcp", "--filter", "other", "--no-confirm", "--dry-run"])
        );
    }

    #[test]
    fn test_credentials_skip_empty_values() {
        let mut state = State::default();
        state.aws.access_key_id = "key".to_string();
        let env = credentials(&state, Iaas::Aws);
        assert_eq!(
            env,
            vec![("BBL_AWS_ACCESS_KEY_ID".to_string(), "key".to_string())]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cli_reports_failure() {
        let cli = LeftoversCli::new("false");
        let err = cli.run(&[], &[]).await.unwrap_err();
        assert!(err.to_string().starts_with("leftovers failed"));
    }
}
