use super::{
    Command, Context, Outcome, PROGRESS_INTERVAL, deployment_input, jumpbox_proxy, manifest,
    parse_args, with_progress,
};
use async_trait::async_trait;
use bbl_bosh::Deployment;
use bbl_cloud::CloudError;
use bbl_core::State;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "down", no_binary_name = true)]
struct DownArgs {
    /// Gracefully exit if there is no state file
    #[arg(long)]
    skip_if_missing: bool,
}

/// Tears down the director, then the jumpbox, then the infrastructure
pub struct Down;

#[async_trait]
impl Command for Down {
    async fn execute(&self, ctx: &Context<'_>, args: &[String], state: State) -> Outcome {
        let args: DownArgs = match parse_args(args) {
            Ok(args) => args,
            Err(e) => return Outcome::failed(state, e),
        };

        if state.infrastructure_id().is_none() && state.director_vm.state.is_empty() {
            if args.skip_if_missing {
                ctx.logger().println(
                    "state file not found, and --skip-if-missing flag provided, exiting",
                );
                return Outcome::ok(state);
            }
            return Outcome::failed(state, CloudError::BblNotFound);
        }

        if !ctx.flags.no_confirm
            && !ctx.logger().prompt(&format!(
                "Are you sure you want to delete infrastructure for {}? This operation cannot be undone!",
                state.env_id
            ))
        {
            return Outcome::ok(state);
        }

        destroy(ctx, state).await
    }

    fn usage(&self) -> String {
        "down [--skip-if-missing]".to_string()
    }
}

async fn destroy(ctx: &Context<'_>, mut state: State) -> Outcome {
    if !state.director_vm.state.is_empty() {
        ctx.logger().step("destroying bosh director");
        if let Err(e) = delete(ctx, &mut state, Deployment::Director).await {
            return Outcome::failed(state, e);
        }
        state.director_vm = Default::default();
    }

    if !state.jumpbox.state.is_empty() {
        ctx.logger().step("destroying jumpbox");
        if let Err(e) = delete(ctx, &mut state, Deployment::Jumpbox).await {
            return Outcome::failed(state, e);
        }
        state.jumpbox = Default::default();
        state.key_pair = Default::default();
    }

    if !state.tf_state.is_empty() {
        ctx.logger().step("destroying infrastructure");
        let inputs = match ctx.collaborators.projector.generate(&state).await {
            Ok(inputs) => inputs,
            Err(e) => return Outcome::failed(state, e),
        };
        let run = with_progress(
            ctx.logger(),
            PROGRESS_INTERVAL,
            ctx.collaborators.infrastructure.destroy(ctx.state_dir, &inputs, &state.tf_state),
        )
        .await;
        state.tf_state = run.tf_state;
        state.latest_tf_output = run.output;
        if let Err(e) = run.result {
            return Outcome::failed(state, e);
        }
    }

    ctx.logger().step("finished destroying infrastructure");
    Outcome::ok(State::default())
}

async fn delete(ctx: &Context<'_>, state: &mut State, deployment: Deployment) -> anyhow::Result<()> {
    let proxy = match deployment {
        Deployment::Director => jumpbox_proxy(ctx, state)?,
        Deployment::Jumpbox => None,
    };
    let (recorded_manifest, variables, deployment_state) = match deployment {
        Deployment::Director => (
            &state.director_vm.manifest,
            &state.director_vm.variables,
            &state.director_vm.state,
        ),
        Deployment::Jumpbox => (
            &state.jumpbox.manifest,
            &state.jumpbox.variables,
            &state.jumpbox.state,
        ),
    };
    let input = deployment_input(
        manifest(ctx, deployment, recorded_manifest)?,
        String::new(),
        variables,
        deployment_state,
        proxy,
    );

    let run = with_progress(
        ctx.logger(),
        PROGRESS_INTERVAL,
        ctx.collaborators.deployment.delete_env(deployment, &input),
    )
    .await;
    match deployment {
        Deployment::Director => {
            state.director_vm.variables = run.variables;
            state.director_vm.state = run.state;
        }
        Deployment::Jumpbox => {
            state.jumpbox.variables = run.variables;
            state.jumpbox.state = run.state;
        }
    }
    Ok(run.result?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{FakeBosh, FakeTerraform, Harness, args, deployed_state};

    #[tokio::test]
    async fn test_down_removes_everything() {
        let harness = Harness::new();
        let outcome = Down.execute(&harness.ctx(), &[], deployed_state()).await;
        outcome.result.unwrap();
        assert!(outcome.state.is_empty());
        assert_eq!(
            harness.calls(),
            vec!["delete-env director", "delete-env jumpbox", "destroy"]
        );
        assert!(
            harness
                .output
                .contents()
                .contains("step: finished destroying infrastructure")
        );
    }

    #[tokio::test]
    async fn test_failed_director_delete_keeps_state() {
        let harness = Harness::with(
            FakeTerraform::default(),
            FakeBosh {
                fail_on: Some(("delete-env", Deployment::Director)),
                ..Default::default()
            },
        );
        let outcome = Down.execute(&harness.ctx(), &[], deployed_state()).await;
        assert!(outcome.result.is_err());
        assert_eq!(harness.calls(), vec!["delete-env director"]);
        assert_eq!(outcome.state.director_vm.state, "director-delete-env");
        assert_eq!(outcome.state.jumpbox.state, "{}");
        assert!(!outcome.state.tf_state.is_empty());
    }

    #[tokio::test]
    async fn test_failed_destroy_keeps_infrastructure() {
        let harness = Harness::with(
            FakeTerraform {
                fail: true,
                ..Default::default()
            },
            FakeBosh::default(),
        );
        let outcome = Down.execute(&harness.ctx(), &[], deployed_state()).await;
        assert!(outcome.result.is_err());
        assert!(outcome.state.director_vm.state.is_empty());
        assert!(outcome.state.jumpbox.state.is_empty());
        assert_eq!(outcome.state.latest_tf_output, "Destroy complete!");
        assert_eq!(outcome.state.env_id, "env1");
    }

    #[tokio::test]
    async fn test_missing_environment() {
        let harness = Harness::new();
        let outcome = Down.execute(&harness.ctx(), &[], State::default()).await;
        assert!(matches!(
            outcome.result.unwrap_err().downcast_ref::<CloudError>(),
            Some(CloudError::BblNotFound)
        ));
    }

    #[tokio::test]
    async fn test_skip_if_missing() {
        let harness = Harness::new();
        let outcome = Down
            .execute(&harness.ctx(), &args(&["--skip-if-missing"]), State::default())
            .await;
        outcome.result.unwrap();
        assert!(harness.calls().is_empty());
        assert!(harness.output.contents().contains("--skip-if-missing"));
    }
}
