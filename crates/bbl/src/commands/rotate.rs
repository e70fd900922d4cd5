use super::{Command, Context, Outcome, up::create_jumpbox};
use async_trait::async_trait;
use bbl_bosh::remove_variable;
use bbl_core::State;

/// Regenerates the jumpbox SSH key by dropping it from the vars-store and
/// re-creating the jumpbox
pub struct Rotate;

#[async_trait]
impl Command for Rotate {
    async fn execute(&self, ctx: &Context<'_>, _args: &[String], state: State) -> Outcome {
        if let Err(e) = ctx.collaborators.environment.validate(&state).await {
            return Outcome::failed(state, e);
        }
        if state.jumpbox.variables.is_empty() {
            return Outcome::failed(
                state,
                anyhow::anyhow!("Could not rotate the jumpbox SSH key: no jumpbox is recorded"),
            );
        }

        let mut rotated = state.clone();
        rotated.jumpbox.variables = match remove_variable(&state.jumpbox.variables, "jumpbox_ssh")
        {
            Ok(variables) => variables,
            Err(e) => return Outcome::failed(state, e),
        };

        ctx.logger().step("rotating jumpbox ssh key");
        match create_jumpbox(ctx, &mut rotated).await {
            Ok(()) => Outcome::ok(rotated),
            Err(e) => Outcome::failed(rotated, e),
        }
    }

    fn usage(&self) -> String {
        "rotate".to_string()
    }
}
