use super::{Command, Context, Outcome, recorded_outputs};
use async_trait::async_trait;
use bbl_core::State;

/// Prints every infrastructure output as `name: value`
pub struct PrintOutputs;

#[async_trait]
impl Command for PrintOutputs {
    async fn execute(&self, ctx: &Context<'_>, _args: &[String], state: State) -> Outcome {
        if let Err(e) = ctx.collaborators.environment.validate(&state).await {
            return Outcome::failed(state, e);
        }
        let outputs = match recorded_outputs(&state) {
            Ok(outputs) => outputs,
            Err(e) => return Outcome::failed(state, e),
        };
        for (name, value) in outputs.rendered() {
            ctx.logger().println(&format!("{}: {}", name, value));
        }
        Outcome::ok(state)
    }

    fn usage(&self) -> String {
        "outputs".to_string()
    }
}
