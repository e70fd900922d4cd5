use super::{Command, Context, Outcome, recorded_outputs};
use async_trait::async_trait;
use bbl_core::{LbType, State};

/// Prints the load balancer recorded for the environment
pub struct Lbs;

fn lb_output(name: &str) -> bool {
    name.contains("lb") || name.contains("router") || name.ends_with("name_servers")
}

#[async_trait]
impl Command for Lbs {
    async fn execute(&self, ctx: &Context<'_>, _args: &[String], state: State) -> Outcome {
        if let Err(e) = ctx.collaborators.environment.validate(&state).await {
            return Outcome::failed(state, e);
        }
        if state.lb.lb_type == LbType::None {
            return Outcome::failed(state, anyhow::anyhow!("no lbs found"));
        }
        let outputs = match recorded_outputs(&state) {
            Ok(outputs) => outputs,
            Err(e) => return Outcome::failed(state, e),
        };

        let logger = ctx.logger();
        logger.println(&format!("LB type: {}", state.lb.lb_type));
        if !state.lb.domain.is_empty() {
            logger.println(&format!("Domain: {}", state.lb.domain));
        }
        for (name, value) in outputs.rendered() {
            if lb_output(&name) {
                logger.println(&format!("{}: {}", name, value));
            }
        }
        Outcome::ok(state)
    }

    fn usage(&self) -> String {
        "lbs".to_string()
    }
}
