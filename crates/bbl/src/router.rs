//! Command dispatch with save-on-failure
//!
//! The handler's state is persisted whenever the command modifies state,
//! including when the handler failed, so partial progress such as a created
//! jumpbox survives a failed director deploy.

use crate::commands::{Collaborators, Command, CommandSet, Context, Help, Outcome, builtin};
use bbl_config::Plan;
use bbl_core::{CoreError, StateStore};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RouterError {
    #[error("Unrecognized command '{0}'")]
    UnknownCommand(String),

    #[error(
        "\"{command}\" command failed with \"{exec}\", and the state failed to save with error \"{save}\""
    )]
    SaveFailed {
        command: String,
        exec: anyhow::Error,
        save: CoreError,
    },
}

pub struct CommandRouter {
    store: Arc<dyn StateStore>,
    commands: CommandSet,
    collaborators: Collaborators,
}

impl CommandRouter {
    pub fn new(store: Arc<dyn StateStore>, collaborators: Collaborators) -> Self {
        Self::with_commands(store, collaborators, builtin())
    }

    pub fn with_commands(
        store: Arc<dyn StateStore>,
        collaborators: Collaborators,
        commands: CommandSet,
    ) -> Self {
        Self {
            store,
            commands,
            collaborators,
        }
    }

    #[tracing::instrument(skip_all, fields(command = %plan.command))]
    pub async fn run(&self, plan: Plan) -> anyhow::Result<()> {
        let ctx = Context {
            state_dir: &plan.state_dir,
            flags: &plan.global_flags,
            collaborators: &self.collaborators,
        };

        let Some(handler) = self.commands.get(plan.command.as_str()) else {
            let help: Arc<dyn Command> = match self.commands.get("help") {
                Some(help) => help.clone(),
                None => Arc::new(Help),
            };
            help.execute(&ctx, &[], plan.state.clone()).await.result?;
            return Err(RouterError::UnknownCommand(plan.command.clone()).into());
        };

        let Outcome { state, result } = handler
            .execute(&ctx, &plan.command_args, plan.state.clone())
            .await;

        if !plan.modifies_state {
            return result;
        }

        tracing::debug!(state_dir = %plan.state_dir.display(), "Saving state");
        let saved = self.store.set(&plan.state_dir, &state);
        match (result, saved) {
            (Ok(()), Ok(())) => Ok(()),
            (Ok(()), Err(save)) => Err(save.into()),
            (Err(exec), Ok(())) => Err(exec),
            (Err(exec), Err(save)) => Err(RouterError::SaveFailed {
                command: plan.command.clone(),
                exec,
                save,
            }
            .into()),
        }
    }
}
