//! Commands that print a single recorded value

use super::{Command, Context, Outcome, jumpbox_private_key};
use async_trait::async_trait;
use bbl_core::State;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Query {
    JumpboxAddress,
    DirectorAddress,
    DirectorUsername,
    DirectorPassword,
    DirectorCaCert,
    SshKey,
    EnvId,
}

impl Query {
    pub const ALL: [Query; 7] = [
        Query::JumpboxAddress,
        Query::DirectorAddress,
        Query::DirectorUsername,
        Query::DirectorPassword,
        Query::DirectorCaCert,
        Query::SshKey,
        Query::EnvId,
    ];

    pub fn command(&self) -> &'static str {
        match self {
            Query::JumpboxAddress => "jumpbox-address",
            Query::DirectorAddress => "director-address",
            Query::DirectorUsername => "director-username",
            Query::DirectorPassword => "director-password",
            Query::DirectorCaCert => "director-ca-cert",
            Query::SshKey => "ssh-key",
            Query::EnvId => "env-id",
        }
    }

    fn thing(&self) -> &'static str {
        match self {
            Query::JumpboxAddress => "jumpbox address",
            Query::DirectorAddress => "director address",
            Query::DirectorUsername => "director username",
            Query::DirectorPassword => "director password",
            Query::DirectorCaCert => "director ca cert",
            Query::SshKey => "ssh key",
            Query::EnvId => "environment id",
        }
    }

    /// Director credentials only exist when bbl created the director
    fn needs_director(&self) -> bool {
        matches!(
            self,
            Query::DirectorUsername | Query::DirectorPassword | Query::DirectorCaCert
        )
    }

    fn value(&self, state: &State) -> Option<String> {
        let value = match self {
            Query::JumpboxAddress => state.jumpbox.url.clone(),
            Query::DirectorAddress => state.director_vm.address.clone(),
            Query::DirectorUsername => state.director_vm.username.clone(),
            Query::DirectorPassword => state.director_vm.password.clone(),
            Query::DirectorCaCert => state.director_vm.ca_cert.clone(),
            Query::SshKey => jumpbox_private_key(state).unwrap_or_default(),
            Query::EnvId => state.env_id.clone(),
        };
        Some(value).filter(|v| !v.is_empty())
    }
}

#[async_trait]
impl Command for Query {
    async fn execute(&self, ctx: &Context<'_>, _args: &[String], state: State) -> Outcome {
        if self.needs_director() && state.no_director {
            return Outcome::failed(state, anyhow::anyhow!("Error BBL does not manage this director."));
        }
        match self.value(&state) {
            Some(value) => {
                ctx.logger().println(&value);
                Outcome::ok(state)
            }
            None => {
                let message = format!(
                    "Could not retrieve {}, please make sure you are targeting the proper state dir.",
                    self.thing()
                );
                Outcome::failed(state, anyhow::anyhow!(message))
            }
        }
    }

    fn usage(&self) -> String {
        self.command().to_string()
    }
}

/// Prints the captured output of the last infrastructure run
pub struct LatestError;

#[async_trait]
impl Command for LatestError {
    async fn execute(&self, ctx: &Context<'_>, _args: &[String], state: State) -> Outcome {
        ctx.logger().println(&state.latest_tf_output);
        Outcome::ok(state)
    }

    fn usage(&self) -> String {
        "latest-error".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{Harness, deployed_state};

    #[tokio::test]
    async fn test_prints_values() {
        let harness = Harness::new();
        for query in [Query::DirectorAddress, Query::SshKey, Query::EnvId] {
            query
                .execute(&harness.ctx(), &[], deployed_state())
                .await
                .result
                .unwrap();
        }
        assert_eq!(
            harness.output.contents(),
            "https://10.0.0.6:25555\nJUMPBOX-KEY\nenv1\n"
        );
    }

    #[tokio::test]
    async fn test_missing_value() {
        let harness = Harness::new();
        let outcome = Query::JumpboxAddress
            .execute(&harness.ctx(), &[], State::default())
            .await;
        assert_eq!(
            outcome.result.unwrap_err().to_string(),
            "Could not retrieve jumpbox address, please make sure you are targeting the proper state dir."
        );
    }

    #[tokio::test]
    async fn test_ssh_key_falls_back_to_vars_store() {
        let harness = Harness::new();
        let mut state = deployed_state();
        state.key_pair.private_key.clear();
        Query::SshKey
            .execute(&harness.ctx(), &[], state)
            .await
            .result
            .unwrap();
        assert_eq!(harness.output.contents(), "JUMPBOX-KEY\n");
    }

    #[tokio::test]
    async fn test_no_director() {
        let harness = Harness::new();
        let mut state = deployed_state();
        state.no_director = true;
        let outcome = Query::DirectorPassword
            .execute(&harness.ctx(), &[], state)
            .await;
        assert_eq!(
            outcome.result.unwrap_err().to_string(),
            "Error BBL does not manage this director."
        );
    }

    #[tokio::test]
    async fn test_latest_error() {
        let harness = Harness::new();
        let mut state = State::default();
        state.latest_tf_output = "Error: quota exceeded".to_string();
        LatestError
            .execute(&harness.ctx(), &[], state)
            .await
            .result
            .unwrap();
        assert_eq!(harness.output.contents(), "Error: quota exceeded\n");
    }
}
