use super::{Command, Context, JUMPBOX_KEY_FILE, Outcome, jumpbox_private_key};
use async_trait::async_trait;
use bbl_core::State;

/// Prints the environment variables the bosh CLI needs to reach the director
pub struct PrintEnv;

impl PrintEnv {
    fn render(ctx: &Context<'_>, state: &State) -> anyhow::Result<Vec<String>> {
        if state.director_vm.address.is_empty() {
            anyhow::bail!(
                "Could not retrieve director address, please make sure you are targeting the proper state dir."
            );
        }
        let vm = &state.director_vm;
        let mut lines = vec![
            format!("export BOSH_CLIENT={}", vm.username),
            format!("export BOSH_CLIENT_SECRET={}", vm.password),
            format!("export BOSH_CA_CERT='{}'", vm.ca_cert.trim_end()),
            format!("export BOSH_ENVIRONMENT={}", vm.address),
        ];

        if let (Some(key), false) = (jumpbox_private_key(state), state.jumpbox.url.is_empty()) {
            let path = ctx.write_credential(JUMPBOX_KEY_FILE, &key)?;
            lines.push(format!("export JUMPBOX_PRIVATE_KEY={}", path.display()));
            lines.push(format!(
                "export BOSH_ALL_PROXY=ssh+socks5://jumpbox@{}?private-key={}",
                state.jumpbox.url,
                path.display()
            ));
        }
        Ok(lines)
    }
}

#[async_trait]
impl Command for PrintEnv {
    async fn execute(&self, ctx: &Context<'_>, _args: &[String], state: State) -> Outcome {
        match Self::render(ctx, &state) {
            Ok(lines) => {
                for line in lines {
                    ctx.logger().println(&line);
                }
                Outcome::ok(state)
            }
            Err(e) => Outcome::failed(state, e),
        }
    }

    fn usage(&self) -> String {
        "print-env".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{Harness, deployed_state};

    #[tokio::test]
    async fn test_print_env() {
        let harness = Harness::new();
        PrintEnv
            .execute(&harness.ctx(), &[], deployed_state())
            .await
            .result
            .unwrap();

        let key_path = harness.dir.path().join(".bbl/jumpbox.key");
        assert_eq!(std::fs::read_to_string(&key_path).unwrap(), "JUMPBOX-KEY");
        let printed = harness.output.contents();
        assert!(printed.contains("export BOSH_CLIENT=admin\n"));
        assert!(printed.contains("export BOSH_CLIENT_SECRET=s3cret\n"));
        assert!(printed.contains("export BOSH_CA_CERT='DIRECTOR-CA'\n"));
        assert!(printed.contains("export BOSH_ENVIRONMENT=https://10.0.0.6:25555\n"));
        assert!(printed.contains(&format!("export JUMPBOX_PRIVATE_KEY={}\n", key_path.display())));
        assert!(printed.contains(&format!(
            "export BOSH_ALL_PROXY=ssh+socks5://jumpbox@35.1.2.3:22?private-key={}\n",
            key_path.display()
        )));
    }

    #[tokio::test]
    async fn test_without_jumpbox() {
        let harness = Harness::new();
        let mut state = deployed_state();
        state.jumpbox.url.clear();
        PrintEnv
            .execute(&harness.ctx(), &[], state)
            .await
            .result
            .unwrap();
        assert!(!harness.output.contents().contains("BOSH_ALL_PROXY"));
    }

    #[tokio::test]
    async fn test_without_director() {
        let harness = Harness::new();
        let outcome = PrintEnv
            .execute(&harness.ctx(), &[], State::default())
            .await;
        assert!(outcome.result.is_err());
    }
}
