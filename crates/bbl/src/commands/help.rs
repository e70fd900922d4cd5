use super::{Command, Context, Outcome, builtin};
use async_trait::async_trait;
use bbl_config::{COMMANDS, GlobalFlags, lookup};
use bbl_core::State;
use clap::CommandFactory;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Usage for every command, or for the command named in the first argument
pub struct Help;

impl Help {
    pub fn render(topic: Option<&str>) -> String {
        if let Some(info) = topic.and_then(lookup) {
            let usage = builtin()
                .get(info.name)
                .map(|command| command.usage())
                .filter(|usage| !usage.is_empty())
                .unwrap_or_else(|| info.name.to_string());
            return format!(
                "Usage:\n  bbl [GLOBAL OPTIONS] {}\n\n  {}\n",
                usage, info.summary
            );
        }

        let width = COMMANDS.iter().map(|c| c.name.len()).max().unwrap_or(0);
        let mut out = String::from("Usage:\n  bbl [GLOBAL OPTIONS] COMMAND [OPTIONS]\n\nCommands:\n");
        for command in COMMANDS {
            out.push_str(&format!(
                "  {:width$}  {}\n",
                command.name,
                command.summary,
                width = width
            ));
        }
        out.push_str("\nGlobal Options:\n");
        let global = GlobalFlags::command().render_help().to_string();
        // drop clap's own usage line; the one above covers it
        let options = global
            .split_once("Options:\n")
            .map(|(_, options)| options)
            .unwrap_or(&global);
        out.push_str(options);
        out
    }
}

#[async_trait]
impl Command for Help {
    async fn execute(&self, ctx: &Context<'_>, args: &[String], state: State) -> Outcome {
        ctx.logger()
            .println(Self::render(args.first().map(String::as_str)).trim_end());
        Outcome::ok(state)
    }

    fn usage(&self) -> String {
        "help [COMMAND]".to_string()
    }
}

pub struct Version;

#[async_trait]
impl Command for Version {
    async fn execute(&self, ctx: &Context<'_>, _args: &[String], state: State) -> Outcome {
        ctx.logger().println(&format!("bbl {}", VERSION));
        Outcome::ok(state)
    }

    fn usage(&self) -> String {
        "version".to_string()
    }
}
