//! Splitting `argv` into global flags, subcommand and subcommand arguments
//!
//! Scan left to right. Known global options consume the following token as
//! their value; known switches and `--flag=value` forms consume nothing.
//! Flag-shaped tokens that are not global flags are forwarded to the
//! subcommand and never consume a value. The first remaining token that does
//! not start with `-` is the subcommand; everything after it belongs to the
//! subcommand untouched.

use crate::flags::{FlagShape, GlobalFlags};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitArgs {
    /// Tokens to hand to the global flag parser
    pub global: Vec<String>,
    pub command: Option<String>,
    /// Forwarded unknown flags followed by the tokens after the subcommand
    pub command_args: Vec<String>,
}

pub fn split(args: &[String]) -> SplitArgs {
    let mut split = SplitArgs::default();
    let mut forwarded = Vec::new();
    let mut tokens = args.iter();

    while let Some(token) = tokens.next() {
        if !token.starts_with('-') || token == "-" {
            split.command = Some(token.clone());
            break;
        }

        match GlobalFlags::shape_of(token) {
            FlagShape::TakesValue => {
                split.global.push(token.clone());
                if let Some(value) = tokens.next() {
                    split.global.push(value.clone());
                }
            }
            FlagShape::Switch | FlagShape::Inline => split.global.push(token.clone()),
            FlagShape::Unknown => {
                tracing::debug!(flag = %token, "Forwarding unknown flag to subcommand");
                forwarded.push(token.clone());
            }
        }
    }

    split.command_args = forwarded;
    split.command_args.extend(tokens.cloned());
    split
}
