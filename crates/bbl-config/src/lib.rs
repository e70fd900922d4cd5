//! bbl configuration
//!
//! Turns `argv` plus `BBL_*` environment variables into a [`Plan`]: the
//! loaded, migrated and flag-merged state together with the subcommand to run.
//!
//! Loading order is fixed: parse flags → (remote state download) →
//! `StateStore::get` → `StateMigrator::migrate` → [`FlagMerger::merge`] →
//! (`StateValidator::validate` for state-modifying commands).

pub mod args;
pub mod commands;
pub mod error;
pub mod flags;
pub mod loader;
pub mod merge;
pub mod remote;

pub use commands::{COMMANDS, CommandInfo, lookup, modifies_state, tears_down};
pub use error::{ConfigError, Result};
pub use flags::GlobalFlags;
pub use loader::{ConfigurationLoader, Plan};
pub use merge::FlagMerger;
pub use remote::{HttpStateDownloader, StateDownloader};
