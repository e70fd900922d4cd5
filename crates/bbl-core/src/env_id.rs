//! Derived environment names
//!
//! Downstream resource names are length-constrained, so every provider input
//! uses one of these derivations instead of the raw env ID.

use sha1::{Digest, Sha1};

/// Longest env ID used verbatim as a short env ID
pub const SHORT_ENV_ID_MAX: usize = 18;
const SHORT_ENV_ID_PREFIX: usize = 10;
const SHORT_ENV_ID_HASH: usize = 7;
const SIMPLE_ENV_ID_MAX: usize = 20;

/// Length-bounded env ID: `<first 10 chars>-<first 7 hex of sha1(env_id)>`
/// when the env ID is longer than 18 characters.
pub fn short_env_id(env_id: &str) -> String {
    if env_id.chars().count() <= SHORT_ENV_ID_MAX {
        return env_id.to_string();
    }

    let prefix: String = env_id.chars().take(SHORT_ENV_ID_PREFIX).collect();
    let digest = sha1_hex(env_id);
    format!("{}-{}", prefix, &digest[..SHORT_ENV_ID_HASH])
}

/// Env ID with dashes stripped, truncated to 20 characters, for providers
/// that reject hyphens in resource names
pub fn simple_env_id(env_id: &str) -> String {
    env_id
        .chars()
        .filter(|c| *c != '-')
        .take(SIMPLE_ENV_ID_MAX)
        .collect()
}

pub fn sha1_hex(input: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}
