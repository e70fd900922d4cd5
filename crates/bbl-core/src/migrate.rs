//! Schema migrations
//!
//! Each step upgrades a state by exactly one version and depends only on its
//! input. States older than the first known step start at that step.

use crate::error::{CoreError, Result};
use crate::state::State;

/// Schema version written by this build
pub const CURRENT_VERSION: u32 = 14;

/// Oldest version with a recorded migration
const FIRST_MIGRATED_VERSION: u32 = 11;

type Migration = fn(State) -> State;

/// Ordered migrations; entry `i` upgrades `FIRST_MIGRATED_VERSION + i`
const MIGRATIONS: [Migration; 3] = [zones_from_zone, default_director_name, default_director_username];

#[derive(Debug, Clone, Copy, Default)]
pub struct StateMigrator;

impl StateMigrator {
    pub fn new() -> Self {
        Self
    }

    /// Upgrade `state` to [`CURRENT_VERSION`]
    pub fn migrate(&self, state: State) -> Result<State> {
        if state.version == CURRENT_VERSION {
            return Ok(state);
        }
        if state.version > CURRENT_VERSION {
            return Err(CoreError::UnknownVersion {
                found: state.version,
                supported: CURRENT_VERSION,
            });
        }
        if state.is_empty() {
            return Ok(State {
                version: CURRENT_VERSION,
                ..state
            });
        }

        let from = state.version;
        let mut state = state;
        let mut version = state.version.max(FIRST_MIGRATED_VERSION);
        while version < CURRENT_VERSION {
            let step = MIGRATIONS[(version - FIRST_MIGRATED_VERSION) as usize];
            state = step(state);
            version += 1;
            state.version = version;
        }

        tracing::info!(from, to = CURRENT_VERSION, "Migrated state");
        Ok(state)
    }
}

/// v11 → v12: single GCP zone becomes the zone list
fn zones_from_zone(mut state: State) -> State {
    if state.gcp.zones.is_empty() && !state.gcp.zone.is_empty() {
        state.gcp.zones = vec![state.gcp.zone.clone()];
    }
    state
}

/// v12 → v13: director deployments are named after the environment
fn default_director_name(mut state: State) -> State {
    if state.director_vm.name.is_empty()
        && !state.director_vm.address.is_empty()
        && !state.env_id.is_empty()
    {
        state.director_vm.name = format!("bosh-{}", state.env_id);
    }
    state
}

/// v13 → v14: the director admin user is recorded explicitly
fn default_director_username(mut state: State) -> State {
    if state.director_vm.username.is_empty() && !state.director_vm.address.is_empty() {
        state.director_vm.username = "admin".to_string();
    }
    state
}
