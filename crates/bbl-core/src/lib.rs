//! bbl core
//!
//! The persisted environment record and everything that touches it without
//! talking to a cloud:
//!
//! - [`state`]: the `State` document and its per-provider records
//! - [`storage`]: atomic load/save of `bbl-state.json` and its blob files
//! - [`migrate`]: schema upgrades to [`CURRENT_VERSION`]
//! - [`validate`]: required-field and integrity checks before mutating commands
//! - [`fs`]: the `Filesystem` capability every disk-touching component receives
//!
//! ```text
//!   bbl-state.json ──▶ StateStore::get ──▶ StateMigrator ──▶ (flag merge) ──▶ StateValidator
//!                                                                                │
//!   bbl-state.json ◀── StateStore::set ◀────────── handler result ◀──────────────┘
//! ```

pub mod env_id;
pub mod error;
pub mod fs;
pub mod iaas;
pub mod migrate;
pub mod state;
pub mod storage;
pub mod validate;

pub use env_id::{short_env_id, simple_env_id};
pub use error::{CoreError, Result};
pub use fs::{Filesystem, OsFilesystem};
pub use iaas::Iaas;
pub use migrate::{CURRENT_VERSION, StateMigrator};
pub use state::{
    AwsConfig, AzureConfig, Blob, CloudStackConfig, DirectorVm, GcpConfig, Jumpbox, KeyPair, Lb,
    LbType, OpenStackConfig, Stack, State, VsphereConfig,
};
pub use storage::{FileStateStore, STATE_FILE, StateStore};
pub use validate::{RequiredFlag, StateValidator};
