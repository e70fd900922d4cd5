//! bbl cloud-config
//!
//! Turns a built environment into the cloud-config the director needs:
//! an overlay of ops on top of a generic base plus the vars it references.

pub mod cidr;
pub mod error;
pub mod ops;
pub mod overlay;
pub mod providers;

pub use cidr::Subnet;
pub use error::{CloudConfigError, Result};
pub use ops::{Op, OpKind};
pub use overlay::{BASE_CLOUD_CONFIG, CloudConfigOverlayGenerator};
