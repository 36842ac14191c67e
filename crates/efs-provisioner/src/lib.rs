//! Convergence engine for EFS filesystems.
//!
//! - [`ensure`]: idempotent describe-or-create of filesystems and mount targets
//! - [`poller`]: re-runs an ensure call until the object is available
//! - [`mounts`]: provisions one mount target per subnet concurrently
//! - [`provisioner`]: drives a [`efs_core::FilesystemSpec`] to a ready volume
//! - [`status`]: periodically writes observed readiness back to the store
//! - [`controller`]: provisions declared filesystems that are not ready yet

pub mod config;
pub mod controller;
pub mod ensure;
pub mod mounts;
pub mod observability;
pub mod poller;
pub mod provisioner;
pub mod status;

pub use config::AppConfig;
pub use controller::{ProvisionReport, ProvisioningController};
pub use ensure::{ensure_filesystem, ensure_mount_target};
pub use mounts::provision_mount_targets;
pub use poller::{Converged, DEFAULT_POLL_INTERVAL, Poller};
pub use provisioner::{NfsSource, ProvisionedVolume, Provisioner, provisioner_name};
pub use status::{
    DEFAULT_SYNC_INTERVAL, ReadinessCheck, StatusSynchronizer, SyncReport, derive_readiness,
};
