//! # efs-core
//!
//! Shared vocabulary for the EFS provisioner.
//!
//! This crate defines the data model and the client traits the convergence
//! engine talks to. It does not contain any implementations - in-memory
//! backends live in `efs-memory`, the engine itself in `efs-provisioner`.
//!
//! ## Overview
//!
//! - [`FilesystemSpec`] is the desired state submitted by a provisioning request.
//! - [`FilesystemResource`] and [`MountTarget`] mirror what the provider reports.
//! - [`DeclaredResource`] is the object held by the store of record, carrying
//!   the last known [`ReconciliationStatus`].
//! - [`ProviderClient`] and [`StoreClient`] are the external collaborators.
//!
//! ## Example
//!
//! ```ignore
//! use efs_core::{DynProvider, EfsError, FilesystemResource};
//!
//! async fn lookup(
//!     provider: &DynProvider,
//!     token: &str,
//! ) -> Result<Vec<FilesystemResource>, EfsError> {
//!     provider.describe_filesystems(token).await
//! }
//! ```

mod declared;
mod error;
mod traits;
mod types;

pub use declared::{
    DeclaredResource, DeclaredSpec, ObjectMeta, ReconciliationStatus, ResourceState,
};
pub use error::{EfsError, ErrorCategory};
pub use traits::{Observed, ProviderClient, ProviderFactory, StoreClient};
pub use types::{
    FilesystemResource, FilesystemSpec, LifecycleState, MountTarget, PerformanceMode, Tag,
};

/// Type alias for results produced by the provisioner.
pub type EfsResult<T> = Result<T, EfsError>;

/// Shareable provider client.
pub type DynProvider = std::sync::Arc<dyn ProviderClient>;

/// Shareable store of record.
pub type DynStore = std::sync::Arc<dyn StoreClient>;

/// Shareable per-region provider lookup.
pub type DynProviderFactory = std::sync::Arc<dyn ProviderFactory>;
