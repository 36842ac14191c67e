//! Client traits for the external collaborators of the engine.
//!
//! The provider (the cloud filesystem API) and the store of record (the
//! cluster API holding declared objects) are both reached through these
//! traits. Implementations must be thread-safe (`Send + Sync`) because mount
//! target tasks share a single provider client.

use async_trait::async_trait;

use crate::declared::DeclaredResource;
use crate::error::EfsError;
use crate::types::{FilesystemResource, LifecycleState, MountTarget, PerformanceMode, Tag};
use crate::DynProvider;

/// Filesystem API of the cloud provider.
///
/// Every call is a stateless round trip. No method retries internally; a
/// failure is returned to the caller as [`EfsError::Provider`].
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Lists filesystems created with the given creation token.
    ///
    /// The provider deduplicates creation by token, so more than one entry
    /// indicates state this engine cannot resolve on its own.
    async fn describe_filesystems(
        &self,
        creation_token: &str,
    ) -> Result<Vec<FilesystemResource>, EfsError>;

    /// Creates a filesystem for the creation token.
    async fn create_filesystem(
        &self,
        creation_token: &str,
        performance_mode: PerformanceMode,
    ) -> Result<FilesystemResource, EfsError>;

    /// Attaches tags to a filesystem.
    async fn tag_filesystem(&self, filesystem_id: &str, tags: &[Tag]) -> Result<(), EfsError>;

    /// Lists every mount target of a filesystem.
    async fn describe_mount_targets(
        &self,
        filesystem_id: &str,
    ) -> Result<Vec<MountTarget>, EfsError>;

    /// Creates a mount target for the filesystem in a subnet.
    async fn create_mount_target(
        &self,
        filesystem_id: &str,
        subnet_id: &str,
        security_group: &str,
    ) -> Result<MountTarget, EfsError>;
}

/// Resolves the provider client responsible for a region.
pub trait ProviderFactory: Send + Sync {
    fn for_region(&self, region: &str) -> Result<DynProvider, EfsError>;
}

/// Store of record for declared filesystems and their status.
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Lists every declared filesystem across namespaces.
    async fn list_declared(&self) -> Result<Vec<DeclaredResource>, EfsError>;

    /// Reads a declared filesystem.
    ///
    /// # Errors
    ///
    /// Returns `EfsError::StoreObjectNotFound` if the object does not exist.
    async fn get(&self, namespace: &str, name: &str) -> Result<DeclaredResource, EfsError>;

    /// Replaces the stored object with `resource` in full.
    ///
    /// This is an unconditional overwrite: edits made by another writer
    /// between a `get` and this call are lost.
    async fn put(&self, resource: &DeclaredResource) -> Result<(), EfsError>;
}

/// A provider object with a lifecycle the poller can wait on.
pub trait Observed {
    fn lifecycle_state(&self) -> LifecycleState;

    /// Label used in logs and errors.
    fn describe(&self) -> String;
}

impl Observed for FilesystemResource {
    fn lifecycle_state(&self) -> LifecycleState {
        self.lifecycle_state
    }

    fn describe(&self) -> String {
        format!("filesystem {}", self.id)
    }
}

impl Observed for MountTarget {
    fn lifecycle_state(&self) -> LifecycleState {
        self.lifecycle_state
    }

    fn describe(&self) -> String {
        format!("mount target {} ({})", self.id, self.subnet_id)
    }
}
