//! Status synchronization.
//!
//! Periodically re-derives the readiness of every declared filesystem from
//! the provider and writes it back to the store of record. A failure for one
//! resource is logged and never stops the cycle.
//!
//! Status writes are read-modify-write: the current object is fetched, its
//! status replaced, and the whole object put back. A concurrent edit made by
//! another writer between the fetch and the put is lost. This loop assumes
//! it is the only status writer.

use std::time::Duration;

use efs_core::{
    DeclaredResource, DynProviderFactory, DynStore, EfsError, FilesystemResource, MountTarget,
    ObjectMeta, ProviderClient, ReconciliationStatus, ResourceState,
};
use serde::{Deserialize, Serialize};
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Sync interval used when none is configured.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(60);

/// How mount targets are checked when deriving readiness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessCheck {
    /// Every declared subnet must have an available mount target.
    #[default]
    PerSubnet,
    /// At least one mount target must exist and all existing targets must be
    /// available, regardless of which subnets they cover.
    AtLeastOne,
}

/// Derives readiness from a resolved filesystem and its mount targets.
///
/// `Ready` requires an available filesystem, at least one mount target, and
/// every returned mount target available. [`ReadinessCheck::PerSubnet`]
/// additionally requires a target in each declared subnet.
pub fn derive_readiness(
    filesystem: &FilesystemResource,
    mount_targets: &[MountTarget],
    declared_subnets: &[String],
    check: ReadinessCheck,
) -> ResourceState {
    if !filesystem.lifecycle_state.is_available() || mount_targets.is_empty() {
        return ResourceState::NotReady;
    }
    if !mount_targets.iter().all(|t| t.lifecycle_state.is_available()) {
        return ResourceState::NotReady;
    }

    match check {
        ReadinessCheck::AtLeastOne => ResourceState::Ready,
        ReadinessCheck::PerSubnet => {
            let covered = declared_subnets
                .iter()
                .all(|subnet| mount_targets.iter().any(|t| &t.subnet_id == subnet));
            if covered {
                ResourceState::Ready
            } else {
                ResourceState::NotReady
            }
        }
    }
}

/// Resolves exactly one filesystem for a creation token.
async fn check_filesystem(
    provider: &dyn ProviderClient,
    creation_token: &str,
) -> Result<FilesystemResource, EfsError> {
    let mut found = provider.describe_filesystems(creation_token).await?;
    match found.len() {
        0 => Err(EfsError::filesystem_not_found(creation_token)),
        1 => Ok(found.swap_remove(0)),
        count => Err(EfsError::ambiguous(creation_token, count)),
    }
}

/// Outcome of one synchronization cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Declared resources seen in the store.
    pub declared: usize,
    /// Resources whose status was written, with the state written.
    pub updated: Vec<(ObjectMeta, ResourceState)>,
    /// Resources skipped because their declaration is malformed.
    pub invalid: Vec<ObjectMeta>,
    /// Resources whose observation or status write failed.
    pub failed: Vec<ObjectMeta>,
}

/// Keeps the stored status of declared filesystems current.
pub struct StatusSynchronizer {
    store: DynStore,
    providers: DynProviderFactory,
    readiness: ReadinessCheck,
}

impl StatusSynchronizer {
    pub fn new(store: DynStore, providers: DynProviderFactory) -> Self {
        Self {
            store,
            providers,
            readiness: ReadinessCheck::default(),
        }
    }

    #[must_use]
    pub fn with_readiness(mut self, readiness: ReadinessCheck) -> Self {
        self.readiness = readiness;
        self
    }

    /// Runs a sync cycle every `period` until `cancel` fires.
    ///
    /// The first cycle runs immediately. A failed cycle is logged and the
    /// loop waits for the next tick. A zero `period` falls back to
    /// [`DEFAULT_SYNC_INTERVAL`].
    pub async fn run(&self, period: Duration, cancel: CancellationToken) {
        let period = if period.is_zero() {
            warn!("Zero sync interval, using the default");
            DEFAULT_SYNC_INTERVAL
        } else {
            period
        };
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(period_secs = period.as_secs(), "Status synchronizer started");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match self.sync_once().await {
                Ok(report) => info!(
                    declared = report.declared,
                    updated = report.updated.len(),
                    invalid = report.invalid.len(),
                    failed = report.failed.len(),
                    "Status sync completed"
                ),
                Err(e) => error!(error = %e, "Failed to load declared filesystems"),
            }
        }

        info!("Status synchronizer stopped");
    }

    /// Runs one synchronization cycle.
    ///
    /// # Errors
    ///
    /// Only a failure to list declared resources is returned; every
    /// per-resource failure is recorded in the report instead.
    pub async fn sync_once(&self) -> Result<SyncReport, EfsError> {
        let declared = self.store.list_declared().await?;
        let mut report = SyncReport {
            declared: declared.len(),
            ..SyncReport::default()
        };

        let mut updates = Vec::with_capacity(declared.len());
        for resource in &declared {
            let name = resource.creation_token();

            if let Err(e) = resource.validate() {
                error!(filesystem = %name, error = %e, "Not a valid filesystem object");
                report.invalid.push(resource.metadata.clone());
                continue;
            }

            match self.observe(resource).await {
                Ok(status) => updates.push((resource.metadata.clone(), status)),
                Err(e) => {
                    error!(filesystem = %name, error = %e, "Failed to check filesystem mounts");
                    report.failed.push(resource.metadata.clone());
                }
            }
        }

        for (metadata, status) in updates {
            let state = status.lifecycle_state;
            match self.write_status(&metadata, status).await {
                Ok(()) => {
                    info!(object = %metadata, state = %state, "Updated status");
                    report.updated.push((metadata, state));
                }
                Err(e) => {
                    error!(object = %metadata, error = %e, "Failed to update filesystem status");
                    report.failed.push(metadata);
                }
            }
        }

        Ok(report)
    }

    /// Re-derives the status of one declared resource.
    ///
    /// A filesystem that cannot be resolved yields an `Unknown` status rather
    /// than an error, and its mount targets are not queried. A failure to
    /// list mount targets is returned as an error and no status is produced.
    pub async fn observe(&self, resource: &DeclaredResource) -> Result<ReconciliationStatus, EfsError> {
        let name = resource.creation_token();
        let provider = self.providers.for_region(&resource.spec.region)?;

        debug!(filesystem = %name, "Checking filesystem");
        let filesystem = match check_filesystem(provider.as_ref(), &name).await {
            Ok(filesystem) => filesystem,
            Err(e) => {
                warn!(filesystem = %name, error = %e, "Failed to check filesystem");
                return Ok(ReconciliationStatus::unknown());
            }
        };

        let mount_targets = provider.describe_mount_targets(&filesystem.id).await?;
        let state = derive_readiness(
            &filesystem,
            &mount_targets,
            &resource.spec.subnets,
            self.readiness,
        );

        Ok(ReconciliationStatus::new(filesystem.id, state))
    }

    /// Fetches the stored object, replaces its status and writes it back in full.
    async fn write_status(
        &self,
        metadata: &ObjectMeta,
        status: ReconciliationStatus,
    ) -> Result<(), EfsError> {
        let mut current = self.store.get(&metadata.namespace, &metadata.name).await?;
        current.status = Some(status);
        self.store.put(&current).await
    }
}
