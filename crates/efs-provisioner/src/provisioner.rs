//! Provisioning entry point.
//!
//! [`Provisioner::provision`] drives a [`FilesystemSpec`] to a ready volume:
//! the filesystem is polled until available, then one mount target per
//! subnet is provisioned concurrently. The result describes the NFS volume
//! the cluster binds to.

use std::collections::BTreeMap;

use efs_core::{
    DynProviderFactory, EfsError, FilesystemSpec, MountTarget, PerformanceMode,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::ensure::ensure_filesystem;
use crate::mounts::provision_mount_targets;
use crate::poller::Poller;

/// Annotation holding NFS mount options on a persistent volume.
pub const MOUNT_OPTIONS_ANNOTATION: &str = "volume.beta.kubernetes.io/mount-options";

/// Mount options recommended for EFS.
///
/// See <http://docs.aws.amazon.com/efs/latest/ug/mounting-fs-mount-cmd-dns-name.html>.
pub const DEFAULT_MOUNT_OPTIONS: &str =
    "nfsvers=4.1,rsize=1048576,wsize=1048576,hard,timeo=600,retrans=2";

/// EFS reports a practically unbounded size when mounted; volumes mirror it.
pub const VOLUME_CAPACITY: &str = "8.0E";

/// Reclaim policy of provisioned volumes. Deletion is never automated.
pub const RECLAIM_POLICY: &str = "Retain";

/// Default provisioner name for a performance mode, e.g. `efs.aws.skpr.io/maxIO`.
///
/// Using the mode in the name lets one cluster run a provisioner per class.
pub fn provisioner_name(performance_mode: PerformanceMode) -> String {
    format!("efs.aws.skpr.io/{performance_mode}")
}

/// DNS name of a filesystem's NFS endpoint.
pub fn nfs_server(filesystem_id: &str, region: &str) -> String {
    format!("{filesystem_id}.efs.{region}.amazonaws.com")
}

/// NFS source of a provisioned volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NfsSource {
    pub server: String,
    pub path: String,
}

/// A filesystem whose mount targets are all available.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionedVolume {
    /// Provider filesystem id, also used as the volume name.
    pub filesystem_id: String,
    pub region: String,
    pub mount_targets: Vec<MountTarget>,
    pub nfs: NfsSource,
    pub capacity: String,
    pub reclaim_policy: String,
    pub annotations: BTreeMap<String, String>,
}

impl ProvisionedVolume {
    fn new(filesystem_id: String, region: &str, mount_targets: Vec<MountTarget>) -> Self {
        let mut annotations = BTreeMap::new();
        annotations.insert(
            MOUNT_OPTIONS_ANNOTATION.to_string(),
            DEFAULT_MOUNT_OPTIONS.to_string(),
        );

        Self {
            nfs: NfsSource {
                server: nfs_server(&filesystem_id, region),
                path: "/".to_string(),
            },
            filesystem_id,
            region: region.to_string(),
            mount_targets,
            capacity: VOLUME_CAPACITY.to_string(),
            reclaim_policy: RECLAIM_POLICY.to_string(),
            annotations,
        }
    }

    /// Subnets with an available mount target.
    pub fn mount_subnets(&self) -> Vec<&str> {
        self.mount_targets
            .iter()
            .map(|t| t.subnet_id.as_str())
            .collect()
    }
}

/// Provisions filesystems and their mount targets.
pub struct Provisioner {
    providers: DynProviderFactory,
    poller: Poller,
}

impl Provisioner {
    pub fn new(providers: DynProviderFactory) -> Self {
        Self {
            providers,
            poller: Poller::default(),
        }
    }

    #[must_use]
    pub fn with_poller(mut self, poller: Poller) -> Self {
        self.poller = poller;
        self
    }

    pub fn poller(&self) -> Poller {
        self.poller
    }

    /// Drives `spec` to a ready volume.
    ///
    /// Filesystem convergence always completes before any mount target is
    /// attempted. Cancelling `cancel` stops every outstanding poll and
    /// provider call.
    ///
    /// # Errors
    ///
    /// Returns the first failure from validation, filesystem convergence or
    /// any mount target task. Nothing created before the failure is removed.
    pub async fn provision(
        &self,
        spec: &FilesystemSpec,
        cancel: &CancellationToken,
    ) -> Result<ProvisionedVolume, EfsError> {
        spec.validate()?;
        let provider = self.providers.for_region(&spec.region)?;

        info!(
            filesystem = %spec.name,
            region = %spec.region,
            subnets = spec.subnets.len(),
            "Provisioning filesystem"
        );

        let filesystem = self
            .poller
            .converge(&spec.name, cancel, || ensure_filesystem(provider.as_ref(), spec))
            .await?;
        info!(
            filesystem = %spec.name,
            filesystem_id = %filesystem.resource.id,
            attempts = filesystem.attempts,
            "Filesystem is ready"
        );

        let mount_targets = provision_mount_targets(
            provider.clone(),
            self.poller,
            &filesystem.resource.id,
            &spec.subnets,
            &spec.security_group,
            cancel,
        )
        .await?;

        let volume = ProvisionedVolume::new(filesystem.resource.id, &spec.region, mount_targets);
        info!(
            filesystem = %spec.name,
            server = %volume.nfs.server,
            "Responding with persistent volume spec"
        );
        Ok(volume)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nfs_server_name() {
        assert_eq!(
            nfs_server("fs-1234", "ap-southeast-2"),
            "fs-1234.efs.ap-southeast-2.amazonaws.com"
        );
    }

    #[test]
    fn test_provisioner_name() {
        assert_eq!(
            provisioner_name(PerformanceMode::GeneralPurpose),
            "efs.aws.skpr.io/generalPurpose"
        );
        assert_eq!(provisioner_name(PerformanceMode::MaxIo), "efs.aws.skpr.io/maxIO");
    }

    #[test]
    fn test_volume_descriptor() {
        let volume = ProvisionedVolume::new("fs-1".into(), "us-east-1", Vec::new());
        assert_eq!(volume.nfs.path, "/");
        assert_eq!(volume.capacity, "8.0E");
        assert_eq!(volume.reclaim_policy, "Retain");
        assert_eq!(
            volume.annotations.get(MOUNT_OPTIONS_ANNOTATION).map(String::as_str),
            Some(DEFAULT_MOUNT_OPTIONS)
        );
    }
}
