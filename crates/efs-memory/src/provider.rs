//! Simulated filesystem provider.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use efs_core::{
    DynProvider, EfsError, FilesystemResource, LifecycleState, MountTarget, PerformanceMode,
    ProviderClient, ProviderFactory, Tag,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone)]
struct FilesystemRecord {
    resource: FilesystemResource,
    observations: u32,
    settle_after: u32,
    tags: Vec<Tag>,
}

#[derive(Debug, Clone)]
struct MountTargetRecord {
    target: MountTarget,
    observations: u32,
    settle_after: u32,
}

/// Serializable copy of a provider's objects, including how far each one
/// has progressed towards `available`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSnapshot {
    #[serde(default)]
    pub filesystems: Vec<FilesystemSnapshot>,
    #[serde(default)]
    pub mount_targets: Vec<MountTargetSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilesystemSnapshot {
    pub resource: FilesystemResource,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub observations: u32,
    #[serde(default)]
    pub settle_after: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MountTargetSnapshot {
    pub target: MountTarget,
    #[serde(default)]
    pub observations: u32,
    #[serde(default)]
    pub settle_after: u32,
}

/// Advances a `creating` object to `available` once it has been observed
/// `settle_after` times.
fn observe(state: &mut LifecycleState, observations: &mut u32, settle_after: u32) {
    *observations += 1;
    if *state == LifecycleState::Creating && *observations >= settle_after {
        *state = LifecycleState::Available;
    }
}

fn short_id(prefix: &str) -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("{prefix}-{}", &id[..8])
}

/// In-memory filesystem provider.
///
/// Objects are created in the `creating` state and become `available` on the
/// `settle_after`-th describe call that returns them. With `settle_after` set
/// to zero they are created `available`.
#[derive(Debug, Default)]
pub struct InMemoryProvider {
    settle_after: AtomicU32,
    /// filesystem id -> record
    filesystems: DashMap<String, FilesystemRecord>,
    /// filesystem id -> mount targets
    mount_targets: DashMap<String, Vec<MountTargetRecord>>,

    describe_failures: DashMap<String, String>,
    mount_describe_failures: DashMap<String, String>,
    mount_create_failures: DashMap<String, String>,
    fail_create: AtomicBool,
    fail_tagging: AtomicBool,

    describe_filesystem_calls: AtomicUsize,
    create_filesystem_calls: AtomicUsize,
    tag_calls: AtomicUsize,
    describe_mount_target_calls: AtomicUsize,
    create_mount_target_calls: AtomicUsize,
}

impl InMemoryProvider {
    /// Creates a provider whose objects are available as soon as they exist.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how many describe calls a newly created object needs before it
    /// reports `available`.
    #[must_use]
    pub fn with_settle_after(self, describes: u32) -> Self {
        self.settle_after.store(describes, Ordering::SeqCst);
        self
    }

    pub fn settle_after(&self) -> u32 {
        self.settle_after.load(Ordering::SeqCst)
    }

    // ==================== Seeding ====================

    /// Inserts a filesystem directly, bypassing the create path and its
    /// uniqueness check. Used to model state created by another process.
    pub fn insert_filesystem(
        &self,
        creation_token: &str,
        state: LifecycleState,
        settle_after: u32,
    ) -> FilesystemResource {
        let resource = FilesystemResource {
            id: short_id("fs"),
            creation_token: creation_token.to_string(),
            lifecycle_state: state,
            performance_mode: PerformanceMode::default(),
        };
        self.filesystems.insert(
            resource.id.clone(),
            FilesystemRecord {
                resource: resource.clone(),
                observations: 0,
                settle_after,
                tags: Vec::new(),
            },
        );
        resource
    }

    /// Inserts a mount target directly.
    pub fn insert_mount_target(
        &self,
        filesystem_id: &str,
        subnet_id: &str,
        state: LifecycleState,
    ) -> MountTarget {
        let target = MountTarget {
            id: short_id("fsmt"),
            filesystem_id: filesystem_id.to_string(),
            subnet_id: subnet_id.to_string(),
            lifecycle_state: state,
            ip_address: None,
        };
        self.mount_targets
            .entry(filesystem_id.to_string())
            .or_default()
            .push(MountTargetRecord {
                target: target.clone(),
                observations: 0,
                settle_after: 0,
            });
        target
    }

    /// Forces the lifecycle state of every mount target in a subnet.
    pub fn set_mount_target_state(&self, filesystem_id: &str, subnet_id: &str, state: LifecycleState) {
        if let Some(mut targets) = self.mount_targets.get_mut(filesystem_id) {
            for record in targets.iter_mut().filter(|r| r.target.subnet_id == subnet_id) {
                record.target.lifecycle_state = state;
            }
        }
    }

    // ==================== Persistence ====================

    /// Copies every object, ordered by id. Does not count as an observation.
    pub fn snapshot(&self) -> ProviderSnapshot {
        let mut filesystems: Vec<FilesystemSnapshot> = self
            .filesystems
            .iter()
            .map(|r| FilesystemSnapshot {
                resource: r.resource.clone(),
                tags: r.tags.clone(),
                observations: r.observations,
                settle_after: r.settle_after,
            })
            .collect();
        filesystems.sort_by(|a, b| a.resource.id.cmp(&b.resource.id));

        let mut mount_targets: Vec<MountTargetSnapshot> = self
            .mount_targets
            .iter()
            .flat_map(|entry| {
                entry
                    .value()
                    .iter()
                    .map(|r| MountTargetSnapshot {
                        target: r.target.clone(),
                        observations: r.observations,
                        settle_after: r.settle_after,
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        mount_targets.sort_by(|a, b| a.target.id.cmp(&b.target.id));

        ProviderSnapshot {
            filesystems,
            mount_targets,
        }
    }

    /// Loads objects from a snapshot, replacing any with the same id.
    pub fn restore(&self, snapshot: ProviderSnapshot) {
        for fs in snapshot.filesystems {
            self.filesystems.insert(
                fs.resource.id.clone(),
                FilesystemRecord {
                    resource: fs.resource,
                    observations: fs.observations,
                    settle_after: fs.settle_after,
                    tags: fs.tags,
                },
            );
        }
        for mt in snapshot.mount_targets {
            let mut targets = self
                .mount_targets
                .entry(mt.target.filesystem_id.clone())
                .or_default();
            targets.retain(|r| r.target.id != mt.target.id);
            targets.push(MountTargetRecord {
                target: mt.target,
                observations: mt.observations,
                settle_after: mt.settle_after,
            });
        }
    }

    // ==================== Fault injection ====================

    /// Makes `describe_filesystems` fail for a creation token.
    pub fn fail_describe_filesystems(&self, creation_token: &str, message: &str) {
        self.describe_failures
            .insert(creation_token.to_string(), message.to_string());
    }

    /// Makes `describe_mount_targets` fail for a filesystem.
    pub fn fail_describe_mount_targets(&self, filesystem_id: &str, message: &str) {
        self.mount_describe_failures
            .insert(filesystem_id.to_string(), message.to_string());
    }

    /// Makes `create_mount_target` fail for a subnet.
    pub fn fail_mount_target_creation(&self, subnet_id: &str, message: &str) {
        self.mount_create_failures
            .insert(subnet_id.to_string(), message.to_string());
    }

    /// Makes every `create_filesystem` call fail.
    pub fn fail_filesystem_creation(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    /// Makes every `tag_filesystem` call fail.
    pub fn fail_tagging(&self, fail: bool) {
        self.fail_tagging.store(fail, Ordering::SeqCst);
    }

    // ==================== Inspection ====================

    /// Filesystems carrying a creation token, without counting as an observation.
    pub fn filesystems_for(&self, creation_token: &str) -> Vec<FilesystemResource> {
        self.filesystems
            .iter()
            .filter(|r| r.resource.creation_token == creation_token)
            .map(|r| r.resource.clone())
            .collect()
    }

    /// Mount targets of a filesystem, without counting as an observation.
    pub fn mount_targets(&self, filesystem_id: &str) -> Vec<MountTarget> {
        self.mount_targets
            .get(filesystem_id)
            .map(|targets| targets.iter().map(|r| r.target.clone()).collect())
            .unwrap_or_default()
    }

    pub fn tags(&self, filesystem_id: &str) -> Vec<Tag> {
        self.filesystems
            .get(filesystem_id)
            .map(|r| r.tags.clone())
            .unwrap_or_default()
    }

    pub fn describe_filesystem_calls(&self) -> usize {
        self.describe_filesystem_calls.load(Ordering::SeqCst)
    }

    pub fn create_filesystem_calls(&self) -> usize {
        self.create_filesystem_calls.load(Ordering::SeqCst)
    }

    pub fn tag_calls(&self) -> usize {
        self.tag_calls.load(Ordering::SeqCst)
    }

    pub fn describe_mount_target_calls(&self) -> usize {
        self.describe_mount_target_calls.load(Ordering::SeqCst)
    }

    pub fn create_mount_target_calls(&self) -> usize {
        self.create_mount_target_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderClient for InMemoryProvider {
    async fn describe_filesystems(
        &self,
        creation_token: &str,
    ) -> Result<Vec<FilesystemResource>, EfsError> {
        self.describe_filesystem_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.describe_failures.get(creation_token) {
            return Err(EfsError::provider("DescribeFileSystems", message.value().clone()));
        }

        let mut found = Vec::new();
        for mut record in self.filesystems.iter_mut() {
            if record.resource.creation_token != creation_token {
                continue;
            }
            let record = &mut *record;
            observe(
                &mut record.resource.lifecycle_state,
                &mut record.observations,
                record.settle_after,
            );
            found.push(record.resource.clone());
        }
        Ok(found)
    }

    async fn create_filesystem(
        &self,
        creation_token: &str,
        performance_mode: PerformanceMode,
    ) -> Result<FilesystemResource, EfsError> {
        self.create_filesystem_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(EfsError::provider("CreateFileSystem", "injected failure"));
        }
        if self
            .filesystems
            .iter()
            .any(|r| r.resource.creation_token == creation_token)
        {
            return Err(EfsError::provider(
                "CreateFileSystem",
                format!("FileSystemAlreadyExists: {creation_token}"),
            ));
        }

        let settle_after = self.settle_after();
        let resource = FilesystemResource {
            id: short_id("fs"),
            creation_token: creation_token.to_string(),
            lifecycle_state: if settle_after == 0 {
                LifecycleState::Available
            } else {
                LifecycleState::Creating
            },
            performance_mode,
        };
        self.filesystems.insert(
            resource.id.clone(),
            FilesystemRecord {
                resource: resource.clone(),
                observations: 0,
                settle_after,
                tags: Vec::new(),
            },
        );
        tracing::debug!(filesystem_id = %resource.id, creation_token, "Simulated filesystem created");
        Ok(resource)
    }

    async fn tag_filesystem(&self, filesystem_id: &str, tags: &[Tag]) -> Result<(), EfsError> {
        self.tag_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_tagging.load(Ordering::SeqCst) {
            return Err(EfsError::provider("CreateTags", "injected failure"));
        }
        let mut record = self.filesystems.get_mut(filesystem_id).ok_or_else(|| {
            EfsError::provider("CreateTags", format!("FileSystemNotFound: {filesystem_id}"))
        })?;
        for tag in tags {
            record.tags.retain(|t| t.key != tag.key);
            record.tags.push(tag.clone());
        }
        Ok(())
    }

    async fn describe_mount_targets(
        &self,
        filesystem_id: &str,
    ) -> Result<Vec<MountTarget>, EfsError> {
        self.describe_mount_target_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.mount_describe_failures.get(filesystem_id) {
            return Err(EfsError::provider("DescribeMountTargets", message.value().clone()));
        }
        if !self.filesystems.contains_key(filesystem_id) {
            return Err(EfsError::provider(
                "DescribeMountTargets",
                format!("FileSystemNotFound: {filesystem_id}"),
            ));
        }

        let Some(mut targets) = self.mount_targets.get_mut(filesystem_id) else {
            return Ok(Vec::new());
        };
        Ok(targets
            .iter_mut()
            .map(|record| {
                observe(
                    &mut record.target.lifecycle_state,
                    &mut record.observations,
                    record.settle_after,
                );
                record.target.clone()
            })
            .collect())
    }

    async fn create_mount_target(
        &self,
        filesystem_id: &str,
        subnet_id: &str,
        _security_group: &str,
    ) -> Result<MountTarget, EfsError> {
        self.create_mount_target_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.mount_create_failures.get(subnet_id) {
            return Err(EfsError::provider("CreateMountTarget", message.value().clone()));
        }
        let available = match self.filesystems.get(filesystem_id) {
            Some(record) => record.resource.lifecycle_state.is_available(),
            None => {
                return Err(EfsError::provider(
                    "CreateMountTarget",
                    format!("FileSystemNotFound: {filesystem_id}"),
                ));
            }
        };
        if !available {
            return Err(EfsError::provider(
                "CreateMountTarget",
                format!("IncorrectFileSystemLifeCycleState: {filesystem_id}"),
            ));
        }

        let settle_after = self.settle_after();
        let mut targets = self.mount_targets.entry(filesystem_id.to_string()).or_default();
        if targets.iter().any(|r| r.target.subnet_id == subnet_id) {
            return Err(EfsError::provider(
                "CreateMountTarget",
                format!("MountTargetConflict: {filesystem_id} already has a target in {subnet_id}"),
            ));
        }

        let target = MountTarget {
            id: short_id("fsmt"),
            filesystem_id: filesystem_id.to_string(),
            subnet_id: subnet_id.to_string(),
            lifecycle_state: if settle_after == 0 {
                LifecycleState::Available
            } else {
                LifecycleState::Creating
            },
            ip_address: None,
        };
        targets.push(MountTargetRecord {
            target: target.clone(),
            observations: 0,
            settle_after,
        });
        Ok(target)
    }
}

/// Hands out one [`InMemoryProvider`] per region, created on first use.
#[derive(Debug, Default)]
pub struct InMemoryProviderFactory {
    settle_after: u32,
    regions: DashMap<String, Arc<InMemoryProvider>>,
}

impl InMemoryProviderFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Settle delay applied to providers created by this factory.
    #[must_use]
    pub fn with_settle_after(mut self, describes: u32) -> Self {
        self.settle_after = describes;
        self
    }

    /// Registers a pre-built provider for a region.
    #[must_use]
    pub fn with_region(self, region: &str, provider: Arc<InMemoryProvider>) -> Self {
        self.regions.insert(region.to_string(), provider);
        self
    }

    /// Snapshots every region handed out so far.
    pub fn snapshot(&self) -> BTreeMap<String, ProviderSnapshot> {
        self.regions
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().snapshot()))
            .collect()
    }

    /// Restores regions from [`InMemoryProviderFactory::snapshot`] output.
    pub fn restore(&self, regions: BTreeMap<String, ProviderSnapshot>) {
        for (region, snapshot) in regions {
            self.region(&region).restore(snapshot);
        }
    }

    /// The concrete provider for a region, for seeding and inspection.
    pub fn region(&self, region: &str) -> Arc<InMemoryProvider> {
        self.regions
            .entry(region.to_string())
            .or_insert_with(|| {
                Arc::new(InMemoryProvider::new().with_settle_after(self.settle_after))
            })
            .clone()
    }
}

impl ProviderFactory for InMemoryProviderFactory {
    fn for_region(&self, region: &str) -> Result<DynProvider, EfsError> {
        if region.trim().is_empty() {
            return Err(EfsError::validation("region must not be empty"));
        }
        let provider: DynProvider = self.region(region);
        Ok(provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_filesystem_settles_after_describes() {
        let provider = InMemoryProvider::new().with_settle_after(2);
        let created = provider
            .create_filesystem("acme", PerformanceMode::MaxIo)
            .await
            .unwrap();
        assert_eq!(created.lifecycle_state, LifecycleState::Creating);
        assert_eq!(created.performance_mode, PerformanceMode::MaxIo);

        let first = provider.describe_filesystems("acme").await.unwrap();
        assert_eq!(first[0].lifecycle_state, LifecycleState::Creating);
        let second = provider.describe_filesystems("acme").await.unwrap();
        assert_eq!(second[0].lifecycle_state, LifecycleState::Available);
        assert_eq!(provider.describe_filesystem_calls(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_creation_token_is_rejected() {
        let provider = InMemoryProvider::new();
        provider
            .create_filesystem("acme", PerformanceMode::GeneralPurpose)
            .await
            .unwrap();
        let err = provider
            .create_filesystem("acme", PerformanceMode::GeneralPurpose)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("FileSystemAlreadyExists"));
    }

    #[tokio::test]
    async fn test_mount_target_per_subnet_is_unique() {
        let provider = InMemoryProvider::new();
        let fs = provider
            .create_filesystem("acme", PerformanceMode::GeneralPurpose)
            .await
            .unwrap();
        provider
            .create_mount_target(&fs.id, "sn-1", "sg-1")
            .await
            .unwrap();
        assert!(
            provider
                .create_mount_target(&fs.id, "sn-1", "sg-1")
                .await
                .is_err()
        );
        assert_eq!(provider.mount_targets(&fs.id).len(), 1);
    }

    #[tokio::test]
    async fn test_mount_target_requires_available_filesystem() {
        let provider = InMemoryProvider::new();
        let fs = provider.insert_filesystem("acme", LifecycleState::Creating, 5);
        let err = provider
            .create_mount_target(&fs.id, "sn-1", "sg-1")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("IncorrectFileSystemLifeCycleState"));
    }

    #[tokio::test]
    async fn test_tags_replace_by_key() {
        let provider = InMemoryProvider::new();
        let fs = provider.insert_filesystem("acme", LifecycleState::Available, 0);
        provider
            .tag_filesystem(&fs.id, &[Tag::name("first")])
            .await
            .unwrap();
        provider
            .tag_filesystem(&fs.id, &[Tag::name("second")])
            .await
            .unwrap();
        assert_eq!(provider.tags(&fs.id), vec![Tag::name("second")]);
    }

    #[tokio::test]
    async fn test_snapshot_restores_objects_and_progress() {
        let factory = InMemoryProviderFactory::new().with_settle_after(3);
        let provider = factory.region("us-east-1");
        let fs = provider
            .create_filesystem("acme", PerformanceMode::GeneralPurpose)
            .await
            .unwrap();
        provider.describe_filesystems("acme").await.unwrap();
        provider.describe_filesystems("acme").await.unwrap();
        provider
            .tag_filesystem(&fs.id, &[Tag::name("acme")])
            .await
            .unwrap();
        let target = provider.insert_mount_target(&fs.id, "sn-1", LifecycleState::Available);

        let json = serde_json::to_string(&factory.snapshot()).unwrap();
        let restored = InMemoryProviderFactory::new().with_settle_after(3);
        restored.restore(serde_json::from_str(&json).unwrap());

        let provider = restored.region("us-east-1");
        assert_eq!(provider.tags(&fs.id), vec![Tag::name("acme")]);
        assert_eq!(provider.mount_targets(&fs.id)[0].id, target.id);
        // Two describes were recorded before the snapshot; the third settles it.
        let found = provider.describe_filesystems("acme").await.unwrap();
        assert_eq!(found[0].lifecycle_state, LifecycleState::Available);
    }

    #[test]
    fn test_factory_reuses_region_provider() {
        let factory = InMemoryProviderFactory::new().with_settle_after(3);
        let a = factory.region("us-east-1");
        let b = factory.region("us-east-1");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.settle_after(), 3);
        assert!(factory.for_region("").is_err());
    }
}
