use std::sync::Arc;
use std::time::Duration;

use efs_core::{
    DeclaredResource, DeclaredSpec, LifecycleState, ObjectMeta, ResourceState,
};
use efs_memory::{InMemoryProviderFactory, InMemoryStore};
use efs_provisioner::{ReadinessCheck, StatusSynchronizer};
use tokio_util::sync::CancellationToken;

const REGION: &str = "us-west-2";

fn declared(namespace: &str, name: &str, subnets: &[&str]) -> DeclaredResource {
    DeclaredResource::new(
        ObjectMeta::new(namespace, name),
        DeclaredSpec {
            region: REGION.into(),
            subnets: subnets.iter().map(|s| s.to_string()).collect(),
            security_group: "sg-1".into(),
            performance: None,
        },
    )
}

fn setup(
    resources: Vec<DeclaredResource>,
) -> (Arc<InMemoryStore>, Arc<InMemoryProviderFactory>, StatusSynchronizer) {
    let store = Arc::new(InMemoryStore::with_resources(resources));
    let factory = Arc::new(InMemoryProviderFactory::new());
    let sync = StatusSynchronizer::new(store.clone(), factory.clone());
    (store, factory, sync)
}

#[tokio::test]
async fn test_ready_filesystem_is_reported_ready() {
    let (store, factory, sync) = setup(vec![declared("acme", "prod", &["sn-1", "sn-2"])]);
    let provider = factory.region(REGION);
    let fs = provider.insert_filesystem("acme-prod", LifecycleState::Available, 0);
    provider.insert_mount_target(&fs.id, "sn-1", LifecycleState::Available);
    provider.insert_mount_target(&fs.id, "sn-2", LifecycleState::Available);

    let report = sync.sync_once().await.unwrap();
    assert_eq!(
        report.updated,
        vec![(ObjectMeta::new("acme", "prod"), ResourceState::Ready)]
    );

    let status = store.snapshot("acme", "prod").unwrap().status.unwrap();
    assert_eq!(status.id, fs.id);
    assert_eq!(status.lifecycle_state, ResourceState::Ready);
}

#[tokio::test]
async fn test_creating_mount_target_is_not_ready() {
    let (store, factory, sync) = setup(vec![declared("acme", "prod", &["sn-1", "sn-2"])]);
    let provider = factory.region(REGION);
    let fs = provider.insert_filesystem("acme-prod", LifecycleState::Available, 0);
    provider.insert_mount_target(&fs.id, "sn-1", LifecycleState::Available);
    provider.insert_mount_target(&fs.id, "sn-2", LifecycleState::Creating);

    sync.sync_once().await.unwrap();
    let status = store.snapshot("acme", "prod").unwrap().status.unwrap();
    assert_eq!(status.lifecycle_state, ResourceState::NotReady);

    provider.set_mount_target_state(&fs.id, "sn-2", LifecycleState::Available);
    sync.sync_once().await.unwrap();
    let status = store.snapshot("acme", "prod").unwrap().status.unwrap();
    assert_eq!(status.lifecycle_state, ResourceState::Ready);
}

#[tokio::test]
async fn test_missing_filesystem_is_unknown_without_mount_lookup() {
    let (store, factory, sync) = setup(vec![declared("acme", "gone", &["sn-1"])]);
    let provider = factory.region(REGION);

    let report = sync.sync_once().await.unwrap();
    assert_eq!(report.updated[0].1, ResourceState::Unknown);
    assert_eq!(provider.describe_mount_target_calls(), 0);

    let status = store.snapshot("acme", "gone").unwrap().status.unwrap();
    assert_eq!(status.lifecycle_state, ResourceState::Unknown);
    assert!(status.id.is_empty());
}

#[tokio::test]
async fn test_ambiguous_filesystem_is_unknown() {
    let (store, factory, sync) = setup(vec![declared("acme", "dup", &["sn-1"])]);
    let provider = factory.region(REGION);
    provider.insert_filesystem("acme-dup", LifecycleState::Available, 0);
    provider.insert_filesystem("acme-dup", LifecycleState::Available, 0);

    sync.sync_once().await.unwrap();
    let status = store.snapshot("acme", "dup").unwrap().status.unwrap();
    assert_eq!(status.lifecycle_state, ResourceState::Unknown);
    assert_eq!(provider.describe_mount_target_calls(), 0);
}

#[tokio::test]
async fn test_one_failure_does_not_stop_the_cycle() {
    let (store, factory, sync) = setup(vec![
        declared("acme", "broken-mounts", &["sn-1"]),
        declared("acme", "broken-put", &["sn-1"]),
        declared("acme", "healthy", &["sn-1"]),
        declared("acme", "invalid", &[]),
    ]);
    let provider = factory.region(REGION);
    for token in ["acme-broken-mounts", "acme-broken-put", "acme-healthy"] {
        let fs = provider.insert_filesystem(token, LifecycleState::Available, 0);
        provider.insert_mount_target(&fs.id, "sn-1", LifecycleState::Available);
        if token == "acme-broken-mounts" {
            provider.fail_describe_mount_targets(&fs.id, "throttled");
        }
    }
    store.fail_put("acme", "broken-put", "conflict");

    let report = sync.sync_once().await.unwrap();

    assert_eq!(report.declared, 4);
    assert_eq!(
        report.updated,
        vec![(ObjectMeta::new("acme", "healthy"), ResourceState::Ready)]
    );
    assert_eq!(report.invalid, vec![ObjectMeta::new("acme", "invalid")]);
    assert_eq!(
        report.failed,
        vec![
            ObjectMeta::new("acme", "broken-mounts"),
            ObjectMeta::new("acme", "broken-put"),
        ]
    );
    assert!(store.snapshot("acme", "broken-mounts").unwrap().status.is_none());
}

#[tokio::test]
async fn test_at_least_one_readiness() {
    let (store, factory, sync) = setup(vec![declared("acme", "prod", &["sn-1", "sn-2"])]);
    let sync = sync.with_readiness(ReadinessCheck::AtLeastOne);
    let provider = factory.region(REGION);
    let fs = provider.insert_filesystem("acme-prod", LifecycleState::Available, 0);
    provider.insert_mount_target(&fs.id, "sn-1", LifecycleState::Available);

    sync.sync_once().await.unwrap();
    let status = store.snapshot("acme", "prod").unwrap().status.unwrap();
    assert_eq!(status.lifecycle_state, ResourceState::Ready);
}

#[tokio::test]
async fn test_list_failure_is_returned() {
    let (store, _factory, sync) = setup(Vec::new());
    store.fail_list(true);
    assert!(sync.sync_once().await.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_run_syncs_every_period_until_cancelled() {
    let (store, factory, sync) = setup(vec![declared("acme", "prod", &["sn-1"])]);
    factory
        .region(REGION)
        .insert_filesystem("acme-prod", LifecycleState::Available, 0);

    let sync = Arc::new(sync);
    let cancel = CancellationToken::new();
    let handle = {
        let sync = sync.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { sync.run(Duration::from_secs(60), cancel).await })
    };

    tokio::time::sleep(Duration::from_secs(150)).await;
    cancel.cancel();
    handle.await.unwrap();

    // Cycles at 0s, 60s and 120s.
    assert_eq!(store.put_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_zero_period_falls_back_to_default_interval() {
    let (store, factory, sync) = setup(vec![declared("acme", "prod", &["sn-1"])]);
    factory
        .region(REGION)
        .insert_filesystem("acme-prod", LifecycleState::Available, 0);

    let sync = Arc::new(sync);
    let cancel = CancellationToken::new();
    let handle = {
        let sync = sync.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { sync.run(Duration::ZERO, cancel).await })
    };

    tokio::time::sleep(Duration::from_secs(150)).await;
    cancel.cancel();
    handle.await.unwrap();

    assert_eq!(store.put_calls(), 3);
}
