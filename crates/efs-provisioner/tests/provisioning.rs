use std::sync::Arc;
use std::time::Duration;

use efs_core::{EfsError, FilesystemSpec, LifecycleState, ProviderClient};
use efs_memory::{InMemoryProvider, InMemoryProviderFactory};
use efs_provisioner::{Poller, Provisioner};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const REGION: &str = "ap-southeast-2";

fn spec(subnets: &[&str]) -> FilesystemSpec {
    FilesystemSpec::new("acme-prod", REGION, "sg-1", subnets.iter().copied())
}

fn provisioner(provider: Arc<InMemoryProvider>) -> Provisioner {
    let factory = InMemoryProviderFactory::new().with_region(REGION, provider);
    Provisioner::new(Arc::new(factory)).with_poller(Poller::new(Duration::from_secs(15)))
}

#[tokio::test(start_paused = true)]
async fn test_provision_from_scratch() {
    let provider = Arc::new(InMemoryProvider::new().with_settle_after(3));
    let provisioner = provisioner(provider.clone());

    let volume = provisioner
        .provision(&spec(&["sn-a", "sn-b"]), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(provider.create_filesystem_calls(), 1);
    assert_eq!(provider.create_mount_target_calls(), 2);
    assert_eq!(volume.mount_subnets(), vec!["sn-a", "sn-b"]);
    assert!(
        volume
            .mount_targets
            .iter()
            .all(|t| t.lifecycle_state == LifecycleState::Available)
    );
    assert_eq!(
        volume.nfs.server,
        format!("{}.efs.{REGION}.amazonaws.com", volume.filesystem_id)
    );

    let filesystems = provider.filesystems_for("acme-prod");
    assert_eq!(filesystems.len(), 1);
    assert_eq!(filesystems[0].id, volume.filesystem_id);
}

#[tokio::test(start_paused = true)]
async fn test_provision_again_creates_nothing() {
    let provider = Arc::new(InMemoryProvider::new().with_settle_after(2));
    let provisioner = provisioner(provider.clone());
    let spec = spec(&["sn-a", "sn-b"]);

    let first = provisioner
        .provision(&spec, &CancellationToken::new())
        .await
        .unwrap();
    let second = provisioner
        .provision(&spec, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(first.filesystem_id, second.filesystem_id);
    assert_eq!(provider.create_filesystem_calls(), 1);
    assert_eq!(provider.create_mount_target_calls(), 2);
    assert_eq!(provider.mount_targets(&first.filesystem_id).len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_mounts_wait_for_filesystem() {
    let provider = Arc::new(InMemoryProvider::new().with_settle_after(4));
    let provisioner = provisioner(provider.clone());
    let started = Instant::now();

    provisioner
        .provision(&spec(&["sn-a"]), &CancellationToken::new())
        .await
        .unwrap();

    // Creating mount targets against a filesystem that is not yet available
    // would be rejected by the provider.
    assert_eq!(provider.create_mount_target_calls(), 1);
    assert!(started.elapsed() >= Duration::from_secs(60));
}

#[tokio::test(start_paused = true)]
async fn test_failing_subnet_stops_the_request() {
    let provider = Arc::new(InMemoryProvider::new().with_settle_after(u32::MAX));
    let fs = provider.insert_filesystem("acme-prod", LifecycleState::Available, 0);
    provider.fail_mount_target_creation("sn-2", "InvalidSubnet");
    let provisioner = provisioner(provider.clone());
    let started = Instant::now();

    let err = provisioner
        .provision(&spec(&["sn-1", "sn-2", "sn-3"]), &CancellationToken::new())
        .await
        .unwrap_err();

    match &err {
        EfsError::MountTarget { subnet, .. } => assert_eq!(subnet, "sn-2"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(started.elapsed() < Duration::from_secs(15));

    let remaining = provider.describe_mount_targets(&fs.id).await.unwrap();
    let mut subnets: Vec<_> = remaining.into_iter().map(|t| t.subnet_id).collect();
    subnets.sort();
    assert_eq!(subnets, vec!["sn-1", "sn-3"]);
}

#[tokio::test(start_paused = true)]
async fn test_ambiguous_filesystem_is_not_polled() {
    let provider = Arc::new(InMemoryProvider::new());
    provider.insert_filesystem("acme-prod", LifecycleState::Available, 0);
    provider.insert_filesystem("acme-prod", LifecycleState::Available, 0);
    let provisioner = provisioner(provider.clone());

    let err = provisioner
        .provision(&spec(&["sn-1"]), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(err.is_ambiguous());
    assert_eq!(provider.describe_filesystem_calls(), 1);
    assert_eq!(provider.create_mount_target_calls(), 0);
}

#[tokio::test]
async fn test_invalid_spec_is_rejected_before_any_call() {
    let provider = Arc::new(InMemoryProvider::new());
    let provisioner = provisioner(provider.clone());

    let err = provisioner
        .provision(&spec(&["sn-1", "sn-1"]), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(err.is_validation());
    assert_eq!(provider.describe_filesystem_calls(), 0);
}
