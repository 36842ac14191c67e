//! Concurrent mount target provisioning.
//!
//! One task per subnet ensures its mount target and polls it until
//! available. The tasks run in a [`JoinSet`] under a child cancellation
//! token: the first failure cancels the remaining tasks, and the group is
//! always drained before returning so no task outlives the call. Mount
//! targets that were already created by other tasks are left in place.

use efs_core::{DynProvider, EfsError, MountTarget};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::ensure::ensure_mount_target;
use crate::poller::Poller;

/// Ensures one available mount target per subnet of an available filesystem.
///
/// Returns the mount targets in the order of `subnets`. The first task
/// failure observed is returned, wrapped with its subnet; which failure wins
/// when several tasks fail is not defined.
pub async fn provision_mount_targets(
    provider: DynProvider,
    poller: Poller,
    filesystem_id: &str,
    subnets: &[String],
    security_group: &str,
    cancel: &CancellationToken,
) -> Result<Vec<MountTarget>, EfsError> {
    let group = cancel.child_token();
    let mut tasks = JoinSet::new();

    for (index, subnet) in subnets.iter().enumerate() {
        let provider = provider.clone();
        let filesystem_id = filesystem_id.to_string();
        let subnet = subnet.clone();
        let security_group = security_group.to_string();
        let token = group.clone();

        tasks.spawn(async move {
            let label = format!("{filesystem_id}:{subnet}");
            let result = poller
                .converge(&label, &token, || {
                    ensure_mount_target(provider.as_ref(), &filesystem_id, &subnet, &security_group)
                })
                .await;
            (index, subnet, result)
        });
    }

    let mut ready: Vec<Option<MountTarget>> = vec![None; subnets.len()];
    let mut first_error: Option<EfsError> = None;

    while let Some(joined) = tasks.join_next().await {
        let failure = match joined {
            Ok((index, subnet, Ok(converged))) => {
                info!(
                    filesystem_id,
                    subnet = %subnet,
                    mount_target_id = %converged.resource.id,
                    attempts = converged.attempts,
                    "Mount target is available"
                );
                ready[index] = Some(converged.resource);
                continue;
            }
            Ok((_, subnet, Err(e))) => EfsError::mount_target(subnet, e),
            Err(join_error) => EfsError::internal(format!("mount target task failed: {join_error}")),
        };

        if first_error.is_none() {
            error!(filesystem_id, error = %failure, "Error creating mount target, cancelling remaining subnets");
            group.cancel();
            first_error = Some(failure);
        }
    }

    if let Some(e) = first_error {
        return Err(e);
    }

    Ok(ready.into_iter().flatten().collect())
}
