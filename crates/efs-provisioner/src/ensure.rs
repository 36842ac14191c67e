//! Describe-or-create primitives.
//!
//! Both functions are idempotent: calling them again with the same input
//! returns the object created by the first call instead of creating another.
//! Neither retries; a provider failure is returned as is.

use efs_core::{EfsError, FilesystemResource, FilesystemSpec, MountTarget, ProviderClient, Tag};
use tracing::{debug, info, warn};

/// Returns the filesystem for `spec`'s creation token, creating it if absent.
///
/// A freshly created filesystem is tagged with its name on a best-effort
/// basis: a tagging failure is logged and the filesystem is still returned.
///
/// # Errors
///
/// Returns `EfsError::AmbiguousFilesystem` if the provider reports more than
/// one filesystem for the token, and provider errors from describe or create.
pub async fn ensure_filesystem(
    provider: &dyn ProviderClient,
    spec: &FilesystemSpec,
) -> Result<FilesystemResource, EfsError> {
    let token = spec.creation_token();
    let mut existing = provider.describe_filesystems(token).await?;

    match existing.len() {
        0 => {}
        1 => {
            let found = existing.swap_remove(0);
            debug!(
                filesystem = %token,
                filesystem_id = %found.id,
                lifecycle = %found.lifecycle_state,
                "Found existing filesystem"
            );
            return Ok(found);
        }
        count => return Err(EfsError::ambiguous(token, count)),
    }

    let created = provider
        .create_filesystem(token, spec.performance_mode)
        .await?;
    info!(
        filesystem = %token,
        filesystem_id = %created.id,
        performance_mode = %spec.performance_mode,
        "Created filesystem"
    );

    // Tags make it easier for operators to see what a filesystem was provisioned for.
    if let Err(e) = provider
        .tag_filesystem(&created.id, &[Tag::name(&spec.name)])
        .await
    {
        warn!(
            filesystem = %token,
            filesystem_id = %created.id,
            error = %e,
            "Failed to tag filesystem"
        );
    }

    Ok(created)
}

/// Returns the mount target of `filesystem_id` in `subnet_id`, creating it if absent.
///
/// The describe and the create are separate calls, so two processes ensuring
/// the same subnet at the same moment can both decide to create. The provider
/// rejects the second create; this function does not guard against it.
pub async fn ensure_mount_target(
    provider: &dyn ProviderClient,
    filesystem_id: &str,
    subnet_id: &str,
    security_group: &str,
) -> Result<MountTarget, EfsError> {
    let targets = provider.describe_mount_targets(filesystem_id).await?;

    if let Some(target) = targets.into_iter().find(|t| t.subnet_id == subnet_id) {
        debug!(
            filesystem_id,
            subnet = %subnet_id,
            mount_target_id = %target.id,
            lifecycle = %target.lifecycle_state,
            "Found existing mount target"
        );
        return Ok(target);
    }

    let created = provider
        .create_mount_target(filesystem_id, subnet_id, security_group)
        .await?;
    info!(
        filesystem_id,
        subnet = %subnet_id,
        mount_target_id = %created.id,
        "Created mount target"
    );
    Ok(created)
}
