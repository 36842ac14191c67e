use anyhow::{Context as _, Result};
use efs_provisioner::{Provisioner, provisioner_name};

use super::{Context, shutdown_token};
use crate::cli::{OutputFormat, ProvisionArgs};
use crate::output::{print_success, print_volume};

pub async fn provision(ctx: &Context, args: &ProvisionArgs, format: OutputFormat) -> Result<()> {
    let mut settings = ctx.config.provider.clone();
    if let Some(region) = &args.region {
        settings.region = region.clone();
    }
    if !args.subnets.is_empty() {
        settings.subnets = args.subnets.clone();
    }
    if let Some(security_group) = &args.security_group {
        settings.security_group = security_group.clone();
    }
    if let Some(performance) = args.performance {
        settings.performance_mode = performance;
    }

    let spec = settings
        .spec_for(&args.name)
        .map_err(anyhow::Error::msg)
        .context("incomplete provider settings")?;

    tracing::info!(
        provisioner = %provisioner_name(spec.performance_mode),
        "Running provisioner"
    );

    let provisioner =
        Provisioner::new(ctx.providers.clone()).with_poller(ctx.config.poll.poller());
    let result = provisioner.provision(&spec, &shutdown_token()).await;
    // Objects created before a failure are kept, so save them either way.
    ctx.save_provider_state()?;
    let volume = result.with_context(|| format!("failed to provision {}", spec.name))?;

    print_volume(&volume, format)?;
    print_success(&format!(
        "Filesystem {} is ready with {} mount target(s)",
        volume.filesystem_id,
        volume.mount_targets.len()
    ));
    Ok(())
}
