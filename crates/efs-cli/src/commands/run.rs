use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use efs_core::StoreClient;
use efs_provisioner::{Provisioner, ProvisioningController};

use super::{Context, shutdown_token};
use crate::cli::OutputFormat;
use crate::output::print_resources;

/// Runs the controller and the synchronizer side by side until Ctrl+C.
pub async fn run(ctx: &Context, period: Option<Duration>, format: OutputFormat) -> Result<()> {
    let provisioner = Arc::new(
        Provisioner::new(ctx.providers.clone()).with_poller(ctx.config.poll.poller()),
    );
    let controller = ProvisioningController::new(ctx.store.clone(), provisioner)
        .with_request_timeout(ctx.config.provisioning.request_timeout());
    let synchronizer = super::sync::synchronizer(ctx);

    let cancel = shutdown_token();
    let sync_period = period.unwrap_or_else(|| ctx.config.sync_interval());

    tokio::join!(
        controller.run(ctx.config.provisioning_interval(), cancel.clone()),
        synchronizer.run(sync_period, cancel.clone()),
    );

    ctx.save_declarations().await?;
    ctx.save_provider_state()?;

    let resources = ctx.store.list_declared().await?;
    print_resources(&resources, format)
}
