use std::time::Duration;

use anyhow::Result;
use efs_provisioner::StatusSynchronizer;

use super::{Context, shutdown_token};
use crate::output::print_sync_report;

pub fn synchronizer(ctx: &Context) -> StatusSynchronizer {
    StatusSynchronizer::new(ctx.store.clone(), ctx.providers.clone())
        .with_readiness(ctx.config.sync.readiness)
}

/// Syncs once, or every `period` until Ctrl+C, then saves the statuses.
pub async fn sync(ctx: &Context, period: Option<Duration>) -> Result<()> {
    let synchronizer = synchronizer(ctx);

    match period {
        Some(period) => synchronizer.run(period, shutdown_token()).await,
        None => {
            let report = synchronizer.sync_once().await?;
            print_sync_report(&report);
        }
    }

    ctx.save_declarations().await?;
    // Describes advance simulated objects towards available.
    ctx.save_provider_state()
}
