use anyhow::Result;
use efs_core::StoreClient;

use super::Context;
use crate::cli::OutputFormat;
use crate::output::print_resources;

pub async fn list(ctx: &Context, format: OutputFormat) -> Result<()> {
    let resources = ctx.store.list_declared().await?;
    print_resources(&resources, format)
}
