mod cli;
mod commands;
mod declarations;
mod output;
mod simulation;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use efs_provisioner::config::loader::load_config;
use efs_provisioner::observability::init_tracing_with_level;

use cli::{Cli, Commands};
use commands::Context;
use output::print_error;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref()).map_err(anyhow::Error::msg)?;
    let level = cli.log_level.as_deref().unwrap_or(&config.logging.level);
    init_tracing_with_level(level);

    let format = cli.format.unwrap_or_default();
    let ctx = Context::load(
        config,
        PathBuf::from(&cli.declarations),
        PathBuf::from(&cli.state),
        cli.settle_after,
    )?;

    match &cli.command {
        Commands::Provision(args) => commands::provision::provision(&ctx, args, format).await?,
        Commands::Sync(args) => commands::sync::sync(&ctx, args.period).await?,
        Commands::Run(args) => commands::run::run(&ctx, args.period, format).await?,
        Commands::List => commands::list::list(&ctx, format).await?,
    }

    Ok(())
}
