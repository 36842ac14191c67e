use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use efs_core::PerformanceMode;

#[derive(Parser)]
#[command(name = "efs-provisioner")]
#[command(about = "Provision EFS filesystems and keep their status in sync")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the config file (defaults to ./efs-provisioner.toml when present)
    #[arg(short, long, global = true, env = "EFS_CONFIG")]
    pub config: Option<String>,

    /// Declared filesystems and their last status, as a TOML file of [[filesystem]] tables
    #[arg(
        short,
        long,
        global = true,
        env = "EFS_DECLARATIONS",
        default_value = "filesystems.toml"
    )]
    pub declarations: String,

    /// JSON file holding the simulated provider's filesystems and mount targets
    #[arg(
        long,
        global = true,
        env = "EFS_PROVIDER_STATE",
        default_value = ".efs-provider-state.json"
    )]
    pub state: String,

    /// Describe calls a simulated filesystem or mount target needs before it is available
    #[arg(long, global = true, env = "EFS_SETTLE_AFTER", default_value_t = 0)]
    pub settle_after: u32,

    /// Log level (overrides logging.level from config)
    #[arg(long, global = true, env = "EFS_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Output format
    #[arg(short, long, global = true)]
    pub format: Option<OutputFormat>,
}

#[derive(Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    Json,
    #[default]
    Table,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Provision one filesystem and wait until all of its mount targets are available
    Provision(ProvisionArgs),
    /// Write the observed readiness of declared filesystems to their status
    Sync(SyncArgs),
    /// Run the provisioning controller and the status synchronizer until interrupted
    Run(RunArgs),
    /// List declared filesystems and their status
    List,
}

#[derive(clap::Args)]
pub struct ProvisionArgs {
    /// Filesystem name, also used as the creation token
    pub name: String,
    /// Region of the filesystem
    #[arg(long, env = "AWS_REGION")]
    pub region: Option<String>,
    /// Subnets to create mount targets in
    #[arg(long, env = "AWS_SUBNETS", value_delimiter = ',')]
    pub subnets: Vec<String>,
    /// Security group applied to mount targets
    #[arg(long, env = "AWS_SECURITY_GROUP")]
    pub security_group: Option<String>,
    /// Performance mode: generalPurpose or maxIO
    #[arg(long, env = "EFS_PERFORMANCE")]
    pub performance: Option<PerformanceMode>,
}

#[derive(clap::Args)]
pub struct SyncArgs {
    /// Keep syncing on this period (e.g. 30s, 5m) instead of a single pass
    #[arg(long, env = "SYNC_PERIOD", value_parser = parse_period)]
    pub period: Option<Duration>,
}

#[derive(clap::Args)]
pub struct RunArgs {
    /// Status sync period (e.g. 30s, 5m); defaults to sync.interval_secs
    #[arg(long, env = "SYNC_PERIOD", value_parser = parse_period)]
    pub period: Option<Duration>,
}

/// Parses a human readable period such as `30s`, `5m` or `1m30s`.
pub fn parse_period(value: &str) -> Result<Duration, String> {
    let period = humantime::parse_duration(value.trim()).map_err(|e| format!("{e}: {value}"))?;
    if period.is_zero() {
        return Err("period must be > 0".into());
    }
    Ok(period)
}
