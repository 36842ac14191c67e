use std::time::Duration;

use efs_core::{FilesystemSpec, PerformanceMode};
use serde::{Deserialize, Serialize};

use crate::controller::DEFAULT_PROVISIONING_INTERVAL;
use crate::poller::{DEFAULT_POLL_INTERVAL, Poller};
use crate::status::{DEFAULT_SYNC_INTERVAL, ReadinessCheck};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Provider defaults used by one-off `provision` requests
    #[serde(default)]
    pub provider: ProviderSettings,
    #[serde(default)]
    pub poll: PollSettings,
    #[serde(default)]
    pub sync: SyncSettings,
    #[serde(default)]
    pub provisioning: ProvisioningSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.poll.interval_secs == 0 {
            return Err("poll.interval_secs must be > 0".into());
        }
        if self.sync.interval_secs == 0 {
            return Err("sync.interval_secs must be > 0".into());
        }
        if self.provisioning.interval_secs == 0 {
            return Err("provisioning.interval_secs must be > 0".into());
        }
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        Ok(())
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync.interval_secs)
    }

    pub fn provisioning_interval(&self) -> Duration {
        Duration::from_secs(self.provisioning.interval_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProviderSettings {
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub subnets: Vec<String>,
    #[serde(default)]
    pub security_group: String,
    #[serde(default)]
    pub performance_mode: PerformanceMode,
}

impl ProviderSettings {
    /// Checks the settings needed to provision without a declaration.
    pub fn validate(&self) -> Result<(), String> {
        if self.region.trim().is_empty() {
            return Err("provider.region is required".into());
        }
        if self.subnets.is_empty() {
            return Err("provider.subnets is required".into());
        }
        if self.security_group.trim().is_empty() {
            return Err("provider.security_group is required".into());
        }
        Ok(())
    }

    /// Builds a provisioning spec for `name` from these settings.
    pub fn spec_for(&self, name: &str) -> Result<FilesystemSpec, String> {
        self.validate()?;
        let spec = FilesystemSpec::new(
            name,
            &self.region,
            &self.security_group,
            self.subnets.iter().cloned(),
        )
        .with_performance_mode(self.performance_mode);
        spec.validate().map_err(|e| e.to_string())?;
        Ok(spec)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollSettings {
    #[serde(default = "default_poll_interval_secs")]
    pub interval_secs: u64,
    /// Upper bound on ensure calls per object; unset or 0 polls until cancelled
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_poll_interval_secs(),
            max_attempts: None,
        }
    }
}

impl PollSettings {
    pub fn poller(&self) -> Poller {
        Poller::new(Duration::from_secs(self.interval_secs)).with_max_attempts(self.max_attempts)
    }
}

fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL.as_secs()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    #[serde(default = "default_sync_interval_secs")]
    pub interval_secs: u64,
    #[serde(default)]
    pub readiness: ReadinessCheck,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_sync_interval_secs(),
            readiness: ReadinessCheck::default(),
        }
    }
}

fn default_sync_interval_secs() -> u64 {
    DEFAULT_SYNC_INTERVAL.as_secs()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisioningSettings {
    #[serde(default = "default_provisioning_interval_secs")]
    pub interval_secs: u64,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl Default for ProvisioningSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_provisioning_interval_secs(),
            request_timeout_secs: None,
        }
    }
}

impl ProvisioningSettings {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

fn default_provisioning_interval_secs() -> u64 {
    DEFAULT_PROVISIONING_INTERVAL.as_secs()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    pub const DEFAULT_CONFIG_FILE: &str = "efs-provisioner.toml";

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        match path {
            Some(p) => {
                let pathbuf = PathBuf::from(p);
                if !pathbuf.exists() {
                    return Err(format!("config file not found: {p}"));
                }
                builder = builder.add_source(File::from(pathbuf));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    builder = builder.add_source(File::from(default_path));
                }
            }
        }
        // Environment variable overrides, e.g., EFS__SYNC__INTERVAL_SECS=30
        builder = builder.add_source(
            Environment::with_prefix("EFS")
                .try_parsing(true)
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("provider.subnets"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}
