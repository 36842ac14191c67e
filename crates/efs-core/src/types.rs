//! Desired and observed filesystem types.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EfsError;

/// Throughput class of a filesystem.
///
/// See <http://docs.aws.amazon.com/efs/latest/ug/performance.html#performancemodes>.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PerformanceMode {
    #[default]
    #[serde(rename = "generalPurpose")]
    GeneralPurpose,
    #[serde(rename = "maxIO")]
    MaxIo,
}

impl PerformanceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GeneralPurpose => "generalPurpose",
            Self::MaxIo => "maxIO",
        }
    }
}

impl fmt::Display for PerformanceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PerformanceMode {
    type Err = EfsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "generalPurpose" => Ok(Self::GeneralPurpose),
            "maxIO" => Ok(Self::MaxIo),
            other => Err(EfsError::validation(format!(
                "unknown performance mode '{other}', expected generalPurpose or maxIO"
            ))),
        }
    }
}

/// Lifecycle state reported by the provider for filesystems and mount targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Creating,
    Available,
    Deleting,
    Deleted,
    #[default]
    #[serde(other)]
    Unknown,
}

impl LifecycleState {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Creating => "creating",
            Self::Available => "available",
            Self::Deleting => "deleting",
            Self::Deleted => "deleted",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Desired state of a filesystem, as submitted by a provisioning request.
///
/// `name` doubles as the provider creation token, so two specs with the same
/// name always resolve to the same filesystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilesystemSpec {
    pub name: String,
    pub region: String,
    #[serde(default)]
    pub performance_mode: PerformanceMode,
    pub security_group: String,
    pub subnets: Vec<String>,
}

impl FilesystemSpec {
    pub fn new(
        name: impl Into<String>,
        region: impl Into<String>,
        security_group: impl Into<String>,
        subnets: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            region: region.into(),
            performance_mode: PerformanceMode::default(),
            security_group: security_group.into(),
            subnets: subnets.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn with_performance_mode(mut self, mode: PerformanceMode) -> Self {
        self.performance_mode = mode;
        self
    }

    /// The provider-side idempotency key.
    pub fn creation_token(&self) -> &str {
        &self.name
    }

    /// Checks required fields are present and subnets form a set.
    pub fn validate(&self) -> Result<(), EfsError> {
        if self.name.trim().is_empty() {
            return Err(EfsError::validation("name must not be empty"));
        }
        if self.region.trim().is_empty() {
            return Err(EfsError::validation("region must not be empty"));
        }
        if self.security_group.trim().is_empty() {
            return Err(EfsError::validation("security group must not be empty"));
        }
        if self.subnets.is_empty() {
            return Err(EfsError::validation("at least one subnet is required"));
        }

        let mut seen = HashSet::new();
        for subnet in &self.subnets {
            if subnet.trim().is_empty() {
                return Err(EfsError::validation("subnet ids must not be empty"));
            }
            if !seen.insert(subnet.as_str()) {
                return Err(EfsError::validation(format!(
                    "subnet '{subnet}' is declared more than once"
                )));
            }
        }

        Ok(())
    }
}

/// A filesystem as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilesystemResource {
    pub id: String,
    pub creation_token: String,
    pub lifecycle_state: LifecycleState,
    #[serde(default)]
    pub performance_mode: PerformanceMode,
}

/// A per-subnet network endpoint for a filesystem, as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MountTarget {
    pub id: String,
    pub filesystem_id: String,
    pub subnet_id: String,
    pub lifecycle_state: LifecycleState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
}

/// Key/value label attached to a filesystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// The `Name` tag shown by provider consoles.
    pub fn name(value: impl Into<String>) -> Self {
        Self::new("Name", value)
    }
}
