//! Declared resources held by the store of record.

use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::EfsError;
use crate::types::{FilesystemSpec, PerformanceMode};

/// Identity of a declared object in the store of record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub namespace: String,
    pub name: String,
}

impl ObjectMeta {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Desired filesystem settings as declared by a cluster user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclaredSpec {
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub subnets: Vec<String>,
    #[serde(default)]
    pub security_group: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance: Option<PerformanceMode>,
}

/// Readiness recorded by the status synchronizer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceState {
    #[serde(rename = "Ready")]
    Ready,
    #[serde(rename = "Not Ready")]
    NotReady,
    #[default]
    #[serde(rename = "Unknown")]
    Unknown,
}

impl fmt::Display for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => write!(f, "Ready"),
            Self::NotReady => write!(f, "Not Ready"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Last observed status of a declared filesystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationStatus {
    /// Provider filesystem id; empty when the filesystem could not be resolved.
    #[serde(default)]
    pub id: String,
    pub lifecycle_state: ResourceState,
    #[serde(with = "time::serde::rfc3339")]
    pub last_update: OffsetDateTime,
}

impl ReconciliationStatus {
    /// Builds a status stamped with the current time.
    pub fn new(id: impl Into<String>, lifecycle_state: ResourceState) -> Self {
        Self {
            id: id.into(),
            lifecycle_state,
            last_update: OffsetDateTime::now_utc(),
        }
    }

    /// Status for a resource whose filesystem could not be resolved.
    pub fn unknown() -> Self {
        Self::new(String::new(), ResourceState::Unknown)
    }
}

/// A declared filesystem object, as held by the store of record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredResource {
    pub metadata: ObjectMeta,
    pub spec: DeclaredSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ReconciliationStatus>,
}

impl DeclaredResource {
    pub fn new(metadata: ObjectMeta, spec: DeclaredSpec) -> Self {
        Self {
            metadata,
            spec,
            status: None,
        }
    }

    /// Creation token used at the provider: `{namespace}-{name}`.
    pub fn creation_token(&self) -> String {
        format!("{}-{}", self.metadata.namespace, self.metadata.name)
    }

    pub fn validate(&self) -> Result<(), EfsError> {
        if self.metadata.namespace.trim().is_empty() || self.metadata.name.trim().is_empty() {
            return Err(EfsError::validation("namespace and name are required"));
        }
        if self.spec.region.trim().is_empty() {
            return Err(EfsError::validation("spec.region is required"));
        }
        if self.spec.subnets.is_empty() {
            return Err(EfsError::validation("spec.subnets is required"));
        }
        if self.spec.security_group.trim().is_empty() {
            return Err(EfsError::validation("spec.securityGroup is required"));
        }
        Ok(())
    }

    /// Fills unset optional fields.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.spec.performance.get_or_insert_with(PerformanceMode::default);
        self
    }

    /// Validates the declaration and turns it into a provisioning spec.
    pub fn to_filesystem_spec(&self) -> Result<FilesystemSpec, EfsError> {
        self.validate()?;
        let spec = FilesystemSpec {
            name: self.creation_token(),
            region: self.spec.region.clone(),
            performance_mode: self.spec.performance.unwrap_or_default(),
            security_group: self.spec.security_group.clone(),
            subnets: self.spec.subnets.clone(),
        };
        spec.validate()?;
        Ok(spec)
    }

    pub fn is_ready(&self) -> bool {
        self.status
            .as_ref()
            .is_some_and(|s| s.lifecycle_state == ResourceState::Ready)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn declared() -> DeclaredResource {
        DeclaredResource::new(
            ObjectMeta::new("acme", "prod"),
            DeclaredSpec {
                region: "ap-southeast-2".into(),
                subnets: vec!["sn-1".into(), "sn-2".into()],
                security_group: "sg-1".into(),
                performance: None,
            },
        )
    }

    #[test]
    fn test_creation_token() {
        assert_eq!(declared().creation_token(), "acme-prod");
        assert_eq!(declared().metadata.to_string(), "acme/prod");
    }

    #[test]
    fn test_to_filesystem_spec_applies_default_performance() {
        let spec = declared().to_filesystem_spec().unwrap();
        assert_eq!(spec.name, "acme-prod");
        assert_eq!(spec.performance_mode, PerformanceMode::GeneralPurpose);
        assert_eq!(spec.subnets, vec!["sn-1", "sn-2"]);

        let defaulted = declared().with_defaults();
        assert_eq!(defaulted.spec.performance, Some(PerformanceMode::GeneralPurpose));
    }

    #[test]
    fn test_invalid_declaration() {
        let mut d = declared();
        d.spec.security_group.clear();
        assert!(d.validate().unwrap_err().is_validation());
        assert!(d.to_filesystem_spec().is_err());
    }

    #[test]
    fn test_status_wire_format() {
        let mut d = declared();
        d.status = Some(ReconciliationStatus::new("fs-123", ResourceState::NotReady));
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["status"]["lifecycleState"], "Not Ready");
        assert_eq!(json["status"]["id"], "fs-123");
        assert!(json["status"]["lastUpdate"].is_string());
        assert_eq!(json["spec"]["securityGroup"], "sg-1");

        let back: DeclaredResource = serde_json::from_value(json).unwrap();
        assert!(!back.is_ready());
    }
}
