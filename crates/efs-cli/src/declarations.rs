//! Declared filesystems loaded from a TOML file.
//!
//! ```toml
//! [[filesystem]]
//! namespace = "acme"
//! name = "prod"
//! region = "ap-southeast-2"
//! subnets = ["subnet-a", "subnet-b"]
//! security_group = "sg-1234"
//! performance = "maxIO"
//! ```
//!
//! The file is the store of record for the binary: statuses written by a
//! sync are saved back as a `status` table under each filesystem.

use std::path::Path;

use anyhow::{Context, Result};
use efs_core::{
    DeclaredResource, DeclaredSpec, ObjectMeta, PerformanceMode, ReconciliationStatus,
};
use efs_memory::InMemoryStore;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Serialize, Deserialize)]
struct DeclarationsFile {
    #[serde(default)]
    filesystem: Vec<Declaration>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Declaration {
    #[serde(default = "default_namespace")]
    namespace: String,
    name: String,
    #[serde(default)]
    region: String,
    #[serde(default)]
    subnets: Vec<String>,
    #[serde(default)]
    security_group: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    performance: Option<PerformanceMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    status: Option<ReconciliationStatus>,
}

fn default_namespace() -> String {
    "default".into()
}

impl From<Declaration> for DeclaredResource {
    fn from(d: Declaration) -> Self {
        let mut resource = DeclaredResource::new(
            ObjectMeta::new(d.namespace, d.name),
            DeclaredSpec {
                region: d.region,
                subnets: d.subnets,
                security_group: d.security_group,
                performance: d.performance,
            },
        )
        .with_defaults();
        resource.status = d.status;
        resource
    }
}

impl From<DeclaredResource> for Declaration {
    fn from(r: DeclaredResource) -> Self {
        Self {
            namespace: r.metadata.namespace,
            name: r.metadata.name,
            region: r.spec.region,
            subnets: r.spec.subnets,
            security_group: r.spec.security_group,
            performance: r.spec.performance,
            status: r.status,
        }
    }
}

pub fn parse(content: &str) -> Result<Vec<DeclaredResource>> {
    let file: DeclarationsFile = toml::from_str(content).context("invalid declarations file")?;
    Ok(file.filesystem.into_iter().map(Into::into).collect())
}

/// Loads declarations into a fresh store. A missing file yields an empty store.
pub fn load_store(path: &Path) -> Result<InMemoryStore> {
    if !path.exists() {
        tracing::warn!(path = %path.display(), "Declarations file not found, starting empty");
        return Ok(InMemoryStore::new());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(InMemoryStore::with_resources(parse(&content)?))
}

/// Writes declarations, with their current status, back to `path`.
pub fn save(path: &Path, resources: Vec<DeclaredResource>) -> Result<()> {
    let file = DeclarationsFile {
        filesystem: resources.into_iter().map(Into::into).collect(),
    };
    let content = toml::to_string_pretty(&file).context("failed to encode declarations")?;
    std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}
