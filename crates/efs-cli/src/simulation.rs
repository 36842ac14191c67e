//! Persisted state of the simulated provider.
//!
//! Filesystems and mount targets created by one invocation are saved as JSON
//! so later `sync` and `list` runs observe them.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use efs_memory::{InMemoryProviderFactory, ProviderSnapshot};

pub fn load(path: &Path, settle_after: u32) -> Result<InMemoryProviderFactory> {
    let factory = InMemoryProviderFactory::new().with_settle_after(settle_after);
    if !path.exists() {
        return Ok(factory);
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let regions: BTreeMap<String, ProviderSnapshot> = serde_json::from_str(&content)
        .with_context(|| format!("invalid provider state in {}", path.display()))?;
    factory.restore(regions);
    Ok(factory)
}

pub fn save(path: &Path, factory: &InMemoryProviderFactory) -> Result<()> {
    let content = serde_json::to_string_pretty(&factory.snapshot())?;
    std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use efs_core::LifecycleState;

    use super::*;

    #[test]
    fn test_state_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let factory = load(&path, 0).unwrap();
        let fs = factory
            .region("us-east-1")
            .insert_filesystem("acme-prod", LifecycleState::Available, 0);
        save(&path, &factory).unwrap();

        let reloaded = load(&path, 0).unwrap();
        let found = reloaded.region("us-east-1").filesystems_for("acme-prod");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, fs.id);
    }
}
