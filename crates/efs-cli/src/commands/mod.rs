pub mod list;
pub mod provision;
pub mod run;
pub mod sync;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use efs_core::StoreClient;
use efs_memory::{InMemoryProviderFactory, InMemoryStore};
use efs_provisioner::AppConfig;
use tokio_util::sync::CancellationToken;

use crate::{declarations, simulation};

/// Collaborators shared by every command.
pub struct Context {
    pub config: AppConfig,
    pub store: Arc<InMemoryStore>,
    pub providers: Arc<InMemoryProviderFactory>,
    declarations_path: PathBuf,
    state_path: PathBuf,
}

impl Context {
    /// Loads the declarations file and the simulated provider state.
    pub fn load(
        config: AppConfig,
        declarations_path: PathBuf,
        state_path: PathBuf,
        settle_after: u32,
    ) -> Result<Self> {
        Ok(Self {
            config,
            store: Arc::new(declarations::load_store(&declarations_path)?),
            providers: Arc::new(simulation::load(&state_path, settle_after)?),
            declarations_path,
            state_path,
        })
    }

    /// Writes the store back to the declarations file.
    pub async fn save_declarations(&self) -> Result<()> {
        let resources = self.store.list_declared().await?;
        declarations::save(&self.declarations_path, resources)
    }

    pub fn save_provider_state(&self) -> Result<()> {
        simulation::save(&self.state_path, &self.providers)
    }
}

/// Token cancelled on Ctrl+C.
pub fn shutdown_token() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown requested");
        }
        trigger.cancel();
    });
    token
}
