//! In-memory backends for the EFS provisioner.
//!
//! [`InMemoryProvider`] simulates an eventually consistent filesystem API:
//! new filesystems and mount targets report `creating` until they have been
//! observed a configurable number of times. [`InMemoryStore`] is a store of
//! record keyed by namespace and name. Both count calls and accept injected
//! faults, which makes them the test doubles for the engine.
//!
//! # Example
//!
//! ```ignore
//! use efs_core::ProviderClient;
//! use efs_memory::InMemoryProvider;
//!
//! let provider = InMemoryProvider::new().with_settle_after(2);
//! let fs = provider.create_filesystem("acme-prod", Default::default()).await?;
//! assert_eq!(provider.create_filesystem_calls(), 1);
//! ```

pub mod provider;
pub mod store;

pub use provider::{
    FilesystemSnapshot, InMemoryProvider, InMemoryProviderFactory, MountTargetSnapshot,
    ProviderSnapshot,
};
pub use store::InMemoryStore;
