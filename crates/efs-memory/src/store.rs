//! In-memory store of record.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use efs_core::{DeclaredResource, EfsError, ObjectMeta, StoreClient};

/// Store of record backed by a concurrent map keyed by namespace and name.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    objects: DashMap<ObjectMeta, DeclaredResource>,
    put_failures: DashMap<ObjectMeta, String>,
    fail_list: AtomicBool,
    put_calls: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with declared resources.
    pub fn with_resources(resources: impl IntoIterator<Item = DeclaredResource>) -> Self {
        let store = Self::new();
        for resource in resources {
            store.insert(resource);
        }
        store
    }

    /// Inserts or replaces an object without going through `put`.
    pub fn insert(&self, resource: DeclaredResource) {
        self.objects.insert(resource.metadata.clone(), resource);
    }

    /// Reads an object without going through `get`.
    pub fn snapshot(&self, namespace: &str, name: &str) -> Option<DeclaredResource> {
        self.objects
            .get(&ObjectMeta::new(namespace, name))
            .map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Makes `put` fail for one object.
    pub fn fail_put(&self, namespace: &str, name: &str, message: &str) {
        self.put_failures
            .insert(ObjectMeta::new(namespace, name), message.to_string());
    }

    /// Makes `list_declared` fail.
    pub fn fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StoreClient for InMemoryStore {
    async fn list_declared(&self) -> Result<Vec<DeclaredResource>, EfsError> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(EfsError::store("injected list failure"));
        }
        let mut resources: Vec<DeclaredResource> =
            self.objects.iter().map(|r| r.value().clone()).collect();
        resources.sort_by(|a, b| {
            (&a.metadata.namespace, &a.metadata.name)
                .cmp(&(&b.metadata.namespace, &b.metadata.name))
        });
        Ok(resources)
    }

    async fn get(&self, namespace: &str, name: &str) -> Result<DeclaredResource, EfsError> {
        self.snapshot(namespace, name)
            .ok_or_else(|| EfsError::store_object_not_found(namespace, name))
    }

    async fn put(&self, resource: &DeclaredResource) -> Result<(), EfsError> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.put_failures.get(&resource.metadata) {
            return Err(EfsError::store(message.value().clone()));
        }
        match self.objects.get_mut(&resource.metadata) {
            Some(mut existing) => {
                *existing = resource.clone();
                Ok(())
            }
            None => Err(EfsError::store_object_not_found(
                &resource.metadata.namespace,
                &resource.metadata.name,
            )),
        }
    }
}
