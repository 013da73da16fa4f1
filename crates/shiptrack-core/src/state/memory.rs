// # Memory Tracked Store
//
// In-memory implementation of TrackedStore.
//
// All tracked numbers are lost on restart. Useful for tests and for
// deployments that seed the set from configuration on every start.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::tracked_store::{TrackedPackage, TrackedStore};

/// In-memory tracked store
///
/// # Example
///
/// ```rust,no_run
/// use shiptrack_core::state::MemoryTrackedStore;
/// use shiptrack_core::traits::{TrackedPackage, TrackedStore};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryTrackedStore::new();
///     store.set_package(&TrackedPackage::new("S24DEMO456393", None)).await?;
///     assert!(store.get_package("S24DEMO456393").await?.is_some());
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryTrackedStore {
    inner: Arc<RwLock<BTreeMap<String, TrackedPackage>>>,
}

impl MemoryTrackedStore {
    /// Create a new empty memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of tracked packages
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl TrackedStore for MemoryTrackedStore {
    async fn get_package(&self, tracking_number: &str) -> Result<Option<TrackedPackage>, Error> {
        Ok(self.inner.read().await.get(tracking_number).cloned())
    }

    async fn set_package(&self, package: &TrackedPackage) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard.insert(package.tracking_number.clone(), package.clone());
        Ok(())
    }

    async fn delete_package(&self, tracking_number: &str) -> Result<(), Error> {
        self.inner.write().await.remove(tracking_number);
        Ok(())
    }

    async fn list_packages(&self) -> Result<Vec<TrackedPackage>, Error> {
        Ok(self.inner.read().await.values().cloned().collect())
    }

    async fn flush(&self) -> Result<(), Error> {
        Ok(())
    }
}
