// # Tracked Store Implementations
//
// Implementations of the TrackedStore trait, plus a constructor that picks
// one from configuration.

pub mod file;
pub mod memory;

use std::sync::Arc;

pub use file::FileTrackedStore;
pub use memory::MemoryTrackedStore;

use crate::config::StoreConfig;
use crate::error::Result;
use crate::traits::TrackedStore;

/// Open the tracked store described by `config`
pub async fn open_store(config: &StoreConfig) -> Result<Arc<dyn TrackedStore>> {
    match config {
        StoreConfig::Memory => {
            tracing::info!("Using in-memory tracked store");
            Ok(Arc::new(MemoryTrackedStore::new()))
        }
        StoreConfig::File { path } => {
            tracing::info!("Using file tracked store at {}", path);
            Ok(Arc::new(FileTrackedStore::new(path).await?))
        }
    }
}
