// # Tracked Store Trait
//
// Defines the interface for persisting the tracked-package set.
//
// ## Purpose
//
// The tracked store remembers which tracking numbers are monitored, and the
// user label attached to each, across restarts. Package data itself is not
// stored here; it is re-fetched on startup.
//
// ## Implementations
//
// - In-memory: `MemoryTrackedStore`
// - JSON file: `FileTrackedStore`

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry of the tracked-package set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedPackage {
    /// The tracking number (stable key)
    pub tracking_number: String,
    /// Optional user label
    #[serde(default)]
    pub custom_name: Option<String>,
    /// When the number was first added
    pub added_at: DateTime<Utc>,
}

impl TrackedPackage {
    /// Create a new entry stamped with the current time
    pub fn new(tracking_number: impl Into<String>, custom_name: Option<String>) -> Self {
        Self {
            tracking_number: tracking_number.into(),
            custom_name,
            added_at: Utc::now(),
        }
    }
}

/// Trait for tracked-set store implementations
///
/// All methods must be safe to call concurrently from multiple tasks.
#[async_trait]
pub trait TrackedStore: Send + Sync {
    /// Get one entry
    ///
    /// # Returns
    ///
    /// - `Ok(Some(TrackedPackage))`: The entry
    /// - `Ok(None)`: Not tracked
    /// - `Err(Error)`: Storage error
    async fn get_package(&self, tracking_number: &str)
    -> Result<Option<TrackedPackage>, crate::Error>;

    /// Insert or replace an entry
    async fn set_package(&self, package: &TrackedPackage) -> Result<(), crate::Error>;

    /// Delete an entry
    ///
    /// Deleting a missing entry is not an error.
    async fn delete_package(&self, tracking_number: &str) -> Result<(), crate::Error>;

    /// List all entries, ordered by tracking number
    async fn list_packages(&self) -> Result<Vec<TrackedPackage>, crate::Error>;

    /// Persist any pending changes
    async fn flush(&self) -> Result<(), crate::Error>;
}
