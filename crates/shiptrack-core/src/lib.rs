// # shiptrack-core
//
// Core library for the package tracking service.
//
// ## Architecture Overview
//
// - **TrackingBackend**: Trait for tracking APIs (create, fetch, webhook parsing)
// - **TrackedStore**: Trait for persisting the tracked-package set
// - **UpdateCoordinator**: Polls tracked packages and applies webhook pushes
// - **Entity views**: Sensor-style read models over the coordinator cache
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from the Ship24 backend
// 2. **Explicit Context**: The tracked set and cache live in one coordinator
//    shared via `Arc`, never in globals
// 3. **Library-First**: All core functionality can be used as a library
// 4. **Last-Known-Good**: A failed refresh never erases cached data

pub mod config;
pub mod coordinator;
pub mod entity;
pub mod error;
pub mod model;
pub mod state;
pub mod traits;

// Re-export core types for convenience
pub use config::{ApiConfig, CoordinatorConfig, StoreConfig, TrackerConfig, WebhookConfig};
pub use coordinator::{
    AddOutcome, CoordinatorEvent, PackageEntry, PackageState, RefreshSummary, StatusMessage,
    UpdateCoordinator, WebhookInbox, WebhookSummary,
};
pub use entity::{PackageSensor, StatusSensor};
pub use error::{Error, FailureKind, Result};
pub use model::{GeoPoint, PackageData, PackageStatus, TrackingEvent};
pub use state::{FileTrackedStore, MemoryTrackedStore, open_store};
pub use traits::{TrackedPackage, TrackedStore, TrackingBackend};
