//! Core traits for the tracking system
//!
//! This module defines the abstract interfaces that implementations plug into.
//!
//! - [`TrackingBackend`]: Create trackers, fetch results, map webhook payloads
//! - [`TrackedStore`]: Persistence of the tracked-package set

pub mod tracked_store;
pub mod tracking_backend;

pub use tracked_store::{TrackedPackage, TrackedStore};
pub use tracking_backend::TrackingBackend;
