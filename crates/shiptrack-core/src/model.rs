//! Normalized package model
//!
//! [`PackageData`] is the backend-agnostic representation of one shipment.
//! Backends produce it, the coordinator caches it, and the entity layer
//! renders it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Normalized shipment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageStatus {
    /// Carrier has the shipment info but no movement yet
    Pending,
    /// Moving through the carrier network
    InTransit,
    /// On the vehicle for final delivery
    OutForDelivery,
    /// Delivered
    Delivered,
    /// Delivery problem, failed attempt, return
    Exception,
    /// No status, or a status code we do not recognise
    #[default]
    Unknown,
}

impl PackageStatus {
    /// Stable string code (`in_transit`, `delivered`, ...)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InTransit => "in_transit",
            Self::OutForDelivery => "out_for_delivery",
            Self::Delivered => "delivered",
            Self::Exception => "exception",
            Self::Unknown => "unknown",
        }
    }

    /// Default human-readable text
    pub fn default_text(&self) -> &'static str {
        match self {
            Self::Pending => "Info Received",
            Self::InTransit => "In Transit",
            Self::OutForDelivery => "Out for Delivery",
            Self::Delivered => "Delivered",
            Self::Exception => "Exception",
            Self::Unknown => "Unknown",
        }
    }

    /// Display icon
    pub fn icon(&self) -> &'static str {
        match self {
            Self::InTransit => "mdi:truck-delivery",
            Self::OutForDelivery => "mdi:truck-fast",
            Self::Delivered => "mdi:check-circle",
            Self::Exception => "mdi:alert-circle",
            Self::Pending | Self::Unknown => "mdi:package-variant",
        }
    }
}

impl std::fmt::Display for PackageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A latitude/longitude pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// One entry in a shipment timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingEvent {
    pub timestamp: DateTime<Utc>,
    pub status: PackageStatus,
    pub status_text: String,
    pub location_text: Option<String>,
    pub location: Option<GeoPoint>,
}

impl TrackingEvent {
    /// Identity used when merging timelines across refreshes
    fn same_as(&self, other: &TrackingEvent) -> bool {
        self.timestamp == other.timestamp
            && self.status_text == other.status_text
            && self.location_text == other.location_text
    }
}

/// Normalized representation of one shipment
///
/// `tracking_number` is the stable key. `events` are ordered oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageData {
    pub tracking_number: String,
    pub carrier: Option<String>,
    pub status: PackageStatus,
    pub status_text: String,
    pub last_update: Option<DateTime<Utc>>,
    pub estimated_delivery: Option<DateTime<Utc>>,
    pub location: Option<GeoPoint>,
    pub location_text: Option<String>,
    pub events: Vec<TrackingEvent>,
    pub custom_name: Option<String>,
    pub tracker_id: Option<String>,
}

impl PackageData {
    /// Create a package with unknown status and no optional data
    pub fn new(tracking_number: impl Into<String>) -> Self {
        Self {
            tracking_number: tracking_number.into(),
            carrier: None,
            status: PackageStatus::Unknown,
            status_text: PackageStatus::Unknown.default_text().to_string(),
            last_update: None,
            estimated_delivery: None,
            location: None,
            location_text: None,
            events: Vec::new(),
            custom_name: None,
            tracker_id: None,
        }
    }

    /// Most recent event, if any
    pub fn latest_event(&self) -> Option<&TrackingEvent> {
        self.events.last()
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Carry forward history from the previous snapshot of the same package
    ///
    /// Events that were present before and are missing from this snapshot are
    /// kept, so the timeline only ever grows between refreshes. The result is
    /// re-sorted oldest first.
    pub fn merge_history(&mut self, previous: &PackageData) {
        if previous.tracking_number != self.tracking_number {
            return;
        }

        let missing: Vec<TrackingEvent> = previous
            .events
            .iter()
            .filter(|old| !self.events.iter().any(|new| new.same_as(old)))
            .cloned()
            .collect();

        if missing.is_empty() {
            return;
        }

        self.events.extend(missing);
        self.events.sort_by_key(|e| e.timestamp);
    }
}
