//! Read-only sensor views over the coordinator cache
//!
//! Sensors never call the backend. They render whatever the coordinator
//! last cached, flagged stale when the most recent refresh failed.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::coordinator::{PackageEntry, StatusMessage};
use crate::model::{PackageData, PackageStatus, TrackingEvent};

/// Unique-id prefix for package sensors
pub const UNIQUE_ID_PREFIX: &str = "ship24_";

/// Location attribute, rendered as `{latitude, longitude}`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LocationAttribute {
    pub latitude: f64,
    pub longitude: f64,
}

/// Attributes shown alongside a package sensor state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorAttributes {
    pub tracking_number: String,
    pub carrier: Option<String>,
    pub status: PackageStatus,
    pub status_text: String,
    pub last_update: Option<DateTime<Utc>>,
    pub estimated_delivery: Option<DateTime<Utc>>,
    pub location: Option<LocationAttribute>,
    pub location_text: Option<String>,
    pub events: Vec<TrackingEvent>,
    pub event_count: usize,
    pub custom_name: Option<String>,
    pub tracker_id: Option<String>,
}

impl From<&PackageData> for SensorAttributes {
    fn from(data: &PackageData) -> Self {
        Self {
            tracking_number: data.tracking_number.clone(),
            carrier: data.carrier.clone(),
            status: data.status,
            status_text: data.status_text.clone(),
            last_update: data.last_update,
            estimated_delivery: data.estimated_delivery,
            location: data.location.map(|p| LocationAttribute {
                latitude: p.latitude,
                longitude: p.longitude,
            }),
            location_text: data.location_text.clone(),
            events: data.events.clone(),
            event_count: data.event_count(),
            custom_name: data.custom_name.clone(),
            tracker_id: data.tracker_id.clone(),
        }
    }
}

/// Sensor view of one tracked package
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackageSensor {
    pub unique_id: String,
    pub name: String,
    /// Cached data exists
    pub available: bool,
    /// Last refresh failed; values are last-known-good
    pub stale: bool,
    pub error: Option<String>,
    pub native_value: Option<String>,
    pub icon: &'static str,
    pub attributes: Option<SensorAttributes>,
}

impl PackageSensor {
    pub fn from_entry(entry: &PackageEntry) -> Self {
        let name = entry
            .custom_name
            .clone()
            .unwrap_or_else(|| entry.tracking_number.clone());

        let error = match &entry.state {
            crate::coordinator::PackageState::Error { message, .. } => Some(message.clone()),
            _ => None,
        };

        let status = entry
            .data
            .as_ref()
            .map(|d| d.status)
            .unwrap_or_default();

        Self {
            unique_id: format!("{}{}", UNIQUE_ID_PREFIX, entry.tracking_number),
            name,
            available: entry.data.is_some(),
            stale: error.is_some(),
            error,
            native_value: entry.data.as_ref().map(|d| d.status_text.clone()),
            icon: status.icon(),
            attributes: entry.data.as_ref().map(SensorAttributes::from),
        }
    }
}

/// "Last Message" sensor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSensor {
    pub unique_id: String,
    pub name: String,
    pub native_value: String,
    pub last_updated: Option<DateTime<Utc>>,
}

impl StatusSensor {
    pub fn from_status(status: &StatusMessage) -> Self {
        let native_value = match (&status.last_error, &status.last_message) {
            (Some(error), _) => format!("Error: {}", error),
            (None, Some(message)) => message.clone(),
            (None, None) => "No messages".to_string(),
        };

        Self {
            unique_id: format!("{}status", UNIQUE_ID_PREFIX),
            name: "Last Message".to_string(),
            native_value,
            last_updated: status.updated_at,
        }
    }
}
