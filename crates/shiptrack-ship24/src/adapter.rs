//! Ship24 response adapter
//!
//! Pure functions converting raw Ship24 JSON into [`PackageData`]. The only
//! failure is a response without a tracking number; every other missing
//! field is left unset.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use shiptrack_core::model::{GeoPoint, PackageData, PackageStatus, TrackingEvent};
use shiptrack_core::{Error, Result};

use crate::schema::{EventLocation, Tracking, WebhookPayload};

/// Map a `statusMilestone` (and optional `statusCode`) to a status and text
///
/// Unknown milestones map to [`PackageStatus::Unknown`] with the raw
/// milestone as text. A `statusCode` naming delivery, out-for-delivery or a
/// failure overrides the milestone.
pub fn map_status(milestone: Option<&str>, status_code: Option<&str>) -> (PackageStatus, String) {
    let Some(milestone) = milestone.filter(|m| !m.is_empty()) else {
        return (PackageStatus::Unknown, "Unknown".to_string());
    };

    let (status, text) = match milestone.to_ascii_lowercase().as_str() {
        "info_received" => (PackageStatus::Pending, "Info Received".to_string()),
        "in_transit" => (PackageStatus::InTransit, "In Transit".to_string()),
        "out_for_delivery" => (PackageStatus::OutForDelivery, "Out for Delivery".to_string()),
        "delivered" => (PackageStatus::Delivered, "Delivered".to_string()),
        "exception" => (PackageStatus::Exception, "Exception".to_string()),
        "failed_attempt" => (PackageStatus::Exception, "Failed Attempt".to_string()),
        "available_for_pickup" => (PackageStatus::InTransit, "Available for Pickup".to_string()),
        _ => (PackageStatus::Unknown, milestone.to_string()),
    };

    if let Some(code) = status_code {
        let code = code.to_ascii_lowercase();
        if code.contains("delivery_delivered") {
            return (PackageStatus::Delivered, "Delivered".to_string());
        }
        if code.contains("delivery_out_for_delivery") {
            return (PackageStatus::OutForDelivery, "Out for Delivery".to_string());
        }
        if code.contains("exception") || code.contains("failed") {
            return (PackageStatus::Exception, "Exception".to_string());
        }
    }

    (status, text)
}

/// Parse a Ship24 datetime
///
/// RFC 3339 first; naive forms without an offset are taken as UTC.
/// Returns `None` for anything unparseable.
pub fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }

    tracing::debug!("Unparseable Ship24 datetime: {}", value);
    None
}

/// Convert one API response (or bare tracking object) to PackageData
///
/// # Errors
///
/// `Error::MalformedPayload` if the body does not deserialize or carries no
/// tracking number.
pub fn to_package_data(response: &Value) -> Result<PackageData> {
    let tracking = Tracking::from_response(response)
        .map_err(|e| Error::malformed(format!("Unexpected Ship24 tracking format: {}", e)))?;
    tracking_to_package(tracking)
}

/// Convert a pushed webhook body to the packages it carries
///
/// Every tracking in the payload is mapped independently; a payload
/// without trackings yields an empty list.
pub fn parse_webhook(payload: &Value) -> Result<Vec<Result<PackageData>>> {
    if !payload.is_object() {
        return Err(Error::malformed("Webhook payload is not a JSON object"));
    }

    let payload: WebhookPayload = serde_json::from_value(payload.clone())
        .map_err(|e| Error::malformed(format!("Unexpected webhook format: {}", e)))?;

    if payload.trackings.is_empty() {
        tracing::warn!("Webhook payload has no trackings");
    }

    Ok(payload.trackings.iter().map(to_package_data).collect())
}

fn tracking_to_package(tracking: Tracking) -> Result<PackageData> {
    let tracker = tracking.tracker.unwrap_or_default();
    let tracking_number = tracker
        .tracking_number
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| Error::malformed("Missing tracking number in Ship24 response"))?;

    let shipment = tracking.shipment.unwrap_or_default();
    let raw_events = tracking.events.unwrap_or_default();

    let (status, status_text) = map_status(
        shipment.status_milestone.as_deref(),
        shipment.status_code.as_deref(),
    );

    let carrier = tracker
        .courier_code
        .as_ref()
        .and_then(|c| c.first())
        .or_else(|| {
            raw_events
                .first()
                .and_then(|e| e.courier_code.as_ref())
                .and_then(|c| c.first())
        })
        .map(str::to_string);

    let events = parse_events(&raw_events);
    let latest = events.last();

    let last_update = latest.map(|e| e.timestamp).or_else(|| {
        tracking
            .statistics
            .and_then(|s| s.timestamps)
            .and_then(|t| t.latest_milestone().and_then(parse_datetime))
    });

    let estimated_delivery = shipment
        .delivery
        .and_then(|d| d.estimated_delivery_date)
        .and_then(|d| parse_datetime(&d));

    let mut data = PackageData::new(tracking_number);
    data.carrier = carrier;
    data.status = status;
    data.status_text = status_text;
    data.last_update = last_update;
    data.estimated_delivery = estimated_delivery;
    data.location = latest.and_then(|e| e.location);
    data.location_text = latest.and_then(|e| e.location_text.clone());
    data.tracker_id = tracker.tracker_id;
    data.events = events;

    Ok(data)
}

fn parse_events(raw_events: &[crate::schema::Event]) -> Vec<TrackingEvent> {
    let mut events: Vec<TrackingEvent> = raw_events
        .iter()
        .filter_map(|raw| {
            let timestamp = raw.raw_timestamp().and_then(parse_datetime)?;

            let (status, mapped_text) =
                map_status(raw.status_milestone.as_deref(), raw.status_code.as_deref());
            let status_text = raw
                .status
                .clone()
                .filter(|s| !s.is_empty())
                .unwrap_or(mapped_text);

            let (location_text, location) = match &raw.location {
                Some(EventLocation::Text(text)) => (Some(text.clone()), None),
                Some(EventLocation::Detailed(detailed)) => {
                    let point = match (
                        detailed.latitude.as_ref().and_then(|c| c.value()),
                        detailed.longitude.as_ref().and_then(|c| c.value()),
                    ) {
                        (Some(latitude), Some(longitude)) => Some(GeoPoint {
                            latitude,
                            longitude,
                        }),
                        _ => None,
                    };
                    (detailed.text().map(str::to_string), point)
                }
                None => (None, None),
            };

            Some(TrackingEvent {
                timestamp,
                status,
                status_text,
                location_text: location_text.filter(|t| !t.is_empty()),
                location,
            })
        })
        .collect();

    events.sort_by_key(|e| e.timestamp);
    events
}
