//! Ship24 response schema
//!
//! Only the fields the adapter reads are modeled. Everything is optional so
//! a sparse response deserializes cleanly; required-ness is enforced by the
//! adapter.

use serde::Deserialize;
use serde_json::Value;

/// Entry of the `GET /trackers` list
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerSummary {
    pub tracker_id: Option<String>,
    pub tracking_number: Option<String>,
    #[serde(default)]
    pub is_subscribed: bool,
    #[serde(default)]
    pub is_tracked: bool,
}

impl TrackerSummary {
    pub fn is_active(&self) -> bool {
        self.is_subscribed && self.is_tracked
    }
}

/// One tracking object: tracker, shipment, events and statistics
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tracking {
    #[serde(default)]
    pub tracker: Option<TrackerInfo>,
    #[serde(default)]
    pub shipment: Option<Shipment>,
    #[serde(default, deserialize_with = "lenient_events")]
    pub events: Option<Vec<Event>>,
    #[serde(default)]
    pub statistics: Option<Statistics>,
}

impl Tracking {
    /// Locate the tracking object in an API response
    ///
    /// Accepts `data.trackings[0]`, `data.tracking`, or `data` (or the body
    /// itself when there is no `data`) as the tracking object.
    pub fn from_response(response: &Value) -> Result<Self, serde_json::Error> {
        let data = match response.get("data") {
            Some(data) if !data.is_null() => data,
            _ => response,
        };

        let tracking = match data.get("trackings").and_then(Value::as_array) {
            Some(trackings) if !trackings.is_empty() => &trackings[0],
            _ => data.get("tracking").unwrap_or(data),
        };

        Self::deserialize(tracking)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerInfo {
    pub tracker_id: Option<String>,
    pub tracking_number: Option<String>,
    #[serde(default)]
    pub courier_code: Option<CourierCode>,
}

/// `courierCode` appears both as a string and as a list
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CourierCode {
    One(String),
    Many(Vec<String>),
}

impl CourierCode {
    pub fn first(&self) -> Option<&str> {
        match self {
            Self::One(code) => Some(code.as_str()),
            Self::Many(codes) => codes.first().map(String::as_str),
        }
        .filter(|c| !c.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shipment {
    pub status_milestone: Option<String>,
    pub status_code: Option<String>,
    #[serde(default)]
    pub delivery: Option<Delivery>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Delivery {
    pub estimated_delivery_date: Option<String>,
}

/// Events that deserialize on their own; malformed entries are dropped
fn lenient_events<'de, D>(deserializer: D) -> Result<Option<Vec<Event>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    let Some(Value::Array(items)) = raw else {
        return Ok(None);
    };

    let events = items
        .into_iter()
        .filter_map(|item| match Event::deserialize(item) {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::debug!("Skipping malformed event: {}", e);
                None
            }
        })
        .collect();
    Ok(Some(events))
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub occurrence_datetime: Option<String>,
    pub occurred_at: Option<String>,
    pub datetime: Option<String>,
    pub timestamp: Option<String>,
    pub status_milestone: Option<String>,
    pub status_code: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub location: Option<EventLocation>,
    #[serde(default)]
    pub courier_code: Option<CourierCode>,
}

impl Event {
    /// First present timestamp field, in priority order
    pub fn raw_timestamp(&self) -> Option<&str> {
        [
            &self.occurrence_datetime,
            &self.occurred_at,
            &self.datetime,
            &self.timestamp,
        ]
        .into_iter()
        .flatten()
        .map(String::as_str)
        .find(|s| !s.is_empty())
    }
}

/// Event location: plain text or a structured object
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum EventLocation {
    Text(String),
    Detailed(DetailedLocation),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DetailedLocation {
    #[serde(default, alias = "lat")]
    pub latitude: Option<Coordinate>,
    #[serde(default, alias = "lng", alias = "lon")]
    pub longitude: Option<Coordinate>,
    pub address: Option<String>,
    pub name: Option<String>,
    pub city: Option<String>,
}

impl DetailedLocation {
    pub fn text(&self) -> Option<&str> {
        [&self.address, &self.name, &self.city]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|s| !s.is_empty())
    }
}

/// A coordinate sent as a number or a numeric string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Coordinate {
    Number(f64),
    Text(String),
}

impl Coordinate {
    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Statistics {
    #[serde(default)]
    pub timestamps: Option<Timestamps>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timestamps {
    pub delivered_datetime: Option<String>,
    pub out_for_delivery_datetime: Option<String>,
    pub in_transit_datetime: Option<String>,
    pub info_received_datetime: Option<String>,
}

impl Timestamps {
    /// Most advanced milestone timestamp present
    pub fn latest_milestone(&self) -> Option<&str> {
        [
            &self.delivered_datetime,
            &self.out_for_delivery_datetime,
            &self.in_transit_datetime,
            &self.info_received_datetime,
        ]
        .into_iter()
        .flatten()
        .map(String::as_str)
        .find(|s| !s.is_empty())
    }
}

/// Pushed webhook body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub trackings: Vec<Value>,
}
