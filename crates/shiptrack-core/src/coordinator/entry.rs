//! Per-package cache entries held by the coordinator

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Error, FailureKind};
use crate::model::PackageData;

/// Refresh state of one tracked package
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PackageState {
    /// Tracked, no refresh has completed yet
    Uninitialized,
    /// Last refresh succeeded
    Active,
    /// Last refresh failed; cached data (if any) is stale
    Error { kind: FailureKind, message: String },
}

impl PackageState {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

/// Coordinator cache value for one tracking number
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackageEntry {
    pub tracking_number: String,
    pub custom_name: Option<String>,
    pub state: PackageState,
    /// Last-known-good data, kept across failed refreshes
    pub data: Option<PackageData>,
    pub last_attempt: Option<DateTime<Utc>>,
    pub last_success: Option<DateTime<Utc>>,
}

impl PackageEntry {
    pub(crate) fn new(tracking_number: impl Into<String>, custom_name: Option<String>) -> Self {
        Self {
            tracking_number: tracking_number.into(),
            custom_name,
            state: PackageState::Uninitialized,
            data: None,
            last_attempt: None,
            last_success: None,
        }
    }

    /// Replace cached data with a fresh snapshot
    ///
    /// The custom name is stamped on the snapshot and the previous event
    /// history is merged in.
    pub(crate) fn apply(&mut self, mut data: PackageData) {
        data.custom_name = self.custom_name.clone();
        if let Some(previous) = &self.data {
            data.merge_history(previous);
        }
        self.data = Some(data);
        self.state = PackageState::Active;
        self.last_success = Some(Utc::now());
    }

    /// Mark the entry failed, keeping whatever data it had
    pub(crate) fn fail(&mut self, error: &Error) {
        self.state = PackageState::Error {
            kind: error.failure_kind(),
            message: error.to_string(),
        };
    }

    pub(crate) fn set_custom_name(&mut self, custom_name: Option<String>) {
        if let Some(data) = self.data.as_mut() {
            data.custom_name = custom_name.clone();
        }
        self.custom_name = custom_name;
    }
}
