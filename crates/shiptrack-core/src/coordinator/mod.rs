//! Update coordinator
//!
//! The UpdateCoordinator owns the tracked-package cache and is responsible for:
//! - Polling every tracked package on a fixed interval
//! - Applying pushed webhook payloads through the backend's adapter
//! - Adding and removing tracking numbers
//! - Keeping last-known-good data when a refresh fails
//!
//! ## Architecture
//!
//! ```text
//!   interval tick      webhook inbox      add/remove/refresh
//!         │                  │                    │
//!         └──────────────────┼────────────────────┘
//!                            ▼
//!                 ┌─────────────────────┐
//!                 │ UpdateCoordinator   │
//!                 └─────────────────────┘
//!                            │
//!       ┌────────────────────┼────────────────────┐
//!       ▼                    ▼                    ▼
//! ┌──────────────┐  ┌─────────────────┐  ┌──────────────┐
//! │ TrackedStore │  │ TrackingBackend │  │    Events    │
//! │ (set)        │  │ (fetch/parse)   │  │   (notify)   │
//! └──────────────┘  └─────────────────┘  └──────────────┘
//! ```
//!
//! ## Concurrency
//!
//! Each tracking number has its own async mutex. Refresh, webhook apply,
//! add and remove for the same number hold it, so one package is never
//! written by two tasks at once. Different packages proceed independently.

mod entry;

pub use entry::{PackageEntry, PackageState};

use std::collections::HashMap;
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock, mpsc, oneshot};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info, warn};

use crate::config::TrackerConfig;
use crate::error::{Error, FailureKind, Result};
use crate::model::{PackageData, PackageStatus};
use crate::traits::{TrackedPackage, TrackedStore, TrackingBackend};

/// Events emitted by the UpdateCoordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorEvent {
    /// Run loop started
    Started { packages_count: usize },

    /// Tracking number added to the tracked set
    PackageAdded { tracking_number: String },

    /// Tracking number removed from the tracked set
    PackageRemoved { tracking_number: String },

    /// Package refreshed from the API
    RefreshSucceeded {
        tracking_number: String,
        status: PackageStatus,
    },

    /// Package refresh failed; cached data retained
    RefreshFailed {
        tracking_number: String,
        kind: FailureKind,
        error: String,
    },

    /// Pushed update applied to a tracked package
    WebhookApplied {
        tracking_number: String,
        status: PackageStatus,
    },

    /// Pushed update for a number that is not tracked
    WebhookIgnored { tracking_number: String },

    /// Run loop stopped
    Stopped { reason: String },
}

/// Result of [`UpdateCoordinator::add_tracking`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AddOutcome {
    /// Newly tracked
    Added,
    /// Already tracked, nothing changed
    AlreadyTracked,
    /// Already tracked, custom name updated
    Renamed,
}

/// Counts from one refresh pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RefreshSummary {
    pub refreshed: usize,
    pub failed: usize,
}

/// Counts from one applied webhook payload
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WebhookSummary {
    pub applied: usize,
    /// Valid trackings for numbers that are not tracked
    pub ignored: usize,
    /// Trackings the adapter could not map
    pub rejected: usize,
}

/// Last outcome reported to the user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusMessage {
    pub last_message: Option<String>,
    pub last_error: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Handle for queueing webhook payloads into a running coordinator
#[derive(Debug, Clone)]
pub struct WebhookInbox {
    tx: mpsc::Sender<serde_json::Value>,
}

impl WebhookInbox {
    /// Queue a payload without waiting
    ///
    /// Fails with `RateLimited` when the inbox is full.
    pub fn try_submit(&self, payload: serde_json::Value) -> Result<()> {
        self.tx.try_send(payload).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => Error::rate_limited("Webhook inbox is full"),
            mpsc::error::TrySendError::Closed(_) => Error::Other("Coordinator stopped".to_string()),
        })
    }
}

/// Update coordinator
///
/// Shared behind an `Arc` by the run loop and the service/HTTP layer.
///
/// ## Lifecycle
///
/// 1. Create with [`UpdateCoordinator::new()`]
/// 2. Start with [`UpdateCoordinator::run()`] (once)
/// 3. Call services concurrently while it runs
/// 4. Run loop exits on shutdown and flushes the tracked store
pub struct UpdateCoordinator {
    backend: Arc<dyn TrackingBackend>,

    store: Arc<dyn TrackedStore>,

    /// Cache keyed by tracking number
    cache: RwLock<HashMap<String, PackageEntry>>,

    /// Per-tracking-number writer locks, pruned when released
    locks: LockMap,

    update_interval: Duration,

    webhook_tx: mpsc::Sender<serde_json::Value>,

    /// Taken by the run loop
    webhook_rx: Mutex<Option<mpsc::Receiver<serde_json::Value>>>,

    event_tx: mpsc::Sender<CoordinatorEvent>,

    status: RwLock<StatusMessage>,
}

impl UpdateCoordinator {
    /// Create a new coordinator
    ///
    /// # Returns
    ///
    /// A tuple of (coordinator, event_receiver) where event_receiver yields
    /// coordinator events
    pub fn new(
        backend: Arc<dyn TrackingBackend>,
        store: Arc<dyn TrackedStore>,
        config: &TrackerConfig,
    ) -> Result<(Self, mpsc::Receiver<CoordinatorEvent>)> {
        config.validate()?;

        let (event_tx, event_rx) = mpsc::channel(config.coordinator.event_channel_capacity);
        let (webhook_tx, webhook_rx) = mpsc::channel(config.coordinator.webhook_queue_capacity);

        let coordinator = Self {
            backend,
            store,
            cache: RwLock::new(HashMap::new()),
            locks: LockMap::default(),
            update_interval: config.update_interval(),
            webhook_tx,
            webhook_rx: Mutex::new(Some(webhook_rx)),
            event_tx,
            status: RwLock::new(StatusMessage::default()),
        };

        Ok((coordinator, event_rx))
    }

    pub fn update_interval(&self) -> Duration {
        self.update_interval
    }

    /// Handle for pushing webhook payloads into the run loop
    pub fn webhook_inbox(&self) -> WebhookInbox {
        WebhookInbox {
            tx: self.webhook_tx.clone(),
        }
    }

    /// Populate the cache from the tracked store
    ///
    /// Entries already in the cache are left as they are.
    ///
    /// # Returns
    ///
    /// Number of tracked packages
    pub async fn load(&self) -> Result<usize> {
        let tracked = self.store.list_packages().await?;
        let mut cache = self.cache.write().await;
        for package in &tracked {
            cache
                .entry(package.tracking_number.clone())
                .or_insert_with(|| {
                    PackageEntry::new(&package.tracking_number, package.custom_name.clone())
                });
        }
        debug!("Loaded {} tracked packages", tracked.len());
        Ok(tracked.len())
    }

    /// Run the coordinator until SIGINT
    pub async fn run(&self) -> Result<()> {
        self.run_with_shutdown(None).await
    }

    /// Run the coordinator until the given shutdown signal fires
    ///
    /// With `None`, waits for Ctrl-C instead. If any tracked package has no
    /// cached data yet the first refresh runs immediately; otherwise it
    /// waits one full interval.
    pub async fn run_with_shutdown(&self, shutdown_rx: Option<oneshot::Receiver<()>>) -> Result<()> {
        let webhook_rx = self
            .webhook_rx
            .lock()
            .await
            .take()
            .ok_or_else(|| Error::Other("Coordinator is already running".to_string()))?;
        let mut webhooks = ReceiverStream::new(webhook_rx);

        let packages_count = self.load().await?;
        self.emit_event(CoordinatorEvent::Started { packages_count });
        info!(
            "Coordinator started: {} packages, update interval {}s",
            packages_count,
            self.update_interval.as_secs()
        );

        let shutdown = async move {
            match shutdown_rx {
                Some(rx) => {
                    let _ = rx.await;
                }
                None => {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        error!("Failed to listen for Ctrl-C: {}", e);
                    }
                }
            }
        };
        tokio::pin!(shutdown);

        let first_tick = if self.needs_initial_refresh().await {
            tokio::time::Instant::now()
        } else {
            tokio::time::Instant::now() + self.update_interval
        };
        let mut ticker = tokio::time::interval_at(first_tick, self.update_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let summary = self.refresh_all().await;
                    debug!(
                        "Scheduled refresh done: {} refreshed, {} failed",
                        summary.refreshed, summary.failed
                    );
                }

                Some(payload) = webhooks.next() => {
                    if let Err(e) = self.apply_webhook(&payload).await {
                        warn!("Failed to apply webhook payload: {}", e);
                    }
                }

                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    self.emit_event(CoordinatorEvent::Stopped {
                        reason: "Shutdown signal".to_string(),
                    });
                    break;
                }
            }
        }

        self.store.flush().await?;
        info!("Tracked store flushed, coordinator stopped");

        Ok(())
    }

    async fn needs_initial_refresh(&self) -> bool {
        self.cache.read().await.values().any(|entry| entry.data.is_none())
    }

    /// Start tracking a package
    ///
    /// A new number is stored and immediately created (or found) at the
    /// backend. An authentication failure rolls the add back; any other
    /// failure leaves the package tracked in error state for the next cycle.
    pub async fn add_tracking(
        &self,
        tracking_number: &str,
        custom_name: Option<String>,
    ) -> Result<AddOutcome> {
        let tracking_number = normalize_tracking_number(tracking_number)?;
        let custom_name = custom_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        let _guard = self.lock_key(&tracking_number).await;

        if let Some(mut existing) = self.store.get_package(&tracking_number).await? {
            let outcome = match custom_name {
                Some(name) if existing.custom_name.as_deref() != Some(name.as_str()) => {
                    existing.custom_name = Some(name);
                    self.store.set_package(&existing).await?;
                    info!("Renamed {} to {:?}", tracking_number, existing.custom_name);
                    AddOutcome::Renamed
                }
                _ => {
                    debug!("{} is already tracked", tracking_number);
                    AddOutcome::AlreadyTracked
                }
            };

            let mut cache = self.cache.write().await;
            cache
                .entry(tracking_number.clone())
                .or_insert_with(|| PackageEntry::new(&tracking_number, None))
                .set_custom_name(existing.custom_name.clone());
            return Ok(outcome);
        }

        let tracked = TrackedPackage::new(&tracking_number, custom_name.clone());
        self.store.set_package(&tracked).await?;
        self.cache.write().await.insert(
            tracking_number.clone(),
            PackageEntry::new(&tracking_number, custom_name),
        );

        match self.create_locked(&tracking_number).await {
            Ok(_) => {
                info!("Now tracking {}", tracking_number);
                self.record_message(format!("Added tracking for {}", tracking_number))
                    .await;
            }
            Err(e) if e.failure_kind() == FailureKind::Auth => {
                error!("Rolling back add of {}: {}", tracking_number, e);
                self.store.delete_package(&tracking_number).await?;
                self.cache.write().await.remove(&tracking_number);
                self.record_error(e.to_string()).await;
                return Err(e);
            }
            Err(e) => {
                warn!(
                    "Tracking {} but initial fetch failed, retrying next cycle: {}",
                    tracking_number, e
                );
                self.record_error(format!("{}: {}", tracking_number, e)).await;
            }
        }

        self.emit_event(CoordinatorEvent::PackageAdded {
            tracking_number: tracking_number.clone(),
        });
        Ok(AddOutcome::Added)
    }

    /// Stop tracking a package and discard its cached data
    ///
    /// # Returns
    ///
    /// `true` if the number was tracked
    pub async fn remove_tracking(&self, tracking_number: &str) -> Result<bool> {
        let tracking_number = normalize_tracking_number(tracking_number)?;

        let removed = {
            let _guard = self.lock_key(&tracking_number).await;

            let was_stored = self.store.get_package(&tracking_number).await?.is_some();
            if was_stored {
                self.store.delete_package(&tracking_number).await?;
            }
            let was_cached = self.cache.write().await.remove(&tracking_number).is_some();
            was_stored || was_cached
        };

        if removed {
            info!("Stopped tracking {}", tracking_number);
            self.record_message(format!("Removed tracking for {}", tracking_number))
                .await;
            self.emit_event(CoordinatorEvent::PackageRemoved { tracking_number });
        } else {
            debug!("{} was not tracked", tracking_number);
        }

        Ok(removed)
    }

    /// Refresh every tracked package
    ///
    /// Failures are isolated per package and never abort the pass.
    pub async fn refresh_all(&self) -> RefreshSummary {
        let tracked = match self.store.list_packages().await {
            Ok(tracked) => tracked,
            Err(e) => {
                error!("Failed to list tracked packages: {}", e);
                self.record_error(e.to_string()).await;
                return RefreshSummary::default();
            }
        };

        let mut summary = RefreshSummary::default();
        for package in tracked {
            match self.refresh_one(&package.tracking_number).await {
                Ok(Some(_)) => summary.refreshed += 1,
                Ok(None) => {}
                Err(_) => summary.failed += 1,
            }
        }

        if summary.failed > 0 {
            self.record_error(format!(
                "{} of {} packages failed to update",
                summary.failed,
                summary.failed + summary.refreshed
            ))
            .await;
        } else {
            self.record_message(format!("Updated {} packages", summary.refreshed))
                .await;
        }

        summary
    }

    /// Refresh one tracked package
    pub async fn refresh_package(&self, tracking_number: &str) -> Result<PackageData> {
        let tracking_number = normalize_tracking_number(tracking_number)?;

        match self.refresh_one(&tracking_number).await {
            Ok(Some(data)) => {
                self.record_message(format!("Updated {}", tracking_number)).await;
                Ok(data)
            }
            Ok(None) => Err(Error::invalid_input(format!(
                "{} is not tracked",
                tracking_number
            ))),
            Err(e) => {
                self.record_error(format!("{}: {}", tracking_number, e)).await;
                Err(e)
            }
        }
    }

    /// Apply a pushed webhook payload
    ///
    /// Packages that are not tracked are ignored. A tracking the adapter
    /// cannot map is skipped without affecting the rest of the payload.
    pub async fn apply_webhook(&self, payload: &serde_json::Value) -> Result<WebhookSummary> {
        let results = match self.backend.parse_webhook(payload) {
            Ok(results) => results,
            Err(e) => {
                self.record_error(format!("Invalid webhook payload: {}", e)).await;
                return Err(e);
            }
        };

        let mut summary = WebhookSummary::default();
        let mut first_rejection = None;
        for result in results {
            let data = match result {
                Ok(data) => data,
                Err(e) => {
                    warn!("Skipping webhook tracking: {}", e);
                    summary.rejected += 1;
                    first_rejection.get_or_insert(e);
                    continue;
                }
            };
            let tracking_number = data.tracking_number.clone();

            let _guard = self.lock_key(&tracking_number).await;

            if self.store.get_package(&tracking_number).await?.is_none() {
                debug!("Ignoring webhook update for untracked {}", tracking_number);
                summary.ignored += 1;
                self.emit_event(CoordinatorEvent::WebhookIgnored { tracking_number });
                continue;
            }

            let status = data.status;
            self.update_entry(&tracking_number, |entry| entry.apply(data))
                .await;
            debug!("Webhook update applied to {}: {}", tracking_number, status);
            summary.applied += 1;
            self.emit_event(CoordinatorEvent::WebhookApplied {
                tracking_number,
                status,
            });
        }

        if let Some(e) = first_rejection {
            self.record_error(format!(
                "Webhook had {} invalid trackings: {}",
                summary.rejected, e
            ))
            .await;
        } else if summary.applied > 0 {
            self.record_message(format!("Webhook updated {} packages", summary.applied))
                .await;
        }

        Ok(summary)
    }

    /// Snapshot of all cache entries, ordered by tracking number
    pub async fn packages(&self) -> Vec<PackageEntry> {
        let mut entries: Vec<PackageEntry> = self.cache.read().await.values().cloned().collect();
        entries.sort_by(|a, b| a.tracking_number.cmp(&b.tracking_number));
        entries
    }

    /// Snapshot of one cache entry
    pub async fn package(&self, tracking_number: &str) -> Option<PackageEntry> {
        self.cache.read().await.get(tracking_number.trim()).cloned()
    }

    /// Tracking numbers in the tracked set
    pub async fn tracked_numbers(&self) -> Result<Vec<String>> {
        Ok(self
            .store
            .list_packages()
            .await?
            .into_iter()
            .map(|p| p.tracking_number)
            .collect())
    }

    pub async fn status_message(&self) -> StatusMessage {
        self.status.read().await.clone()
    }

    /// Refresh one package under its lock
    ///
    /// Returns `Ok(None)` if the number is no longer tracked.
    async fn refresh_one(&self, tracking_number: &str) -> Result<Option<PackageData>> {
        let _guard = self.lock_key(tracking_number).await;

        let Some(tracked) = self.store.get_package(tracking_number).await? else {
            return Ok(None);
        };

        let has_data = {
            let mut cache = self.cache.write().await;
            cache
                .entry(tracking_number.to_string())
                .or_insert_with(|| PackageEntry::new(tracking_number, tracked.custom_name.clone()))
                .data
                .is_some()
        };

        if has_data {
            self.update_entry(tracking_number, |entry| {
                entry.last_attempt = Some(Utc::now())
            })
            .await;
            let result = self.backend.fetch_package(tracking_number).await;
            self.record_result(tracking_number, result).await.map(Some)
        } else {
            self.create_locked(tracking_number).await.map(Some)
        }
    }

    /// Create-or-find at the backend; caller holds the package lock
    async fn create_locked(&self, tracking_number: &str) -> Result<PackageData> {
        self.update_entry(tracking_number, |entry| {
            entry.last_attempt = Some(Utc::now())
        })
        .await;
        let result = self.backend.create_tracker(tracking_number, None).await;
        self.record_result(tracking_number, result).await
    }

    async fn record_result(
        &self,
        tracking_number: &str,
        result: Result<PackageData>,
    ) -> Result<PackageData> {
        let result = result.and_then(|data| matching_number(tracking_number, data));
        match result {
            Ok(data) => {
                let status = data.status;
                let applied = self
                    .update_entry(tracking_number, |entry| {
                        entry.apply(data);
                        entry.data.clone()
                    })
                    .await
                    .flatten()
                    .ok_or_else(|| Error::Other(format!("{} left the cache", tracking_number)))?;
                debug!("Refreshed {}: {}", tracking_number, status);
                self.emit_event(CoordinatorEvent::RefreshSucceeded {
                    tracking_number: tracking_number.to_string(),
                    status,
                });
                Ok(applied)
            }
            Err(e) => {
                warn!(
                    "Refresh of {} via {} failed: {}",
                    tracking_number,
                    self.backend.backend_name(),
                    e
                );
                self.update_entry(tracking_number, |entry| entry.fail(&e))
                    .await;
                self.emit_event(CoordinatorEvent::RefreshFailed {
                    tracking_number: tracking_number.to_string(),
                    kind: e.failure_kind(),
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn update_entry<T>(
        &self,
        tracking_number: &str,
        f: impl FnOnce(&mut PackageEntry) -> T,
    ) -> Option<T> {
        self.cache.write().await.get_mut(tracking_number).map(f)
    }

    /// Take the writer lock for one tracking number
    async fn lock_key(&self, tracking_number: &str) -> KeyGuard {
        let lock = self
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(tracking_number.to_string())
            .or_default()
            .clone();

        KeyGuard {
            tracking_number: tracking_number.to_string(),
            locks: Arc::clone(&self.locks),
            guard: Some(lock.lock_owned().await),
        }
    }

    #[cfg(test)]
    fn lock_count(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    async fn record_message(&self, message: String) {
        let mut status = self.status.write().await;
        status.last_message = Some(message);
        status.last_error = None;
        status.updated_at = Some(Utc::now());
    }

    async fn record_error(&self, message: String) {
        let mut status = self.status.write().await;
        status.last_error = Some(message);
        status.updated_at = Some(Utc::now());
    }

    fn emit_event(&self, event: CoordinatorEvent) {
        if self.event_tx.try_send(event).is_err() {
            warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
        }
    }
}

type LockMap = Arc<std::sync::Mutex<HashMap<String, Arc<Mutex<()>>>>>;

/// Held writer lock for one tracking number
///
/// On drop the map entry is removed once no other task holds or waits on
/// the same mutex, so the map only contains numbers in use.
struct KeyGuard {
    tracking_number: String,
    locks: LockMap,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        // Release first so our own clone does not count below
        self.guard.take();

        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks
            .get(&self.tracking_number)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.tracking_number);
        }
    }
}

/// Reject backend data filed under a different tracking number
///
/// Case differences are accepted and the cache key wins.
fn matching_number(tracking_number: &str, mut data: PackageData) -> Result<PackageData> {
    if data.tracking_number == tracking_number {
        return Ok(data);
    }
    if data.tracking_number.eq_ignore_ascii_case(tracking_number) {
        data.tracking_number = tracking_number.to_string();
        return Ok(data);
    }
    Err(Error::malformed(format!(
        "Requested {} but the response is for {}",
        tracking_number, data.tracking_number
    )))
}

fn normalize_tracking_number(tracking_number: &str) -> Result<String> {
    let trimmed = tracking_number.trim();
    if trimmed.is_empty() {
        return Err(Error::invalid_input("Tracking number cannot be empty"));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_tracking_number() {
        assert_eq!(normalize_tracking_number("  S24X ").unwrap(), "S24X");
        assert!(matches!(
            normalize_tracking_number("   "),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_inbox_reports_full() {
        let (tx, _rx) = mpsc::channel(1);
        let inbox = WebhookInbox { tx };

        assert!(inbox.try_submit(serde_json::json!({})).is_ok());
        let err = inbox.try_submit(serde_json::json!({})).unwrap_err();
        assert!(err.is_transient());
    }

    /// Backend that echoes the requested number, or fails auth
    struct EchoBackend {
        reject_key: bool,
    }

    #[async_trait::async_trait]
    impl TrackingBackend for EchoBackend {
        async fn create_tracker(&self, tracking_number: &str, _: Option<&str>) -> Result<PackageData> {
            self.fetch_package(tracking_number).await
        }

        async fn fetch_package(&self, tracking_number: &str) -> Result<PackageData> {
            if self.reject_key {
                return Err(Error::auth("Invalid API key"));
            }
            Ok(PackageData::new(tracking_number))
        }

        fn parse_webhook(&self, payload: &serde_json::Value) -> Result<Vec<Result<PackageData>>> {
            Ok(payload["trackings"]
                .as_array()
                .into_iter()
                .flatten()
                .filter_map(|t| t.as_str())
                .map(|n| Ok(PackageData::new(n)))
                .collect())
        }

        async fn verify_credentials(&self) -> Result<()> {
            Ok(())
        }

        fn backend_name(&self) -> &'static str {
            "echo"
        }
    }

    fn coordinator(reject_key: bool) -> UpdateCoordinator {
        let (coordinator, _events) = UpdateCoordinator::new(
            Arc::new(EchoBackend { reject_key }),
            Arc::new(crate::state::MemoryTrackedStore::new()),
            &TrackerConfig::new("test-key"),
        )
        .unwrap();
        coordinator
    }

    #[tokio::test]
    async fn test_locks_are_pruned_after_use() {
        let coordinator = coordinator(false);

        for i in 0..50 {
            let number = format!("UNTRACKED{}", i);
            coordinator
                .apply_webhook(&serde_json::json!({ "trackings": [number.clone()] }))
                .await
                .unwrap();
            assert!(coordinator.refresh_package(&number).await.is_err());
        }
        coordinator.add_tracking("AA111", None).await.unwrap();
        coordinator.refresh_all().await;
        coordinator.remove_tracking("AA111").await.unwrap();

        assert_eq!(coordinator.lock_count(), 0);
    }

    #[tokio::test]
    async fn test_rolled_back_add_releases_lock() {
        let coordinator = coordinator(true);

        assert!(coordinator.add_tracking("AA111", None).await.is_err());
        assert_eq!(coordinator.lock_count(), 0);
    }

    #[tokio::test]
    async fn test_lock_survives_while_held() {
        let coordinator = Arc::new(coordinator(false));

        let held = coordinator.lock_key("AA111").await;

        let waiter = {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move {
                let _guard = coordinator.lock_key("AA111").await;
            })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        // The waiter still references the mutex, so its entry stays
        drop(held);
        assert_eq!(coordinator.lock_count(), 1);
        waiter.await.unwrap();
        assert_eq!(coordinator.lock_count(), 0);
    }

    #[test]
    fn test_matching_number() {
        let data = matching_number("S24X", PackageData::new("s24x")).unwrap();
        assert_eq!(data.tracking_number, "S24X");

        assert!(matches!(
            matching_number("S24X", PackageData::new("OTHER")),
            Err(Error::MalformedPayload(_))
        ));
    }
}
