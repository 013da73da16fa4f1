// # Tracking Backend Trait
//
// Defines the interface to a parcel tracking API.
//
// ## Implementations
//
// - Ship24: `shiptrack-ship24` crate
//
// ## Usage
//
// ```rust,ignore
// use shiptrack_core::TrackingBackend;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let backend = /* TrackingBackend implementation */;
//
//     // Register the shipment (or find the existing tracker)
//     let package = backend.create_tracker("S24DEMO456393", None).await?;
//
//     // Later: refresh it
//     let package = backend.fetch_package("S24DEMO456393").await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

use crate::model::PackageData;

/// Trait for tracking API implementations
///
/// A backend pairs an API client with an adapter: every method that talks
/// to the remote side returns already-normalized [`PackageData`].
///
/// # Responsibilities
///
/// Backends perform one logical API operation per call and report the
/// outcome. They do not retry, schedule, cache or decide which packages are
/// tracked; the coordinator owns all of that. A failed call is simply
/// retried on the coordinator's next cycle.
///
/// # Errors
///
/// - [`Error::Authentication`](crate::Error::Authentication) for a rejected key
/// - [`Error::NotFound`](crate::Error::NotFound) when no tracker exists
/// - [`Error::Network`](crate::Error::Network) / [`Error::Timeout`](crate::Error::Timeout)
///   for transport failures
/// - [`Error::MalformedPayload`](crate::Error::MalformedPayload) when the
///   response cannot be mapped
#[async_trait]
pub trait TrackingBackend: Send + Sync {
    /// Create a tracker for `tracking_number`, or find the existing one
    ///
    /// Returns the current tracking results either way.
    async fn create_tracker(
        &self,
        tracking_number: &str,
        carrier_code: Option<&str>,
    ) -> Result<PackageData, crate::Error>;

    /// Fetch the latest results for an existing tracker
    async fn fetch_package(&self, tracking_number: &str) -> Result<PackageData, crate::Error>;

    /// Map a pushed webhook body to the packages it describes
    ///
    /// The outer error means the body itself is unusable. Each tracking is
    /// mapped on its own, so one bad entry does not hide the others. An
    /// empty vector means the payload carried no trackings.
    fn parse_webhook(
        &self,
        payload: &serde_json::Value,
    ) -> Result<Vec<Result<PackageData, crate::Error>>, crate::Error>;

    /// Check that the configured credentials are accepted
    async fn verify_credentials(&self) -> Result<(), crate::Error>;

    /// Get the backend name (for logging/debugging)
    fn backend_name(&self) -> &'static str;
}
