// # Ship24 API Client
//
// Raw HTTP access to the Ship24 REST API. Every method performs its
// requests once and returns the response body as JSON; mapping to
// `PackageData` happens in the adapter.
//
// ## Endpoints
//
// - List trackers: GET `/trackers`
// - Create tracker and get results: POST `/trackers/track`
// - Get results: GET `/trackers/search/{tracking_number}/results`
//
// ## Errors
//
// - 401/403: `Error::Authentication`
// - 404: `Error::NotFound`
// - 429: `Error::RateLimited`
// - 5xx: `Error::Backend` (transient)
// - Timeout / connect failure: `Error::Timeout` / `Error::Network`

use reqwest::{Method, StatusCode, Url};
use serde_json::{Value, json};
use shiptrack_core::config::{ApiConfig, DEFAULT_API_BASE_URL};
use shiptrack_core::{Error, Result};
use std::time::Duration;

use crate::schema::TrackerSummary;

/// Backend name used in errors and logs
pub const BACKEND_NAME: &str = "ship24";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Ship24 REST client
///
/// Single-shot: no retries, no caching. A failed call is retried by the
/// coordinator on its next cycle.
pub struct Ship24Client {
    /// Ship24 API key
    /// ⚠️ NEVER log this value
    api_key: String,

    base_url: String,

    client: reqwest::Client,
}

// Custom Debug implementation that hides the API key
impl std::fmt::Debug for Ship24Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ship24Client")
            .field("api_key", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl Ship24Client {
    /// Create a client against the public Ship24 API
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_options(api_key, DEFAULT_API_BASE_URL, DEFAULT_HTTP_TIMEOUT)
    }

    /// Create a client from API configuration
    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        Self::with_options(&config.api_key, &config.base_url, config.timeout())
    }

    /// Create a client with an explicit base URL and timeout
    ///
    /// # Errors
    ///
    /// `Error::Config` if the key is empty or the HTTP client cannot be built.
    pub fn with_options(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Error::config("Ship24 API key cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        let parsed = Url::parse(&base_url)
            .map_err(|e| Error::config(format!("Invalid Ship24 base URL {}: {}", base_url, e)))?;
        if parsed.cannot_be_a_base() {
            return Err(Error::config(format!(
                "Ship24 base URL {} cannot take a path",
                base_url
            )));
        }

        Ok(Self {
            api_key,
            base_url,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// List active trackers
    ///
    /// Only trackers with `isSubscribed` and `isTracked` both true count.
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /trackers
    /// Authorization: Bearer <key>
    /// ```
    pub async fn list_trackers(&self) -> Result<Vec<TrackerSummary>> {
        let response = self.request(Method::GET, &["trackers"], None, &[]).await?;

        let trackers = response
            .get("data")
            .and_then(|d| d.get("trackers"))
            .cloned()
            .unwrap_or_else(|| json!([]));

        let trackers: Vec<TrackerSummary> = serde_json::from_value(trackers).map_err(|e| {
            Error::malformed(format!("Unexpected tracker list format: {}", e))
        })?;

        Ok(trackers.into_iter().filter(TrackerSummary::is_active).collect())
    }

    /// Find an active tracker by tracking number
    pub async fn find_tracker(&self, tracking_number: &str) -> Result<Option<TrackerSummary>> {
        Ok(self
            .list_trackers()
            .await?
            .into_iter()
            .find(|t| t.tracking_number.as_deref() == Some(tracking_number)))
    }

    /// Create a tracker, or fetch results if one already exists
    ///
    /// # API Call
    ///
    /// ```http
    /// POST /trackers/track
    /// Authorization: Bearer <key>
    ///
    /// {"trackingNumber": "...", "courierCode": "..."}
    /// ```
    pub async fn create_tracker(
        &self,
        tracking_number: &str,
        carrier_code: Option<&str>,
    ) -> Result<Value> {
        if self.find_tracker(tracking_number).await?.is_some() {
            tracing::debug!("Tracker {} already exists, fetching results", tracking_number);
            return self.get_tracker_results(tracking_number).await;
        }

        let mut body = json!({ "trackingNumber": tracking_number });
        if let Some(code) = carrier_code {
            body["courierCode"] = json!(code);
        }

        tracing::info!("Creating Ship24 tracker for {}", tracking_number);
        self.request(Method::POST, &["trackers", "track"], Some(&body), &[])
            .await
    }

    /// Fetch tracking results for an existing tracker
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /trackers/search/{tracking_number}/results
    /// Authorization: Bearer <key>
    /// ```
    pub async fn get_tracker_results(&self, tracking_number: &str) -> Result<Value> {
        self.request(
            Method::GET,
            &["trackers", "search", tracking_number, "results"],
            None,
            &[],
        )
        .await
    }

    /// Check that the API key is accepted
    pub async fn test_connection(&self) -> Result<()> {
        self.request(Method::GET, &["trackers"], None, &[("limit", "1")])
            .await
            .map(|_| ())
    }

    /// Base URL plus `segments`, each percent-encoded as one path segment
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            Error::config(format!("Invalid Ship24 base URL {}: {}", self.base_url, e))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                Error::config(format!("Ship24 base URL {} cannot take a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn request(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&Value>,
        query: &[(&str, &str)],
    ) -> Result<Value> {
        let url = self.endpoint(segments)?;
        let path = url.path().to_string();
        tracing::trace!("Ship24 request: {} {}", method, path);

        let mut request = self
            .client
            .request(method, url)
            .bearer_auth(&self.api_key)
            .header("Content-Type", "application/json");
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| transport_error(&path, e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(status_error(status, &path, &error_text));
        }

        response
            .json()
            .await
            .map_err(|e| Error::malformed(format!("Failed to parse response from {}: {}", path, e)))
    }
}

fn transport_error(path: &str, err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::timeout(format!("{} did not respond in time", path))
    } else {
        Error::network(format!("HTTP request to {} failed: {}", path, err))
    }
}

fn status_error(status: StatusCode, path: &str, error_text: &str) -> Error {
    match status.as_u16() {
        401 | 403 => Error::auth(format!(
            "Invalid Ship24 API key or insufficient permissions. Status: {}",
            status
        )),
        404 => Error::not_found(format!("{} returned {}", path, status)),
        429 => Error::rate_limited(format!("Ship24 rate limit exceeded. Status: {}", status)),
        500..=599 => Error::backend(
            BACKEND_NAME,
            format!("Ship24 server error (transient): {} - {}", status, error_text),
        ),
        _ => Error::backend(
            BACKEND_NAME,
            format!("Request to {} failed: {} - {}", path, status, error_text),
        ),
    }
}
