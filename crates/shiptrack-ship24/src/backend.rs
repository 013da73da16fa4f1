// # Ship24 Tracking Backend
//
// Pairs the client with the adapter behind the `TrackingBackend` trait.

use async_trait::async_trait;
use shiptrack_core::config::ApiConfig;
use shiptrack_core::model::PackageData;
use shiptrack_core::traits::TrackingBackend;
use shiptrack_core::Result;

use crate::adapter;
use crate::client::{BACKEND_NAME, Ship24Client};

/// Ship24 implementation of [`TrackingBackend`]
#[derive(Debug)]
pub struct Ship24Backend {
    client: Ship24Client,
}

impl Ship24Backend {
    pub fn new(client: Ship24Client) -> Self {
        Self { client }
    }

    /// Build a backend from API configuration
    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(Ship24Client::from_config(config)?))
    }

    pub fn client(&self) -> &Ship24Client {
        &self.client
    }
}

#[async_trait]
impl TrackingBackend for Ship24Backend {
    async fn create_tracker(
        &self,
        tracking_number: &str,
        carrier_code: Option<&str>,
    ) -> Result<PackageData> {
        let response = self
            .client
            .create_tracker(tracking_number, carrier_code)
            .await?;
        adapter::to_package_data(&response)
    }

    async fn fetch_package(&self, tracking_number: &str) -> Result<PackageData> {
        let response = self.client.get_tracker_results(tracking_number).await?;
        adapter::to_package_data(&response)
    }

    fn parse_webhook(&self, payload: &serde_json::Value) -> Result<Vec<Result<PackageData>>> {
        adapter::parse_webhook(payload)
    }

    async fn verify_credentials(&self) -> Result<()> {
        self.client.test_connection().await
    }

    fn backend_name(&self) -> &'static str {
        BACKEND_NAME
    }
}
