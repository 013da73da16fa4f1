// # Ship24 Tracking Backend
//
// This crate provides the Ship24 implementation of `TrackingBackend`.
//
// - `client`: authenticated REST calls, raw JSON out
// - `schema`: serde model of the parts of a Ship24 tracking we read
// - `adapter`: raw JSON to `PackageData`
// - `backend`: the `TrackingBackend` impl tying the two together
//
// ## Constraints
//
// - One HTTP request per logical operation (create-or-find makes two)
// - No retry, backoff or caching; the coordinator owns scheduling
// - No background tasks
//
// ## Security
//
// - The API key never appears in logs or `Debug` output
// - Construction fails if the key is empty
//
// ## API Reference
//
// - Ship24 API v1: https://docs.ship24.com/
// - Create tracker and get results: POST `/trackers/track`
// - Get results: GET `/trackers/search/:trackingNumber/results`
// - List trackers: GET `/trackers`

pub mod adapter;
pub mod backend;
pub mod client;
pub mod schema;

pub use backend::Ship24Backend;
pub use client::Ship24Client;
