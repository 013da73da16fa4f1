//! HTTP surface for shiptrack
//!
//! ## Routes
//!
//! | method | path | purpose |
//! |---|---|---|
//! | GET | `/health` | liveness |
//! | GET | `/api/packages` | all package sensors |
//! | GET | `/api/packages/{tracking_number}` | one package sensor |
//! | GET | `/api/status` | "Last Message" sensor |
//! | POST | `/api/services/add_tracking` | start tracking |
//! | POST | `/api/services/remove_tracking` | stop tracking |
//! | POST | `/api/services/refresh` | refresh all packages now |
//! | POST | `/api/webhook/{webhook_id}` | Ship24 push receiver |

pub mod error;
pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use shiptrack_core::{UpdateCoordinator, WebhookInbox};
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<UpdateCoordinator>,
    pub inbox: WebhookInbox,
    /// Accepted webhook path segment; webhooks are refused when `None`
    pub webhook_id: Option<String>,
}

impl AppState {
    pub fn new(coordinator: Arc<UpdateCoordinator>, webhook_id: Option<String>) -> Self {
        let inbox = coordinator.webhook_inbox();
        Self {
            coordinator,
            inbox,
            webhook_id,
        }
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/packages", get(handlers::list_packages))
        .route("/api/packages/{tracking_number}", get(handlers::get_package))
        .route("/api/status", get(handlers::status))
        .route("/api/services/add_tracking", post(handlers::add_tracking))
        .route("/api/services/remove_tracking", post(handlers::remove_tracking))
        .route("/api/services/refresh", post(handlers::refresh))
        .route("/api/webhook/{webhook_id}", post(handlers::webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the router until `shutdown` resolves
pub async fn serve(
    listener: tokio::net::TcpListener,
    state: AppState,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("HTTP server listening on http://{}", addr);
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}
