use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;
use pod_store::ContentStore;
use tower_http::trace::TraceLayer;

use crate::handler;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ContentStore>,
    pub max_object_size: usize,
}

/// Build the axum router with all content store endpoints.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/health", get(handler::health_handler))
        .route("/objects", put(handler::put_object))
        .route("/objects/:digest", get(handler::get_object))
        .route(
            "/pins/:digest",
            post(handler::pin_object).delete(handler::unpin_object),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
