use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::service::ResolutionService;

use super::handlers::{health_check, redirect_link, RedirectState};

pub fn create_redirect_router(service: Arc<ResolutionService>) -> Router {
    let state = Arc::new(RedirectState { service });

    Router::new()
        .route("/", get(health_check))
        .route("/link/{code}", get(redirect_link))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
