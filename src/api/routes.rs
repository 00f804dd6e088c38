use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::auth::{auth_middleware, AuthService};
use crate::service::ResolutionService;

use super::handlers::{health_check, link_analytics, list_links, shorten_url, AppState};

pub fn create_api_router(
    service: Arc<ResolutionService>,
    auth_service: Arc<AuthService>,
) -> Router {
    let state = Arc::new(AppState { service });

    let protected_routes = Router::new()
        .route("/api/shorten", post(shorten_url))
        .route("/api/links", get(list_links))
        .route("/api/links/{id}/analytics", get(link_analytics))
        .route_layer(middleware::from_fn(move |headers, req, next| {
            let auth = Arc::clone(&auth_service);
            auth_middleware(auth, headers, req, next)
        }))
        .with_state(Arc::clone(&state));

    Router::new()
        .route("/health", get(health_check))
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
}
