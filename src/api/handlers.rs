use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::auth::AuthUser;
use crate::error::ServiceError;
use crate::models::{AnalyticsSummary, ShortLink, ShortenRequest};
use crate::service::ResolutionService;

pub struct AppState {
    pub service: Arc<ResolutionService>,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct SuccessResponse {
    pub message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortenResponse {
    pub short_url: String,
}

fn error_response(err: ServiceError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match &err {
        ServiceError::NotFound => StatusCode::NOT_FOUND,
        ServiceError::Forbidden => StatusCode::FORBIDDEN,
        ServiceError::Internal(source) => {
            tracing::error!(error = %source, "internal service failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

/// Shorten a URL for the authenticated owner
pub async fn shorten_url(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<ShortenRequest>,
) -> Result<(StatusCode, Json<ShortenResponse>), (StatusCode, Json<ErrorResponse>)> {
    // Validate URL
    if payload.url.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "URL cannot be empty".to_string(),
            }),
        ));
    }

    if !payload.url.starts_with("http://") && !payload.url.starts_with("https://") {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "URL must start with http:// or https://".to_string(),
            }),
        ));
    }

    match state.service.shorten_url(&payload.url, &user.id).await {
        Ok(short_url) => Ok((StatusCode::CREATED, Json(ShortenResponse { short_url }))),
        Err(e) => Err(error_response(e)),
    }
}

/// List every link owned by the authenticated caller
pub async fn list_links(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<ShortLink>>, (StatusCode, Json<ErrorResponse>)> {
    match state.service.fetch_owner_links(&user.id).await {
        Ok(links) => Ok(Json(links)),
        Err(e) => Err(error_response(e)),
    }
}

/// Full analytics summary for one link, owner only
pub async fn link_analytics(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<AnalyticsSummary>, (StatusCode, Json<ErrorResponse>)> {
    match state.service.get_analytics(id, &user.id).await {
        Ok(summary) => Ok(Json(summary)),
        Err(e) => Err(error_response(e)),
    }
}

/// Health check endpoint
pub async fn health_check() -> Json<SuccessResponse> {
    Json(SuccessResponse {
        message: "OK".to_string(),
    })
}
