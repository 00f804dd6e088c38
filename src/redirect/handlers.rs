use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use woothee::parser::Parser;

use crate::error::ServiceError;
use crate::models::HitMetadata;
use crate::service::ResolutionService;

pub struct RedirectState {
    pub service: Arc<ResolutionService>,
}

/// Resolve a short code and redirect to the original URL
pub async fn redirect_link(
    State(state): State<Arc<RedirectState>>,
    Path(code): Path<String>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let meta = hit_metadata(&headers);

    match state.service.resolve_url(&code, meta).await {
        // 307 keeps user agents from caching the hop, so every visit
        // reaches the analytics path
        Ok(url) => Redirect::temporary(&url).into_response(),
        Err(ServiceError::NotFound) => {
            (StatusCode::NOT_FOUND, "Short link not found").into_response()
        }
        Err(err) => {
            tracing::error!(short_code = %code, error = %err, "redirect resolution failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
        }
    }
}

/// Derive per-visit metadata from request headers: referrer from
/// `Referer`, browser and device category from `User-Agent`.
fn hit_metadata(headers: &HeaderMap) -> HitMetadata {
    let referral_source = headers
        .get(header::REFERER)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string);

    let user_agent = headers.get(header::USER_AGENT).and_then(|h| h.to_str().ok());
    let (browser_type, device_type) = parse_user_agent(user_agent);

    HitMetadata {
        referral_source,
        browser_type,
        device_type,
    }
}

fn parse_user_agent(user_agent: Option<&str>) -> (Option<String>, Option<String>) {
    let ua = match user_agent {
        Some(s) if !s.is_empty() => s,
        _ => return (None, None),
    };

    let parser = Parser::new();
    match parser.parse(ua) {
        Some(result) => {
            let browser = match result.name {
                "" | "UNKNOWN" => None,
                name => Some(name.to_lowercase()),
            };
            let device = match result.category {
                "" | "UNKNOWN" => None,
                category => Some(category.to_string()),
            };
            (browser, device)
        }
        None => (None, None),
    }
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    #[derive(Serialize)]
    struct HealthResponse {
        status: String,
    }

    Json(HealthResponse {
        status: "OK".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_user_agent_recognizes_chrome_on_desktop() {
        let ua = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                  (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
        let (browser, device) = parse_user_agent(Some(ua));
        assert_eq!(browser.as_deref(), Some("chrome"));
        assert_eq!(device.as_deref(), Some("pc"));
    }

    #[test]
    fn test_parse_user_agent_missing_or_garbage() {
        assert_eq!(parse_user_agent(None), (None, None));
        assert_eq!(parse_user_agent(Some("")), (None, None));

        let (browser, _) = parse_user_agent(Some("definitely-not-a-real-agent"));
        assert!(browser.is_none());
    }

    #[test]
    fn test_hit_metadata_reads_referer_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::REFERER, "https://google.com".parse().unwrap());

        let meta = hit_metadata(&headers);
        assert_eq!(meta.referral_source.as_deref(), Some("https://google.com"));
        assert!(meta.browser_type.is_none());
        assert!(meta.device_type.is_none());
    }
}
