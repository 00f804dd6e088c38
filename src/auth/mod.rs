use axum::{
    extract::Request,
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::{AuthConfig, AuthMode};

/// Identity of the authenticated caller, inserted into request extensions
/// by the auth middleware.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

pub struct AuthService {
    mode: AuthMode,
    decoding_key: Option<DecodingKey>,
}

impl AuthService {
    pub fn new(config: &AuthConfig) -> Self {
        let decoding_key = config
            .jwt
            .as_ref()
            .map(|jwt| DecodingKey::from_secret(jwt.secret.as_bytes()));
        Self {
            mode: config.mode.clone(),
            decoding_key,
        }
    }

    /// Resolve the caller identity from request headers.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<AuthUser, &'static str> {
        match self.mode {
            AuthMode::None => {
                // Auth disabled (dev mode): trust a caller-supplied id
                let id = headers
                    .get("X-User-Id")
                    .and_then(|h| h.to_str().ok())
                    .unwrap_or("anonymous")
                    .to_string();
                Ok(AuthUser { id })
            }
            AuthMode::Jwt => {
                let header = headers
                    .get(header::AUTHORIZATION)
                    .and_then(|h| h.to_str().ok())
                    .ok_or("Missing authorization header")?;

                let token = header
                    .strip_prefix("Bearer ")
                    .ok_or("Expected a bearer token")?;

                let key = self
                    .decoding_key
                    .as_ref()
                    .ok_or("Auth misconfigured: no signing key")?;

                let data = decode::<Claims>(token, key, &Validation::default())
                    .map_err(|_| "Invalid or expired token")?;

                Ok(AuthUser {
                    id: data.claims.sub,
                })
            }
        }
    }
}

pub async fn auth_middleware(
    auth_service: Arc<AuthService>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Response {
    match auth_service.authenticate(&headers) {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(reason) => (StatusCode::UNAUTHORIZED, reason).into_response(),
    }
}
