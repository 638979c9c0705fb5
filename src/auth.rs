//! Authentication seam. Credential verification lives outside this crate (gateway / auth service);
//! an `Authenticator` turns request headers into a `Principal`.

use crate::error::AppError;
use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_EMAIL_HEADER: &str = "x-user-email";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// The authenticated actor making a request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl Principal {
    pub fn new(id: impl Into<String>) -> Self {
        Principal {
            id: id.into(),
            email: None,
            role: None,
        }
    }
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, headers: &HeaderMap) -> Result<Principal, AppError>;
}

/// Trusts the identity headers forwarded by the gateway after it verified the token.
#[derive(Clone, Copy, Debug, Default)]
pub struct TrustedHeaders;

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[async_trait]
impl Authenticator for TrustedHeaders {
    async fn authenticate(&self, headers: &HeaderMap) -> Result<Principal, AppError> {
        let id = header(headers, USER_ID_HEADER)
            .ok_or_else(|| AppError::Unauthorized("Authentication required".into()))?;
        Ok(Principal {
            id,
            email: header(headers, USER_EMAIL_HEADER),
            role: header(headers, USER_ROLE_HEADER),
        })
    }
}

/// Rejects the request with 401 unless the authenticator resolves a principal.
pub async fn require_auth(
    State(auth): State<Arc<dyn Authenticator>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let principal = auth.authenticate(req.headers()).await?;
    tracing::debug!(principal = %principal.id, "authenticated");
    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}

/// Attaches a principal when one can be resolved; never rejects.
pub async fn optional_auth(State(auth): State<Arc<dyn Authenticator>>, mut req: Request, next: Next) -> Response {
    if let Ok(principal) = auth.authenticate(req.headers()).await {
        req.extensions_mut().insert(principal);
    }
    next.run(req).await
}
