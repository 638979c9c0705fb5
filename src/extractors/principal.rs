//! Extract the principal attached by the authentication middleware.

use crate::auth::Principal;
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};

/// Principal of the current request, if the mount resolved one. Never rejects.
#[derive(Clone, Debug)]
pub struct MaybePrincipal(pub Option<Principal>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybePrincipal
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybePrincipal(parts.extensions.get::<Principal>().cloned()))
    }
}
