//! Principal extraction
//!
//! Pulls the bearer token from the Authorization header and resolves it to
//! the acting principal. Role enforcement happens inside the engine and
//! services, which take the principal explicitly; this extractor only
//! establishes who is calling.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::auth::AuthService;
use crate::domain::Principal;
use crate::error::ApiError;

/// Authenticated principal extracted from a bearer token.
#[derive(Debug, Clone)]
pub struct AuthenticatedPrincipal(pub Principal);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedPrincipal
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        use axum::response::IntoResponse;

        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| {
                    ApiError::Unauthorized(
                        "Authorization header with Bearer token required".to_string(),
                    )
                    .into_response()
                })?;

        let auth = Arc::<AuthService>::from_ref(state);
        let principal = auth
            .principal_from_token(bearer.token())
            .map_err(|e| ApiError::from(e).into_response())?;

        Ok(AuthenticatedPrincipal(principal))
    }
}
