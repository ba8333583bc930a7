//! HTTP middleware

mod auth;
mod security;
mod tracing;

pub use auth::AuthenticatedPrincipal;
pub use security::security_headers;
pub use tracing::request_tracing;
