//! Authentication
//!
//! Email/password sign-in with bcrypt hashes, JWT access/refresh tokens and
//! a link-style email confirmation flow. Authentication failures are hard
//! failures: a bad password is never papered over into a session.

mod jwt;
mod service;

pub use jwt::{generate_access_token, generate_refresh_token, verify_token, Claims};
pub use service::{AuthError, AuthService, AuthTokens};
