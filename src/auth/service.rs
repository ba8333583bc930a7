//! Authentication service
//!
//! Sign-in verifies the bcrypt hash and fails closed: a verification error
//! and a wrong password are the same `InvalidCredentials`, and there is no
//! path that turns an authentication failure into a session. Confirmation
//! tokens are random, stored only as a SHA-256 hash and burned on use.

use std::sync::Arc;

use rand::RngCore;
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use crate::auth::jwt::{
    generate_access_token, generate_refresh_token, user_id_from_claims, verify_token, JwtError,
};
use crate::domain::user::SignUpRequest;
use crate::domain::{AuditAction, Principal, UserAccount, UserRole};
use crate::services::{AuditLog, UserError, UserService};

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("invalid or expired confirmation token")]
    InvalidConfirmationToken,

    #[error("invalid refresh token")]
    InvalidRefreshToken,

    #[error("token error: {0}")]
    TokenError(String),

    #[error(transparent)]
    User(#[from] UserError),
}

impl From<JwtError> for AuthError {
    fn from(e: JwtError) -> Self {
        AuthError::TokenError(e.to_string())
    }
}

/// Token pair issued on sign-in and refresh.
#[derive(Debug, Clone, Serialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

pub struct AuthService {
    users: Arc<UserService>,
    audit: AuditLog,
    jwt_secret: String,
    access_token_ttl_seconds: i64,
    refresh_token_ttl_days: i64,
}

impl AuthService {
    pub fn new(
        users: Arc<UserService>,
        audit: AuditLog,
        jwt_secret: String,
        access_token_ttl_seconds: i64,
        refresh_token_ttl_days: i64,
    ) -> Self {
        Self {
            users,
            audit,
            jwt_secret,
            access_token_ttl_seconds,
            refresh_token_ttl_days,
        }
    }

    /// Create an unconfirmed account and issue its confirmation token.
    ///
    /// The returned token is what the confirmation email would carry; only
    /// its hash is stored.
    pub async fn sign_up(&self, request: SignUpRequest) -> Result<(UserAccount, String), AuthError> {
        let account = self.users.sign_up(request).await?;
        let token = self.issue_confirmation_token(account.id).await?;
        Ok((account, token))
    }

    /// Exchange credentials for a token pair. Fail-closed.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthTokens, AuthError> {
        let account = self
            .users
            .find_by_email(email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let verified = bcrypt::verify(password, &account.password_hash).unwrap_or(false);
        if !verified {
            return Err(AuthError::InvalidCredentials);
        }

        self.audit
            .record(
                Some(account.id),
                AuditAction::UserSignedIn,
                format!("{} signed in", account.email),
                None,
            )
            .await;
        self.issue_tokens(&account)
    }

    /// Exchange a refresh token for a fresh pair. Role and confirmation
    /// status are re-read from the account, not trusted from the old token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthTokens, AuthError> {
        let claims = verify_token(refresh_token, &self.jwt_secret)
            .map_err(|_| AuthError::InvalidRefreshToken)?;
        if claims.token_type != "refresh" {
            return Err(AuthError::InvalidRefreshToken);
        }
        let user_id = user_id_from_claims(&claims).map_err(|_| AuthError::InvalidRefreshToken)?;
        let account = self.users.get(user_id).await?;
        self.issue_tokens(&account)
    }

    /// Redeem a confirmation token, marking the account confirmed.
    pub async fn confirm(&self, token: &str) -> Result<UserAccount, AuthError> {
        let hash = hash_token(token);
        let account = self
            .users
            .find_by_confirmation_hash(&hash)
            .await?
            .ok_or(AuthError::InvalidConfirmationToken)?;
        Ok(self.users.mark_confirmed(account.id).await?)
    }

    /// Resolve an access token into the acting principal.
    pub fn principal_from_token(&self, token: &str) -> Result<Principal, AuthError> {
        let claims = verify_token(token, &self.jwt_secret)?;
        if claims.token_type != "access" {
            return Err(AuthError::TokenError("expected access token".to_string()));
        }
        let id = user_id_from_claims(&claims)?;
        let role = UserRole::try_from(claims.role).map_err(AuthError::TokenError)?;
        Ok(Principal {
            id,
            email: claims.email,
            role,
            confirmed: claims.confirmed,
        })
    }

    async fn issue_confirmation_token(&self, user_id: Uuid) -> Result<String, AuthError> {
        let token = generate_token_string();
        self.users
            .set_confirmation_hash(user_id, &hash_token(&token))
            .await?;
        Ok(token)
    }

    fn issue_tokens(&self, account: &UserAccount) -> Result<AuthTokens, AuthError> {
        let jti = Uuid::new_v4().to_string();
        let access_token = generate_access_token(
            account,
            &jti,
            &self.jwt_secret,
            self.access_token_ttl_seconds,
        )?;
        let refresh_token = generate_refresh_token(
            account,
            &jti,
            &self.jwt_secret,
            self.refresh_token_ttl_days,
        )?;
        Ok(AuthTokens {
            access_token,
            refresh_token,
            token_type: "Bearer",
            expires_in: self.access_token_ttl_seconds,
        })
    }
}

fn generate_token_string() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
