//! User account service
//!
//! Sign-up, profile management and the admin-only account operations.
//! Privileged operations take the acting principal explicitly and check
//! the role before touching the store.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

use crate::domain::user::{ProfileUpdate, SignUpRequest};
use crate::domain::{AuditAction, Principal, UserAccount, UserRole};
use crate::services::AuditLog;
use crate::store::{collections, CollectionStore, Filter, Order, StoreError};

#[derive(Error, Debug)]
pub enum UserError {
    #[error("validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("an account with email {0} already exists")]
    EmailTaken(String),

    #[error("no user with id {0}")]
    NotFound(Uuid),

    #[error("{0}")]
    Authorization(String),

    #[error("password hashing failed: {0}")]
    Hash(String),

    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl From<StoreError> for UserError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { id, .. } => UserError::NotFound(id),
            other => UserError::Persistence(other.to_string()),
        }
    }
}

pub struct UserService {
    store: Arc<dyn CollectionStore>,
    audit: AuditLog,
}

impl UserService {
    pub fn new(store: Arc<dyn CollectionStore>, audit: AuditLog) -> Self {
        Self { store, audit }
    }

    /// Create an unconfirmed account. Confirmation happens out of band via
    /// the email token flow.
    pub async fn sign_up(&self, request: SignUpRequest) -> Result<UserAccount, UserError> {
        request.validate()?;
        let email = request.email.trim().to_lowercase();
        if self.find_by_email(&email).await?.is_some() {
            return Err(UserError::EmailTaken(email));
        }

        let password_hash = bcrypt::hash(&request.password, bcrypt::DEFAULT_COST)
            .map_err(|e| UserError::Hash(e.to_string()))?;
        let member_number = self
            .store
            .count(collections::USERS_ACCOUNT, &Filter::none())
            .await?
            + 1;

        let account = UserAccount {
            id: Uuid::new_v4(),
            email,
            full_name: request.full_name,
            gender: request.gender,
            date_of_birth: None,
            cellphone: request.cellphone,
            home_address: None,
            profile_picture_url: None,
            role: UserRole::Standard,
            confirmed: false,
            member_number,
            created_at: Utc::now(),
            password_hash,
            confirmation_token_hash: None,
        };
        let data =
            serde_json::to_value(&account).map_err(|e| UserError::Persistence(e.to_string()))?;
        self.store
            .insert(collections::USERS_ACCOUNT, Some(account.id), data)
            .await?;

        self.audit
            .record(
                Some(account.id),
                AuditAction::UserSignedUp,
                format!("account created for {}", account.email),
                None,
            )
            .await;
        Ok(account)
    }

    pub async fn get(&self, id: Uuid) -> Result<UserAccount, UserError> {
        let record = self
            .store
            .fetch(collections::USERS_ACCOUNT, id)
            .await?
            .ok_or(UserError::NotFound(id))?;
        Ok(record.decode()?)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, UserError> {
        let records = self
            .store
            .query(
                collections::USERS_ACCOUNT,
                &Filter::none().eq("email", json!(email.trim().to_lowercase())),
                Order::Unordered,
            )
            .await?;
        match records.first() {
            Some(record) => Ok(Some(record.decode()?)),
            None => Ok(None),
        }
    }

    /// All accounts in display order.
    pub async fn list(&self, principal: &Principal) -> Result<Vec<UserAccount>, UserError> {
        self.ensure_admin(principal, "listing accounts")?;
        let records = self
            .store
            .query(
                collections::USERS_ACCOUNT,
                &Filter::none(),
                Order::FieldAsc("member_number"),
            )
            .await?;
        records
            .iter()
            .map(|r| r.decode().map_err(UserError::from))
            .collect()
    }

    /// Update profile fields. Allowed for the account holder or an admin.
    pub async fn update_profile(
        &self,
        id: Uuid,
        principal: &Principal,
        update: ProfileUpdate,
    ) -> Result<UserAccount, UserError> {
        if principal.id != id && !principal.is_admin() {
            return Err(UserError::Authorization(
                "only the account holder or an admin may update this profile".to_string(),
            ));
        }

        let mut patch = serde_json::Map::new();
        if let Some(v) = update.full_name {
            patch.insert("full_name".to_string(), json!(v));
        }
        if let Some(v) = update.gender {
            patch.insert("gender".to_string(), json!(v));
        }
        if let Some(v) = update.date_of_birth {
            patch.insert("date_of_birth".to_string(), json!(v));
        }
        if let Some(v) = update.cellphone {
            patch.insert("cellphone".to_string(), json!(v));
        }
        if let Some(v) = update.home_address {
            patch.insert("home_address".to_string(), json!(v));
        }
        if let Some(v) = update.profile_picture_url {
            patch.insert("profile_picture_url".to_string(), json!(v));
        }
        if !patch.is_empty() {
            self.store
                .update(
                    collections::USERS_ACCOUNT,
                    id,
                    serde_json::Value::Object(patch),
                )
                .await?;
        }

        self.audit
            .record(
                Some(principal.id),
                AuditAction::UserUpdated,
                format!("profile updated for user {}", id),
                None,
            )
            .await;
        self.get(id).await
    }

    /// Change an account's role. Admin only.
    pub async fn set_role(
        &self,
        id: Uuid,
        role: UserRole,
        principal: &Principal,
    ) -> Result<UserAccount, UserError> {
        self.ensure_admin(principal, "changing a role")?;
        self.store
            .update(
                collections::USERS_ACCOUNT,
                id,
                json!({ "role": role.code() }),
            )
            .await?;

        self.audit
            .record(
                Some(principal.id),
                AuditAction::UserRoleChanged,
                format!("user {} role set to {}", id, role.as_str()),
                None,
            )
            .await;
        self.get(id).await
    }

    /// Force an account's confirmation status. Admin only; the normal path
    /// is the email token flow.
    pub async fn set_confirmed(
        &self,
        id: Uuid,
        confirmed: bool,
        principal: &Principal,
    ) -> Result<UserAccount, UserError> {
        self.ensure_admin(principal, "changing confirmation status")?;
        self.store
            .update(
                collections::USERS_ACCOUNT,
                id,
                json!({ "confirmed": confirmed, "confirmation_token_hash": null }),
            )
            .await?;

        self.audit
            .record(
                Some(principal.id),
                AuditAction::UserConfirmed,
                format!("user {} confirmation set to {}", id, confirmed),
                None,
            )
            .await;
        self.get(id).await
    }

    /// Delete an account. Admin only.
    pub async fn delete(&self, id: Uuid, principal: &Principal) -> Result<(), UserError> {
        self.ensure_admin(principal, "deleting an account")?;
        let removed = self.store.delete(collections::USERS_ACCOUNT, id).await?;
        if !removed {
            return Err(UserError::NotFound(id));
        }

        self.audit
            .record(
                Some(principal.id),
                AuditAction::UserDeleted,
                format!("user {} deleted", id),
                None,
            )
            .await;
        Ok(())
    }

    /// Store the hash of a freshly issued confirmation token.
    pub async fn set_confirmation_hash(&self, id: Uuid, hash: &str) -> Result<(), UserError> {
        self.store
            .update(
                collections::USERS_ACCOUNT,
                id,
                json!({ "confirmation_token_hash": hash }),
            )
            .await?;
        Ok(())
    }

    /// Resolve a confirmation-token hash back to its account.
    pub async fn find_by_confirmation_hash(
        &self,
        hash: &str,
    ) -> Result<Option<UserAccount>, UserError> {
        let records = self
            .store
            .query(
                collections::USERS_ACCOUNT,
                &Filter::none().eq("confirmation_token_hash", json!(hash)),
                Order::Unordered,
            )
            .await?;
        match records.first() {
            Some(record) => Ok(Some(record.decode()?)),
            None => Ok(None),
        }
    }

    /// Mark an account confirmed and burn its token hash.
    pub async fn mark_confirmed(&self, id: Uuid) -> Result<UserAccount, UserError> {
        self.store
            .update(
                collections::USERS_ACCOUNT,
                id,
                json!({ "confirmed": true, "confirmation_token_hash": null }),
            )
            .await?;
        self.audit
            .record(
                Some(id),
                AuditAction::UserConfirmed,
                format!("user {} confirmed their email", id),
                None,
            )
            .await;
        self.get(id).await
    }

    fn ensure_admin(&self, principal: &Principal, operation: &str) -> Result<(), UserError> {
        if !principal.is_admin() {
            return Err(UserError::Authorization(format!(
                "{} requires the admin role",
                operation
            )));
        }
        Ok(())
    }
}
