//! User accounts and the acting principal

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Account role, persisted as its numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum UserRole {
    Admin = 1,
    Editor = 2,
    Standard = 3,
}

impl UserRole {
    pub fn code(&self) -> u8 {
        *self as u8
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Editor => "editor",
            UserRole::Standard => "standard",
        }
    }
}

impl TryFrom<u8> for UserRole {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(UserRole::Admin),
            2 => Ok(UserRole::Editor),
            3 => Ok(UserRole::Standard),
            other => Err(format!("invalid role code: {}", other)),
        }
    }
}

impl From<UserRole> for u8 {
    fn from(role: UserRole) -> u8 {
        role.code()
    }
}

/// A system account as stored in `users_account`.
///
/// The password hash and confirmation-token hash live on the stored record;
/// use [`UserView`] for anything that leaves the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub gender: String,
    pub date_of_birth: Option<NaiveDate>,
    pub cellphone: String,
    pub home_address: Option<String>,
    pub profile_picture_url: Option<String>,
    pub role: UserRole,
    pub confirmed: bool,
    pub member_number: i64,
    pub created_at: DateTime<Utc>,
    pub password_hash: String,
    #[serde(default)]
    pub confirmation_token_hash: Option<String>,
}

impl UserAccount {
    pub fn principal(&self) -> Principal {
        Principal {
            id: self.id,
            email: self.email.clone(),
            role: self.role,
            confirmed: self.confirmed,
        }
    }
}

/// Public projection of an account, safe for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub gender: String,
    pub date_of_birth: Option<NaiveDate>,
    pub cellphone: String,
    pub home_address: Option<String>,
    pub profile_picture_url: Option<String>,
    pub role: UserRole,
    pub confirmed: bool,
    pub member_number: i64,
    pub created_at: DateTime<Utc>,
}

impl From<&UserAccount> for UserView {
    fn from(account: &UserAccount) -> Self {
        Self {
            id: account.id,
            email: account.email.clone(),
            full_name: account.full_name.clone(),
            gender: account.gender.clone(),
            date_of_birth: account.date_of_birth,
            cellphone: account.cellphone.clone(),
            home_address: account.home_address.clone(),
            profile_picture_url: account.profile_picture_url.clone(),
            role: account.role,
            confirmed: account.confirmed,
            member_number: account.member_number,
            created_at: account.created_at,
        }
    }
}

/// The authenticated identity performing an action.
#[derive(Debug, Clone)]
pub struct Principal {
    pub id: Uuid,
    pub email: String,
    pub role: UserRole,
    pub confirmed: bool,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        matches!(self.role, UserRole::Admin)
    }
}

/// Sign-up payload.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignUpRequest {
    #[validate(email(message = "invalid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
    #[validate(length(min = 2, message = "name must be at least 2 characters"))]
    pub full_name: String,
    pub gender: String,
    #[validate(custom = "validate_cellphone")]
    pub cellphone: String,
}

fn validate_cellphone(phone: &str) -> Result<(), ValidationError> {
    let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
    if digits < 10 {
        let mut err = ValidationError::new("cellphone");
        err.message = Some("cellphone must contain at least 10 digits".into());
        return Err(err);
    }
    Ok(())
}

/// Self-service profile changes. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub cellphone: Option<String>,
    pub home_address: Option<String>,
    pub profile_picture_url: Option<String>,
}
