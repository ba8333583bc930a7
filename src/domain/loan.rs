//! Loan application lifecycle models
//!
//! An application lives in exactly one of three collections: pending
//! (`loan_applications`), approved (`approved_loans`) or rejected
//! (`rejected_loans`). Approval and rejection copy the record into the
//! destination collection under the same id and remove it from pending;
//! approved records additionally carry the computed `total_return` and a
//! `settled` flag.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::domain::money;

/// Document categories attached to an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    IdDocument,
    ProofOfIncome,
    BankStatement,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::IdDocument => "id_document",
            DocumentKind::ProofOfIncome => "proof_of_income",
            DocumentKind::BankStatement => "bank_statement",
        }
    }

    /// Multipart field name to document kind.
    pub fn from_field(name: &str) -> Option<Self> {
        match name {
            "id_document" => Some(DocumentKind::IdDocument),
            "proof_of_income" => Some(DocumentKind::ProofOfIncome),
            "bank_statement" => Some(DocumentKind::BankStatement),
            _ => None,
        }
    }

    /// Name of the URL field on the stored record.
    pub fn url_field(&self) -> &'static str {
        match self {
            DocumentKind::IdDocument => "id_document_url",
            DocumentKind::ProofOfIncome => "proof_of_income_url",
            DocumentKind::BankStatement => "bank_statement_url",
        }
    }
}

/// A document received from the client, not yet uploaded. Documents are
/// stored under a path derived from the application id and kind, so the
/// client filename is not kept.
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    pub kind: DocumentKind,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Submission payload for a new loan application.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoanDraft {
    #[validate(length(min = 2, message = "name must be at least 2 characters"))]
    pub full_name: String,
    #[validate(email(message = "invalid email address"))]
    pub email: String,
    #[validate(custom = "validate_phone")]
    pub phone: String,
    #[validate(length(min = 6, message = "id number must be at least 6 characters"))]
    pub id_number: String,
    pub gender: String,
    pub date_of_birth: NaiveDate,
    #[validate(length(min = 5, message = "address must be at least 5 characters"))]
    pub address: String,
    #[validate(custom = "validate_amount")]
    pub amount: Decimal,
    #[validate(length(min = 1, message = "bank is required"))]
    pub bank: String,
    #[validate(length(min = 5, message = "account number must be at least 5 characters"))]
    pub account_number: String,
    #[validate(length(min = 5, message = "purpose must be at least 5 characters"))]
    pub purpose: String,
    #[validate(custom = "validate_due_date")]
    pub due_date: NaiveDate,
}

fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
    if digits < 10 {
        let mut err = ValidationError::new("phone");
        err.message = Some("phone number must contain at least 10 digits".into());
        return Err(err);
    }
    Ok(())
}

fn validate_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount <= Decimal::ZERO {
        let mut err = ValidationError::new("amount");
        err.message = Some("amount must be a positive number".into());
        return Err(err);
    }
    Ok(())
}

fn validate_due_date(due_date: &NaiveDate) -> Result<(), ValidationError> {
    if *due_date <= Utc::now().date_naive() {
        let mut err = ValidationError::new("due_date");
        err.message = Some("due date must be in the future".into());
        return Err(err);
    }
    Ok(())
}

/// A pending loan application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanApplication {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub id_number: String,
    pub gender: String,
    pub date_of_birth: NaiveDate,
    pub address: String,
    pub amount: Decimal,
    pub bank: String,
    pub account_number: String,
    pub purpose: String,
    pub due_date: NaiveDate,
    pub submitted_at: DateTime<Utc>,
    pub id_document_url: Option<String>,
    pub proof_of_income_url: Option<String>,
    pub bank_statement_url: Option<String>,
}

impl LoanApplication {
    pub fn from_draft(id: Uuid, draft: LoanDraft, submitted_at: DateTime<Utc>) -> Self {
        Self {
            id,
            full_name: draft.full_name,
            email: draft.email,
            phone: draft.phone,
            id_number: draft.id_number,
            gender: draft.gender,
            date_of_birth: draft.date_of_birth,
            address: draft.address,
            amount: money::round_cents(draft.amount),
            bank: draft.bank,
            account_number: draft.account_number,
            purpose: draft.purpose,
            due_date: draft.due_date,
            submitted_at,
            id_document_url: None,
            proof_of_income_url: None,
            bank_statement_url: None,
        }
    }
}

/// Repayment status relative to the due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DueStatus {
    Upcoming,
    DueToday,
    Overdue,
}

/// An application that has been approved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovedLoan {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub id_number: String,
    pub gender: String,
    pub date_of_birth: NaiveDate,
    pub address: String,
    pub amount: Decimal,
    pub bank: String,
    pub account_number: String,
    pub purpose: String,
    pub due_date: NaiveDate,
    pub submitted_at: DateTime<Utc>,
    pub id_document_url: Option<String>,
    pub proof_of_income_url: Option<String>,
    pub bank_statement_url: Option<String>,
    pub decided_at: DateTime<Utc>,
    pub total_return: Decimal,
    pub settled: bool,
}

impl ApprovedLoan {
    /// Copy an application into the approved shape, stamping the decision
    /// time and computing the flat-rate return.
    pub fn from_application(
        app: &LoanApplication,
        decided_at: DateTime<Utc>,
        interest_rate: Decimal,
    ) -> Self {
        Self {
            id: app.id,
            full_name: app.full_name.clone(),
            email: app.email.clone(),
            phone: app.phone.clone(),
            id_number: app.id_number.clone(),
            gender: app.gender.clone(),
            date_of_birth: app.date_of_birth,
            address: app.address.clone(),
            amount: app.amount,
            bank: app.bank.clone(),
            account_number: app.account_number.clone(),
            purpose: app.purpose.clone(),
            due_date: app.due_date,
            submitted_at: app.submitted_at,
            id_document_url: app.id_document_url.clone(),
            proof_of_income_url: app.proof_of_income_url.clone(),
            bank_statement_url: app.bank_statement_url.clone(),
            decided_at,
            total_return: money::total_return(app.amount, interest_rate),
            settled: false,
        }
    }

    pub fn due_status(&self, today: NaiveDate) -> DueStatus {
        if self.due_date < today {
            DueStatus::Overdue
        } else if self.due_date == today {
            DueStatus::DueToday
        } else {
            DueStatus::Upcoming
        }
    }
}

/// An application that has been rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectedLoan {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub id_number: String,
    pub gender: String,
    pub date_of_birth: NaiveDate,
    pub address: String,
    pub amount: Decimal,
    pub bank: String,
    pub account_number: String,
    pub purpose: String,
    pub due_date: NaiveDate,
    pub submitted_at: DateTime<Utc>,
    pub id_document_url: Option<String>,
    pub proof_of_income_url: Option<String>,
    pub bank_statement_url: Option<String>,
    pub decided_at: DateTime<Utc>,
}

impl RejectedLoan {
    pub fn from_application(app: &LoanApplication, decided_at: DateTime<Utc>) -> Self {
        Self {
            id: app.id,
            full_name: app.full_name.clone(),
            email: app.email.clone(),
            phone: app.phone.clone(),
            id_number: app.id_number.clone(),
            gender: app.gender.clone(),
            date_of_birth: app.date_of_birth,
            address: app.address.clone(),
            amount: app.amount,
            bank: app.bank.clone(),
            account_number: app.account_number.clone(),
            purpose: app.purpose.clone(),
            due_date: app.due_date,
            submitted_at: app.submitted_at,
            id_document_url: app.id_document_url.clone(),
            proof_of_income_url: app.proof_of_income_url.clone(),
            bank_statement_url: app.bank_statement_url.clone(),
            decided_at,
        }
    }
}

/// A loan in whichever lifecycle state it currently occupies.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum LoanRecord {
    Pending(LoanApplication),
    Approved(ApprovedLoan),
    Rejected(RejectedLoan),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn valid_draft() -> LoanDraft {
        LoanDraft {
            full_name: "Thandi Nkosi".to_string(),
            email: "thandi@example.com".to_string(),
            phone: "0821234567".to_string(),
            id_number: "9001015009087".to_string(),
            gender: "female".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
            address: "12 Vilakazi Street, Soweto".to_string(),
            amount: dec!(5000),
            bank: "FNB".to_string(),
            account_number: "62001234567".to_string(),
            purpose: "School fees for the new term".to_string(),
            due_date: (Utc::now() + Duration::days(30)).date_naive(),
        }
    }

    #[test]
    fn valid_draft_passes() {
        assert!(valid_draft().validate().is_ok());
    }

    #[test]
    fn zero_or_negative_amount_fails() {
        let mut draft = valid_draft();
        draft.amount = Decimal::ZERO;
        assert!(draft.validate().is_err());
        draft.amount = dec!(-50);
        assert!(draft.validate().is_err());
    }

    #[test]
    fn past_due_date_fails() {
        let mut draft = valid_draft();
        draft.due_date = (Utc::now() - Duration::days(1)).date_naive();
        assert!(draft.validate().is_err());
        // Today is not "strictly in the future" either.
        draft.due_date = Utc::now().date_naive();
        assert!(draft.validate().is_err());
    }

    #[test]
    fn short_fields_fail() {
        let mut draft = valid_draft();
        draft.full_name = "T".to_string();
        assert!(draft.validate().is_err());

        let mut draft = valid_draft();
        draft.purpose = "fees".to_string();
        assert!(draft.validate().is_err());

        let mut draft = valid_draft();
        draft.phone = "082123".to_string();
        assert!(draft.validate().is_err());
    }

    #[test]
    fn phone_counts_digits_not_length() {
        let mut draft = valid_draft();
        draft.phone = "+27 82 123 4567".to_string();
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn approval_copies_fields_and_computes_return() {
        let draft = valid_draft();
        let app = LoanApplication::from_draft(Uuid::new_v4(), draft, Utc::now());
        let approved =
            ApprovedLoan::from_application(&app, Utc::now(), money::DEFAULT_INTEREST_RATE);

        assert_eq!(approved.id, app.id);
        assert_eq!(approved.amount, dec!(5000.00));
        assert_eq!(approved.total_return, dec!(6999.50));
        assert!(!approved.settled);
    }

    #[test]
    fn due_status_brackets() {
        let app = LoanApplication::from_draft(Uuid::new_v4(), valid_draft(), Utc::now());
        let approved =
            ApprovedLoan::from_application(&app, Utc::now(), money::DEFAULT_INTEREST_RATE);
        assert_eq!(
            approved.due_status(approved.due_date - Duration::days(5)),
            DueStatus::Upcoming
        );
        assert_eq!(approved.due_status(approved.due_date), DueStatus::DueToday);
        assert_eq!(
            approved.due_status(approved.due_date + Duration::days(1)),
            DueStatus::Overdue
        );
    }
}
