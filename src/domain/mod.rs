//! Domain entities and pure calculations for the loan book

pub mod audit;
pub mod loan;
pub mod money;
pub mod stokvela;
pub mod user;

pub use audit::{AuditAction, UserLog};
pub use loan::{
    ApprovedLoan, DocumentKind, DocumentUpload, DueStatus, LoanApplication, LoanDraft, LoanRecord,
    RejectedLoan,
};
pub use money::{MonthlyComparison, RevenueSummary};
pub use stokvela::StokvelaMember;
pub use user::{Principal, ProfileUpdate, SignUpRequest, UserAccount, UserRole, UserView};
