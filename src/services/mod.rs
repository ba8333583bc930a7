//! Application services around the lifecycle engine

mod audit;
mod stokvela;
mod users;

pub use audit::AuditLog;
pub use stokvela::StokvelaService;
pub use users::{UserError, UserService};
