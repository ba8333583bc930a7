//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::AuthService;
use crate::engine::LoanEngine;
use crate::services::{AuditLog, StokvelaService, UserService};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<LoanEngine>,
    pub users: Arc<UserService>,
    pub auth: Arc<AuthService>,
    pub stokvela: Arc<StokvelaService>,
    pub audit: AuditLog,
}

impl AppState {
    pub fn new(
        engine: Arc<LoanEngine>,
        users: Arc<UserService>,
        auth: Arc<AuthService>,
        stokvela: Arc<StokvelaService>,
        audit: AuditLog,
    ) -> Self {
        Self {
            engine,
            users,
            auth,
            stokvela,
            audit,
        }
    }
}

impl FromRef<AppState> for Arc<LoanEngine> {
    fn from_ref(state: &AppState) -> Self {
        state.engine.clone()
    }
}

impl FromRef<AppState> for Arc<UserService> {
    fn from_ref(state: &AppState) -> Self {
        state.users.clone()
    }
}

impl FromRef<AppState> for Arc<AuthService> {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

impl FromRef<AppState> for Arc<StokvelaService> {
    fn from_ref(state: &AppState) -> Self {
        state.stokvela.clone()
    }
}

impl FromRef<AppState> for AuditLog {
    fn from_ref(state: &AppState) -> Self {
        state.audit.clone()
    }
}
