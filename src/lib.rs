//! KasiLend Backend Library
//!
//! Loan lifecycle management for a community lender: applications,
//! approval and rejection, a fixed-rate interest engine and dashboard
//! analytics, backed by a pluggable document-collection store.

pub mod auth;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;
pub mod storage;
pub mod store;
