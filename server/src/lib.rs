//! ATM Ledger HTTP Server
//!
//! Thin axum adapter over [`atm_ledger::Ledger`]: request validation, error
//! to status mapping, metrics and process configuration.

pub mod app;
pub mod config;
pub mod dto;
pub mod errors;
pub mod metrics;
pub mod routes;
pub mod telemetry;

pub use app::{build_app, AppState};
pub use config::ServerConfig;
