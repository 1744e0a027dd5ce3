//! Biblioteca Library Management System support and realtime server
//!
//! Backend for the support subsystem of the Biblioteca library platform:
//! ticket lifecycle, real-time ticket chat over WebSockets, agent management,
//! and notification fan-out.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod realtime;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
    pub realtime: realtime::RealtimeGateway,
}
