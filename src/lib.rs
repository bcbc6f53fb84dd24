//! HMIS core library
//!
//! This module exports the core functionality of the hospital management
//! information system: the HTTP API, authentication, and the data layer.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod telemetry;

use std::sync::Arc;

use crate::auth::TokenService;
use crate::config::Config;
use crate::db::Database;

/// Application state shared by every request handler
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<Config>,
    pub tokens: TokenService,
}

impl AppState {
    pub fn new(db: Database, config: Config) -> Self {
        let tokens = TokenService::new(&config.auth.jwt_secret, config.auth.token_ttl_minutes);
        Self {
            db,
            config: Arc::new(config),
            tokens,
        }
    }
}
