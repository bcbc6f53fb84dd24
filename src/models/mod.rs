//! Data models for HMIS
//!
//! Row types mirror the relational schema; request types carry the
//! validation rules applied before anything touches the database.

use serde::Deserialize;

pub mod admission;
pub mod appointment;
pub mod billing;
pub mod dashboard;
pub mod facility;
pub mod lab;
pub mod patient;
pub mod pharmacy;
pub mod radiology;
pub mod user;

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 200;

/// `limit`/`offset` query parameters shared by list endpoints
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Page {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Page {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}
