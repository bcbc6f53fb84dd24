use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum Modality {
    Xray,
    Ct,
    Mri,
    Ultrasound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ScanStatus {
    Ordered,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RadiologyScan {
    pub id: i64,
    pub patient_id: i64,
    pub ordered_by: i64,
    pub modality: Modality,
    pub body_part: String,
    pub clinical_notes: Option<String>,
    pub status: ScanStatus,
    pub findings: Option<String>,
    pub impression: Option<String>,
    pub reported_by: Option<i64>,
    pub ordered_at: DateTime<Utc>,
    pub reported_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct OrderScanRequest {
    pub patient_id: i64,
    pub modality: Modality,
    #[validate(length(min = 1, max = 100))]
    pub body_part: String,
    pub clinical_notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ScanReportRequest {
    #[validate(length(min = 1))]
    pub findings: String,
    #[validate(length(min = 1))]
    pub impression: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ScanFilter {
    pub status: Option<ScanStatus>,
    pub patient_id: Option<i64>,
}
