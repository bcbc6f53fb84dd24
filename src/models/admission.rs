use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::facility::Bed;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum AdmissionCategory {
    /// Ward stay, recorded with an inpatient sub-record
    General,
    /// Intensive care, recorded with an ICU sub-record
    Icu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum AdmissionStatus {
    Admitted,
    Discharged,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Admission {
    pub id: i64,
    pub patient_id: i64,
    pub bed_id: i64,
    pub category: AdmissionCategory,
    pub reason: String,
    pub admitted_by: i64,
    pub status: AdmissionStatus,
    pub admitted_at: DateTime<Utc>,
    pub discharged_at: Option<DateTime<Utc>>,
    pub discharge_notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct IcuRecord {
    pub id: i64,
    pub admission_id: i64,
    pub ventilator_required: bool,
    pub monitoring_level: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InpatientRecord {
    pub id: i64,
    pub admission_id: i64,
    pub attending_doctor_id: Option<i64>,
    pub diet: Option<String>,
    pub notes: Option<String>,
}

/// An admission with its bed and category-specific sub-record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionDetail {
    #[serde(flatten)]
    pub admission: Admission,
    pub bed: Bed,
    pub icu: Option<IcuRecord>,
    pub inpatient: Option<InpatientRecord>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct AdmitRequest {
    pub patient_id: i64,
    pub category: AdmissionCategory,
    #[validate(length(min = 1, max = 500))]
    pub reason: String,
    /// A specific bed; when absent a free bed is allocated
    pub bed_id: Option<i64>,
    /// Restrict automatic allocation to one ward
    pub ward_id: Option<i64>,
    pub attending_doctor_id: Option<i64>,
    pub ventilator_required: Option<bool>,
    #[validate(length(min = 1, max = 50))]
    pub monitoring_level: Option<String>,
    pub diet: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DischargeRequest {
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub bed_id: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct AdmissionFilter {
    pub status: Option<AdmissionStatus>,
    pub patient_id: Option<i64>,
}
