use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::admission::AdmissionCategory;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Department {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct DepartmentRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum WardType {
    General,
    Icu,
    Private,
    Maternity,
    Emergency,
}

impl WardType {
    /// Whether a bed in this kind of ward can host the admission category
    pub fn accepts(&self, category: AdmissionCategory) -> bool {
        match category {
            AdmissionCategory::Icu => *self == WardType::Icu,
            AdmissionCategory::General => *self != WardType::Icu,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Ward {
    pub id: i64,
    pub name: String,
    pub department_id: i64,
    pub ward_type: WardType,
    pub created_at: DateTime<Utc>,
}

/// A ward with its bed counts
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WardSummary {
    pub id: i64,
    pub name: String,
    pub department_id: i64,
    pub ward_type: WardType,
    pub total_beds: i64,
    pub occupied_beds: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct WardRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    pub department_id: i64,
    pub ward_type: WardType,
}

#[derive(Debug, Default, Deserialize)]
pub struct WardFilter {
    pub department_id: Option<i64>,
}

/// A bed joined with the ward it belongs to
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Bed {
    pub id: i64,
    pub ward_id: i64,
    pub ward_name: String,
    pub ward_type: WardType,
    pub bed_number: String,
    pub is_occupied: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct BedRequest {
    #[validate(length(min = 1, max = 20))]
    pub bed_number: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct BedFilter {
    pub available: Option<bool>,
    pub ward_type: Option<WardType>,
    pub ward_id: Option<i64>,
}
