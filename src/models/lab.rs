use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum Priority {
    Routine,
    Urgent,
    Stat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum LabStatus {
    Ordered,
    SampleCollected,
    Completed,
    Cancelled,
}

impl LabStatus {
    pub fn can_transition_to(&self, next: LabStatus) -> bool {
        matches!(
            (self, next),
            (LabStatus::Ordered, LabStatus::SampleCollected)
                | (LabStatus::SampleCollected, LabStatus::Completed)
                | (LabStatus::Ordered, LabStatus::Cancelled)
                | (LabStatus::SampleCollected, LabStatus::Cancelled)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LabTest {
    pub id: i64,
    pub patient_id: i64,
    pub ordered_by: i64,
    pub test_name: String,
    pub priority: Priority,
    pub status: LabStatus,
    pub result: Option<String>,
    pub result_notes: Option<String>,
    pub performed_by: Option<i64>,
    pub ordered_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct OrderLabTestRequest {
    pub patient_id: i64,
    #[validate(length(min = 1, max = 200))]
    pub test_name: String,
    pub priority: Option<Priority>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LabResultRequest {
    #[validate(length(min = 1))]
    pub result: String,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LabFilter {
    pub status: Option<LabStatus>,
    pub patient_id: Option<i64>,
}
