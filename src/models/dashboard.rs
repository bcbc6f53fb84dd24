use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::facility::WardType;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BedOccupancy {
    pub ward_type: WardType,
    pub total_beds: i64,
    pub occupied_beds: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardStats {
    pub patients: i64,
    pub active_admissions: i64,
    pub total_beds: i64,
    pub occupied_beds: i64,
    pub occupancy: Vec<BedOccupancy>,
    pub pending_lab_tests: i64,
    pub pending_radiology_scans: i64,
    pub pending_prescriptions: i64,
    pub appointments_today: i64,
    pub outstanding_cents: i64,
    pub low_stock_medicines: i64,
}
