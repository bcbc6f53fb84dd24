use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Most units of one medicine the pharmacy can hold
pub const MAX_STOCK_QUANTITY: i64 = 1_000_000_000;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Medicine {
    pub id: i64,
    pub name: String,
    pub form: String,
    pub strength: String,
    pub unit_price_cents: i64,
    pub stock_quantity: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateMedicineRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 50))]
    pub form: String,
    #[validate(length(min = 1, max = 50))]
    pub strength: String,
    #[validate(range(min = 0, max = 10000000000))]
    pub unit_price_cents: i64,
    #[validate(range(min = 0, max = 1000000000))]
    pub stock_quantity: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateMedicineRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub form: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub strength: Option<String>,
    #[validate(range(min = 0, max = 10000000000))]
    pub unit_price_cents: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RestockRequest {
    #[validate(range(min = 1, max = 1000000000))]
    pub quantity: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct MedicineFilter {
    /// Only medicines with stock at or below this level
    pub low_stock: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum PrescriptionStatus {
    Pending,
    Dispensed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Prescription {
    pub id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
    pub notes: Option<String>,
    pub status: PrescriptionStatus,
    pub created_at: DateTime<Utc>,
    pub dispensed_by: Option<i64>,
    pub dispensed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PrescriptionItem {
    pub id: i64,
    pub prescription_id: i64,
    pub medicine_id: i64,
    pub medicine_name: String,
    pub dosage: String,
    pub frequency: String,
    pub duration_days: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrescriptionDetail {
    #[serde(flatten)]
    pub prescription: Prescription,
    pub items: Vec<PrescriptionItem>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct PrescriptionItemRequest {
    pub medicine_id: i64,
    #[validate(length(min = 1, max = 100))]
    pub dosage: String,
    #[validate(length(min = 1, max = 100))]
    pub frequency: String,
    #[validate(range(min = 1, max = 365))]
    pub duration_days: i64,
    #[validate(range(min = 1, max = 1000000000))]
    pub quantity: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePrescriptionRequest {
    pub patient_id: i64,
    pub notes: Option<String>,
    #[validate(length(min = 1, message = "at least one item is required"))]
    pub items: Vec<PrescriptionItemRequest>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PrescriptionFilter {
    pub status: Option<PrescriptionStatus>,
    pub patient_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::billing::MAX_UNIT_PRICE_CENTS;

    #[test]
    fn restock_is_bounded_by_stock_limit() {
        assert!(RestockRequest { quantity: MAX_STOCK_QUANTITY }.validate().is_ok());
        assert!(RestockRequest { quantity: MAX_STOCK_QUANTITY + 1 }.validate().is_err());
        assert!(RestockRequest { quantity: i64::MAX }.validate().is_err());
    }

    #[test]
    fn medicine_price_is_bounded() {
        let medicine = CreateMedicineRequest {
            name: "Amoxicillin".into(),
            form: "capsule".into(),
            strength: "500 mg".into(),
            unit_price_cents: MAX_UNIT_PRICE_CENTS + 1,
            stock_quantity: Some(MAX_STOCK_QUANTITY),
        };
        let errors = medicine.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("unit_price_cents"));
        assert!(!errors.field_errors().contains_key("stock_quantity"));
    }

    #[test]
    fn prescription_needs_an_item() {
        let empty = CreatePrescriptionRequest {
            patient_id: 1,
            notes: None,
            items: Vec::new(),
        };
        assert!(empty.validate().is_err());
    }
}
