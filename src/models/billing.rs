use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Largest unit price accepted for a bill line or a medicine
pub const MAX_UNIT_PRICE_CENTS: i64 = 10_000_000_000;

/// Largest total a single bill may reach
pub const MAX_BILL_TOTAL_CENTS: i64 = 100_000_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum BillStatus {
    Unpaid,
    PartiallyPaid,
    Paid,
    Void,
}

impl BillStatus {
    /// Status implied by the amounts of a bill that has not been voided
    pub fn from_amounts(total_cents: i64, paid_cents: i64) -> Self {
        if paid_cents <= 0 {
            BillStatus::Unpaid
        } else if paid_cents < total_cents {
            BillStatus::PartiallyPaid
        } else {
            BillStatus::Paid
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ItemCategory {
    Consultation,
    Room,
    Lab,
    Radiology,
    Pharmacy,
    Procedure,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Insurance,
    Transfer,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Bill {
    pub id: i64,
    pub patient_id: i64,
    pub admission_id: Option<i64>,
    pub status: BillStatus,
    pub total_cents: i64,
    pub paid_cents: i64,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bill {
    pub fn balance_cents(&self) -> i64 {
        self.total_cents - self.paid_cents
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BillItem {
    pub id: i64,
    pub bill_id: i64,
    pub description: String,
    pub category: ItemCategory,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub amount_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub id: i64,
    pub bill_id: i64,
    pub amount_cents: i64,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub received_by: i64,
    pub paid_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillDetail {
    #[serde(flatten)]
    pub bill: Bill,
    pub balance_cents: i64,
    pub items: Vec<BillItem>,
    pub payments: Vec<Payment>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct BillItemRequest {
    #[validate(length(min = 1, max = 200))]
    pub description: String,
    pub category: ItemCategory,
    #[validate(range(min = 1, max = 10000))]
    pub quantity: i64,
    #[validate(range(min = 0, max = 10000000000))]
    pub unit_price_cents: i64,
}

impl BillItemRequest {
    /// Line amount, or None on overflow
    pub fn amount_cents(&self) -> Option<i64> {
        self.quantity.checked_mul(self.unit_price_cents)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBillRequest {
    pub patient_id: i64,
    pub admission_id: Option<i64>,
    #[serde(default)]
    pub items: Vec<BillItemRequest>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PaymentRequest {
    #[validate(range(min = 1, max = 100000000000000))]
    pub amount_cents: i64,
    pub method: PaymentMethod,
    #[validate(length(max = 100))]
    pub reference: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BillFilter {
    pub status: Option<BillStatus>,
    pub patient_id: Option<i64>,
}

/// Sum of line amounts, or None on overflow
pub fn total_cents(items: &[BillItemRequest]) -> Option<i64> {
    items
        .iter()
        .try_fold(0i64, |acc, item| acc.checked_add(item.amount_cents()?))
}
