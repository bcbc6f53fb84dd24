use chrono::Utc;
use sqlx::{Executor, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{info, instrument};

use crate::db::begin_write;
use crate::error::{ApiError, ApiResult};
use crate::models::billing::{
    total_cents, Bill, BillDetail, BillFilter, BillItem, BillItemRequest, BillStatus, CreateBillRequest, Payment,
    PaymentRequest, MAX_BILL_TOTAL_CENTS,
};

const BILL_COLUMNS: &str =
    "id, patient_id, admission_id, status, total_cents, paid_cents, created_by, created_at, updated_at";

pub async fn find<'e, E>(executor: E, id: i64) -> Result<Option<Bill>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Bill>(&format!("SELECT {} FROM bills WHERE id = ?", BILL_COLUMNS))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn list(pool: &SqlitePool, filter: &BillFilter) -> Result<Vec<Bill>, sqlx::Error> {
    let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM bills WHERE 1 = 1", BILL_COLUMNS));
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status);
    }
    if let Some(patient_id) = filter.patient_id {
        qb.push(" AND patient_id = ").push_bind(patient_id);
    }
    qb.push(" ORDER BY created_at DESC, id DESC");
    qb.build_query_as::<Bill>().fetch_all(pool).await
}

pub async fn detail(pool: &SqlitePool, id: i64) -> Result<Option<BillDetail>, sqlx::Error> {
    let Some(bill) = find(pool, id).await? else {
        return Ok(None);
    };

    let items = sqlx::query_as::<_, BillItem>(
        "SELECT id, bill_id, description, category, quantity, unit_price_cents, amount_cents
         FROM bill_items WHERE bill_id = ? ORDER BY id",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    let payments = sqlx::query_as::<_, Payment>(
        "SELECT id, bill_id, amount_cents, method, reference, received_by, paid_at
         FROM payments WHERE bill_id = ? ORDER BY paid_at, id",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    Ok(Some(BillDetail {
        balance_cents: bill.balance_cents(),
        bill,
        items,
        payments,
    }))
}

/// A bill total, or 400 once it passes the per-bill limit
fn bounded_total(total: Option<i64>) -> ApiResult<i64> {
    total.filter(|t| *t <= MAX_BILL_TOTAL_CENTS).ok_or_else(|| {
        ApiError::BadRequest(format!("bill total may not exceed {} cents", MAX_BILL_TOTAL_CENTS))
    })
}

async fn insert_items(conn: &mut SqliteConnection, bill_id: i64, items: &[BillItemRequest]) -> ApiResult<i64> {
    let added = bounded_total(total_cents(items))?;
    for item in items {
        // total_cents succeeded, so every line amount fits
        let amount = item.amount_cents().unwrap_or_default();
        sqlx::query(
            "INSERT INTO bill_items (bill_id, description, category, quantity, unit_price_cents, amount_cents)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(bill_id)
        .bind(&item.description)
        .bind(item.category)
        .bind(item.quantity)
        .bind(item.unit_price_cents)
        .bind(amount)
        .execute(&mut *conn)
        .await?;
    }
    Ok(added)
}

async fn write_amounts(conn: &mut SqliteConnection, bill_id: i64, total: i64, paid: i64) -> ApiResult<()> {
    sqlx::query("UPDATE bills SET total_cents = ?, paid_cents = ?, status = ?, updated_at = ? WHERE id = ?")
        .bind(total)
        .bind(paid)
        .bind(BillStatus::from_amounts(total, paid))
        .bind(Utc::now())
        .bind(bill_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Load a bill inside a transaction and require that it is not void
async fn find_open(conn: &mut SqliteConnection, id: i64) -> ApiResult<Bill> {
    let bill = find(&mut *conn, id)
        .await?
        .ok_or_else(|| ApiError::not_found("bill", id))?;
    if bill.status == BillStatus::Void {
        return Err(ApiError::Conflict(format!("bill {} is void", id)));
    }
    Ok(bill)
}

#[instrument(skip(pool, req), fields(patient_id = req.patient_id, items = req.items.len()))]
pub async fn create(pool: &SqlitePool, req: &CreateBillRequest, created_by: i64) -> ApiResult<BillDetail> {
    let mut tx = begin_write(pool).await?;

    let patient: Option<(i64,)> = sqlx::query_as("SELECT id FROM patients WHERE id = ?")
        .bind(req.patient_id)
        .fetch_optional(&mut *tx)
        .await?;
    if patient.is_none() {
        return Err(ApiError::not_found("patient", req.patient_id));
    }

    if let Some(admission_id) = req.admission_id {
        let owner: Option<(i64,)> = sqlx::query_as("SELECT patient_id FROM admissions WHERE id = ?")
            .bind(admission_id)
            .fetch_optional(&mut *tx)
            .await?;
        match owner {
            None => return Err(ApiError::not_found("admission", admission_id)),
            Some((patient_id,)) if patient_id != req.patient_id => {
                return Err(ApiError::BadRequest(format!(
                    "admission {} belongs to another patient",
                    admission_id
                )))
            }
            Some(_) => {}
        }
    }

    let now = Utc::now();
    let id = sqlx::query(
        "INSERT INTO bills (patient_id, admission_id, status, total_cents, paid_cents, created_by, created_at, updated_at)
         VALUES (?, ?, ?, 0, 0, ?, ?, ?)",
    )
    .bind(req.patient_id)
    .bind(req.admission_id)
    .bind(BillStatus::Unpaid)
    .bind(created_by)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    let total = insert_items(&mut tx, id, &req.items).await?;
    write_amounts(&mut tx, id, total, 0).await?;

    tx.commit().await?;
    info!(bill_id = id, total_cents = total, "Bill created");

    detail(pool, id).await?.ok_or_else(|| ApiError::not_found("bill", id))
}

#[instrument(skip(pool, items), fields(items = items.len()))]
pub async fn add_items(pool: &SqlitePool, id: i64, items: &[BillItemRequest]) -> ApiResult<BillDetail> {
    let mut tx = begin_write(pool).await?;
    let bill = find_open(&mut tx, id).await?;

    let added = insert_items(&mut tx, id, items).await?;
    let total = bounded_total(bill.total_cents.checked_add(added))?;
    write_amounts(&mut tx, id, total, bill.paid_cents).await?;

    tx.commit().await?;
    info!(bill_id = id, added_cents = added, "Bill items added");

    detail(pool, id).await?.ok_or_else(|| ApiError::not_found("bill", id))
}

#[instrument(skip(pool, req), fields(amount_cents = req.amount_cents))]
pub async fn add_payment(pool: &SqlitePool, id: i64, req: &PaymentRequest, received_by: i64) -> ApiResult<BillDetail> {
    let mut tx = begin_write(pool).await?;
    let bill = find_open(&mut tx, id).await?;

    if req.amount_cents > bill.balance_cents() {
        return Err(ApiError::BadRequest(format!(
            "payment of {} exceeds the outstanding balance of {}",
            req.amount_cents,
            bill.balance_cents()
        )));
    }

    sqlx::query(
        "INSERT INTO payments (bill_id, amount_cents, method, reference, received_by, paid_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(req.amount_cents)
    .bind(req.method)
    .bind(&req.reference)
    .bind(received_by)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await?;

    write_amounts(&mut tx, id, bill.total_cents, bill.paid_cents + req.amount_cents).await?;

    tx.commit().await?;
    info!(bill_id = id, "Payment recorded");

    detail(pool, id).await?.ok_or_else(|| ApiError::not_found("bill", id))
}

#[instrument(skip(pool))]
pub async fn void(pool: &SqlitePool, id: i64) -> ApiResult<BillDetail> {
    let mut tx = begin_write(pool).await?;
    let bill = find_open(&mut tx, id).await?;

    if bill.paid_cents > 0 {
        return Err(ApiError::Conflict(format!("bill {} has payments and cannot be voided", id)));
    }

    sqlx::query("UPDATE bills SET status = ?, updated_at = ? WHERE id = ?")
        .bind(BillStatus::Void)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    info!(bill_id = id, "Bill voided");

    detail(pool, id).await?.ok_or_else(|| ApiError::not_found("bill", id))
}

pub async fn for_patient(pool: &SqlitePool, patient_id: i64) -> Result<Vec<Bill>, sqlx::Error> {
    list(
        pool,
        &BillFilter {
            status: None,
            patient_id: Some(patient_id),
        },
    )
    .await
}
