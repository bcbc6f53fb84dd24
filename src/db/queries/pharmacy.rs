use chrono::Utc;
use sqlx::{Executor, QueryBuilder, Sqlite, SqlitePool};
use tracing::{info, instrument};

use crate::db::begin_write;
use crate::error::{ApiError, ApiResult};
use crate::models::pharmacy::{
    CreateMedicineRequest, CreatePrescriptionRequest, Medicine, MedicineFilter, Prescription, PrescriptionDetail,
    PrescriptionFilter, PrescriptionItem, PrescriptionStatus, UpdateMedicineRequest, MAX_STOCK_QUANTITY,
};

const MEDICINE_COLUMNS: &str = "id, name, form, strength, unit_price_cents, stock_quantity, created_at";

const PRESCRIPTION_COLUMNS: &str =
    "id, patient_id, doctor_id, notes, status, created_at, dispensed_by, dispensed_at";

// ===== Medicines =====

pub async fn find_medicine<'e, E>(executor: E, id: i64) -> Result<Option<Medicine>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Medicine>(&format!("SELECT {} FROM medicines WHERE id = ?", MEDICINE_COLUMNS))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn list_medicines(pool: &SqlitePool, filter: &MedicineFilter) -> Result<Vec<Medicine>, sqlx::Error> {
    let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM medicines", MEDICINE_COLUMNS));
    if let Some(level) = filter.low_stock {
        qb.push(" WHERE stock_quantity <= ").push_bind(level);
    }
    qb.push(" ORDER BY name");
    qb.build_query_as::<Medicine>().fetch_all(pool).await
}

pub async fn insert_medicine(pool: &SqlitePool, req: &CreateMedicineRequest) -> Result<Medicine, sqlx::Error> {
    let id = sqlx::query(
        "INSERT INTO medicines (name, form, strength, unit_price_cents, stock_quantity, created_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&req.name)
    .bind(&req.form)
    .bind(&req.strength)
    .bind(req.unit_price_cents)
    .bind(req.stock_quantity.unwrap_or(0))
    .bind(Utc::now())
    .execute(pool)
    .await?
    .last_insert_rowid();

    find_medicine(pool, id).await?.ok_or(sqlx::Error::RowNotFound)
}

pub async fn update_medicine(
    pool: &SqlitePool,
    id: i64,
    req: &UpdateMedicineRequest,
) -> Result<Option<Medicine>, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE medicines SET
            name = COALESCE(?, name),
            form = COALESCE(?, form),
            strength = COALESCE(?, strength),
            unit_price_cents = COALESCE(?, unit_price_cents)
         WHERE id = ?",
    )
    .bind(&req.name)
    .bind(&req.form)
    .bind(&req.strength)
    .bind(req.unit_price_cents)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    find_medicine(pool, id).await
}

/// Add stock, refusing any restock that would pass MAX_STOCK_QUANTITY
#[instrument(skip(pool))]
pub async fn restock(pool: &SqlitePool, id: i64, quantity: i64) -> ApiResult<Medicine> {
    if !(1..=MAX_STOCK_QUANTITY).contains(&quantity) {
        return Err(ApiError::BadRequest(format!(
            "restock quantity must be between 1 and {}",
            MAX_STOCK_QUANTITY
        )));
    }
    let result = sqlx::query(
        "UPDATE medicines SET stock_quantity = stock_quantity + ?
         WHERE id = ? AND stock_quantity <= ?",
    )
    .bind(quantity)
    .bind(id)
    .bind(MAX_STOCK_QUANTITY - quantity)
    .execute(pool)
    .await?;

    let medicine = find_medicine(pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("medicine", id))?;
    if result.rows_affected() == 0 {
        return Err(ApiError::BadRequest(format!(
            "restocking {} units would take {} above the stock limit of {}",
            quantity, medicine.name, MAX_STOCK_QUANTITY
        )));
    }
    info!(medicine_id = id, quantity, stock = medicine.stock_quantity, "Medicine restocked");
    Ok(medicine)
}

// ===== Prescriptions =====

pub async fn find_prescription<'e, E>(executor: E, id: i64) -> Result<Option<Prescription>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Prescription>(&format!("SELECT {} FROM prescriptions WHERE id = ?", PRESCRIPTION_COLUMNS))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn items<'e, E>(executor: E, prescription_id: i64) -> Result<Vec<PrescriptionItem>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, PrescriptionItem>(
        "SELECT i.id, i.prescription_id, i.medicine_id, m.name AS medicine_name,
                i.dosage, i.frequency, i.duration_days, i.quantity
         FROM prescription_items i
         JOIN medicines m ON m.id = i.medicine_id
         WHERE i.prescription_id = ?
         ORDER BY i.id",
    )
    .bind(prescription_id)
    .fetch_all(executor)
    .await
}

pub async fn prescription_detail(pool: &SqlitePool, id: i64) -> Result<Option<PrescriptionDetail>, sqlx::Error> {
    let Some(prescription) = find_prescription(pool, id).await? else {
        return Ok(None);
    };
    let items = items(pool, id).await?;
    Ok(Some(PrescriptionDetail { prescription, items }))
}

pub async fn list_prescriptions(
    pool: &SqlitePool,
    filter: &PrescriptionFilter,
) -> Result<Vec<Prescription>, sqlx::Error> {
    let mut qb =
        QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM prescriptions WHERE 1 = 1", PRESCRIPTION_COLUMNS));
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status);
    }
    if let Some(patient_id) = filter.patient_id {
        qb.push(" AND patient_id = ").push_bind(patient_id);
    }
    qb.push(" ORDER BY created_at DESC, id DESC");
    qb.build_query_as::<Prescription>().fetch_all(pool).await
}

#[instrument(skip(pool, req), fields(patient_id = req.patient_id, items = req.items.len()))]
pub async fn create_prescription(
    pool: &SqlitePool,
    req: &CreatePrescriptionRequest,
    doctor_id: i64,
) -> ApiResult<PrescriptionDetail> {
    let mut tx = begin_write(pool).await?;

    let id = sqlx::query(
        "INSERT INTO prescriptions (patient_id, doctor_id, notes, status, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(req.patient_id)
    .bind(doctor_id)
    .bind(&req.notes)
    .bind(PrescriptionStatus::Pending)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    for item in &req.items {
        if find_medicine(&mut *tx, item.medicine_id).await?.is_none() {
            return Err(ApiError::not_found("medicine", item.medicine_id));
        }
        sqlx::query(
            "INSERT INTO prescription_items (prescription_id, medicine_id, dosage, frequency, duration_days, quantity)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(item.medicine_id)
        .bind(&item.dosage)
        .bind(&item.frequency)
        .bind(item.duration_days)
        .bind(item.quantity)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    info!(prescription_id = id, "Prescription written");

    prescription_detail(pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("prescription", id))
}

/// Hand out every item of a pending prescription. Stock is taken item by
/// item; the first short item aborts the whole dispense.
#[instrument(skip(pool))]
pub async fn dispense(pool: &SqlitePool, id: i64, pharmacist: i64) -> ApiResult<PrescriptionDetail> {
    let mut tx = begin_write(pool).await?;

    let prescription = find_prescription(&mut *tx, id)
        .await?
        .ok_or_else(|| ApiError::not_found("prescription", id))?;
    if prescription.status != PrescriptionStatus::Pending {
        return Err(ApiError::Conflict(format!(
            "prescription {} is {:?} and cannot be dispensed",
            id, prescription.status
        )));
    }

    let lines = items(&mut *tx, id).await?;
    for item in lines {
        let taken = sqlx::query(
            "UPDATE medicines SET stock_quantity = stock_quantity - ?
             WHERE id = ? AND stock_quantity >= ?",
        )
        .bind(item.quantity)
        .bind(item.medicine_id)
        .bind(item.quantity)
        .execute(&mut *tx)
        .await?;

        if taken.rows_affected() == 0 {
            return Err(ApiError::Conflict(format!(
                "insufficient stock of {} for {} units",
                item.medicine_name, item.quantity
            )));
        }
    }

    sqlx::query("UPDATE prescriptions SET status = ?, dispensed_by = ?, dispensed_at = ? WHERE id = ?")
        .bind(PrescriptionStatus::Dispensed)
        .bind(pharmacist)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    info!(prescription_id = id, "Prescription dispensed");

    prescription_detail(pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("prescription", id))
}

#[instrument(skip(pool))]
pub async fn cancel_prescription(pool: &SqlitePool, id: i64) -> ApiResult<PrescriptionDetail> {
    let result = sqlx::query("UPDATE prescriptions SET status = ? WHERE id = ? AND status = ?")
        .bind(PrescriptionStatus::Cancelled)
        .bind(id)
        .bind(PrescriptionStatus::Pending)
        .execute(pool)
        .await?;

    let detail = prescription_detail(pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("prescription", id))?;
    if result.rows_affected() == 0 {
        return Err(ApiError::Conflict(format!(
            "prescription {} is {:?} and cannot be cancelled",
            id, detail.prescription.status
        )));
    }
    Ok(detail)
}

pub async fn for_patient(pool: &SqlitePool, patient_id: i64) -> Result<Vec<Prescription>, sqlx::Error> {
    list_prescriptions(
        pool,
        &PrescriptionFilter {
            status: None,
            patient_id: Some(patient_id),
        },
    )
    .await
}
