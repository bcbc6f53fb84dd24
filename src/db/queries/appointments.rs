use chrono::{DateTime, Duration, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{info, instrument};

use super::users;
use crate::auth::Role;
use crate::db::begin_write;
use crate::error::{ApiError, ApiResult};
use crate::models::appointment::{
    day_bounds, normalize_start, overlaps, Appointment, AppointmentFilter, AppointmentStatus,
    CreateAppointmentRequest, DEFAULT_DURATION_MINUTES, MAX_DURATION_MINUTES,
};

const APPOINTMENT_COLUMNS: &str =
    "id, patient_id, doctor_id, scheduled_at, duration_minutes, reason, status, created_by, created_at";

pub async fn find(pool: &SqlitePool, id: i64) -> Result<Option<Appointment>, sqlx::Error> {
    sqlx::query_as::<_, Appointment>(&format!("SELECT {} FROM appointments WHERE id = ?", APPOINTMENT_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list(pool: &SqlitePool, filter: &AppointmentFilter) -> Result<Vec<Appointment>, sqlx::Error> {
    let mut qb =
        QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM appointments WHERE 1 = 1", APPOINTMENT_COLUMNS));
    if let Some(doctor_id) = filter.doctor_id {
        qb.push(" AND doctor_id = ").push_bind(doctor_id);
    }
    if let Some(patient_id) = filter.patient_id {
        qb.push(" AND patient_id = ").push_bind(patient_id);
    }
    if let Some(day) = filter.date {
        let (start, end) = day_bounds(day);
        qb.push(" AND scheduled_at >= ")
            .push_bind(start)
            .push(" AND scheduled_at < ")
            .push_bind(end);
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status);
    }
    qb.push(" ORDER BY scheduled_at, id");
    qb.build_query_as::<Appointment>().fetch_all(pool).await
}

/// Fail if the doctor already has a scheduled slot overlapping the window
async fn ensure_free_slot(
    conn: &mut SqliteConnection,
    doctor_id: i64,
    start: DateTime<Utc>,
    minutes: i64,
    exclude: Option<i64>,
) -> ApiResult<()> {
    let end = start + Duration::minutes(minutes);
    // Nothing that starts earlier than this can still be running
    let earliest = start - Duration::minutes(MAX_DURATION_MINUTES);

    let candidates = sqlx::query_as::<_, Appointment>(&format!(
        "SELECT {} FROM appointments
         WHERE doctor_id = ? AND status = ? AND scheduled_at >= ? AND scheduled_at < ? AND id != ?",
        APPOINTMENT_COLUMNS
    ))
    .bind(doctor_id)
    .bind(AppointmentStatus::Scheduled)
    .bind(earliest)
    .bind(end)
    .bind(exclude.unwrap_or(-1))
    .fetch_all(&mut *conn)
    .await?;

    if let Some(clash) = candidates
        .iter()
        .find(|a| overlaps(a.scheduled_at, a.duration_minutes, start, minutes))
    {
        return Err(ApiError::Conflict(format!(
            "doctor {} already has appointment {} from {} to {}",
            doctor_id,
            clash.id,
            clash.scheduled_at,
            clash.ends_at()
        )));
    }
    Ok(())
}

fn ensure_future(at: DateTime<Utc>) -> ApiResult<()> {
    if at <= Utc::now() {
        return Err(ApiError::BadRequest("appointments must be scheduled in the future".into()));
    }
    Ok(())
}

#[instrument(skip(pool, req), fields(doctor_id = req.doctor_id, patient_id = req.patient_id))]
pub async fn create(pool: &SqlitePool, req: &CreateAppointmentRequest, created_by: i64) -> ApiResult<Appointment> {
    let start = normalize_start(req.scheduled_at);
    let minutes = req.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES);
    ensure_future(start)?;

    let mut tx = begin_write(pool).await?;

    let patient: Option<(i64,)> = sqlx::query_as("SELECT id FROM patients WHERE id = ?")
        .bind(req.patient_id)
        .fetch_optional(&mut *tx)
        .await?;
    if patient.is_none() {
        return Err(ApiError::not_found("patient", req.patient_id));
    }
    if !users::has_active_role(&mut *tx, req.doctor_id, Role::Doctor).await? {
        return Err(ApiError::BadRequest(format!("user {} is not an active doctor", req.doctor_id)));
    }

    ensure_free_slot(&mut tx, req.doctor_id, start, minutes, None).await?;

    let id = sqlx::query(
        "INSERT INTO appointments (patient_id, doctor_id, scheduled_at, duration_minutes, reason, status, created_by, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(req.patient_id)
    .bind(req.doctor_id)
    .bind(start)
    .bind(minutes)
    .bind(&req.reason)
    .bind(AppointmentStatus::Scheduled)
    .bind(created_by)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    tx.commit().await?;
    info!(appointment_id = id, scheduled_at = %start, "Appointment booked");

    find(pool, id).await?.ok_or_else(|| ApiError::not_found("appointment", id))
}

#[instrument(skip(pool))]
pub async fn reschedule(
    pool: &SqlitePool,
    id: i64,
    scheduled_at: DateTime<Utc>,
    duration_minutes: Option<i64>,
) -> ApiResult<Appointment> {
    let start = normalize_start(scheduled_at);
    ensure_future(start)?;

    let mut tx = begin_write(pool).await?;
    let current = sqlx::query_as::<_, Appointment>(&format!(
        "SELECT {} FROM appointments WHERE id = ?",
        APPOINTMENT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| ApiError::not_found("appointment", id))?;

    if current.status != AppointmentStatus::Scheduled {
        return Err(ApiError::Conflict(format!(
            "appointment {} is {:?} and cannot be rescheduled",
            id, current.status
        )));
    }

    let minutes = duration_minutes.unwrap_or(current.duration_minutes);
    ensure_free_slot(&mut tx, current.doctor_id, start, minutes, Some(id)).await?;

    sqlx::query("UPDATE appointments SET scheduled_at = ?, duration_minutes = ? WHERE id = ?")
        .bind(start)
        .bind(minutes)
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    info!(appointment_id = id, scheduled_at = %start, "Appointment rescheduled");

    find(pool, id).await?.ok_or_else(|| ApiError::not_found("appointment", id))
}

/// Move a scheduled appointment to a final status
#[instrument(skip(pool))]
pub async fn close(pool: &SqlitePool, id: i64, status: AppointmentStatus) -> ApiResult<Appointment> {
    let result = sqlx::query("UPDATE appointments SET status = ? WHERE id = ? AND status = ?")
        .bind(status)
        .bind(id)
        .bind(AppointmentStatus::Scheduled)
        .execute(pool)
        .await?;

    let appointment = find(pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("appointment", id))?;
    if result.rows_affected() == 0 {
        return Err(ApiError::Conflict(format!(
            "appointment {} is {:?}, only scheduled appointments can change",
            id, appointment.status
        )));
    }
    info!(appointment_id = id, status = ?status, "Appointment closed");
    Ok(appointment)
}

pub async fn for_patient(pool: &SqlitePool, patient_id: i64) -> Result<Vec<Appointment>, sqlx::Error> {
    list(
        pool,
        &AppointmentFilter {
            patient_id: Some(patient_id),
            ..Default::default()
        },
    )
    .await
}
