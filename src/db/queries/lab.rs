use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{info, instrument};

use crate::error::{ApiError, ApiResult};
use crate::models::lab::{LabFilter, LabStatus, LabTest, OrderLabTestRequest, Priority};

const LAB_COLUMNS: &str = "id, patient_id, ordered_by, test_name, priority, status, result, result_notes,
    performed_by, ordered_at, completed_at";

pub async fn find(pool: &SqlitePool, id: i64) -> Result<Option<LabTest>, sqlx::Error> {
    sqlx::query_as::<_, LabTest>(&format!("SELECT {} FROM lab_tests WHERE id = ?", LAB_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list(pool: &SqlitePool, filter: &LabFilter) -> Result<Vec<LabTest>, sqlx::Error> {
    let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM lab_tests WHERE 1 = 1", LAB_COLUMNS));
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status);
    }
    if let Some(patient_id) = filter.patient_id {
        qb.push(" AND patient_id = ").push_bind(patient_id);
    }
    // STAT first, then oldest orders
    qb.push(
        " ORDER BY CASE priority WHEN 'stat' THEN 0 WHEN 'urgent' THEN 1 ELSE 2 END, ordered_at, id",
    );
    qb.build_query_as::<LabTest>().fetch_all(pool).await
}

#[instrument(skip(pool, req), fields(patient_id = req.patient_id))]
pub async fn insert(pool: &SqlitePool, req: &OrderLabTestRequest, ordered_by: i64) -> Result<LabTest, sqlx::Error> {
    let id = sqlx::query(
        "INSERT INTO lab_tests (patient_id, ordered_by, test_name, priority, status, ordered_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(req.patient_id)
    .bind(ordered_by)
    .bind(&req.test_name)
    .bind(req.priority.unwrap_or(Priority::Routine))
    .bind(LabStatus::Ordered)
    .bind(Utc::now())
    .execute(pool)
    .await?
    .last_insert_rowid();

    info!(lab_test_id = id, test = %req.test_name, "Lab test ordered");
    find(pool, id).await?.ok_or(sqlx::Error::RowNotFound)
}

/// Move a test to `next`, recording the result when completing.
/// The status guard in the UPDATE rejects a concurrent transition.
#[instrument(skip(pool, result, notes))]
pub async fn transition(
    pool: &SqlitePool,
    id: i64,
    next: LabStatus,
    actor: i64,
    result: Option<&str>,
    notes: Option<&str>,
) -> ApiResult<LabTest> {
    let current = find(pool, id).await?.ok_or_else(|| ApiError::not_found("lab test", id))?;
    if !current.status.can_transition_to(next) {
        return Err(ApiError::Conflict(format!(
            "lab test {} cannot move from {:?} to {:?}",
            id, current.status, next
        )));
    }

    let now = Utc::now();
    let updated = match next {
        LabStatus::Completed => sqlx::query(
            "UPDATE lab_tests SET status = ?, result = ?, result_notes = ?, performed_by = ?, completed_at = ?
             WHERE id = ? AND status = ?",
        )
        .bind(next)
        .bind(result)
        .bind(notes)
        .bind(actor)
        .bind(now)
        .bind(id)
        .bind(current.status),
        LabStatus::SampleCollected => {
            sqlx::query("UPDATE lab_tests SET status = ?, performed_by = ? WHERE id = ? AND status = ?")
                .bind(next)
                .bind(actor)
                .bind(id)
                .bind(current.status)
        }
        _ => sqlx::query("UPDATE lab_tests SET status = ? WHERE id = ? AND status = ?")
            .bind(next)
            .bind(id)
            .bind(current.status),
    }
    .execute(pool)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(ApiError::Conflict(format!("lab test {} changed concurrently", id)));
    }
    info!(lab_test_id = id, status = ?next, "Lab test updated");
    find(pool, id).await?.ok_or_else(|| ApiError::not_found("lab test", id))
}

pub async fn for_patient(pool: &SqlitePool, patient_id: i64) -> Result<Vec<LabTest>, sqlx::Error> {
    list(
        pool,
        &LabFilter {
            status: None,
            patient_id: Some(patient_id),
        },
    )
    .await
}
