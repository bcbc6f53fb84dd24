use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{info, instrument};

use crate::error::{ApiError, ApiResult};
use crate::models::radiology::{OrderScanRequest, RadiologyScan, ScanFilter, ScanReportRequest, ScanStatus};

const SCAN_COLUMNS: &str = "id, patient_id, ordered_by, modality, body_part, clinical_notes, status,
    findings, impression, reported_by, ordered_at, reported_at";

pub async fn find(pool: &SqlitePool, id: i64) -> Result<Option<RadiologyScan>, sqlx::Error> {
    sqlx::query_as::<_, RadiologyScan>(&format!("SELECT {} FROM radiology_scans WHERE id = ?", SCAN_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list(pool: &SqlitePool, filter: &ScanFilter) -> Result<Vec<RadiologyScan>, sqlx::Error> {
    let mut qb =
        QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM radiology_scans WHERE 1 = 1", SCAN_COLUMNS));
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status);
    }
    if let Some(patient_id) = filter.patient_id {
        qb.push(" AND patient_id = ").push_bind(patient_id);
    }
    qb.push(" ORDER BY ordered_at, id");
    qb.build_query_as::<RadiologyScan>().fetch_all(pool).await
}

#[instrument(skip(pool, req), fields(patient_id = req.patient_id, modality = ?req.modality))]
pub async fn insert(pool: &SqlitePool, req: &OrderScanRequest, ordered_by: i64) -> Result<RadiologyScan, sqlx::Error> {
    let id = sqlx::query(
        "INSERT INTO radiology_scans (patient_id, ordered_by, modality, body_part, clinical_notes, status, ordered_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(req.patient_id)
    .bind(ordered_by)
    .bind(req.modality)
    .bind(&req.body_part)
    .bind(&req.clinical_notes)
    .bind(ScanStatus::Ordered)
    .bind(Utc::now())
    .execute(pool)
    .await?
    .last_insert_rowid();

    info!(scan_id = id, "Radiology scan ordered");
    find(pool, id).await?.ok_or(sqlx::Error::RowNotFound)
}

#[instrument(skip(pool, report))]
pub async fn report(pool: &SqlitePool, id: i64, report: &ScanReportRequest, radiologist: i64) -> ApiResult<RadiologyScan> {
    let result = sqlx::query(
        "UPDATE radiology_scans SET status = ?, findings = ?, impression = ?, reported_by = ?, reported_at = ?
         WHERE id = ? AND status = ?",
    )
    .bind(ScanStatus::Completed)
    .bind(&report.findings)
    .bind(&report.impression)
    .bind(radiologist)
    .bind(Utc::now())
    .bind(id)
    .bind(ScanStatus::Ordered)
    .execute(pool)
    .await?;

    finish_transition(pool, id, result.rows_affected(), "reported").await
}

#[instrument(skip(pool))]
pub async fn cancel(pool: &SqlitePool, id: i64) -> ApiResult<RadiologyScan> {
    let result = sqlx::query("UPDATE radiology_scans SET status = ? WHERE id = ? AND status = ?")
        .bind(ScanStatus::Cancelled)
        .bind(id)
        .bind(ScanStatus::Ordered)
        .execute(pool)
        .await?;

    finish_transition(pool, id, result.rows_affected(), "cancelled").await
}

/// Distinguish "no such scan" from "scan not in ordered state"
async fn finish_transition(pool: &SqlitePool, id: i64, rows: u64, action: &str) -> ApiResult<RadiologyScan> {
    let scan = find(pool, id).await?.ok_or_else(|| ApiError::not_found("radiology scan", id))?;
    if rows == 0 {
        return Err(ApiError::Conflict(format!(
            "radiology scan {} is {:?} and cannot be {}",
            id, scan.status, action
        )));
    }
    info!(scan_id = id, action, "Radiology scan updated");
    Ok(scan)
}

pub async fn for_patient(pool: &SqlitePool, patient_id: i64) -> Result<Vec<RadiologyScan>, sqlx::Error> {
    list(
        pool,
        &ScanFilter {
            status: None,
            patient_id: Some(patient_id),
        },
    )
    .await
}
