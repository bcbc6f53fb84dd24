//! Admission workflow
//!
//! Admitting a patient touches up to three tables: the bed is claimed, the
//! admission row is written, and an ICU or inpatient sub-record is attached.
//! All of it runs in one transaction; any early return drops the
//! transaction and rolls every step back.

use chrono::Utc;
use sqlx::{Executor, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{info, instrument, warn};

use super::{facilities, users};
use crate::auth::Role;
use crate::db::begin_write;
use crate::error::{ApiError, ApiResult};
use crate::models::admission::{
    Admission, AdmissionCategory, AdmissionDetail, AdmissionFilter, AdmissionStatus, AdmitRequest, IcuRecord,
    InpatientRecord,
};
use crate::models::facility::{Bed, WardType};

const DEFAULT_MONITORING_LEVEL: &str = "continuous";

const ADMISSION_COLUMNS: &str = "id, patient_id, bed_id, category, reason, admitted_by, status,
    admitted_at, discharged_at, discharge_notes";

const WARD_TYPES: [WardType; 5] = [
    WardType::General,
    WardType::Icu,
    WardType::Private,
    WardType::Maternity,
    WardType::Emergency,
];

fn ward_types_for(category: AdmissionCategory) -> Vec<WardType> {
    WARD_TYPES.into_iter().filter(|t| t.accepts(category)).collect()
}

pub async fn find<'e, E>(executor: E, id: i64) -> Result<Option<Admission>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Admission>(&format!("SELECT {} FROM admissions WHERE id = ?", ADMISSION_COLUMNS))
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// The patient's current admission, if any
pub async fn active_for_patient<'e, E>(executor: E, patient_id: i64) -> Result<Option<Admission>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Admission>(&format!(
        "SELECT {} FROM admissions WHERE patient_id = ? AND status = ?",
        ADMISSION_COLUMNS
    ))
    .bind(patient_id)
    .bind(AdmissionStatus::Admitted)
    .fetch_optional(executor)
    .await
}

pub async fn list(pool: &SqlitePool, filter: &AdmissionFilter) -> Result<Vec<Admission>, sqlx::Error> {
    let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM admissions WHERE 1 = 1", ADMISSION_COLUMNS));
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status);
    }
    if let Some(patient_id) = filter.patient_id {
        qb.push(" AND patient_id = ").push_bind(patient_id);
    }
    qb.push(" ORDER BY admitted_at DESC, id DESC");
    qb.build_query_as::<Admission>().fetch_all(pool).await
}

/// Admission with its bed and sub-record
pub async fn detail(pool: &SqlitePool, id: i64) -> Result<Option<AdmissionDetail>, sqlx::Error> {
    let Some(admission) = find(pool, id).await? else {
        return Ok(None);
    };

    let bed = facilities::find_bed(pool, admission.bed_id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;

    let icu = sqlx::query_as::<_, IcuRecord>(
        "SELECT id, admission_id, ventilator_required, monitoring_level, notes
         FROM icu_admissions WHERE admission_id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    let inpatient = sqlx::query_as::<_, InpatientRecord>(
        "SELECT id, admission_id, attending_doctor_id, diet, notes
         FROM inpatient_admissions WHERE admission_id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(Some(AdmissionDetail {
        admission,
        bed,
        icu,
        inpatient,
    }))
}

/// Find-or-validate a bed for the request, without claiming it
async fn select_bed(conn: &mut SqliteConnection, req: &AdmitRequest) -> ApiResult<Bed> {
    match req.bed_id {
        Some(bed_id) => {
            let bed = facilities::find_bed(&mut *conn, bed_id)
                .await?
                .ok_or_else(|| ApiError::not_found("bed", bed_id))?;
            if bed.is_occupied {
                return Err(ApiError::Conflict(format!("bed {} is occupied", bed.bed_number)));
            }
            if !bed.ward_type.accepts(req.category) {
                return Err(ApiError::BadRequest(format!(
                    "bed {} is in a {:?} ward and cannot take a {:?} admission",
                    bed.bed_number, bed.ward_type, req.category
                )));
            }
            if req.ward_id.is_some_and(|ward_id| ward_id != bed.ward_id) {
                return Err(ApiError::BadRequest("bed does not belong to the requested ward".into()));
            }
            Ok(bed)
        }
        None => facilities::first_free_bed(&mut *conn, &ward_types_for(req.category), req.ward_id)
            .await?
            .ok_or_else(|| ApiError::Conflict("no free bed matches the admission request".into())),
    }
}

#[instrument(skip(pool, req), fields(patient_id = req.patient_id, category = ?req.category))]
pub async fn admit(pool: &SqlitePool, req: &AdmitRequest, admitted_by: i64) -> ApiResult<AdmissionDetail> {
    let mut tx = begin_write(pool).await?;

    let patient: Option<(i64,)> = sqlx::query_as("SELECT id FROM patients WHERE id = ?")
        .bind(req.patient_id)
        .fetch_optional(&mut *tx)
        .await?;
    if patient.is_none() {
        return Err(ApiError::not_found("patient", req.patient_id));
    }

    if let Some(active) = active_for_patient(&mut *tx, req.patient_id).await? {
        return Err(ApiError::Conflict(format!(
            "patient {} is already admitted (admission {})",
            req.patient_id, active.id
        )));
    }

    let bed = select_bed(&mut tx, req).await?;

    if !facilities::claim_bed(&mut *tx, bed.id).await? {
        warn!(bed_id = bed.id, "Bed was claimed concurrently");
        return Err(ApiError::Conflict(format!("bed {} is occupied", bed.bed_number)));
    }

    let admission_id = sqlx::query(
        "INSERT INTO admissions (patient_id, bed_id, category, reason, admitted_by, status, admitted_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(req.patient_id)
    .bind(bed.id)
    .bind(req.category)
    .bind(&req.reason)
    .bind(admitted_by)
    .bind(AdmissionStatus::Admitted)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    match req.category {
        AdmissionCategory::Icu => {
            sqlx::query(
                "INSERT INTO icu_admissions (admission_id, ventilator_required, monitoring_level, notes)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(admission_id)
            .bind(req.ventilator_required.unwrap_or(false))
            .bind(req.monitoring_level.as_deref().unwrap_or(DEFAULT_MONITORING_LEVEL))
            .bind(&req.notes)
            .execute(&mut *tx)
            .await?;
        }
        AdmissionCategory::General => {
            if let Some(doctor_id) = req.attending_doctor_id {
                if !users::has_active_role(&mut *tx, doctor_id, Role::Doctor).await? {
                    return Err(ApiError::BadRequest(format!(
                        "user {} is not an active doctor",
                        doctor_id
                    )));
                }
            }
            sqlx::query(
                "INSERT INTO inpatient_admissions (admission_id, attending_doctor_id, diet, notes)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(admission_id)
            .bind(req.attending_doctor_id)
            .bind(&req.diet)
            .bind(&req.notes)
            .execute(&mut *tx)
            .await?;
        }
    }

    tx.commit().await?;
    info!(admission_id, bed_id = bed.id, "Patient admitted");

    detail(pool, admission_id)
        .await?
        .ok_or_else(|| ApiError::not_found("admission", admission_id))
}

/// Load an admission inside a transaction and require it to be active
async fn find_active(conn: &mut SqliteConnection, id: i64) -> ApiResult<Admission> {
    let admission = find(&mut *conn, id)
        .await?
        .ok_or_else(|| ApiError::not_found("admission", id))?;
    if admission.status != AdmissionStatus::Admitted {
        return Err(ApiError::Conflict(format!("admission {} is already discharged", id)));
    }
    Ok(admission)
}

#[instrument(skip(pool, notes))]
pub async fn discharge(pool: &SqlitePool, id: i64, notes: Option<&str>) -> ApiResult<AdmissionDetail> {
    let mut tx = begin_write(pool).await?;
    let admission = find_active(&mut tx, id).await?;

    sqlx::query("UPDATE admissions SET status = ?, discharged_at = ?, discharge_notes = ? WHERE id = ?")
        .bind(AdmissionStatus::Discharged)
        .bind(Utc::now())
        .bind(notes)
        .bind(id)
        .execute(&mut *tx)
        .await?;
    facilities::release_bed(&mut *tx, admission.bed_id).await?;

    tx.commit().await?;
    info!(admission_id = id, bed_id = admission.bed_id, "Patient discharged");

    detail(pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("admission", id))
}

#[instrument(skip(pool))]
pub async fn transfer(pool: &SqlitePool, id: i64, bed_id: i64) -> ApiResult<AdmissionDetail> {
    let mut tx = begin_write(pool).await?;
    let admission = find_active(&mut tx, id).await?;

    if admission.bed_id == bed_id {
        return Err(ApiError::BadRequest("patient already occupies that bed".into()));
    }

    let bed = facilities::find_bed(&mut *tx, bed_id)
        .await?
        .ok_or_else(|| ApiError::not_found("bed", bed_id))?;
    if !bed.ward_type.accepts(admission.category) {
        return Err(ApiError::BadRequest(format!(
            "bed {} cannot take a {:?} admission",
            bed.bed_number, admission.category
        )));
    }
    if !facilities::claim_bed(&mut *tx, bed.id).await? {
        return Err(ApiError::Conflict(format!("bed {} is occupied", bed.bed_number)));
    }
    facilities::release_bed(&mut *tx, admission.bed_id).await?;

    sqlx::query("UPDATE admissions SET bed_id = ? WHERE id = ?")
        .bind(bed.id)
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    info!(admission_id = id, from_bed = admission.bed_id, to_bed = bed.id, "Patient transferred");

    detail(pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("admission", id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn icu_admissions_only_use_icu_wards() {
        assert_eq!(ward_types_for(AdmissionCategory::Icu), vec![WardType::Icu]);
    }

    #[test]
    fn general_admissions_use_every_other_ward() {
        let types = ward_types_for(AdmissionCategory::General);
        assert_eq!(types.len(), 4);
        assert!(!types.contains(&WardType::Icu));
    }
}
