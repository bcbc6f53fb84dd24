use actix_web::{web, HttpResponse};
use tracing::info;

use super::{validated, ADMIN_ONLY, ANY_STAFF, FRONT_DESK_AND_CLINICAL};
use crate::api::middleware::AuthUser;
use crate::db::queries::{admissions, appointments, billing, lab, patients, pharmacy, radiology};
use crate::error::{ApiError, ApiResult};
use crate::models::admission::AdmissionFilter;
use crate::models::patient::{PatientHistory, PatientRequest, PatientSearch};
use crate::models::Page;
use crate::AppState;

/// GET /api/patients
pub async fn search(
    state: web::Data<AppState>,
    user: AuthUser,
    query: web::Query<PatientSearch>,
) -> ApiResult<HttpResponse> {
    user.require(ANY_STAFF)?;
    let page = Page {
        limit: query.limit,
        offset: query.offset,
    };
    let found = patients::search(state.db.pool(), query.q.as_deref(), page).await?;
    Ok(HttpResponse::Ok().json(found))
}

/// POST /api/patients
pub async fn register(
    state: web::Data<AppState>,
    user: AuthUser,
    body: web::Json<PatientRequest>,
) -> ApiResult<HttpResponse> {
    user.require(FRONT_DESK_AND_CLINICAL)?;
    let req = validated(body)?;
    let patient = patients::insert(state.db.pool(), &req).await?;
    info!(patient_id = patient.id, registered_by = user.id, "Patient registration complete");
    Ok(HttpResponse::Created().json(patient))
}

/// GET /api/patients/{id}
pub async fn get(state: web::Data<AppState>, user: AuthUser, path: web::Path<i64>) -> ApiResult<HttpResponse> {
    user.require(ANY_STAFF)?;
    let id = path.into_inner();
    let patient = patients::find(state.db.pool(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("patient", id))?;
    Ok(HttpResponse::Ok().json(patient))
}

/// PUT /api/patients/{id}
pub async fn update(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
    body: web::Json<PatientRequest>,
) -> ApiResult<HttpResponse> {
    user.require(FRONT_DESK_AND_CLINICAL)?;
    let id = path.into_inner();
    let req = validated(body)?;
    let patient = patients::update(state.db.pool(), id, &req)
        .await?
        .ok_or_else(|| ApiError::not_found("patient", id))?;
    Ok(HttpResponse::Ok().json(patient))
}

/// DELETE /api/patients/{id}: only records nothing else refers to
pub async fn delete(state: web::Data<AppState>, user: AuthUser, path: web::Path<i64>) -> ApiResult<HttpResponse> {
    user.require(ADMIN_ONLY)?;
    let id = path.into_inner();
    let pool = state.db.pool();

    if patients::find(pool, id).await?.is_none() {
        return Err(ApiError::not_found("patient", id));
    }
    if admissions::active_for_patient(pool, id).await?.is_some() {
        return Err(ApiError::Conflict(format!("patient {} is currently admitted", id)));
    }
    if patients::reference_count(pool, id).await? > 0 {
        return Err(ApiError::Conflict(format!(
            "patient {} has clinical or billing records and cannot be deleted",
            id
        )));
    }

    patients::delete(pool, id).await?;
    info!(patient_id = id, deleted_by = user.id, "Patient record deleted");
    Ok(HttpResponse::NoContent().finish())
}

/// GET /api/patients/{id}/history
pub async fn history(state: web::Data<AppState>, user: AuthUser, path: web::Path<i64>) -> ApiResult<HttpResponse> {
    user.require(FRONT_DESK_AND_CLINICAL)?;
    let id = path.into_inner();
    let pool = state.db.pool();

    let patient = patients::find(pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("patient", id))?;

    let history = PatientHistory {
        patient,
        admissions: admissions::list(
            pool,
            &AdmissionFilter {
                status: None,
                patient_id: Some(id),
            },
        )
        .await?,
        lab_tests: lab::for_patient(pool, id).await?,
        radiology_scans: radiology::for_patient(pool, id).await?,
        prescriptions: pharmacy::for_patient(pool, id).await?,
        appointments: appointments::for_patient(pool, id).await?,
        bills: billing::for_patient(pool, id).await?,
    };
    Ok(HttpResponse::Ok().json(history))
}
