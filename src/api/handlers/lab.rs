use actix_web::{web, HttpResponse};

use super::{ensure_patient, validated};
use crate::api::middleware::AuthUser;
use crate::auth::Role;
use crate::db::queries::lab;
use crate::error::{ApiError, ApiResult};
use crate::models::lab::{LabFilter, LabResultRequest, LabStatus, OrderLabTestRequest};
use crate::AppState;

const ORDERING: &[Role] = &[Role::Doctor];
const VIEWING: &[Role] = &[Role::Admin, Role::Doctor, Role::Nurse, Role::Receptionist, Role::LabTechnician];
const COLLECTING: &[Role] = &[Role::LabTechnician, Role::Nurse];
const RESULTING: &[Role] = &[Role::LabTechnician];
const CANCELLING: &[Role] = &[Role::Doctor, Role::Admin];

/// POST /api/lab-tests
pub async fn order(
    state: web::Data<AppState>,
    user: AuthUser,
    body: web::Json<OrderLabTestRequest>,
) -> ApiResult<HttpResponse> {
    user.require(ORDERING)?;
    let req = validated(body)?;
    ensure_patient(&state, req.patient_id).await?;
    let test = lab::insert(state.db.pool(), &req, user.id).await?;
    Ok(HttpResponse::Created().json(test))
}

/// GET /api/lab-tests
pub async fn list(
    state: web::Data<AppState>,
    user: AuthUser,
    filter: web::Query<LabFilter>,
) -> ApiResult<HttpResponse> {
    user.require(VIEWING)?;
    Ok(HttpResponse::Ok().json(lab::list(state.db.pool(), &filter).await?))
}

/// GET /api/lab-tests/{id}
pub async fn get(state: web::Data<AppState>, user: AuthUser, path: web::Path<i64>) -> ApiResult<HttpResponse> {
    user.require(VIEWING)?;
    let id = path.into_inner();
    let test = lab::find(state.db.pool(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("lab test", id))?;
    Ok(HttpResponse::Ok().json(test))
}

/// POST /api/lab-tests/{id}/collect
pub async fn collect(state: web::Data<AppState>, user: AuthUser, path: web::Path<i64>) -> ApiResult<HttpResponse> {
    user.require(COLLECTING)?;
    let test = lab::transition(state.db.pool(), path.into_inner(), LabStatus::SampleCollected, user.id, None, None)
        .await?;
    Ok(HttpResponse::Ok().json(test))
}

/// POST /api/lab-tests/{id}/result
pub async fn record_result(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
    body: web::Json<LabResultRequest>,
) -> ApiResult<HttpResponse> {
    user.require(RESULTING)?;
    let req = validated(body)?;
    let test = lab::transition(
        state.db.pool(),
        path.into_inner(),
        LabStatus::Completed,
        user.id,
        Some(&req.result),
        req.notes.as_deref(),
    )
    .await?;
    Ok(HttpResponse::Ok().json(test))
}

/// POST /api/lab-tests/{id}/cancel
pub async fn cancel(state: web::Data<AppState>, user: AuthUser, path: web::Path<i64>) -> ApiResult<HttpResponse> {
    user.require(CANCELLING)?;
    let test = lab::transition(state.db.pool(), path.into_inner(), LabStatus::Cancelled, user.id, None, None).await?;
    Ok(HttpResponse::Ok().json(test))
}
