use actix_web::{web, HttpResponse};

use super::{validated, ANY_STAFF, FRONT_DESK_AND_CLINICAL};
use crate::api::middleware::AuthUser;
use crate::db::queries::admissions;
use crate::error::{ApiError, ApiResult};
use crate::models::admission::{AdmissionFilter, AdmitRequest, DischargeRequest, TransferRequest};
use crate::AppState;

/// POST /api/admissions
pub async fn admit(
    state: web::Data<AppState>,
    user: AuthUser,
    body: web::Json<AdmitRequest>,
) -> ApiResult<HttpResponse> {
    user.require(FRONT_DESK_AND_CLINICAL)?;
    let req = validated(body)?;
    let detail = admissions::admit(state.db.pool(), &req, user.id).await?;
    Ok(HttpResponse::Created().json(detail))
}

/// GET /api/admissions
pub async fn list(
    state: web::Data<AppState>,
    user: AuthUser,
    filter: web::Query<AdmissionFilter>,
) -> ApiResult<HttpResponse> {
    user.require(ANY_STAFF)?;
    Ok(HttpResponse::Ok().json(admissions::list(state.db.pool(), &filter).await?))
}

/// GET /api/admissions/{id}
pub async fn get(state: web::Data<AppState>, user: AuthUser, path: web::Path<i64>) -> ApiResult<HttpResponse> {
    user.require(ANY_STAFF)?;
    let id = path.into_inner();
    let detail = admissions::detail(state.db.pool(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("admission", id))?;
    Ok(HttpResponse::Ok().json(detail))
}

/// POST /api/admissions/{id}/discharge
pub async fn discharge(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
    body: Option<web::Json<DischargeRequest>>,
) -> ApiResult<HttpResponse> {
    user.require(FRONT_DESK_AND_CLINICAL)?;
    let notes = body.and_then(|b| b.into_inner().notes);
    let detail = admissions::discharge(state.db.pool(), path.into_inner(), notes.as_deref()).await?;
    Ok(HttpResponse::Ok().json(detail))
}

/// POST /api/admissions/{id}/transfer
pub async fn transfer(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
    body: web::Json<TransferRequest>,
) -> ApiResult<HttpResponse> {
    user.require(FRONT_DESK_AND_CLINICAL)?;
    let detail = admissions::transfer(state.db.pool(), path.into_inner(), body.bed_id).await?;
    Ok(HttpResponse::Ok().json(detail))
}
