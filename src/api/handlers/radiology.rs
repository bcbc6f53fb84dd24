use actix_web::{web, HttpResponse};

use super::{ensure_patient, validated};
use crate::api::middleware::AuthUser;
use crate::auth::Role;
use crate::db::queries::radiology;
use crate::error::{ApiError, ApiResult};
use crate::models::radiology::{OrderScanRequest, ScanFilter, ScanReportRequest};
use crate::AppState;

const VIEWING: &[Role] = &[Role::Admin, Role::Doctor, Role::Nurse, Role::Receptionist, Role::Radiologist];

pub async fn order(
    state: web::Data<AppState>,
    user: AuthUser,
    body: web::Json<OrderScanRequest>,
) -> ApiResult<HttpResponse> {
    user.require(&[Role::Doctor])?;
    let req = validated(body)?;
    ensure_patient(&state, req.patient_id).await?;
    let scan = radiology::insert(state.db.pool(), &req, user.id).await?;
    Ok(HttpResponse::Created().json(scan))
}

pub async fn list(
    state: web::Data<AppState>,
    user: AuthUser,
    filter: web::Query<ScanFilter>,
) -> ApiResult<HttpResponse> {
    user.require(VIEWING)?;
    Ok(HttpResponse::Ok().json(radiology::list(state.db.pool(), &filter).await?))
}

pub async fn get(state: web::Data<AppState>, user: AuthUser, path: web::Path<i64>) -> ApiResult<HttpResponse> {
    user.require(VIEWING)?;
    let id = path.into_inner();
    let scan = radiology::find(state.db.pool(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("radiology scan", id))?;
    Ok(HttpResponse::Ok().json(scan))
}

pub async fn report(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
    body: web::Json<ScanReportRequest>,
) -> ApiResult<HttpResponse> {
    user.require(&[Role::Radiologist])?;
    let req = validated(body)?;
    let scan = radiology::report(state.db.pool(), path.into_inner(), &req, user.id).await?;
    Ok(HttpResponse::Ok().json(scan))
}

pub async fn cancel(state: web::Data<AppState>, user: AuthUser, path: web::Path<i64>) -> ApiResult<HttpResponse> {
    user.require(&[Role::Doctor, Role::Admin])?;
    let scan = radiology::cancel(state.db.pool(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(scan))
}
