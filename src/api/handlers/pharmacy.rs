use actix_web::{web, HttpResponse};
use validator::Validate;

use super::{ensure_patient, validated};
use crate::api::middleware::AuthUser;
use crate::auth::Role;
use crate::db::queries::pharmacy;
use crate::error::{ApiError, ApiResult};
use crate::models::pharmacy::{
    CreateMedicineRequest, CreatePrescriptionRequest, MedicineFilter, PrescriptionFilter, RestockRequest,
    UpdateMedicineRequest,
};
use crate::AppState;

const INVENTORY_VIEW: &[Role] = &[Role::Admin, Role::Doctor, Role::Nurse, Role::Pharmacist];
const INVENTORY_EDIT: &[Role] = &[Role::Admin, Role::Pharmacist];
const PRESCRIPTION_VIEW: &[Role] = &[Role::Admin, Role::Doctor, Role::Nurse, Role::Pharmacist];

// ===== Medicines =====

pub async fn list_medicines(
    state: web::Data<AppState>,
    user: AuthUser,
    filter: web::Query<MedicineFilter>,
) -> ApiResult<HttpResponse> {
    user.require(INVENTORY_VIEW)?;
    Ok(HttpResponse::Ok().json(pharmacy::list_medicines(state.db.pool(), &filter).await?))
}

pub async fn create_medicine(
    state: web::Data<AppState>,
    user: AuthUser,
    body: web::Json<CreateMedicineRequest>,
) -> ApiResult<HttpResponse> {
    user.require(INVENTORY_EDIT)?;
    let req = validated(body)?;
    let medicine = pharmacy::insert_medicine(state.db.pool(), &req).await?;
    Ok(HttpResponse::Created().json(medicine))
}

pub async fn update_medicine(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
    body: web::Json<UpdateMedicineRequest>,
) -> ApiResult<HttpResponse> {
    user.require(INVENTORY_EDIT)?;
    let id = path.into_inner();
    let req = validated(body)?;
    let medicine = pharmacy::update_medicine(state.db.pool(), id, &req)
        .await?
        .ok_or_else(|| ApiError::not_found("medicine", id))?;
    Ok(HttpResponse::Ok().json(medicine))
}

pub async fn restock(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
    body: web::Json<RestockRequest>,
) -> ApiResult<HttpResponse> {
    user.require(INVENTORY_EDIT)?;
    let id = path.into_inner();
    let req = validated(body)?;
    let medicine = pharmacy::restock(state.db.pool(), id, req.quantity).await?;
    Ok(HttpResponse::Ok().json(medicine))
}

// ===== Prescriptions =====

pub async fn create_prescription(
    state: web::Data<AppState>,
    user: AuthUser,
    body: web::Json<CreatePrescriptionRequest>,
) -> ApiResult<HttpResponse> {
    user.require(&[Role::Doctor])?;
    let req = validated(body)?;
    for item in &req.items {
        item.validate()?;
    }
    ensure_patient(&state, req.patient_id).await?;
    let detail = pharmacy::create_prescription(state.db.pool(), &req, user.id).await?;
    Ok(HttpResponse::Created().json(detail))
}

pub async fn list_prescriptions(
    state: web::Data<AppState>,
    user: AuthUser,
    filter: web::Query<PrescriptionFilter>,
) -> ApiResult<HttpResponse> {
    user.require(PRESCRIPTION_VIEW)?;
    Ok(HttpResponse::Ok().json(pharmacy::list_prescriptions(state.db.pool(), &filter).await?))
}

pub async fn get_prescription(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    user.require(PRESCRIPTION_VIEW)?;
    let id = path.into_inner();
    let detail = pharmacy::prescription_detail(state.db.pool(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("prescription", id))?;
    Ok(HttpResponse::Ok().json(detail))
}

pub async fn dispense(state: web::Data<AppState>, user: AuthUser, path: web::Path<i64>) -> ApiResult<HttpResponse> {
    user.require(&[Role::Pharmacist])?;
    let detail = pharmacy::dispense(state.db.pool(), path.into_inner(), user.id).await?;
    Ok(HttpResponse::Ok().json(detail))
}

pub async fn cancel_prescription(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    user.require(&[Role::Doctor, Role::Admin])?;
    let detail = pharmacy::cancel_prescription(state.db.pool(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(detail))
}
