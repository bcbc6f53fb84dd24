use actix_web::{web, HttpResponse};
use tracing::info;

use super::{validated, ADMIN_ONLY, ANY_STAFF};
use crate::api::middleware::AuthUser;
use crate::db::queries::facilities;
use crate::error::{ApiError, ApiResult};
use crate::models::facility::{BedFilter, BedRequest, DepartmentRequest, WardFilter, WardRequest};
use crate::AppState;

// ===== Departments =====

pub async fn list_departments(state: web::Data<AppState>, user: AuthUser) -> ApiResult<HttpResponse> {
    user.require(ANY_STAFF)?;
    Ok(HttpResponse::Ok().json(facilities::list_departments(state.db.pool()).await?))
}

pub async fn create_department(
    state: web::Data<AppState>,
    user: AuthUser,
    body: web::Json<DepartmentRequest>,
) -> ApiResult<HttpResponse> {
    user.require(ADMIN_ONLY)?;
    let req = validated(body)?;
    let id = facilities::insert_department(state.db.pool(), &req).await?;
    let department = facilities::find_department(state.db.pool(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("department", id))?;
    info!(department_id = id, name = %department.name, "Department created");
    Ok(HttpResponse::Created().json(department))
}

pub async fn update_department(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
    body: web::Json<DepartmentRequest>,
) -> ApiResult<HttpResponse> {
    user.require(ADMIN_ONLY)?;
    let id = path.into_inner();
    let req = validated(body)?;
    if !facilities::update_department(state.db.pool(), id, &req).await? {
        return Err(ApiError::not_found("department", id));
    }
    let department = facilities::find_department(state.db.pool(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("department", id))?;
    Ok(HttpResponse::Ok().json(department))
}

pub async fn delete_department(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    user.require(ADMIN_ONLY)?;
    let id = path.into_inner();
    if facilities::department_has_wards(state.db.pool(), id).await? {
        return Err(ApiError::Conflict(format!("department {} still has wards", id)));
    }
    if !facilities::delete_department(state.db.pool(), id).await? {
        return Err(ApiError::not_found("department", id));
    }
    Ok(HttpResponse::NoContent().finish())
}

// ===== Wards =====

pub async fn list_wards(
    state: web::Data<AppState>,
    user: AuthUser,
    filter: web::Query<WardFilter>,
) -> ApiResult<HttpResponse> {
    user.require(ANY_STAFF)?;
    Ok(HttpResponse::Ok().json(facilities::list_wards(state.db.pool(), &filter).await?))
}

pub async fn get_ward(state: web::Data<AppState>, user: AuthUser, path: web::Path<i64>) -> ApiResult<HttpResponse> {
    user.require(ANY_STAFF)?;
    let id = path.into_inner();
    let ward = facilities::find_ward_summary(state.db.pool(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("ward", id))?;
    Ok(HttpResponse::Ok().json(ward))
}

pub async fn create_ward(
    state: web::Data<AppState>,
    user: AuthUser,
    body: web::Json<WardRequest>,
) -> ApiResult<HttpResponse> {
    user.require(ADMIN_ONLY)?;
    let req = validated(body)?;
    if facilities::find_department(state.db.pool(), req.department_id).await?.is_none() {
        return Err(ApiError::not_found("department", req.department_id));
    }
    let id = facilities::insert_ward(state.db.pool(), &req).await?;
    let ward = facilities::find_ward(state.db.pool(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("ward", id))?;
    info!(ward_id = id, ward_type = ?ward.ward_type, "Ward created");
    Ok(HttpResponse::Created().json(ward))
}

// ===== Beds =====

pub async fn list_ward_beds(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    user.require(ANY_STAFF)?;
    let ward_id = path.into_inner();
    if facilities::find_ward(state.db.pool(), ward_id).await?.is_none() {
        return Err(ApiError::not_found("ward", ward_id));
    }
    let filter = BedFilter {
        ward_id: Some(ward_id),
        ..Default::default()
    };
    Ok(HttpResponse::Ok().json(facilities::list_beds(state.db.pool(), &filter).await?))
}

pub async fn add_bed(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
    body: web::Json<BedRequest>,
) -> ApiResult<HttpResponse> {
    user.require(ADMIN_ONLY)?;
    let ward_id = path.into_inner();
    let req = validated(body)?;
    if facilities::find_ward(state.db.pool(), ward_id).await?.is_none() {
        return Err(ApiError::not_found("ward", ward_id));
    }
    let id = facilities::insert_bed(state.db.pool(), ward_id, &req.bed_number).await?;
    let bed = facilities::find_bed(state.db.pool(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("bed", id))?;
    Ok(HttpResponse::Created().json(bed))
}

pub async fn list_beds(
    state: web::Data<AppState>,
    user: AuthUser,
    filter: web::Query<BedFilter>,
) -> ApiResult<HttpResponse> {
    user.require(ANY_STAFF)?;
    Ok(HttpResponse::Ok().json(facilities::list_beds(state.db.pool(), &filter).await?))
}

pub async fn delete_bed(state: web::Data<AppState>, user: AuthUser, path: web::Path<i64>) -> ApiResult<HttpResponse> {
    user.require(ADMIN_ONLY)?;
    let id = path.into_inner();
    let bed = facilities::find_bed(state.db.pool(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("bed", id))?;
    if bed.is_occupied {
        return Err(ApiError::Conflict(format!("bed {} is occupied", bed.bed_number)));
    }
    if facilities::bed_has_admissions(state.db.pool(), id).await? {
        return Err(ApiError::Conflict(format!("bed {} has admission history", bed.bed_number)));
    }
    if !facilities::delete_bed(state.db.pool(), id).await? {
        return Err(ApiError::Conflict(format!("bed {} is occupied", bed.bed_number)));
    }
    Ok(HttpResponse::NoContent().finish())
}
