use actix_web::{web, HttpResponse};
use tracing::info;

use super::{hash_blocking, validated, ADMIN_ONLY, ANY_STAFF};
use crate::api::middleware::AuthUser;
use crate::auth::Role;
use crate::db::queries::users;
use crate::error::{ApiError, ApiResult};
use crate::models::user::{CreateUserRequest, UpdateUserRequest, User, UserFilter};
use crate::AppState;

/// GET /api/users
pub async fn list(
    state: web::Data<AppState>,
    user: AuthUser,
    filter: web::Query<UserFilter>,
) -> ApiResult<HttpResponse> {
    user.require(ADMIN_ONLY)?;
    let users: Vec<User> = users::list(state.db.pool(), &filter)
        .await?
        .into_iter()
        .map(User::from)
        .collect();
    Ok(HttpResponse::Ok().json(users))
}

/// GET /api/doctors
pub async fn list_doctors(state: web::Data<AppState>, user: AuthUser) -> ApiResult<HttpResponse> {
    user.require(ANY_STAFF)?;
    let doctors: Vec<User> = users::list_active_by_role(state.db.pool(), Role::Doctor)
        .await?
        .into_iter()
        .map(User::from)
        .collect();
    Ok(HttpResponse::Ok().json(doctors))
}

/// POST /api/users
pub async fn create(
    state: web::Data<AppState>,
    user: AuthUser,
    body: web::Json<CreateUserRequest>,
) -> ApiResult<HttpResponse> {
    user.require(ADMIN_ONLY)?;
    let req = validated(body)?;

    let password_hash = hash_blocking(req.password.clone()).await?;
    let id = users::insert_user(
        state.db.pool(),
        &req.username,
        &password_hash,
        &req.full_name,
        req.email.as_deref(),
        req.role,
        req.department_id,
    )
    .await?;

    let created = users::find_by_id(state.db.pool(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("user", id))?;
    info!(user_id = id, role = %req.role, created_by = user.id, "Staff account created");
    Ok(HttpResponse::Created().json(User::from(created)))
}

/// GET /api/users/{id}: admins, or the user themselves
pub async fn get(state: web::Data<AppState>, user: AuthUser, path: web::Path<i64>) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    if user.id != id {
        user.require(ADMIN_ONLY)?;
    }
    let found = users::find_by_id(state.db.pool(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("user", id))?;
    Ok(HttpResponse::Ok().json(User::from(found)))
}

/// PUT /api/users/{id}
pub async fn update(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
    body: web::Json<UpdateUserRequest>,
) -> ApiResult<HttpResponse> {
    user.require(ADMIN_ONLY)?;
    let id = path.into_inner();
    let req = validated(body)?;

    if id == user.id && req.is_active == Some(false) {
        return Err(ApiError::BadRequest("you cannot deactivate your own account".into()));
    }

    let updated = users::update(state.db.pool(), id, &req)
        .await?
        .ok_or_else(|| ApiError::not_found("user", id))?;
    Ok(HttpResponse::Ok().json(User::from(updated)))
}

/// DELETE /api/users/{id}: deactivates, never deletes
pub async fn deactivate(state: web::Data<AppState>, user: AuthUser, path: web::Path<i64>) -> ApiResult<HttpResponse> {
    user.require(ADMIN_ONLY)?;
    let id = path.into_inner();
    if id == user.id {
        return Err(ApiError::BadRequest("you cannot deactivate your own account".into()));
    }
    if !users::set_active(state.db.pool(), id, false).await? {
        return Err(ApiError::not_found("user", id));
    }
    info!(user_id = id, deactivated_by = user.id, "Staff account deactivated");
    Ok(HttpResponse::NoContent().finish())
}
