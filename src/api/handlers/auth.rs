use actix_web::{web, HttpResponse};
use tracing::{info, warn};

use super::{check_password, hash_blocking, validated};
use crate::api::middleware::AuthUser;
use crate::db::queries::users;
use crate::error::{ApiError, ApiResult};
use crate::models::user::{ChangePasswordRequest, LoginRequest, LoginResponse, User};
use crate::AppState;

/// POST /api/auth/login
pub async fn login(state: web::Data<AppState>, body: web::Json<LoginRequest>) -> ApiResult<HttpResponse> {
    let req = validated(body)?;
    let invalid = || ApiError::Unauthorized("invalid username or password".into());

    // Unknown usernames still pay for a hash check, so timing does not reveal them
    let found = users::find_by_username(state.db.pool(), &req.username).await?;
    let matched = check_password(req.password, found.as_ref().map(|u| u.password_hash.clone())).await?;
    let Some(user) = found else {
        warn!(username = %req.username, "Login for unknown user");
        return Err(invalid());
    };
    if !matched {
        warn!(username = %req.username, "Login with wrong password");
        return Err(invalid());
    }
    if !user.is_active {
        return Err(ApiError::Forbidden("account is deactivated".into()));
    }

    let issued = state.tokens.issue(user.id, &user.username, user.role)?;
    info!(user_id = user.id, role = %user.role, "User logged in");

    Ok(HttpResponse::Ok().json(LoginResponse {
        token: issued.token,
        token_type: "Bearer",
        expires_at: issued.expires_at,
        user: User::from(user),
    }))
}

/// GET /api/auth/me
pub async fn me(state: web::Data<AppState>, user: AuthUser) -> ApiResult<HttpResponse> {
    let record = users::find_by_id(state.db.pool(), user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("user", user.id))?;
    Ok(HttpResponse::Ok().json(User::from(record)))
}

/// POST /api/auth/change-password
pub async fn change_password(
    state: web::Data<AppState>,
    user: AuthUser,
    body: web::Json<ChangePasswordRequest>,
) -> ApiResult<HttpResponse> {
    let req = validated(body)?;
    let record = users::find_by_id(state.db.pool(), user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("user", user.id))?;

    if !check_password(req.current_password, Some(record.password_hash)).await? {
        return Err(ApiError::BadRequest("current password is incorrect".into()));
    }

    let new_hash = hash_blocking(req.new_password).await?;
    users::set_password_hash(state.db.pool(), user.id, &new_hash).await?;
    info!(user_id = user.id, "Password changed");

    Ok(HttpResponse::NoContent().finish())
}
