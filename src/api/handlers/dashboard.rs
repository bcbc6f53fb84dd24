use actix_web::{web, HttpResponse};

use super::ANY_STAFF;
use crate::api::middleware::AuthUser;
use crate::db::queries::dashboard;
use crate::error::ApiResult;
use crate::AppState;

/// GET /api/dashboard
pub async fn stats(state: web::Data<AppState>, user: AuthUser) -> ApiResult<HttpResponse> {
    user.require(ANY_STAFF)?;
    Ok(HttpResponse::Ok().json(dashboard::stats(state.db.pool()).await?))
}
