use actix_web::{web, HttpResponse};
use validator::Validate;

use super::{validated, ADMIN_ONLY, BILLING_STAFF};
use crate::api::middleware::AuthUser;
use crate::db::queries::billing;
use crate::error::{ApiError, ApiResult};
use crate::models::billing::{BillFilter, BillItemRequest, CreateBillRequest, PaymentRequest};
use crate::AppState;

fn validate_items(items: &[BillItemRequest]) -> ApiResult<()> {
    for item in items {
        item.validate()?;
    }
    Ok(())
}

/// POST /api/bills
pub async fn create(
    state: web::Data<AppState>,
    user: AuthUser,
    body: web::Json<CreateBillRequest>,
) -> ApiResult<HttpResponse> {
    user.require(BILLING_STAFF)?;
    let req = validated(body)?;
    validate_items(&req.items)?;
    let bill = billing::create(state.db.pool(), &req, user.id).await?;
    Ok(HttpResponse::Created().json(bill))
}

/// GET /api/bills
pub async fn list(
    state: web::Data<AppState>,
    user: AuthUser,
    filter: web::Query<BillFilter>,
) -> ApiResult<HttpResponse> {
    user.require(BILLING_STAFF)?;
    Ok(HttpResponse::Ok().json(billing::list(state.db.pool(), &filter).await?))
}

/// GET /api/bills/{id}
pub async fn get(state: web::Data<AppState>, user: AuthUser, path: web::Path<i64>) -> ApiResult<HttpResponse> {
    user.require(BILLING_STAFF)?;
    let id = path.into_inner();
    let bill = billing::detail(state.db.pool(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("bill", id))?;
    Ok(HttpResponse::Ok().json(bill))
}

/// POST /api/bills/{id}/items
pub async fn add_items(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
    body: web::Json<Vec<BillItemRequest>>,
) -> ApiResult<HttpResponse> {
    user.require(BILLING_STAFF)?;
    let items = body.into_inner();
    if items.is_empty() {
        return Err(ApiError::BadRequest("at least one item is required".into()));
    }
    validate_items(&items)?;
    let bill = billing::add_items(state.db.pool(), path.into_inner(), &items).await?;
    Ok(HttpResponse::Ok().json(bill))
}

/// POST /api/bills/{id}/payments
pub async fn add_payment(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
    body: web::Json<PaymentRequest>,
) -> ApiResult<HttpResponse> {
    user.require(BILLING_STAFF)?;
    let req = validated(body)?;
    let bill = billing::add_payment(state.db.pool(), path.into_inner(), &req, user.id).await?;
    Ok(HttpResponse::Ok().json(bill))
}

/// POST /api/bills/{id}/void
pub async fn void(state: web::Data<AppState>, user: AuthUser, path: web::Path<i64>) -> ApiResult<HttpResponse> {
    user.require(ADMIN_ONLY)?;
    let bill = billing::void(state.db.pool(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(bill))
}
