//! HTTP handlers, one module per resource

use actix_web::web;
use validator::Validate;

use crate::auth::{hash_password, verify_account_password, Role};
use crate::db::queries::patients as patient_queries;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

pub mod admissions;
pub mod appointments;
pub mod auth;
pub mod billing;
pub mod dashboard;
pub mod facilities;
pub mod health;
pub mod lab;
pub mod patients;
pub mod pharmacy;
pub mod radiology;
pub mod users;

pub(crate) const ADMIN_ONLY: &[Role] = &[Role::Admin];

/// Staff who register patients and manage their stay
pub(crate) const FRONT_DESK_AND_CLINICAL: &[Role] = &[Role::Admin, Role::Doctor, Role::Nurse, Role::Receptionist];

pub(crate) const BILLING_STAFF: &[Role] = &[Role::Admin, Role::Accountant, Role::Receptionist];

pub(crate) const ANY_STAFF: &[Role] = Role::ALL;

/// Unwrap a JSON body and run its validation rules
pub(crate) fn validated<T: Validate>(body: web::Json<T>) -> ApiResult<T> {
    let body = body.into_inner();
    body.validate()?;
    Ok(body)
}

pub(crate) async fn ensure_patient(state: &AppState, patient_id: i64) -> ApiResult<()> {
    if patient_queries::exists(state.db.pool(), patient_id).await? {
        Ok(())
    } else {
        Err(ApiError::not_found("patient", patient_id))
    }
}

// Argon2 runs on the blocking pool, not the async workers

/// Hash a new password
pub(crate) async fn hash_blocking(plain: String) -> ApiResult<String> {
    web::block(move || hash_password(&plain))
        .await
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {}", e)))?
}

/// Verify a password; `None` stands for an account that does not exist
pub(crate) async fn check_password(plain: String, hash: Option<String>) -> ApiResult<bool> {
    web::block(move || verify_account_password(&plain, hash.as_deref()))
        .await
        .map_err(|e| ApiError::Internal(format!("password check failed: {}", e)))
}
