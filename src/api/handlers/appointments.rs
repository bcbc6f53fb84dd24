use actix_web::{web, HttpResponse};

use super::{ensure_patient, validated};
use crate::api::middleware::AuthUser;
use crate::auth::Role;
use crate::db::queries::appointments;
use crate::error::{ApiError, ApiResult};
use crate::models::appointment::{AppointmentFilter, AppointmentStatus, CreateAppointmentRequest, RescheduleRequest};
use crate::AppState;

const SCHEDULING: &[Role] = &[Role::Admin, Role::Receptionist, Role::Doctor];
const VIEWING: &[Role] = &[Role::Admin, Role::Receptionist, Role::Doctor, Role::Nurse];
const CLOSING: &[Role] = &[Role::Admin, Role::Receptionist, Role::Doctor];

/// POST /api/appointments
pub async fn create(
    state: web::Data<AppState>,
    user: AuthUser,
    body: web::Json<CreateAppointmentRequest>,
) -> ApiResult<HttpResponse> {
    user.require(SCHEDULING)?;
    let req = validated(body)?;
    ensure_patient(&state, req.patient_id).await?;
    let appointment = appointments::create(state.db.pool(), &req, user.id).await?;
    Ok(HttpResponse::Created().json(appointment))
}

/// GET /api/appointments
///
/// Doctors only ever see their own calendar.
pub async fn list(
    state: web::Data<AppState>,
    user: AuthUser,
    filter: web::Query<AppointmentFilter>,
) -> ApiResult<HttpResponse> {
    user.require(VIEWING)?;
    let mut filter = filter.into_inner();
    if user.is(Role::Doctor) {
        filter.doctor_id = Some(user.id);
    }
    Ok(HttpResponse::Ok().json(appointments::list(state.db.pool(), &filter).await?))
}

/// GET /api/appointments/{id}
pub async fn get(state: web::Data<AppState>, user: AuthUser, path: web::Path<i64>) -> ApiResult<HttpResponse> {
    user.require(VIEWING)?;
    let id = path.into_inner();
    let appointment = appointments::find(state.db.pool(), id)
        .await?
        .filter(|a| !user.is(Role::Doctor) || a.doctor_id == user.id)
        .ok_or_else(|| ApiError::not_found("appointment", id))?;
    Ok(HttpResponse::Ok().json(appointment))
}

/// POST /api/appointments/{id}/reschedule
pub async fn reschedule(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
    body: web::Json<RescheduleRequest>,
) -> ApiResult<HttpResponse> {
    user.require(SCHEDULING)?;
    let req = validated(body)?;
    let appointment =
        appointments::reschedule(state.db.pool(), path.into_inner(), req.scheduled_at, req.duration_minutes).await?;
    Ok(HttpResponse::Ok().json(appointment))
}

async fn close_as(
    state: web::Data<AppState>,
    user: AuthUser,
    id: i64,
    status: AppointmentStatus,
) -> ApiResult<HttpResponse> {
    user.require(CLOSING)?;
    let appointment = appointments::close(state.db.pool(), id, status).await?;
    Ok(HttpResponse::Ok().json(appointment))
}

/// POST /api/appointments/{id}/cancel
pub async fn cancel(state: web::Data<AppState>, user: AuthUser, path: web::Path<i64>) -> ApiResult<HttpResponse> {
    close_as(state, user, path.into_inner(), AppointmentStatus::Cancelled).await
}

/// POST /api/appointments/{id}/complete
pub async fn complete(state: web::Data<AppState>, user: AuthUser, path: web::Path<i64>) -> ApiResult<HttpResponse> {
    close_as(state, user, path.into_inner(), AppointmentStatus::Completed).await
}

/// POST /api/appointments/{id}/no-show
pub async fn no_show(state: web::Data<AppState>, user: AuthUser, path: web::Path<i64>) -> ApiResult<HttpResponse> {
    close_as(state, user, path.into_inner(), AppointmentStatus::NoShow).await
}
