use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::error;

use crate::AppState;

/// GET /health
///
/// Unauthenticated liveness check that also pings the database.
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    match sqlx::query("SELECT 1").execute(state.db.pool()).await {
        Ok(_) => HttpResponse::Ok().json(json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
        })),
        Err(e) => {
            error!(error = %e, "Health check could not reach the database");
            HttpResponse::ServiceUnavailable().json(json!({
                "status": "unavailable",
                "version": env!("CARGO_PKG_VERSION"),
            }))
        }
    }
}
