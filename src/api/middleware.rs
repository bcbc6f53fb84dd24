//! Request authentication
//!
//! `AuthUser` is an extractor: any handler that takes one requires a valid
//! bearer token for an active account. Role checks happen per route with
//! [`AuthUser::require`].

use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use futures::future::LocalBoxFuture;
use tracing::{debug, warn};

use crate::auth::{is_allowed, Role};
use crate::db::queries::users;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// The authenticated caller
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
    pub role: Role,
}

impl AuthUser {
    /// Role allow-list check applied by each route
    pub fn require(&self, allowed: &[Role]) -> ApiResult<()> {
        if is_allowed(self.role, allowed) {
            Ok(())
        } else {
            debug!(user = %self.username, role = %self.role, "Role not allowed for route");
            Err(ApiError::Forbidden(format!(
                "role '{}' is not allowed to perform this action",
                self.role
            )))
        }
    }

    pub fn is(&self, role: Role) -> bool {
        self.role == role
    }
}

fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<AppState>>().cloned();
        let token = bearer_token(req);

        Box::pin(async move {
            let state = state.ok_or_else(|| ApiError::Internal("application state is not configured".into()))?;
            let token = token.ok_or_else(|| ApiError::Unauthorized("missing bearer token".into()))?;

            let claims = state.tokens.verify(&token)?;
            let user_id: i64 = claims
                .sub
                .parse()
                .map_err(|_| ApiError::Unauthorized("invalid token".into()))?;

            // The stored role wins over the claim so role changes and
            // deactivation apply to tokens already issued
            let user = users::find_by_id(state.db.pool(), user_id).await?;
            match user {
                Some(user) if user.is_active => Ok(AuthUser {
                    id: user.id,
                    username: user.username,
                    role: user.role,
                }),
                _ => {
                    warn!(user_id, "Token presented for missing or inactive account");
                    Err(ApiError::Unauthorized("account is not active".into()))
                }
            }
        })
    }
}
