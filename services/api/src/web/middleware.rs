//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes, plus the cookie helpers
//! shared by the auth and cart handlers.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::state::AppState;

/// Cookie carrying the auth session token.
pub const AUTH_COOKIE: &str = "session";

/// Cookie identifying the browser's cart.
pub const CART_COOKIE: &str = "cart_session";

/// The signed-in user, inserted into request extensions by [`require_auth`].
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub session_id: String,
}

/// Reads one cookie value from the request headers.
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|c| {
            let (key, value) = c.trim().split_once('=')?;
            (key == name && !value.is_empty()).then_some(value)
        })
}

/// Builds a `Set-Cookie` value for an HttpOnly cookie.
pub fn set_cookie(name: &str, value: &str, max_age_secs: i64) -> String {
    format!("{name}={value}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={max_age_secs}")
}

/// Middleware that validates the auth session cookie and extracts the user.
///
/// If valid, inserts an [`AuthUser`] into request extensions for handlers to use.
/// If invalid or missing, returns 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(session_id) = cookie_value(req.headers(), AUTH_COOKIE).map(str::to_string) else {
        return ApiError::Unauthorized("Sign in required".to_string()).into_response();
    };

    let user_id = match state.db.validate_auth_session(&session_id).await {
        Ok(user_id) => user_id,
        Err(e) => {
            warn!("Rejected auth session: {}", e);
            return ApiError::Unauthorized("Session is invalid or expired".to_string())
                .into_response();
        }
    };

    req.extensions_mut().insert(AuthUser {
        user_id,
        session_id,
    });

    next.run(req).await
}
