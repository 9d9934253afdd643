//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for user signup, login, and logout, and the
//! profile endpoints for the signed-in user.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storefront_core::domain::{NewUser, ProfileUpdate, User};
use storefront_core::ports::PortError;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::web::extract::{not_blank, ValidatedJson};
use crate::web::cart::clear_session_cart;
use crate::web::middleware::{cookie_value, set_cookie, AuthUser, AUTH_COOKIE};
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[validate(custom(function = "not_blank"))]
    pub name: String,
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(length(min = 7, max = 20, message = "Enter a valid mobile number"))]
    pub mobile_number: Option<String>,
}

#[derive(Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(custom(function = "not_blank"))]
    pub name: Option<String>,
    #[validate(length(min = 7, max = 20, message = "Enter a valid mobile number"))]
    pub mobile_number: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub mobile_number: Option<String>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            user_id: user.user_id,
            name: user.name,
            email: user.email,
            mobile_number: user.mobile_number,
        }
    }
}

//=========================================================================================
// Helpers
//=========================================================================================

fn hash_password(password: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            ApiError::Internal("Failed to hash password".to_string())
        })
}

fn verify_password(password: &str, hashed: &str) -> ApiResult<bool> {
    let parsed_hash = PasswordHash::new(hashed).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        ApiError::Internal("Authentication error".to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Creates a session row and returns the matching `Set-Cookie` value.
async fn start_session(state: &AppState, user_id: Uuid) -> ApiResult<String> {
    let auth_session_id = Uuid::new_v4().to_string();
    let ttl = Duration::days(state.config.session_ttl_days);
    state
        .db
        .create_auth_session(&auth_session_id, user_id, Utc::now() + ttl)
        .await?;
    Ok(set_cookie(AUTH_COOKIE, &auth_session_id, ttl.num_seconds()))
}

fn invalid_credentials() -> ApiError {
    ApiError::Unauthorized("Invalid email or password".to_string())
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /api/auth/signup - Create a new user account
#[utoipa::path(
    post,
    path = "/api/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created successfully", body = UserResponse),
        (status = 409, description = "Email already registered", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid fields", body = crate::error::ErrorBody)
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<SignupRequest>,
) -> ApiResult<impl IntoResponse> {
    let hashed_password = hash_password(&req.password)?;

    let user = state
        .db
        .create_user(NewUser {
            name: req.name.trim().to_string(),
            email: req.email,
            hashed_password: Some(hashed_password),
            mobile_number: req.mobile_number,
        })
        .await?;
    info!(user_id = %user.user_id, "User signed up");

    let cookie = start_session(&state, user.user_id).await?;
    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(UserResponse::from(user)),
    ))
}

/// POST /api/auth/login - Login with existing account
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = UserResponse),
        (status = 401, description = "Invalid credentials", body = crate::error::ErrorBody)
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let creds = match state.db.get_user_by_email(&req.email).await {
        Ok(creds) => creds,
        Err(PortError::NotFound(_)) => return Err(invalid_credentials()),
        Err(e) => return Err(e.into()),
    };

    // Accounts created through an external provider have no password to check.
    let Some(hashed) = creds.hashed_password.as_deref() else {
        return Err(invalid_credentials());
    };
    if !verify_password(&req.password, hashed)? {
        return Err(invalid_credentials());
    }

    let user = state.db.get_user_by_id(creds.user_id).await?;
    let cookie = start_session(&state, user.user_id).await?;
    info!(user_id = %user.user_id, "User logged in");

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(UserResponse::from(user)),
    ))
}

/// POST /api/auth/logout - Logout, invalidate the session and empty the cart
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session", body = crate::error::ErrorBody)
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    let auth_session_id = cookie_value(&headers, AUTH_COOKIE)
        .ok_or_else(|| ApiError::Unauthorized("No session found".to_string()))?;

    state.db.delete_auth_session(auth_session_id).await?;

    // Signing out should not pop a "cart cleared" notice.
    clear_session_cart(&state, &headers).await;

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, set_cookie(AUTH_COOKIE, "", 0))],
    ))
}

/// GET /api/users/me - The signed-in user's profile
#[utoipa::path(
    get,
    path = "/api/users/me",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Not signed in", body = crate::error::ErrorBody)
    )
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<UserResponse>> {
    let user = state.db.get_user_by_id(auth.user_id).await?;
    Ok(Json(user.into()))
}

/// PUT /api/users/me - Update name or mobile number
#[utoipa::path(
    put,
    path = "/api/users/me",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated user", body = UserResponse),
        (status = 422, description = "Invalid fields", body = crate::error::ErrorBody)
    )
)]
pub async fn update_me_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ValidatedJson(req): ValidatedJson<UpdateProfileRequest>,
) -> ApiResult<Json<UserResponse>> {
    let user = state
        .db
        .update_user_profile(
            auth.user_id,
            ProfileUpdate {
                name: req.name.map(|n| n.trim().to_string()),
                mobile_number: req.mobile_number,
            },
        )
        .await?;
    Ok(Json(user.into()))
}
