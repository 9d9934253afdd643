//! services/api/src/web/contact.rs

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storefront_core::domain::NewContactMessage;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiResult;
use crate::web::extract::{not_blank, ValidatedJson};
use crate::web::state::AppState;

#[derive(Deserialize, Validate, ToSchema)]
pub struct ContactRequest {
    #[validate(custom(function = "not_blank"))]
    pub name: String,
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    #[validate(length(max = 200, message = "Subject is too long"))]
    pub subject: Option<String>,
    #[validate(
        custom(function = "not_blank"),
        length(max = 5000, message = "Message is too long")
    )]
    pub message: String,
}

#[derive(Serialize, ToSchema)]
pub struct ContactResponse {
    pub message: String,
    pub id: Uuid,
}

/// Store a message from the contact form.
#[utoipa::path(
    post,
    path = "/api/contact",
    request_body = ContactRequest,
    responses(
        (status = 201, description = "Message received", body = ContactResponse),
        (status = 422, description = "Invalid fields", body = crate::error::ErrorBody)
    )
)]
pub async fn contact_handler(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<ContactRequest>,
) -> ApiResult<(StatusCode, Json<ContactResponse>)> {
    let saved = state
        .db
        .save_contact_message(NewContactMessage {
            name: req.name.trim().to_string(),
            email: req.email.trim().to_string(),
            subject: req
                .subject
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            message: req.message.trim().to_string(),
        })
        .await?;
    info!(contact_message_id = %saved.id, "Contact message received");

    Ok((
        StatusCode::CREATED,
        Json(ContactResponse {
            message: "Thanks for getting in touch".to_string(),
            id: saved.id,
        }),
    ))
}
