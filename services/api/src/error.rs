//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and how each
//! variant is rendered as an HTTP response.

use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use storefront_core::{CheckoutError, HoldError, PortError};
use utoipa::ToSchema;
use validator::{ValidationErrors, ValidationErrorsKind};

use crate::config::ConfigError;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from the storage port.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    #[error("Checkout failed: {0}")]
    Checkout(#[from] CheckoutError),

    #[error("Hold failed: {0}")]
    Hold(#[from] HoldError),

    /// A request body or query failed schema validation.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents an error from running embedded migrations.
    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// The JSON body of every error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Always `false`; lets catalog clients branch on `success`.
    pub success: bool,
    /// Machine-readable error code.
    pub error: String,
    pub message: String,
    /// Per-field messages, present for validation failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<BTreeMap<String, Vec<String>>>,
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Port(e)
            | Self::Checkout(CheckoutError::Port(e))
            | Self::Hold(HoldError::Port(e)) => port_status(e),
            Self::Checkout(CheckoutError::EmptyCart) | Self::Hold(HoldError::EmptyCart) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "empty_cart")
            }
            Self::Checkout(CheckoutError::PaymentMethodRequired) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "payment_method_required")
            }
            Self::Checkout(CheckoutError::AddressRequired) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "address_required")
            }
            Self::Checkout(CheckoutError::InvalidProductId(_)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "invalid_product_id")
            }
            Self::Checkout(CheckoutError::TotalOutOfRange) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "total_out_of_range")
            }
            Self::Hold(HoldError::SignInRequired) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "sign_in_required")
            }
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_failed"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            Self::Config(_)
            | Self::Database(_)
            | Self::Migration(_)
            | Self::Io(_)
            | Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        }
    }

    /// The message shown to clients. Internal details stay in the logs.
    fn public_message(&self) -> String {
        match self {
            Self::Port(PortError::Unexpected(_))
            | Self::Checkout(CheckoutError::Port(PortError::Unexpected(_)))
            | Self::Hold(HoldError::Port(PortError::Unexpected(_)))
            | Self::Config(_)
            | Self::Database(_)
            | Self::Migration(_)
            | Self::Io(_)
            | Self::Internal(_) => "Something went wrong. Please try again.".to_string(),
            Self::Port(e) => e.to_string(),
            Self::Checkout(e) => e.to_string(),
            Self::Hold(e) => e.to_string(),
            Self::Validation(_) => "Request validation failed".to_string(),
            Self::BadRequest(m) | Self::Unauthorized(m) | Self::Forbidden(m) => m.clone(),
        }
    }
}

fn port_status(error: &PortError) -> (StatusCode, &'static str) {
    match error {
        PortError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
        PortError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
        PortError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
        PortError::Unexpected(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, %status, "Request rejected");
        }

        let fields = match &self {
            Self::Validation(errors) => {
                let mut out = BTreeMap::new();
                flatten_validation_errors(errors, "", &mut out);
                Some(out)
            }
            _ => None,
        };

        let body = ErrorBody {
            success: false,
            error: code.to_string(),
            message: self.public_message(),
            fields,
        };
        (status, Json(body)).into_response()
    }
}

/// Flattens nested validation errors into `path.to[0].field` keys.
fn flatten_validation_errors(
    errors: &ValidationErrors,
    prefix: &str,
    out: &mut BTreeMap<String, Vec<String>>,
) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                let messages = list.iter().map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string())
                });
                out.entry(path).or_default().extend(messages);
            }
            ValidationErrorsKind::Struct(inner) => flatten_validation_errors(inner, &path, out),
            ValidationErrorsKind::List(items) => {
                for (idx, inner) in items {
                    flatten_validation_errors(inner, &format!("{path}[{idx}]"), out);
                }
            }
        }
    }
}

/// Convenience alias for handler results.
pub type ApiResult<T> = Result<T, ApiError>;
