//! services/api/src/web/extract.rs
//!
//! Request extractors that run `validator` checks before a handler sees the body.

use axum::{
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
    Json,
};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use storefront_core::domain::{is_storable_amount, OrderStatus};
use validator::{Validate, ValidationError};

use crate::error::ApiError;

/// A JSON body that deserialized and passed its `Validate` rules.
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
        value.validate()?;
        Ok(Self(value))
    }
}

/// A query string that deserialized and passed its `Validate` rules.
pub struct ValidatedQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ValidatedQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
        value.validate()?;
        Ok(Self(value))
    }
}

//=========================================================================================
// Shared field rules
//=========================================================================================

fn rule(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

/// Rejects empty or whitespace-only strings.
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(rule("blank", "This field is required"));
    }
    Ok(())
}

/// Prices must fit `NUMERIC(12, 2)`: non-negative, whole cents, at most 9,999,999,999.99.
pub fn storable_price(value: &Decimal) -> Result<(), ValidationError> {
    if !is_storable_amount(value) {
        return Err(rule(
            "price_out_of_range",
            "Must be between 0 and 9999999999.99 with at most two decimals",
        ));
    }
    Ok(())
}

pub fn order_status(value: &str) -> Result<(), ValidationError> {
    value
        .parse::<OrderStatus>()
        .map(|_| ())
        .map_err(|_| rule("unknown_status", "Unknown order status"))
}
