//! Request extractors.

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::ApiError;

/// Boundary validation for request bodies.
pub trait Validate {
    fn validate(&self) -> Result<(), ApiError>;
}

/// JSON body that is deserialized and then validated.
///
/// Malformed JSON, missing fields and failed validation all map to
/// [`ApiError::InvalidInput`] so clients always get a 400 with a JSON body.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|e| {
            debug!("Rejected request body: {}", e.body_text());
            ApiError::invalid("Invalid request body")
        })?;

        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

/// Fails with `InvalidInput` when `value` is blank.
pub fn require_non_empty(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::invalid(format!("{} is required", field)));
    }
    Ok(())
}
