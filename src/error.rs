//! API Error Taxonomy
//! Mission: Map every failure to a short, generic client-facing response

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

/// Errors surfaced at the HTTP boundary.
///
/// Infrastructure code returns `anyhow::Result`; handlers convert with `?`,
/// which lands in [`ApiError::Upstream`] and is rendered as a generic 500.
#[derive(Debug)]
pub enum ApiError {
    DuplicateEmail,
    InvalidCredentials,
    Unauthenticated,
    Forbidden,
    InvalidInput(String),
    NotFound(&'static str),
    InvalidOrExpiredToken,
    /// Payment processor rejected or could not be reached.
    PaymentFailed(anyhow::Error),
    /// Database or other internal failure.
    Upstream(anyhow::Error),
}

impl ApiError {
    pub fn invalid(message: impl Into<String>) -> Self {
        ApiError::InvalidInput(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::DuplicateEmail | ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidOrExpiredToken => StatusCode::BAD_REQUEST,
            ApiError::InvalidCredentials | ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::PaymentFailed(_) => StatusCode::BAD_GATEWAY,
            ApiError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::DuplicateEmail => write!(f, "Email already registered"),
            ApiError::InvalidCredentials => write!(f, "Invalid credentials"),
            ApiError::Unauthenticated => write!(f, "Please authenticate."),
            ApiError::Forbidden => write!(f, "Access denied."),
            ApiError::InvalidInput(msg) => write!(f, "{}", msg),
            ApiError::NotFound(what) => write!(f, "{} not found", what),
            ApiError::InvalidOrExpiredToken => {
                write!(f, "Password reset token is invalid or has expired")
            }
            ApiError::PaymentFailed(_) => write!(f, "Failed to create payment intent"),
            ApiError::Upstream(_) => write!(f, "Internal server error"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Upstream(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Upstream(err) => error!("Internal error: {:#}", err),
            ApiError::PaymentFailed(err) => error!("Payment processor error: {:#}", err),
            _ => {}
        }

        let body = Json(json!({
            "error": self.to_string(),
        }));

        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_statuses() {
        assert_eq!(ApiError::DuplicateEmail.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::InvalidCredentials.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::NotFound("Property").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::InvalidOrExpiredToken.status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_upstream_hides_cause() {
        let err: ApiError = anyhow::anyhow!("disk I/O error at /var/lib/db").into();
        assert_eq!(err.to_string(), "Internal server error");
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_credential_failures_share_minimal_messages() {
        assert_eq!(ApiError::InvalidCredentials.to_string(), "Invalid credentials");
        assert_eq!(ApiError::Unauthenticated.to_string(), "Please authenticate.");
    }
}
