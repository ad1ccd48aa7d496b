//! Payment API Endpoints
//! Mission: Turn a checkout amount into a client secret for the browser

use crate::{
    api::extract::{Validate, ValidatedJson},
    auth::{auth_middleware, AuthContext, AuthState},
    error::ApiError,
    payment::PaymentProcessor,
};
use axum::{extract::State, middleware, routing::post, Extension, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct PaymentState {
    /// `None` when no processor key is configured
    pub processor: Option<Arc<dyn PaymentProcessor>>,
    pub currency: String,
}

#[derive(Debug, Deserialize)]
pub struct CreatePaymentIntentRequest {
    #[serde(default)]
    pub amount: serde_json::Value,
}

impl CreatePaymentIntentRequest {
    /// Amount rounded to whole minor units.
    pub fn amount_minor(&self) -> Result<i64, ApiError> {
        let amount = self
            .amount
            .as_f64()
            .filter(|a| a.is_finite() && *a > 0.0)
            .ok_or_else(|| ApiError::invalid("Invalid amount"))?;

        let rounded = amount.round();
        if rounded < 1.0 || rounded > i64::MAX as f64 {
            return Err(ApiError::invalid("Invalid amount"));
        }
        Ok(rounded as i64)
    }
}

impl Validate for CreatePaymentIntentRequest {
    fn validate(&self) -> Result<(), ApiError> {
        self.amount_minor().map(|_| ())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentIntentResponse {
    pub client_secret: String,
}

/// Build the `/api/payment` router. Every route requires a token.
pub fn router(state: PaymentState, auth: AuthState) -> Router {
    Router::new()
        .route("/create-payment-intent", post(create_payment_intent))
        .route_layer(middleware::from_fn_with_state(auth, auth_middleware))
        .with_state(state)
}

/// Create intent - POST /api/payment/create-payment-intent
pub async fn create_payment_intent(
    State(state): State<PaymentState>,
    Extension(ctx): Extension<AuthContext>,
    ValidatedJson(payload): ValidatedJson<CreatePaymentIntentRequest>,
) -> Result<Json<CreatePaymentIntentResponse>, ApiError> {
    let amount = payload.amount_minor()?;

    let processor = state.processor.as_ref().ok_or_else(|| {
        ApiError::Upstream(anyhow::anyhow!("Payment processor is not configured"))
    })?;

    let intent = processor
        .create_payment_intent(amount, &state.currency, ctx.account_id)
        .await
        .map_err(ApiError::PaymentFailed)?;

    info!(
        "Payment intent {} created for account {} ({} {})",
        intent.id, ctx.account_id, amount, state.currency
    );

    Ok(Json(CreatePaymentIntentResponse {
        client_secret: intent.client_secret,
    }))
}
