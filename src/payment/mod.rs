//! Payments
//! Mission: Create card payment intents with an external processor

pub mod api;
pub mod stripe;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use stripe::StripeClient;

/// A processor-side intent the browser confirms with its client secret
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
}

#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// `amount_minor` is in the currency's smallest unit (cents for usd).
    async fn create_payment_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        account_id: Uuid,
    ) -> Result<PaymentIntent>;
}
