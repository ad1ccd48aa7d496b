//! Stripe REST Client
//!
//! Only the payment intent endpoint is used; confirmation happens client-side.

use crate::payment::{PaymentIntent, PaymentProcessor};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

pub const STRIPE_API_BASE: &str = "https://api.stripe.com";

#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

impl StripeClient {
    pub fn new(secret_key: &str) -> Result<Self> {
        Self::with_base_url(secret_key, STRIPE_API_BASE)
    }

    pub fn with_base_url(secret_key: &str, base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .pool_idle_timeout(Duration::from_secs(90))
            .default_headers({
                let mut headers = reqwest::header::HeaderMap::new();
                headers.insert(
                    reqwest::header::AUTHORIZATION,
                    format!("Bearer {}", secret_key)
                        .parse()
                        .context("Invalid Stripe secret key")?,
                );
                headers
            })
            .build()
            .context("Failed to build StripeClient")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    #[inline]
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl PaymentProcessor for StripeClient {
    async fn create_payment_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        account_id: Uuid,
    ) -> Result<PaymentIntent> {
        let form = [
            ("amount", amount_minor.to_string()),
            ("currency", currency.to_string()),
            ("automatic_payment_methods[enabled]", "true".to_string()),
            ("metadata[userId]", account_id.to_string()),
        ];

        let resp = self
            .client
            .post(self.url("/v1/payment_intents"))
            .form(&form)
            .send()
            .await
            .context("POST /v1/payment_intents failed")?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<StripeErrorBody>(&text)
                .ok()
                .and_then(|b| {
                    let kind = b.error.kind.unwrap_or_default();
                    b.error.message.map(|m| format!("{} ({})", m, kind))
                })
                .unwrap_or(text);
            warn!("Stripe rejected payment intent: {} {}", status, detail);
            return Err(anyhow::anyhow!(
                "POST /v1/payment_intents {}: {}",
                status,
                detail
            ));
        }

        let intent = resp
            .json::<PaymentIntent>()
            .await
            .context("Failed to parse payment intent")?;

        debug!(
            "Created payment intent {} for {} {} ({})",
            intent.id, amount_minor, currency, account_id
        );
        Ok(intent)
    }
}
