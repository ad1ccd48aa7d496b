//! JWT Token Handler
//! Mission: Issue and verify session tokens bound to an account

use crate::auth::models::{Account, Claims};
use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use tracing::debug;

/// JWT Handler for token operations
pub struct JwtHandler {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl JwtHandler {
    /// Create a handler with the default 7-day token lifetime
    pub fn new(secret: &str) -> Self {
        Self::with_ttl(secret, Duration::days(7))
    }

    pub fn with_ttl(secret: &str, ttl: Duration) -> Self {
        let mut validation = Validation::default();
        // Expiry is exact; no clock-skew grace period.
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        }
    }

    /// Issue a signed token for an account. Returns the token and its lifetime in seconds.
    pub fn issue(&self, account: &Account) -> Result<(String, usize)> {
        let now = Utc::now();
        let expiration = now
            .checked_add_signed(self.ttl)
            .context("Invalid timestamp")?
            .timestamp()
            .max(0) as usize;

        let claims = Claims {
            sub: account.id.to_string(),
            ver: account.session_epoch,
            iat: now.timestamp() as usize,
            exp: expiration,
        };

        debug!(
            "Issuing JWT for account {}, expires in {}h",
            account.id,
            self.ttl.num_hours()
        );

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .context("Failed to generate JWT")?;

        Ok((token, self.ttl.num_seconds().max(0) as usize))
    }

    /// Verify signature and expiry. Performs no account lookup.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let decoded = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .context("Invalid or expired token")?;

        Ok(decoded.claims)
    }
}
