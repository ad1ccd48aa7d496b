//! Application Configuration
//! Mission: Build one immutable config object at startup, from TOML and env

use anyhow::{Context, Result};
use serde::Deserialize;
use std::{env, fs, path::Path};

/// Signing secret used when `JWT_SECRET` is not configured. Development only.
pub const DEV_JWT_SECRET: &str = "dev-secret-change-in-production-minimum-32-characters";

/// Upper bound for session token lifetime
pub const MAX_TOKEN_TTL_DAYS: i64 = 3650;

/// Runtime configuration, constructed once in `main` and shared by reference.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Socket address the API binds to
    pub bind_addr: String,
    /// SQLite database file
    pub db_path: String,
    pub jwt_secret: Option<String>,
    /// Session token lifetime
    pub token_ttl_days: i64,
    pub stripe_secret_key: Option<String>,
    pub stripe_api_base: String,
    /// ISO currency code for payment intents
    pub payment_currency: String,
    /// Echo password reset tokens in the forgot-password response (dev mode)
    pub expose_reset_token: bool,
    pub cors_origins: Vec<String>,
    /// Requests per minute per IP on the unauthenticated credential endpoints
    pub auth_rate_limit_per_min: u32,
    /// Optional bootstrap admin account
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5000".to_string(),
            db_path: "roombnb.db".to_string(),
            jwt_secret: None,
            token_ttl_days: 7,
            stripe_secret_key: None,
            stripe_api_base: "https://api.stripe.com".to_string(),
            payment_currency: "usd".to_string(),
            expose_reset_token: false,
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "https://roombnb.vercel.app".to_string(),
            ],
            auth_rate_limit_per_min: 30,
            admin_email: None,
            admin_password: None,
        }
    }
}

impl AppConfig {
    /// Load config: optional TOML file named by `ROOMBNB_CONFIG`, then env overrides.
    pub fn load() -> Result<Self> {
        let mut config = match env::var("ROOMBNB_CONFIG") {
            Ok(path) if !path.trim().is_empty() => Self::from_file(Path::new(&path))?,
            _ => Self::default(),
        };
        config.apply_overrides(|key| env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Apply environment-style overrides. `lookup` returns the raw value for a key.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(port) = get("PORT") {
            let port: u16 = port.trim().parse().context("Invalid PORT")?;
            self.bind_addr = format!("0.0.0.0:{}", port);
        }
        if let Some(addr) = get("BIND_ADDR") {
            self.bind_addr = addr;
        }
        if let Some(path) = get("DB_PATH").or_else(|| get("DATABASE_PATH")) {
            self.db_path = path;
        }
        if let Some(secret) = get("JWT_SECRET") {
            self.jwt_secret = Some(secret);
        }
        if let Some(days) = get("TOKEN_TTL_DAYS") {
            self.token_ttl_days = days.trim().parse().context("Invalid TOKEN_TTL_DAYS")?;
        }
        if let Some(key) = get("STRIPE_SECRET_KEY") {
            self.stripe_secret_key = Some(key);
        }
        if let Some(base) = get("STRIPE_API_BASE") {
            self.stripe_api_base = base;
        }
        if let Some(currency) = get("PAYMENT_CURRENCY") {
            self.payment_currency = currency.to_ascii_lowercase();
        }
        if let Some(flag) = get("EXPOSE_RESET_TOKEN") {
            self.expose_reset_token = matches!(flag.as_str(), "1" | "true" | "TRUE" | "on" | "ON");
        }
        if let Some(origins) = get("CORS_ORIGINS") {
            self.cors_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
        if let Some(limit) = get("AUTH_RATE_LIMIT_PER_MIN") {
            self.auth_rate_limit_per_min = limit
                .trim()
                .parse()
                .context("Invalid AUTH_RATE_LIMIT_PER_MIN")?;
        }
        if let Some(email) = get("ADMIN_EMAIL") {
            self.admin_email = Some(email);
        }
        if let Some(password) = get("ADMIN_PASSWORD") {
            self.admin_password = Some(password);
        }

        if !(1..=MAX_TOKEN_TTL_DAYS).contains(&self.token_ttl_days) {
            anyhow::bail!(
                "TOKEN_TTL_DAYS must be between 1 and {}",
                MAX_TOKEN_TTL_DAYS
            );
        }

        Ok(())
    }

    /// Signing secret, falling back to [`DEV_JWT_SECRET`].
    pub fn jwt_secret(&self) -> &str {
        self.jwt_secret.as_deref().unwrap_or(DEV_JWT_SECRET)
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret.is_none()
    }
}
