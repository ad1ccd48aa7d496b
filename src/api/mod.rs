//! HTTP Surface
//! Mission: Assemble the auth, property and payment routers behind one app

pub mod extract;

use crate::{
    auth::{self, AccountStore, AuthState, JwtHandler},
    config::{AppConfig, MAX_TOKEN_TTL_DAYS},
    db::Database,
    error::ApiError,
    middleware::{rate_limit::RateLimitConfig, request_logging, RateLimitLayer},
    payment::{
        api::{self as payment_api, PaymentState},
        PaymentProcessor,
    },
    properties::{api as properties_api, PropertyStore},
};
use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::warn;

pub const API_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Everything the routers share. Immutable after startup.
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthState,
    pub properties: PropertyStore,
    pub payments: PaymentState,
    pub rate_limiter: RateLimitLayer,
    pub cors_origins: Vec<String>,
}

impl AppState {
    pub fn new(
        config: &AppConfig,
        db: Database,
        processor: Option<Arc<dyn PaymentProcessor>>,
    ) -> Self {
        Self::with_accounts(config, AccountStore::new(db.clone()), db, processor)
    }

    /// Same as [`AppState::new`] with a caller-supplied account store
    /// (tests use a cheap bcrypt cost).
    pub fn with_accounts(
        config: &AppConfig,
        accounts: AccountStore,
        db: Database,
        processor: Option<Arc<dyn PaymentProcessor>>,
    ) -> Self {
        let jwt_handler = JwtHandler::with_ttl(
            config.jwt_secret(),
            chrono::Duration::days(config.token_ttl_days.clamp(1, MAX_TOKEN_TTL_DAYS)),
        );

        Self {
            auth: AuthState {
                accounts,
                jwt_handler: Arc::new(jwt_handler),
                expose_reset_token: config.expose_reset_token,
            },
            properties: PropertyStore::new(db),
            payments: PaymentState {
                processor,
                currency: config.payment_currency.clone(),
            },
            rate_limiter: RateLimitLayer::new(RateLimitConfig::per_minute(
                config.auth_rate_limit_per_min,
            )),
            cors_origins: config.cors_origins.clone(),
        }
    }
}

/// Build the full application router.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .nest(
            "/api/auth",
            auth::api::router(state.auth.clone(), state.rate_limiter.clone()),
        )
        .nest(
            "/api/properties",
            properties_api::router(state.properties.clone(), state.auth.clone()),
        )
        .nest(
            "/api/payment",
            payment_api::router(state.payments.clone(), state.auth.clone()),
        );

    Router::new()
        .route("/", get(welcome))
        .route("/health", get(health_check))
        .merge(api)
        .fallback(|| async { ApiError::NotFound("Route") })
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.cors_origins))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) if o != "*" => Some(v),
            _ => {
                warn!("Ignoring unusable CORS origin: {}", o);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

async fn welcome() -> Json<Value> {
    Json(json!({
        "message": "Welcome to RoomBnB API",
        "status": "online",
        "version": API_VERSION,
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": API_VERSION,
    }))
}
