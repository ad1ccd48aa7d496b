//! RoomBnB API Server
//! Mission: Accounts, listings and payment intents for a vacation rental site

use anyhow::{Context, Result};
use dotenv::dotenv;
use roombnb_backend::{
    auth::AccountStore,
    build_router,
    payment::{PaymentProcessor, StripeClient},
    AppConfig, AppState, Database,
};
use std::{net::SocketAddr, path::Path, sync::Arc, time::Duration};
use tokio::{net::TcpListener, time::interval};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    load_env();
    init_tracing();

    let config = AppConfig::load()?;
    info!("🏠 RoomBnB API starting (v{})", env!("CARGO_PKG_VERSION"));

    if config.uses_dev_secret() {
        warn!("JWT_SECRET is not set; using the development signing secret");
    }
    if config.expose_reset_token {
        warn!("EXPOSE_RESET_TOKEN is on; reset tokens are returned to clients");
    }

    let db = Database::open(&config.db_path)?;
    info!("📊 Database initialized at: {}", config.db_path);

    if let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) {
        AccountStore::new(db.clone())
            .ensure_admin(email, password)
            .await
            .context("Failed to bootstrap admin account")?;
    }

    let processor: Option<Arc<dyn PaymentProcessor>> = match &config.stripe_secret_key {
        Some(key) => Some(Arc::new(StripeClient::with_base_url(
            key,
            &config.stripe_api_base,
        )?)),
        None => {
            warn!("STRIPE_SECRET_KEY is not set; payment intents will fail");
            None
        }
    };

    let state = AppState::new(&config, db, processor);

    let limiter = state.rate_limiter.clone();
    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(60));
        loop {
            ticker.tick().await;
            limiter.cleanup();
        }
    });

    let app = build_router(state);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("🎯 API server listening on {}", config.bind_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roombnb_backend=debug,roombnb=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_env() {
    // Standard dotenv search (cwd + parents), then the crate's own .env
    let _ = dotenv();

    let manifest_env = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    if manifest_env.exists() {
        let _ = dotenv::from_path(&manifest_env);
    }
}
