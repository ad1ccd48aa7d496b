//! RoomBnB Backend Library
//!
//! Exposes the HTTP app and its stores for use by binaries and tests.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod payment;
pub mod properties;

pub use api::{build_router, AppState};
pub use config::AppConfig;
pub use db::Database;
