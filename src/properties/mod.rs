//! Property Listings
//! Mission: Rental listings with public search and host-owned writes

pub mod api;
pub mod models;
pub mod store;

pub use models::{PropertyFilter, PropertyView};
pub use store::PropertyStore;
