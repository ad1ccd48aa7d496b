//! Property Seeder
//!
//! Loads a handful of sample listings, owned by a seed host account.
//!
//! Usage:
//!   cargo run --bin seed_properties -- --db-path ./roombnb.db
//!   cargo run --bin seed_properties -- --db-path ./roombnb.db --keep-existing

use anyhow::{Context, Result};
use clap::Parser;
use roombnb_backend::{
    auth::{AccountStore, Role},
    properties::{
        models::{Coordinates, Location, NewProperty},
        PropertyStore,
    },
    Database,
};
use tracing::info;

/// Seed the RoomBnB database with sample listings
#[derive(Parser, Debug)]
#[command(name = "seed_properties")]
struct Cli {
    /// Path to the SQLite database
    #[arg(short, long, env = "DB_PATH", default_value = "roombnb.db")]
    db_path: String,

    /// Email of the account that will own the listings
    #[arg(long, default_value = "host@example.com")]
    host_email: String,

    /// Password used if the host account has to be created
    #[arg(long, default_value = "password123")]
    host_password: String,

    /// Append instead of clearing existing listings first
    #[arg(long)]
    keep_existing: bool,
}

struct Sample {
    title: &'static str,
    description: &'static str,
    city: &'static str,
    lat: f64,
    lng: f64,
    price: f64,
    image: &'static str,
    amenities: &'static [&'static str],
    max_guests: u32,
    bedrooms: u32,
    bathrooms: u32,
    rating: f64,
}

const SAMPLES: &[Sample] = &[
    Sample {
        title: "Luxury Beachfront Villa",
        description: "Stunning beachfront villa with panoramic ocean views, private pool, and modern amenities. Perfect for a luxurious getaway.",
        city: "Miami",
        lat: 25.7617,
        lng: -80.1918,
        price: 450.0,
        image: "https://images.unsplash.com/photo-1613490493576-7fde63acd811?auto=format&fit=crop&w=1471&q=80",
        amenities: &["Pool", "WiFi", "Air Conditioning", "Kitchen", "Beach Access", "Parking"],
        max_guests: 8,
        bedrooms: 4,
        bathrooms: 3,
        rating: 4.8,
    },
    Sample {
        title: "Cozy Mountain Cabin",
        description: "Charming cabin nestled in the mountains, featuring a wood-burning fireplace, hot tub, and breathtaking views.",
        city: "Denver",
        lat: 39.7392,
        lng: -104.9903,
        price: 250.0,
        image: "https://images.unsplash.com/photo-1523217582562-09d0def993a6?auto=format&fit=crop&w=1480&q=80",
        amenities: &["Fireplace", "Hot Tub", "WiFi", "Kitchen", "Hiking Trails", "Parking"],
        max_guests: 6,
        bedrooms: 3,
        bathrooms: 2,
        rating: 4.9,
    },
    Sample {
        title: "Modern City Apartment",
        description: "Stylish apartment in the heart of the city, close to restaurants, shopping, and public transportation.",
        city: "New York",
        lat: 40.7128,
        lng: -74.0060,
        price: 200.0,
        image: "https://images.unsplash.com/photo-1522708323590-d24dbb6b0267?auto=format&fit=crop&w=1470&q=80",
        amenities: &["WiFi", "Air Conditioning", "Gym Access", "Doorman", "Parking"],
        max_guests: 4,
        bedrooms: 2,
        bathrooms: 2,
        rating: 4.7,
    },
    Sample {
        title: "Seaside Cottage",
        description: "Quaint cottage steps from the beach, featuring a private garden and outdoor dining area.",
        city: "San Diego",
        lat: 32.7157,
        lng: -117.1611,
        price: 175.0,
        image: "https://images.unsplash.com/photo-1564013799919-ab600027ffc6?auto=format&fit=crop&w=1470&q=80",
        amenities: &["Garden", "WiFi", "Kitchen", "Beach Access", "BBQ Grill"],
        max_guests: 4,
        bedrooms: 2,
        bathrooms: 1,
        rating: 4.6,
    },
    Sample {
        title: "Luxury Penthouse Suite",
        description: "Exclusive penthouse with panoramic city views, private terrace, and high-end finishes throughout.",
        city: "Los Angeles",
        lat: 34.0522,
        lng: -118.2437,
        price: 600.0,
        image: "https://images.unsplash.com/photo-1600607687939-ce8a6c25118c?auto=format&fit=crop&w=1453&q=80",
        amenities: &["Terrace", "Pool", "Gym", "Concierge", "Parking", "Air Conditioning"],
        max_guests: 6,
        bedrooms: 3,
        bathrooms: 3,
        rating: 4.9,
    },
];

impl Sample {
    fn to_new_property(&self) -> NewProperty {
        NewProperty {
            title: self.title.to_string(),
            description: self.description.to_string(),
            location: Location {
                city: self.city.to_string(),
                country: "USA".to_string(),
                coordinates: Coordinates {
                    lat: self.lat,
                    lng: self.lng,
                },
            },
            price: self.price,
            images: vec![self.image.to_string()],
            amenities: self.amenities.iter().map(|a| a.to_string()).collect(),
            max_guests: self.max_guests,
            bedrooms: self.bedrooms,
            bathrooms: self.bathrooms,
            rating: Some(self.rating),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roombnb_backend=info,seed_properties=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let db = Database::open(&cli.db_path)?;
    let accounts = AccountStore::new(db.clone());
    let properties = PropertyStore::new(db);

    let host = match accounts.find_by_email(&cli.host_email).await? {
        Some(account) if account.role == Role::Host || account.role == Role::Admin => account,
        Some(account) => accounts
            .update_role(account.id, Role::Host)
            .await?
            .context("Seed host vanished")?,
        None => {
            let account = accounts
                .create(
                    &cli.host_email,
                    &cli.host_password,
                    "John",
                    "Doe",
                    Some(Role::Host.as_str()),
                )
                .await?;
            info!("Created host account {}", cli.host_email);
            account
        }
    };

    if !cli.keep_existing {
        properties.clear().await?;
    }

    for sample in SAMPLES {
        let view = properties.create(host.id, sample.to_new_property()).await?;
        info!("Seeded {} ({})", view.property.title, view.property.id);
    }

    info!("Seeding completed: {} listings", SAMPLES.len());
    Ok(())
}
