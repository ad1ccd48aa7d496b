//! Property Storage
//! Mission: Listing CRUD and filtered search over SQLite

use crate::{
    db::{timestamp, Database},
    properties::models::{
        Coordinates, HostSummary, Location, NewProperty, Property, PropertyFilter, PropertyPatch,
        PropertyView,
    },
};
use anyhow::{Context, Result};
use rusqlite::{params, params_from_iter, types::Value, Connection, OptionalExtension, Row};
use serde::de::DeserializeOwned;
use tracing::{debug, info};
use uuid::Uuid;

const SELECT_VIEW: &str = "SELECT p.id, p.title, p.description, p.city, p.country, p.lat, p.lng,
        p.price, p.images_json, p.amenities_json, p.host_id, p.max_guests, p.bedrooms,
        p.bathrooms, p.rating, p.reviews_json, p.created_at, p.updated_at,
        a.first_name, a.last_name, a.email
    FROM properties p
    JOIN accounts a ON a.id = p.host_id";

#[derive(Clone)]
pub struct PropertyStore {
    db: Database,
}

impl PropertyStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Listings matching every present filter, newest first.
    pub async fn list(&self, filter: &PropertyFilter) -> Result<Vec<PropertyView>> {
        let mut conditions: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(city) = &filter.city {
            conditions.push("p.city = ?");
            values.push(Value::Text(city.clone()));
        }
        if let Some(country) = &filter.country {
            conditions.push("p.country = ?");
            values.push(Value::Text(country.clone()));
        }
        if let Some(min) = filter.min_price {
            conditions.push("p.price >= ?");
            values.push(Value::Real(min));
        }
        if let Some(max) = filter.max_price {
            conditions.push("p.price <= ?");
            values.push(Value::Real(max));
        }
        if let Some(guests) = filter.min_guests {
            conditions.push("p.max_guests >= ?");
            values.push(Value::Real(guests));
        }
        if let Some(bedrooms) = filter.min_bedrooms {
            conditions.push("p.bedrooms >= ?");
            values.push(Value::Real(bedrooms));
        }
        if let Some(bathrooms) = filter.min_bathrooms {
            conditions.push("p.bathrooms >= ?");
            values.push(Value::Real(bathrooms));
        }

        let mut sql = SELECT_VIEW.to_string();
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        sql.push_str(" ORDER BY p.created_at DESC, p.rowid DESC");

        let conn = self.db.conn().await;
        let mut stmt = conn.prepare(&sql)?;
        let views = stmt
            .query_map(params_from_iter(values), row_to_view)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to list properties")?;

        debug!("Found {} properties for {:?}", views.len(), filter);
        Ok(views)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<PropertyView>> {
        let conn = self.db.conn().await;
        load_view(&conn, id)
    }

    /// Host reference of a listing, for ownership checks.
    pub async fn host_of(&self, id: Uuid) -> Result<Option<Uuid>> {
        let conn = self.db.conn().await;
        let host: Option<String> = conn
            .query_row(
                "SELECT host_id FROM properties WHERE id = ?1",
                params![id.to_string()],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to load property host")?;

        host.map(|h| Uuid::parse_str(&h).context("Corrupt host id"))
            .transpose()
    }

    pub async fn create(&self, host_id: Uuid, input: NewProperty) -> Result<PropertyView> {
        let now = timestamp();
        let property = Property {
            id: Uuid::new_v4(),
            title: input.title.trim().to_string(),
            description: input.description,
            location: input.location,
            price: input.price,
            images: input.images,
            amenities: input.amenities,
            host_id,
            max_guests: input.max_guests,
            bedrooms: input.bedrooms,
            bathrooms: input.bathrooms,
            rating: input.rating.unwrap_or(0.0),
            reviews: Vec::new(),
            created_at: now.clone(),
            updated_at: now,
        };

        let conn = self.db.conn().await;
        conn.execute(
            "INSERT INTO properties (id, title, description, city, country, lat, lng, price,
                images_json, amenities_json, host_id, max_guests, bedrooms, bathrooms, rating,
                reviews_json, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
            params![
                property.id.to_string(),
                property.title,
                property.description,
                property.location.city,
                property.location.country,
                property.location.coordinates.lat,
                property.location.coordinates.lng,
                property.price,
                serde_json::to_string(&property.images)?,
                serde_json::to_string(&property.amenities)?,
                property.host_id.to_string(),
                property.max_guests,
                property.bedrooms,
                property.bathrooms,
                property.rating,
                serde_json::to_string(&property.reviews)?,
                property.created_at,
                property.updated_at,
            ],
        )
        .context("Failed to insert property")?;

        info!("Created property {} for host {}", property.id, host_id);
        load_view(&conn, property.id)?.context("Inserted property vanished")
    }

    /// Apply a partial update. The host reference is never changed.
    pub async fn update(&self, id: Uuid, patch: PropertyPatch) -> Result<Option<PropertyView>> {
        let conn = self.db.conn().await;
        let Some(mut view) = load_view(&conn, id)? else {
            return Ok(None);
        };

        patch.apply(&mut view.property);
        let p = &view.property;

        conn.execute(
            "UPDATE properties
             SET title = ?1, description = ?2, city = ?3, country = ?4, lat = ?5, lng = ?6,
                 price = ?7, images_json = ?8, amenities_json = ?9, max_guests = ?10,
                 bedrooms = ?11, bathrooms = ?12, rating = ?13, updated_at = ?14
             WHERE id = ?15",
            params![
                p.title,
                p.description,
                p.location.city,
                p.location.country,
                p.location.coordinates.lat,
                p.location.coordinates.lng,
                p.price,
                serde_json::to_string(&p.images)?,
                serde_json::to_string(&p.amenities)?,
                p.max_guests,
                p.bedrooms,
                p.bathrooms,
                p.rating,
                timestamp(),
                id.to_string(),
            ],
        )
        .context("Failed to update property")?;

        info!("Updated property {}", id);
        load_view(&conn, id)
    }

    /// Returns false when no such property exists.
    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let conn = self.db.conn().await;
        let deleted = conn
            .execute(
                "DELETE FROM properties WHERE id = ?1",
                params![id.to_string()],
            )
            .context("Failed to delete property")?;

        if deleted > 0 {
            info!("Deleted property {}", id);
        }
        Ok(deleted > 0)
    }

    /// Remove every listing. Used when reseeding.
    pub async fn clear(&self) -> Result<usize> {
        let conn = self.db.conn().await;
        let removed = conn
            .execute("DELETE FROM properties", [])
            .context("Failed to clear properties")?;
        info!("Cleared {} properties", removed);
        Ok(removed)
    }
}

fn load_view(conn: &Connection, id: Uuid) -> Result<Option<PropertyView>> {
    conn.query_row(
        &format!("{} WHERE p.id = ?1", SELECT_VIEW),
        params![id.to_string()],
        row_to_view,
    )
    .optional()
    .context("Failed to load property")
}

fn row_to_view(row: &Row<'_>) -> rusqlite::Result<PropertyView> {
    let host_id = uuid_col(row, 10)?;
    let property = Property {
        id: uuid_col(row, 0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        location: Location {
            city: row.get(3)?,
            country: row.get(4)?,
            coordinates: Coordinates {
                lat: row.get(5)?,
                lng: row.get(6)?,
            },
        },
        price: row.get(7)?,
        images: json_col(row, 8)?,
        amenities: json_col(row, 9)?,
        host_id,
        max_guests: row.get(11)?,
        bedrooms: row.get(12)?,
        bathrooms: row.get(13)?,
        rating: row.get(14)?,
        reviews: json_col(row, 15)?,
        created_at: row.get(16)?,
        updated_at: row.get(17)?,
    };

    Ok(PropertyView {
        property,
        host: HostSummary {
            id: host_id,
            first_name: row.get(18)?,
            last_name: row.get(19)?,
            email: row.get(20)?,
        },
    })
}

fn uuid_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn json_col<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}
