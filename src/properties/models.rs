//! Property Models
//! Mission: Listing records, filters and validated create/update payloads

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    api::extract::{require_non_empty, Validate},
    error::ApiError,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub city: String,
    pub country: String,
    pub coordinates: Coordinates,
}

impl Location {
    fn validate(&self) -> Result<(), ApiError> {
        require_non_empty("location.city", &self.city)?;
        require_non_empty("location.country", &self.country)?;
        let Coordinates { lat, lng } = self.coordinates;
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return Err(ApiError::invalid("Coordinates are out of range"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Review {
    pub user: Uuid,
    pub rating: f64,
    pub comment: String,
    pub date: String,
}

/// Stored property listing
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub location: Location,
    pub price: f64, // per night
    pub images: Vec<String>,
    pub amenities: Vec<String>,
    #[serde(skip_serializing)]
    pub host_id: Uuid,
    pub max_guests: u32,
    pub bedrooms: u32,
    pub bathrooms: u32,
    pub rating: f64,
    pub reviews: Vec<Review>,
    pub created_at: String,
    pub updated_at: String,
}

/// Public fields of the owning account
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostSummary {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// Property with its host populated, as returned by every read
#[derive(Debug, Clone, Serialize)]
pub struct PropertyView {
    #[serde(flatten)]
    pub property: Property,
    pub host: HostSummary,
}

/// Create payload. Any `host` in the body is ignored; the caller becomes the host.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProperty {
    pub title: String,
    pub description: String,
    pub location: Location,
    pub price: f64,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub amenities: Vec<String>,
    pub max_guests: u32,
    pub bedrooms: u32,
    pub bathrooms: u32,
    pub rating: Option<f64>,
}

impl Validate for NewProperty {
    fn validate(&self) -> Result<(), ApiError> {
        require_non_empty("title", &self.title)?;
        require_non_empty("description", &self.description)?;
        self.location.validate()?;
        validate_price(self.price)?;
        validate_images(&self.images)?;
        validate_guests(self.max_guests)?;
        if let Some(rating) = self.rating {
            validate_rating(rating)?;
        }
        Ok(())
    }
}

/// Partial update payload. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<Location>,
    pub price: Option<f64>,
    pub images: Option<Vec<String>>,
    pub amenities: Option<Vec<String>>,
    pub max_guests: Option<u32>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<u32>,
    pub rating: Option<f64>,
}

impl Validate for PropertyPatch {
    fn validate(&self) -> Result<(), ApiError> {
        if let Some(title) = &self.title {
            require_non_empty("title", title)?;
        }
        if let Some(description) = &self.description {
            require_non_empty("description", description)?;
        }
        if let Some(location) = &self.location {
            location.validate()?;
        }
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        if let Some(images) = &self.images {
            validate_images(images)?;
        }
        if let Some(max_guests) = self.max_guests {
            validate_guests(max_guests)?;
        }
        if let Some(rating) = self.rating {
            validate_rating(rating)?;
        }
        Ok(())
    }
}

impl PropertyPatch {
    pub fn apply(self, property: &mut Property) {
        if let Some(title) = self.title {
            property.title = title;
        }
        if let Some(description) = self.description {
            property.description = description;
        }
        if let Some(location) = self.location {
            property.location = location;
        }
        if let Some(price) = self.price {
            property.price = price;
        }
        if let Some(images) = self.images {
            property.images = images;
        }
        if let Some(amenities) = self.amenities {
            property.amenities = amenities;
        }
        if let Some(max_guests) = self.max_guests {
            property.max_guests = max_guests;
        }
        if let Some(bedrooms) = self.bedrooms {
            property.bedrooms = bedrooms;
        }
        if let Some(bathrooms) = self.bathrooms {
            property.bathrooms = bathrooms;
        }
        if let Some(rating) = self.rating {
            property.rating = rating;
        }
    }
}

fn validate_price(price: f64) -> Result<(), ApiError> {
    if !price.is_finite() || price < 0.0 {
        return Err(ApiError::invalid("price must be a non-negative number"));
    }
    Ok(())
}

fn validate_images(images: &[String]) -> Result<(), ApiError> {
    if images.iter().any(|url| url.trim().is_empty()) {
        return Err(ApiError::invalid("images must not contain empty URLs"));
    }
    Ok(())
}

fn validate_guests(max_guests: u32) -> Result<(), ApiError> {
    if max_guests == 0 {
        return Err(ApiError::invalid("maxGuests must be at least 1"));
    }
    Ok(())
}

fn validate_rating(rating: f64) -> Result<(), ApiError> {
    if !(0.0..=5.0).contains(&rating) {
        return Err(ApiError::invalid("rating must be between 0 and 5"));
    }
    Ok(())
}

/// Raw query string of `GET /api/properties`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyQuery {
    pub city: Option<String>,
    pub country: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub guests: Option<String>,
    pub bedrooms: Option<String>,
    pub bathrooms: Option<String>,
}

/// Conjunctive listing filter. `None` fields are not applied.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PropertyFilter {
    pub city: Option<String>,
    pub country: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_guests: Option<f64>,
    pub min_bedrooms: Option<f64>,
    pub min_bathrooms: Option<f64>,
}

impl TryFrom<PropertyQuery> for PropertyFilter {
    type Error = ApiError;

    fn try_from(query: PropertyQuery) -> Result<Self, Self::Error> {
        Ok(Self {
            city: non_blank(query.city),
            country: non_blank(query.country),
            min_price: parse_number("minPrice", query.min_price)?,
            max_price: parse_number("maxPrice", query.max_price)?,
            min_guests: parse_number("guests", query.guests)?,
            min_bedrooms: parse_number("bedrooms", query.bedrooms)?,
            min_bathrooms: parse_number("bathrooms", query.bathrooms)?,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn parse_number(name: &str, value: Option<String>) -> Result<Option<f64>, ApiError> {
    match non_blank(value) {
        None => Ok(None),
        Some(raw) => match raw.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(Some(n)),
            _ => Err(ApiError::invalid(format!("{} must be a number", name))),
        },
    }
}
