//! Flat listing service used by the admin screens in place of the query
//! layer. One resource, four operations, no relations.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: String,
    pub name: String,
    pub year: i64,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub image: String,
    pub price: f64,
    #[serde(default)]
    pub mileage: f64,
    pub fuel_type: String,
    pub transmission: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    #[serde(default)]
    pub make: String,
    /// Fields outside the listing shape, carried through updates.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[async_trait]
pub trait ListingApi: Send + Sync {
    /// All listings, newest first; `make` filters by case-insensitive
    /// substring.
    async fn list(&self, make: Option<&str>) -> Result<Vec<Listing>, Error>;
    async fn get(&self, id: &str) -> Result<Listing, Error>;
    async fn create(&self, body: Value) -> Result<Listing, Error>;
    /// Body fields are laid over the stored listing, `id` and unknown keys
    /// included; only numeric fields present in the body are re-coerced.
    async fn update(&self, id: &str, body: Value) -> Result<Listing, Error>;
}

pub struct MemoryListings {
    listings: Mutex<Vec<Listing>>,
}

impl Default for MemoryListings {
    fn default() -> Self {
        Self::new(fixture_listings())
    }
}

impl MemoryListings {
    pub fn new(listings: Vec<Listing>) -> Self {
        Self {
            listings: Mutex::new(listings),
        }
    }

    fn next_id(listings: &[Listing]) -> String {
        let mut id = Utc::now().timestamp_millis();
        while listings.iter().any(|l| l.id == id.to_string()) {
            id += 1;
        }
        id.to_string()
    }
}

/// JS-style truthiness, used for the required-field check.
fn truthy(v: Option<&Value>) -> bool {
    match v {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

/// Accepts numbers and numeric strings.
fn number(field: &str, v: &Value) -> Result<f64, Error> {
    let parsed = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if s.trim().is_empty() => Some(0.0),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Null => Some(0.0),
        _ => None,
    };
    parsed
        .filter(|n| n.is_finite())
        .ok_or_else(|| Error::Validation(format!("{} must be a number", field)))
}

fn text(body: &Map<String, Value>, field: &str, default: &str) -> String {
    match body.get(field) {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        _ => default.to_string(),
    }
}

fn object(body: Value) -> Result<Map<String, Value>, Error> {
    match body {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        _ => Err(Error::InvalidPayload("body must be an object".to_string())),
    }
}

#[async_trait]
impl ListingApi for MemoryListings {
    async fn list(&self, make: Option<&str>) -> Result<Vec<Listing>, Error> {
        let listings = self.listings.lock().map_err(|_| Error::Poisoned)?;
        let needle = make.map(str::to_lowercase).filter(|m| !m.is_empty());
        Ok(listings
            .iter()
            .filter(|l| {
                needle
                    .as_ref()
                    .is_none_or(|n| l.make.to_lowercase().contains(n.as_str()))
            })
            .cloned()
            .collect())
    }

    async fn get(&self, id: &str) -> Result<Listing, Error> {
        self.listings
            .lock()
            .map_err(|_| Error::Poisoned)?
            .iter()
            .find(|l| l.id == id)
            .cloned()
            .ok_or(Error::NotFound)
    }

    async fn create(&self, body: Value) -> Result<Listing, Error> {
        let body = object(body)?;
        if !truthy(body.get("name")) || !truthy(body.get("year")) || !truthy(body.get("price")) {
            return Err(Error::Validation(
                "name, year, price are required".to_string(),
            ));
        }

        let mut listings = self.listings.lock().map_err(|_| Error::Poisoned)?;
        let listing = Listing {
            id: Self::next_id(&listings),
            name: text(&body, "name", ""),
            year: number("year", body.get("year").unwrap_or(&Value::Null))? as i64,
            subtitle: text(&body, "subtitle", ""),
            image: text(&body, "image", ""),
            price: number("price", body.get("price").unwrap_or(&Value::Null))?,
            mileage: number("mileage", body.get("mileage").unwrap_or(&Value::Null))?,
            fuel_type: text(&body, "fuelType", "Petrol"),
            transmission: text(&body, "transmission", "Automatic"),
            badge: body
                .get("badge")
                .and_then(Value::as_str)
                .map(String::from),
            make: text(&body, "make", ""),
            extra: Map::new(),
        };

        listings.insert(0, listing.clone());
        debug!(id = %listing.id, "listing created");
        Ok(listing)
    }

    async fn update(&self, id: &str, body: Value) -> Result<Listing, Error> {
        let body = object(body)?;
        let mut listings = self.listings.lock().map_err(|_| Error::Poisoned)?;
        let existing = listings
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or(Error::NotFound)?;

        let mut merged = match serde_json::to_value(&*existing) {
            Ok(Value::Object(map)) => map,
            Ok(_) => Map::new(),
            Err(e) => return Err(Error::Serialize(e.to_string())),
        };
        for field in ["year", "price", "mileage"] {
            if let Some(v) = body.get(field) {
                let n = number(field, v)?;
                let n = if field == "year" {
                    Value::from(n as i64)
                } else {
                    Value::from(n)
                };
                merged.insert(field.to_string(), n);
            }
        }
        for (key, value) in body {
            if !matches!(key.as_str(), "year" | "price" | "mileage") {
                merged.insert(key, value);
            }
        }

        let updated: Listing = serde_json::from_value(Value::Object(merged))
            .map_err(|e| Error::Validation(e.to_string()))?;
        *existing = updated.clone();
        debug!(id, "listing updated");
        Ok(updated)
    }
}

fn fixture_listings() -> Vec<Listing> {
    let subtitle_d5 = "4.0 D5 PowerPulse Momentum 5dr AWD";
    let subtitle_35 = "3.5 D5 PowerPulse Momentum 5dr AWD";
    vec![
        Listing {
            id: "1".into(),
            name: "Ford Transit".into(),
            year: 2021,
            subtitle: subtitle_d5.into(),
            image: "https://images.unsplash.com/photo-1552519507-da3b142c6e3d?w=600&h=400&fit=crop".into(),
            price: 22000.0,
            mileage: 2500.0,
            fuel_type: "Diesel".into(),
            transmission: "Manual".into(),
            badge: Some("Great Price".into()),
            make: "Ford".into(),
            extra: Map::new(),
        },
        Listing {
            id: "2".into(),
            name: "New GLC".into(),
            year: 2023,
            subtitle: subtitle_d5.into(),
            image: "https://images.unsplash.com/photo-1606016595464-d0b5c54a8f87?w=600&h=400&fit=crop".into(),
            price: 95000.0,
            mileage: 50.0,
            fuel_type: "Petrol".into(),
            transmission: "Automatic".into(),
            badge: Some("Low Mileage".into()),
            make: "Mercedes Benz".into(),
            extra: Map::new(),
        },
        Listing {
            id: "3".into(),
            name: "Audi A6 3.5".into(),
            year: 2024,
            subtitle: subtitle_35.into(),
            image: "https://images.unsplash.com/photo-1605559424843-9e4c228bf1c2?w=600&h=400&fit=crop".into(),
            price: 58000.0,
            mileage: 100.0,
            fuel_type: "Petrol".into(),
            transmission: "Automatic".into(),
            badge: None,
            make: "Audi".into(),
            extra: Map::new(),
        },
        Listing {
            id: "4".into(),
            name: "Corolla Altis".into(),
            year: 2023,
            subtitle: subtitle_35.into(),
            image: "https://images.unsplash.com/photo-1560958089-b8a1929cea89?w=600&h=400&fit=crop".into(),
            price: 45000.0,
            mileage: 15000.0,
            fuel_type: "Petrol".into(),
            transmission: "Automatic".into(),
            badge: None,
            make: "Toyota".into(),
            extra: Map::new(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_list_filters_by_make() {
        let api = MemoryListings::default();
        assert_eq!(api.list(None).await.unwrap().len(), 4);
        let benz = api.list(Some("benz")).await.unwrap();
        assert_eq!(benz.len(), 1);
        assert_eq!(benz[0].name, "New GLC");
    }

    #[tokio::test]
    async fn test_create_requires_name_year_price() {
        let api = MemoryListings::default();
        let err = api
            .create(json!({ "name": "Hilux", "year": 2020 }))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Validation error: name, year, price are required");
    }

    #[tokio::test]
    async fn test_create_coerces_and_prepends() {
        let api = MemoryListings::default();
        let created = api
            .create(json!({ "name": "Hilux", "year": "2020", "price": "31000", "make": "Toyota" }))
            .await
            .unwrap();
        assert_eq!(created.year, 2020);
        assert_eq!(created.price, 31000.0);
        assert_eq!(created.fuel_type, "Petrol");
        assert_eq!(created.transmission, "Automatic");
        assert_eq!(api.list(None).await.unwrap()[0].id, created.id);
    }

    #[tokio::test]
    async fn test_update_merges_body_over_existing() {
        let api = MemoryListings::default();
        let updated = api
            .update(
                "3",
                json!({ "id": "99", "price": "57000", "badge": "Price Drop", "vin": "WAU123" }),
            )
            .await
            .unwrap();
        assert_eq!(updated.id, "99");
        assert_eq!(updated.price, 57000.0);
        assert_eq!(updated.year, 2024);
        assert_eq!(updated.badge.as_deref(), Some("Price Drop"));
        assert_eq!(updated.name, "Audi A6 3.5");
        assert_eq!(updated.extra["vin"], "WAU123");

        assert_eq!(api.get("99").await.unwrap(), updated);
        assert_eq!(api.get("3").await.unwrap_err(), Error::NotFound);

        let wire = serde_json::to_value(&updated).unwrap();
        assert_eq!(wire["vin"], "WAU123");
        assert_eq!(wire["fuelType"], "Petrol");
    }

    #[tokio::test]
    async fn test_missing_id_is_not_found() {
        let api = MemoryListings::default();
        assert_eq!(api.get("404").await.unwrap_err(), Error::NotFound);
        assert_eq!(
            api.update("404", json!({})).await.unwrap_err(),
            Error::NotFound
        );
    }
}
