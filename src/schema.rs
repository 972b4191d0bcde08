//! Hosted-schema metadata: table names, foreign keys, and typed row models.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableName {
    Cars,
    Profiles,
    Wishlist,
    Orders,
    Bookings,
}

impl TableName {
    pub const ALL: [TableName; 5] = [
        TableName::Cars,
        TableName::Profiles,
        TableName::Wishlist,
        TableName::Orders,
        TableName::Bookings,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TableName::Cars => "cars",
            TableName::Profiles => "profiles",
            TableName::Wishlist => "wishlist",
            TableName::Orders => "orders",
            TableName::Bookings => "bookings",
        }
    }

    /// `vehicles` is accepted for the car table.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim() {
            "cars" | "vehicles" => Some(TableName::Cars),
            "profiles" => Some(TableName::Profiles),
            "wishlist" => Some(TableName::Wishlist),
            "orders" => Some(TableName::Orders),
            "bookings" => Some(TableName::Bookings),
            _ => None,
        }
    }
}

impl Display for TableName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical storage name for a table reference.
pub fn canonical_table(name: &str) -> String {
    match TableName::parse(name) {
        Some(table) => table.as_str().to_string(),
        None => name.trim().to_string(),
    }
}

/// Advisory foreign key; never enforced on write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relationship {
    pub table: &'static str,
    pub column: &'static str,
    pub referenced: &'static str,
    pub referenced_column: &'static str,
}

pub const RELATIONSHIPS: &[Relationship] = &[
    Relationship {
        table: "wishlist",
        column: "car_id",
        referenced: "cars",
        referenced_column: "id",
    },
    Relationship {
        table: "orders",
        column: "car_id",
        referenced: "cars",
        referenced_column: "id",
    },
    Relationship {
        table: "bookings",
        column: "car_id",
        referenced: "cars",
        referenced_column: "id",
    },
];

pub fn relationship(table: &str, referenced: &str) -> Option<&'static Relationship> {
    RELATIONSHIPS
        .iter()
        .find(|r| r.table == table && r.referenced == referenced)
}

pub fn is_related(table: &str, referenced: &str) -> bool {
    relationship(table, referenced).is_some()
}

// ==================== Typed rows ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Car {
    pub id: String,
    pub title: String,
    pub make: String,
    pub model: String,
    #[serde(default)]
    pub full_model: Option<String>,
    pub year: i32,
    #[serde(default)]
    pub manufacture_date: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    pub mileage: i64,
    #[serde(default)]
    pub mileage_unit: Option<String>,
    #[serde(default)]
    pub body_type: Option<String>,
    pub fuel_type: String,
    pub transmission: String,
    pub seats: i32,
    #[serde(default)]
    pub vin: Option<String>,
    #[serde(default)]
    pub registration_number: Option<String>,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub price: f64,
    #[serde(default)]
    pub discount: Option<f64>,
    #[serde(default)]
    pub negotiable: Option<bool>,
    #[serde(default)]
    pub service_history: Option<String>,
    #[serde(default)]
    pub last_service_date: Option<String>,
    #[serde(default)]
    pub seller_contact: Option<String>,
    pub created_by: String,
    pub status: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub views: Option<i64>,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Car {
    /// Asking price after discount.
    pub fn final_price(&self) -> f64 {
        self.price - self.discount.unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub full_name: Option<String>,
    pub role: String,
    #[serde(default, alias = "phone")]
    pub phone_number: Option<String>,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WishlistEntry {
    pub id: String,
    pub user_id: String,
    pub car_id: String,
    pub created_at: String,
    /// Present when read with `select("*, cars(*)")`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cars: Option<Car>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub user_id: String,
    pub car_id: String,
    pub total_amount: f64,
    pub status: String,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cars: Option<Car>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub user_id: String,
    pub car_id: String,
    pub booking_date: String,
    pub booking_time: String,
    pub status: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cars: Option<Car>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vehicles_alias() {
        assert_eq!(TableName::parse("vehicles"), Some(TableName::Cars));
        assert_eq!(canonical_table("vehicles"), "cars");
        assert_eq!(canonical_table("garages"), "garages");
    }

    #[test]
    fn test_relationships() {
        let rel = relationship("orders", "cars").unwrap();
        assert_eq!(rel.column, "car_id");
        assert!(!is_related("cars", "orders"));
        assert!(!is_related("profiles", "cars"));
    }
}
