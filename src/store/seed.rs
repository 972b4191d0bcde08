//! Marketplace fixture rows loaded by [`TableStore::seeded`](super::TableStore::seeded).

use once_cell::sync::Lazy;
use serde_json::{Value, json};

use super::Row;
use crate::schema::TableName;

static FIXTURES: Lazy<Vec<(TableName, Vec<Row>)>> = Lazy::new(|| {
    vec![
        (TableName::Cars, cars()),
        (TableName::Profiles, rows(profiles())),
        (TableName::Wishlist, rows(wishlist())),
        (TableName::Orders, rows(orders())),
        (TableName::Bookings, rows(bookings())),
    ]
});

pub fn fixtures() -> &'static [(TableName, Vec<Row>)] {
    &FIXTURES
}

fn rows(value: Value) -> Vec<Row> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(row) => Some(row),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Listing fields every fixture vehicle shares.
fn vehicle(fields: Value) -> Row {
    let mut row = match json!({
        "mileage_unit": "km",
        "location": "Kigali, Rwanda",
        "created_by": "2",
        "status": "available",
        "images": ["/placeholder.svg"],
        "video_url": null,
    }) {
        Value::Object(base) => base,
        _ => Row::new(),
    };
    if let Value::Object(fields) = fields {
        row.extend(fields);
    }
    row
}

fn cars() -> Vec<Row> {
    vec![
        vehicle(json!({
            "id": "1", "title": "Toyota Camry 2020", "make": "Toyota", "model": "Camry",
            "full_model": "Camry LE 2.5L", "year": 2020, "manufacture_date": "2020-03-15",
            "color": "Black", "mileage": 45000, "body_type": "Sedan", "fuel_type": "Petrol",
            "transmission": "Automatic", "seats": 5, "vin": "1HGBH41JXMN109186",
            "registration_number": "RAA123A", "condition": "Used",
            "description": "Well maintained Toyota Camry with full service history. Perfect for family use.",
            "price": 15000000, "discount": 500000, "negotiable": true,
            "service_history": "Regular maintenance at authorized Toyota service center",
            "last_service_date": "2024-01-15", "seller_contact": "+250788123456",
            "created_at": "2024-01-01T00:00:00Z",
        })),
        vehicle(json!({
            "id": "2", "title": "BMW X5 2021", "make": "BMW", "model": "X5",
            "full_model": "X5 xDrive30i", "year": 2021, "manufacture_date": "2021-06-20",
            "color": "White", "mileage": 25000, "body_type": "SUV", "fuel_type": "Petrol",
            "transmission": "Automatic", "seats": 7, "vin": "5UXCR6C05L9B12345",
            "registration_number": "RAA456B", "condition": "Used",
            "description": "Luxury BMW X5 with premium features and low mileage.",
            "price": 35000000, "discount": 0, "negotiable": false,
            "service_history": "BMW authorized service center",
            "last_service_date": "2024-02-01", "seller_contact": "+250788654321",
            "created_at": "2024-01-15T00:00:00Z",
        })),
        vehicle(json!({
            "id": "3", "title": "Mercedes-Benz C-Class 2022", "make": "Mercedes-Benz",
            "model": "C-Class", "full_model": "C200 AMG Line", "year": 2022,
            "manufacture_date": "2022-01-10", "color": "Silver", "mileage": 15000,
            "body_type": "Sedan", "fuel_type": "Petrol", "transmission": "Automatic", "seats": 5,
            "vin": "WDD2050461A123456", "registration_number": "RAA789C", "condition": "New",
            "description": "Brand new Mercedes-Benz C-Class with AMG styling package.",
            "price": 45000000, "discount": 2000000, "negotiable": true,
            "service_history": "Brand new vehicle", "last_service_date": null,
            "seller_contact": "+250788987654", "created_at": "2024-02-01T00:00:00Z",
        })),
        vehicle(json!({
            "id": "4", "title": "Audi A4 2021", "make": "Audi", "model": "A4",
            "full_model": "A4 2.0 TFSI Quattro", "year": 2021, "manufacture_date": "2021-04-12",
            "color": "Blue", "mileage": 30000, "body_type": "Sedan", "fuel_type": "Petrol",
            "transmission": "Automatic", "seats": 5, "vin": "WAUZZZ8V1MA123456",
            "registration_number": "RAA101D", "condition": "Used",
            "description": "Premium Audi A4 with Quattro all-wheel drive system.",
            "price": 28000000, "discount": 1000000, "negotiable": true,
            "service_history": "Audi authorized service center",
            "last_service_date": "2024-01-20", "seller_contact": "+250788111222",
            "created_at": "2024-01-20T00:00:00Z",
        })),
        vehicle(json!({
            "id": "5", "title": "Ford Ranger 2020", "make": "Ford", "model": "Ranger",
            "full_model": "Ranger XLT 2.0L", "year": 2020, "manufacture_date": "2020-08-05",
            "color": "Red", "mileage": 55000, "body_type": "Pickup", "fuel_type": "Diesel",
            "transmission": "Manual", "seats": 5, "vin": "1FTFW1ET5LFA12345",
            "registration_number": "RAA202E", "condition": "Used",
            "description": "Reliable Ford Ranger pickup truck, perfect for work and adventure.",
            "price": 18000000, "discount": 0, "negotiable": true,
            "service_history": "Regular maintenance at Ford service center",
            "last_service_date": "2024-01-10", "seller_contact": "+250788333444",
            "created_at": "2024-01-25T00:00:00Z",
        })),
        vehicle(json!({
            "id": "6", "title": "Mercedes-Benz GLE 2022", "make": "Mercedes-Benz",
            "model": "GLE", "full_model": "GLE 350 4MATIC", "year": 2022,
            "manufacture_date": "2022-02-15", "color": "Black", "mileage": 20000,
            "body_type": "SUV", "fuel_type": "Petrol", "transmission": "Automatic", "seats": 7,
            "vin": "WDC0G4JB2NA123456", "registration_number": "RAA303F", "condition": "Used",
            "description": "Luxury Mercedes-Benz GLE with advanced safety features.",
            "price": 42000000, "discount": 1500000, "negotiable": false,
            "service_history": "Mercedes-Benz authorized service",
            "last_service_date": "2024-02-05", "seller_contact": "+250788555666",
            "created_at": "2024-02-05T00:00:00Z",
        })),
    ]
}

fn profiles() -> Value {
    json!([
        {
            "id": "1", "user_id": "1", "full_name": "John Doe", "role": "buyer",
            "phone_number": "+250788123456", "created_at": "2024-01-01T00:00:00Z",
        },
        {
            "id": "2", "user_id": "2", "full_name": "Admin User", "role": "admin",
            "phone_number": "+250788654321", "created_at": "2024-01-01T00:00:00Z",
        },
    ])
}

fn wishlist() -> Value {
    json!([
        { "id": "1", "user_id": "1", "car_id": "1", "created_at": "2024-01-15T00:00:00Z" },
    ])
}

fn orders() -> Value {
    json!([
        {
            "id": "1", "user_id": "1", "car_id": "2", "total_amount": 35000000,
            "status": "completed", "payment_method": "Bank Transfer",
            "notes": "Smooth transaction", "created_at": "2024-01-20T00:00:00Z",
        },
    ])
}

fn bookings() -> Value {
    json!([
        {
            "id": "1", "user_id": "1", "car_id": "1", "booking_date": "2024-02-15",
            "booking_time": "10:00", "status": "confirmed", "notes": "Test drive appointment",
            "created_at": "2024-01-25T00:00:00Z",
        },
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Booking, Car, Order, Profile, WishlistEntry};

    fn decode<T: serde::de::DeserializeOwned>(table: TableName) -> Vec<T> {
        fixtures()
            .iter()
            .find(|(name, _)| *name == table)
            .map(|(_, rows)| rows.clone())
            .unwrap()
            .into_iter()
            .map(|r| serde_json::from_value(Value::Object(r)).unwrap())
            .collect()
    }

    #[test]
    fn test_fixtures_decode_into_models() {
        let cars: Vec<Car> = decode(TableName::Cars);
        assert_eq!(cars.len(), 6);
        assert_eq!(cars[0].final_price(), 14_500_000.0);
        assert_eq!(cars[2].last_service_date, None);

        let profiles: Vec<Profile> = decode(TableName::Profiles);
        assert_eq!(profiles[1].role, "admin");

        let _: Vec<WishlistEntry> = decode(TableName::Wishlist);
        let _: Vec<Order> = decode(TableName::Orders);
        let _: Vec<Booking> = decode(TableName::Bookings);
    }
}
