//! Response bodies shared by tests.

use serde_json::Value;

/// A hotel record; the first call of the chained-call scenario.
pub const HOTEL: &str = r#"{"id_hotel": 25, "name": "Hotel California", "destination_id": 123}"#;

/// Destination details; the second call of the chained-call scenario.
pub const DESTINATIONS: &str = r#"{
    "destination_id": 123,
    "destinations": ["LAX", "SFO", "OAK"],
    "flights": [
        {"plane": "ABC", "departured": "09:00"},
        {"plane": "DEF", "departured": "07:00"}
    ],
    "informations": {
        "total_population": 11000,
        "total_land_area": 120000,
        "average_temperatures": {"morning": "20c", "night": "13c"}
    }
}"#;

/// Leading bytes of a JPEG image, for upload tests.
pub const PERSON_JPG: &[u8] = b"\xff\xd8\xff\xe0\x00\x10JFIF\x00\x01";

/// [`HOTEL`] as a JSON value.
pub fn hotel() -> Value {
    parse(HOTEL)
}

/// [`DESTINATIONS`] as a JSON value.
pub fn destinations() -> Value {
    parse(DESTINATIONS)
}

/// The merged document expected when the hotel is combined with the
/// `flights` and `informations` of its destination.
pub fn hotel_with_destination() -> Value {
    serde_json::json!({
        "id_hotel": 25,
        "name": "Hotel California",
        "destination_id": 123,
        "flights": [
            {"plane": "ABC", "departured": "09:00"},
            {"plane": "DEF", "departured": "07:00"}
        ],
        "informations": {
            "total_population": 11000,
            "total_land_area": 120000,
            "average_temperatures": {"morning": "20c", "night": "13c"}
        }
    })
}

fn parse(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or(Value::Null)
}
