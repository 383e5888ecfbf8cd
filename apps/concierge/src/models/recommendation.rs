use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::models::lenient;

/// Subjects described at geographic scale. For these, opening hours make no
/// sense and visit duration / best visit time are mandatory.
///
/// Matched against the whole `establishmentType`: "Bar de praia" is a bar and
/// "Country club" is a club.
const GEOGRAPHIC_TYPES: &[&str] = &[
    "city",
    "cidade",
    "country",
    "país",
    "pais",
    "region",
    "região",
    "regiao",
    "island",
    "ilha",
    "beach",
    "praia",
    "cities",
    "cidades",
    "islands",
    "ilhas",
    "beaches",
    "praias",
];

/// Recommendation category. Anything outside the three known values is kept
/// verbatim so the item can still be shown and the violation reported.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Category {
    Flight,
    Hotel,
    General,
    Unrecognized(String),
}

impl Category {
    pub fn from_raw(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "flight" => Category::Flight,
            "hotel" => Category::Hotel,
            "general" => Category::General,
            _ => Category::Unrecognized(raw.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Category::Flight => "flight",
            Category::Hotel => "hotel",
            Category::General => "general",
            Category::Unrecognized(raw) => raw,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Category::Unrecognized(_))
    }
}

impl Default for Category {
    fn default() -> Self {
        Category::Unrecognized(String::new())
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) => Category::from_raw(&s),
            Value::Null => Category::default(),
            other => Category::Unrecognized(other.to_string()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReservationStatus {
    Required,
    Recommended,
    NotNeeded,
    Unknown,
    Unrecognized(String),
}

impl ReservationStatus {
    pub fn from_raw(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "required" => ReservationStatus::Required,
            "recommended" => ReservationStatus::Recommended,
            "not_needed" => ReservationStatus::NotNeeded,
            "unknown" => ReservationStatus::Unknown,
            _ => ReservationStatus::Unrecognized(raw.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ReservationStatus::Required => "required",
            ReservationStatus::Recommended => "recommended",
            ReservationStatus::NotNeeded => "not_needed",
            ReservationStatus::Unknown => "unknown",
            ReservationStatus::Unrecognized(raw) => raw,
        }
    }
}

impl Serialize for ReservationStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ReservationStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) => ReservationStatus::from_raw(&s),
            other => ReservationStatus::Unrecognized(other.to_string()),
        })
    }
}

/// Flight-only fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FlightDetails {
    #[serde(deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub airline: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub flight_number: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub departure_time: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub arrival_time: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub departure_airport: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub arrival_airport: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(deserialize_with = "lenient::opt_u32", skip_serializing_if = "Option::is_none")]
    pub stops: Option<u32>,
}

/// Hotel-only fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HotelDetails {
    #[serde(deserialize_with = "lenient::opt_f32", skip_serializing_if = "Option::is_none")]
    pub stars: Option<f32>,
    #[serde(deserialize_with = "lenient::string_list", skip_serializing_if = "Vec::is_empty")]
    pub amenities: Vec<String>,
    /// Image URLs, restricted by the prompt to an allow-list of hosts.
    #[serde(deserialize_with = "lenient::string_list", skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    #[serde(deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(deserialize_with = "lenient::opt_f32", skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,
    #[serde(deserialize_with = "lenient::opt_u32", skip_serializing_if = "Option::is_none")]
    pub review_count: Option<u32>,
}

/// Fields for restaurants, attractions and places (the `general` category).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VenueDetails {
    #[serde(deserialize_with = "lenient::opt_f32", skip_serializing_if = "Option::is_none")]
    pub google_rating: Option<f32>,
    #[serde(deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub establishment_type: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub open_hours: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub menu_link: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub parking: Option<String>,
}

/// One structured suggestion returned by the upstream model.
///
/// Every field is optional on the way in; the validator reports what is
/// missing but never drops the item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Recommendation {
    pub category: Category,
    #[serde(deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub estimated_cost: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub visit_duration: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub best_visit_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reservation_status: Option<ReservationStatus>,
    #[serde(deserialize_with = "lenient::string_list", skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list", skip_serializing_if = "Vec::is_empty")]
    pub highlights: Vec<String>,

    #[serde(flatten)]
    pub flight: FlightDetails,
    #[serde(flatten)]
    pub hotel: HotelDetails,
    #[serde(flatten)]
    pub venue: VenueDetails,
}

/// De-duplication identity: `(normalized name, category)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityKey {
    pub name: String,
    pub category: Category,
}

impl Recommendation {
    pub fn identity_key(&self) -> IdentityKey {
        IdentityKey {
            name: self
                .name
                .as_deref()
                .unwrap_or_default()
                .trim()
                .to_lowercase(),
            category: self.category.clone(),
        }
    }

    /// True when the subject is a city, country, region, island or beach.
    pub fn is_geographic(&self) -> bool {
        self.venue
            .establishment_type
            .as_deref()
            .map(|t| {
                let t = t.trim().to_lowercase();
                GEOGRAPHIC_TYPES.contains(&t.as_str())
            })
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_hotel_item_deserializes() {
        let json = r#"{
            "category": "hotel",
            "icon": "🏨",
            "name": "Hôtel Bonsaï",
            "description": "Pequeno hotel no 15e",
            "estimatedCost": "€95/noite",
            "visitDuration": "2 noites",
            "bestVisitTime": "Primavera",
            "reservationStatus": "required",
            "stars": 3,
            "amenities": ["wifi", "café da manhã"],
            "images": ["https://upload.wikimedia.org/x.jpg"],
            "rating": "4.4",
            "reviewCount": 812
        }"#;
        let item: Recommendation = serde_json::from_str(json).unwrap();
        assert_eq!(item.category, Category::Hotel);
        assert_eq!(item.name.as_deref(), Some("Hôtel Bonsaï"));
        assert_eq!(item.reservation_status, Some(ReservationStatus::Required));
        assert_eq!(item.hotel.stars, Some(3.0));
        assert_eq!(item.hotel.amenities.len(), 2);
        assert_eq!(item.hotel.rating, Some(4.4));
        assert_eq!(item.hotel.review_count, Some(812));
    }

    #[test]
    fn test_flight_item_deserializes() {
        let json = r#"{
            "category": "flight",
            "name": "GRU → CDG",
            "airline": "Air France",
            "flightNumber": "AF457",
            "departureAirport": "GRU",
            "arrivalAirport": "CDG",
            "stops": 0
        }"#;
        let item: Recommendation = serde_json::from_str(json).unwrap();
        assert_eq!(item.category, Category::Flight);
        assert_eq!(item.flight.flight_number.as_deref(), Some("AF457"));
        assert_eq!(item.flight.stops, Some(0));
    }

    #[test]
    fn test_unknown_category_is_kept() {
        let item: Recommendation =
            serde_json::from_str(r#"{"category": "Restaurant", "name": "Bistrot"}"#).unwrap();
        assert_eq!(item.category, Category::Unrecognized("Restaurant".to_string()));
        assert!(!item.category.is_known());
    }

    #[test]
    fn test_category_is_case_insensitive() {
        assert_eq!(Category::from_raw(" HOTEL "), Category::Hotel);
    }

    #[test]
    fn test_empty_object_deserializes() {
        let item: Recommendation = serde_json::from_str("{}").unwrap();
        assert_eq!(item.category, Category::default());
        assert!(item.name.is_none());
    }

    #[test]
    fn test_serializes_camel_case_and_skips_absent() {
        let item = Recommendation {
            category: Category::General,
            name: Some("Louvre".to_string()),
            visit_duration: Some("3h".to_string()),
            reservation_status: Some(ReservationStatus::NotNeeded),
            ..Default::default()
        };
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["category"], "general");
        assert_eq!(value["visitDuration"], "3h");
        assert_eq!(value["reservationStatus"], "not_needed");
        assert!(value.get("openHours").is_none());
        assert!(value.get("tags").is_none());
    }

    #[test]
    fn test_identity_key_normalizes_name() {
        let a: Recommendation =
            serde_json::from_str(r#"{"category":"general","name":" Louvre "}"#).unwrap();
        let b: Recommendation =
            serde_json::from_str(r#"{"category":"general","name":"louvre"}"#).unwrap();
        let c: Recommendation =
            serde_json::from_str(r#"{"category":"hotel","name":"louvre"}"#).unwrap();
        assert_eq!(a.identity_key(), b.identity_key());
        assert_ne!(a.identity_key(), c.identity_key());
    }

    #[test]
    fn test_geographic_detection() {
        let beach: Recommendation = serde_json::from_str(
            r#"{"category":"general","name":"Praia do Forte","establishmentType":"Praia"}"#,
        )
        .unwrap();
        let cafe: Recommendation = serde_json::from_str(
            r#"{"category":"general","name":"Café","establishmentType":"Cafeteria"}"#,
        )
        .unwrap();
        assert!(beach.is_geographic());
        assert!(!cafe.is_geographic());
    }

    #[test]
    fn test_geographic_word_inside_venue_type_is_not_geographic() {
        for venue_type in ["Salão de bilhar", "Country club", "Bar de praia", "Parque paisagístico"] {
            let item = Recommendation {
                venue: VenueDetails {
                    establishment_type: Some(venue_type.to_string()),
                    ..Default::default()
                },
                ..Default::default()
            };
            assert!(!item.is_geographic(), "{venue_type}");
        }

        let island = Recommendation {
            venue: VenueDetails {
                establishment_type: Some("  Ilha ".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(island.is_geographic());
    }
}
