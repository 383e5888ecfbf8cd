//! Location Context Resolver: turns device coordinates into a place name and
//! country that the prompt builder can mention.
//!
//! Resolution is opt-in. A failed lookup never surfaces to the user: the
//! context just stays empty and prompts omit the location section.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Phrases that imply the user is asking about their surroundings.
/// Matched as lowercase substrings of the query.
pub const LOCALITY_KEYWORDS: &[&str] = &[
    "perto",
    "aqui",
    "nesta cidade",
    "próximo",
    "proximo",
    "por aqui",
    "na minha região",
    "arredores",
    "near me",
    "nearby",
];

const USER_AGENT: &str = concat!("concierge/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coords {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationContext {
    pub coords: Option<Coords>,
    pub place_name: Option<String>,
    pub country: Option<String>,
}

impl LocationContext {
    /// Resolved means a place name is known; coordinates alone are not enough
    /// to say anything useful in a prompt.
    pub fn is_resolved(&self) -> bool {
        self.place_name.is_some()
    }

    /// "Lisboa, Portugal", or just the place when the country is unknown.
    pub fn label(&self) -> Option<String> {
        let place = self.place_name.as_deref()?;
        Some(match self.country.as_deref() {
            Some(country) => format!("{place}, {country}"),
            None => place.to_string(),
        })
    }
}

/// Case-insensitive scan for any locality keyword.
pub fn mentions_locality(text: &str) -> bool {
    let lowered = text.to_lowercase();
    LOCALITY_KEYWORDS.iter().any(|k| lowered.contains(k))
}

#[derive(Debug, Error)]
pub enum LocationError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Geocoder returned status {0}")]
    Status(u16),

    #[error("No place name for coordinates")]
    NoPlace,
}

/// Reverse-geocoding capability. Swappable so tests never touch the network.
#[async_trait]
pub trait LocationResolver: Send + Sync {
    async fn resolve(&self, coords: Coords) -> Result<LocationContext, LocationError>;
}

#[derive(Debug, Deserialize)]
struct NominatimResponse {
    #[serde(default)]
    address: NominatimAddress,
}

#[derive(Debug, Default, Deserialize)]
struct NominatimAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    county: Option<String>,
    state: Option<String>,
    country: Option<String>,
}

impl NominatimAddress {
    fn place_name(&self) -> Option<&str> {
        [&self.city, &self.town, &self.village, &self.county, &self.state]
            .into_iter()
            .find_map(|p| p.as_deref())
    }
}

/// Reverse geocoder against a Nominatim-compatible endpoint.
#[derive(Clone)]
pub struct NominatimResolver {
    client: Client,
    base_url: String,
}

impl NominatimResolver {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .user_agent(USER_AGENT)
                .build()
                .expect("Failed to build HTTP client"),
            base_url,
        }
    }
}

#[async_trait]
impl LocationResolver for NominatimResolver {
    async fn resolve(&self, coords: Coords) -> Result<LocationContext, LocationError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("format", "json".to_string()),
                ("lat", coords.latitude.to_string()),
                ("lon", coords.longitude.to_string()),
                ("zoom", "10".to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(LocationError::Status(status.as_u16()));
        }

        let body: NominatimResponse = response.json().await?;
        let place = body.address.place_name().ok_or(LocationError::NoPlace)?;
        debug!("Reverse geocoded ({}, {}) to {place}", coords.latitude, coords.longitude);

        Ok(LocationContext {
            coords: Some(coords),
            place_name: Some(place.to_string()),
            country: body.address.country.clone(),
        })
    }
}
