use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// Driving route summary between two points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteSummary {
    pub distance_meters: f64,
    pub duration_seconds: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum GeoError {
    #[error("no geocoding candidates for '{0}'")]
    NoMatch(String),
    #[error("no driving route found")]
    NoRoute,
    #[error("geocoding request failed: {0}")]
    Geocode(String),
    #[error("routing request failed: {0}")]
    Routing(String),
}

/// Gateway over the third-party geocoding and routing HTTP APIs.
#[async_trait]
pub trait GeoGateway: Send + Sync {
    /// Resolve a free-form address to zero or more candidates, best first.
    async fn geocode(&self, query: &str) -> Result<Vec<Coordinates>, GeoError>;
    async fn driving_route(
        &self,
        from: Coordinates,
        to: Coordinates,
    ) -> Result<RouteSummary, GeoError>;
}

const MILES_PER_METER: f64 = 0.000_621_371;

/// Convert a route distance to miles, one decimal place.
pub fn meters_to_miles(meters: f64) -> f64 {
    (meters * MILES_PER_METER * 10.0).round() / 10.0
}

/// reqwest-backed gateway talking to a Nominatim-style geocoder and an
/// OSRM-style router.
pub struct HttpGeoGateway {
    client: reqwest::Client,
    geocode_url: String,
    geocode_api_key: String,
    routing_url: String,
}

impl HttpGeoGateway {
    pub fn new(
        geocode_url: String,
        geocode_api_key: String,
        routing_url: String,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;

        Ok(Self {
            client,
            geocode_url,
            geocode_api_key,
            routing_url,
        })
    }
}

/// The geocoder returns coordinates as decimal strings.
#[derive(Debug, Deserialize)]
struct GeocodeCandidate {
    lat: String,
    lon: String,
}

impl GeocodeCandidate {
    fn into_coordinates(self) -> Result<Coordinates, GeoError> {
        let lat = self
            .lat
            .parse()
            .map_err(|_| GeoError::Geocode(format!("unparseable latitude '{}'", self.lat)))?;
        let lon = self
            .lon
            .parse()
            .map_err(|_| GeoError::Geocode(format!("unparseable longitude '{}'", self.lon)))?;
        Ok(Coordinates { lat, lon })
    }
}

#[derive(Debug, Deserialize)]
struct RouteResponse {
    #[serde(default)]
    routes: Vec<RouteLeg>,
}

#[derive(Debug, Deserialize)]
struct RouteLeg {
    distance: f64,
    duration: f64,
}

#[async_trait]
impl GeoGateway for HttpGeoGateway {
    async fn geocode(&self, query: &str) -> Result<Vec<Coordinates>, GeoError> {
        let response = self
            .client
            .get(&self.geocode_url)
            .query(&[("q", query), ("api_key", self.geocode_api_key.as_str())])
            .send()
            .await
            .map_err(|err| GeoError::Geocode(err.to_string()))?;

        if !response.status().is_success() {
            return Err(GeoError::Geocode(format!("status {}", response.status())));
        }

        let candidates: Vec<GeocodeCandidate> = response
            .json()
            .await
            .map_err(|err| GeoError::Geocode(err.to_string()))?;

        candidates
            .into_iter()
            .map(GeocodeCandidate::into_coordinates)
            .collect()
    }

    async fn driving_route(
        &self,
        from: Coordinates,
        to: Coordinates,
    ) -> Result<RouteSummary, GeoError> {
        let url = format!(
            "{}/route/v1/driving/{},{};{},{}",
            self.routing_url.trim_end_matches('/'),
            from.lon,
            from.lat,
            to.lon,
            to.lat
        );

        let response = self
            .client
            .get(&url)
            .query(&[("overview", "false")])
            .send()
            .await
            .map_err(|err| GeoError::Routing(err.to_string()))?;

        if !response.status().is_success() {
            return Err(GeoError::Routing(format!("status {}", response.status())));
        }

        let body: RouteResponse = response
            .json()
            .await
            .map_err(|err| GeoError::Routing(err.to_string()))?;

        let route = body.routes.first().ok_or(GeoError::NoRoute)?;
        Ok(RouteSummary {
            distance_meters: route.distance,
            duration_seconds: route.duration,
        })
    }
}
