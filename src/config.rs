use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::listings::geo::Coordinates;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Campus anchor used for every distance measurement: the Rice University
/// main entrance.
const DEFAULT_CAMPUS_LAT: f64 = 29.7174;
const DEFAULT_CAMPUS_LON: f64 = -95.4018;

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub backend: Option<BackendConfig>,
    pub geo: GeoConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let backend = match env::var("BACKEND_URL") {
            Ok(base_url) if !base_url.is_empty() => Some(BackendConfig {
                base_url,
                service_key: env::var("BACKEND_SERVICE_KEY").unwrap_or_default(),
                photo_bucket: env::var("PHOTO_BUCKET")
                    .unwrap_or_else(|_| "listing-photos".to_string()),
            }),
            _ => None,
        };

        let geo = GeoConfig {
            geocode_url: env::var("GEOCODE_URL")
                .unwrap_or_else(|_| "https://geocode.maps.co/search".to_string()),
            geocode_api_key: env::var("GEOCODE_API_KEY").unwrap_or_default(),
            routing_url: env::var("ROUTING_URL")
                .unwrap_or_else(|_| "https://router.project-osrm.org".to_string()),
            campus: Coordinates {
                lat: parse_coordinate("CAMPUS_LAT", DEFAULT_CAMPUS_LAT)?,
                lon: parse_coordinate("CAMPUS_LON", DEFAULT_CAMPUS_LON)?,
            },
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            backend,
            geo,
        })
    }
}

fn parse_coordinate(key: &'static str, default: f64) -> Result<f64, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidCoordinate { key }),
        Err(_) => Ok(default),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Connection details for the managed data store and its object storage.
/// Absent when the service runs against in-memory backends.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub base_url: String,
    pub service_key: String,
    pub photo_bucket: String,
}

/// Endpoints for the geocoding and routing services plus the campus anchor.
#[derive(Debug, Clone)]
pub struct GeoConfig {
    pub geocode_url: String,
    pub geocode_api_key: String,
    pub routing_url: String,
    pub campus: Coordinates,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidCoordinate { key: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidCoordinate { key } => {
                write!(f, "{key} must parse to a decimal coordinate")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidCoordinate { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
