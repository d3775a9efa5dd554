//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::model::{Coordinate, UserLocation};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub map: MapConfig,

    #[serde(default)]
    pub location: LocationConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the view fetches vehicles and stops from
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_vehicles_path")]
    pub vehicles_path: String,

    #[serde(default = "default_stops_path")]
    pub stops_path: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

fn default_base_url() -> String {
    "http://localhost:8082".to_string()
}

fn default_vehicles_path() -> String {
    "/vehicles".to_string()
}

fn default_stops_path() -> String {
    "/stops".to_string()
}

fn default_request_timeout() -> u64 {
    10_000
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            vehicles_path: default_vehicles_path(),
            stops_path: default_stops_path(),
            request_timeout_ms: default_request_timeout(),
        }
    }
}

impl SourceConfig {
    /// Source pointing at a different backend, other settings default
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }
}

/// Polling behaviour of a live session
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Seconds between vehicle re-polls, 0 disables polling
    #[serde(default = "default_vehicle_refresh")]
    pub vehicle_refresh_secs: u64,

    /// Seconds between stop re-polls, 0 fetches stops once per session
    #[serde(default)]
    pub stops_refresh_secs: u64,

    /// Also re-fetch stops whenever the line filter changes
    #[serde(default)]
    pub refetch_stops_on_filter_change: bool,

    #[serde(default = "default_locate_timeout")]
    pub locate_timeout_ms: u64,
}

fn default_vehicle_refresh() -> u64 {
    15
}

fn default_locate_timeout() -> u64 {
    10_000
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            vehicle_refresh_secs: default_vehicle_refresh(),
            stops_refresh_secs: 0,
            refetch_stops_on_filter_change: false,
            locate_timeout_ms: default_locate_timeout(),
        }
    }
}

/// Map presentation settings
#[derive(Debug, Clone, Deserialize)]
pub struct MapConfig {
    /// `[latitude, longitude]` shown before any target is known
    #[serde(default = "default_initial_center")]
    pub initial_center: [f64; 2],

    #[serde(default = "default_initial_zoom")]
    pub initial_zoom: u8,

    /// Zoom used when re-centering on a target
    #[serde(default = "default_focus_zoom")]
    pub focus_zoom: u8,

    #[serde(default = "default_tile_url")]
    pub tile_url: String,

    #[serde(default = "default_attribution")]
    pub attribution: String,
}

fn default_initial_center() -> [f64; 2] {
    [59.437, 24.7535]
}

fn default_initial_zoom() -> u8 {
    7
}

fn default_focus_zoom() -> u8 {
    15
}

fn default_tile_url() -> String {
    "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png".to_string()
}

fn default_attribution() -> String {
    "&copy; <a href='https://www.openstreetmap.org/copyright'>OpenStreetMap</a> contributors"
        .to_string()
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            initial_center: default_initial_center(),
            initial_zoom: default_initial_zoom(),
            focus_zoom: default_focus_zoom(),
            tile_url: default_tile_url(),
            attribution: default_attribution(),
        }
    }
}

impl MapConfig {
    pub fn initial_center(&self) -> Coordinate {
        Coordinate::new(self.initial_center[0], self.initial_center[1])
    }
}

/// Fixed position reported by the command-line locator
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocationConfig {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl LocationConfig {
    /// Configured position, if both components are set
    pub fn fixed(&self) -> Option<UserLocation> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some(UserLocation::new(lat, lon)),
            _ => None,
        }
    }
}

/// Vehicles/stops backend configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Upstream GPS text feed
    #[serde(default = "default_upstream_url")]
    pub upstream_gps_url: String,

    #[serde(default = "default_upstream_timeout")]
    pub upstream_timeout_ms: u64,

    /// Stops XML file served by `/stops`
    #[serde(default = "default_stops_file")]
    pub stops_file: String,

    /// Only stops served by this transport are returned
    #[serde(default = "default_stops_transport")]
    pub stops_transport: String,

    #[serde(default = "default_cors_permissive")]
    pub cors_permissive: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8082
}

fn default_upstream_url() -> String {
    "https://transport.tallinn.ee/gps.txt".to_string()
}

fn default_upstream_timeout() -> u64 {
    10_000
}

fn default_stops_file() -> String {
    "stops.xml".to_string()
}

fn default_stops_transport() -> String {
    "bus".to_string()
}

fn default_cors_permissive() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            upstream_gps_url: default_upstream_url(),
            upstream_timeout_ms: default_upstream_timeout(),
            stops_file: default_stops_file(),
            stops_transport: default_stops_transport(),
            cors_permissive: default_cors_permissive(),
        }
    }
}

impl ServerConfig {
    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            error,
        })
    }

    fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("transport-map").join("config.toml")),
            Some(PathBuf::from("/etc/transport-map/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var("TRANSPORT_MAP_API_URL") {
            self.source.base_url = url;
        }

        if let Some(host) = var("TRANSPORT_MAP_HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("TRANSPORT_MAP_PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(url) = var("TRANSPORT_MAP_UPSTREAM_URL") {
            self.server.upstream_gps_url = url;
        }
        if let Some(file) = var("TRANSPORT_MAP_STOPS_FILE") {
            self.server.stops_file = file;
        }

        if let Some(level) = var("TRANSPORT_MAP_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("TRANSPORT_MAP_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Transport Map Configuration
#
# Environment variables override these settings:
# - TRANSPORT_MAP_API_URL
# - TRANSPORT_MAP_HOST
# - TRANSPORT_MAP_PORT
# - TRANSPORT_MAP_UPSTREAM_URL
# - TRANSPORT_MAP_STOPS_FILE
# - TRANSPORT_MAP_LOG_LEVEL
# - TRANSPORT_MAP_LOG_FORMAT

[source]
# Backend serving the vehicles and stops endpoints
base_url = "http://localhost:8082"
vehicles_path = "/vehicles"
stops_path = "/stops"

# Request timeout in milliseconds
request_timeout_ms = 10000

[session]
# Re-poll vehicles every N seconds (0 = only on mount and filter changes)
vehicle_refresh_secs = 15

# Re-poll stops every N seconds (0 = once per session)
stops_refresh_secs = 0

# Re-fetch stops whenever the line filter changes
refetch_stops_on_filter_change = false

# How long to wait for a location fix (ms)
locate_timeout_ms = 10000

[map]
initial_center = [59.437, 24.7535]
initial_zoom = 7
focus_zoom = 15
tile_url = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png"

[location]
# Fixed position reported as the user's location
# latitude = 59.437
# longitude = 24.7535

[server]
host = "0.0.0.0"
port = 8082

# Upstream live GPS feed
upstream_gps_url = "https://transport.tallinn.ee/gps.txt"
upstream_timeout_ms = 10000

# Stops XML file and the transport whose stops are served
stops_file = "stops.xml"
stops_transport = "bus"

cors_permissive = true

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_config_parses() {
        let config = Config::parse(&generate_default_config()).unwrap();

        assert_eq!(config.source.base_url, "http://localhost:8082");
        assert_eq!(config.session.vehicle_refresh_secs, 15);
        assert!(!config.session.refetch_stops_on_filter_change);
        assert_eq!(config.map.initial_zoom, 7);
        assert_eq!(config.map.focus_zoom, 15);
        assert_eq!(config.server.stops_transport, "bus");
        assert!(config.location.fixed().is_none());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = Config::parse("[source]\nbase_url = \"http://example.test\"\n").unwrap();

        assert_eq!(config.source.base_url, "http://example.test");
        assert_eq!(config.source.vehicles_path, "/vehicles");
        assert_eq!(config.server.port, 8082);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[location]\nlatitude = 59.4\nlongitude = 24.7").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.location.fixed(), Some(UserLocation::new(59.4, 24.7)));
    }

    #[test]
    fn test_load_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nport = \"not a port\"").unwrap();

        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = Config::load(Path::new("/nonexistent/transport-map.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("TRANSPORT_MAP_API_URL", "http://backend:9000"),
            ("TRANSPORT_MAP_PORT", "9100"),
            ("TRANSPORT_MAP_LOG_FORMAT", "json"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.source.base_url, "http://backend:9000");
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.addr(), "0.0.0.0:9100");
        assert_eq!(config.logging.format, "json");
    }
}
