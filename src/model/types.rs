//! Core map data types
//!
//! Vehicles, stops and the user's location as the view sees them, after
//! decoding but before coordinate validation.

use serde::{Serialize, Serializer};
use std::fmt;

/// A WGS84 position
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Both components are real numbers (not NaN, not infinite)
    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5}, {:.5}", self.latitude, self.longitude)
    }
}

/// Anything that can be placed on the map
pub trait Positioned {
    fn coordinate(&self) -> Coordinate;
}

/// Direction of travel reported by a vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heading {
    /// Whole degrees in `[0, 360)`
    Degrees(u16),
    /// The feed reported the sentinel value, or nothing usable
    Unknown,
}

impl Heading {
    /// Value the feed uses when the heading is not known
    pub const UNKNOWN_SENTINEL: u16 = 999;

    /// Interpret a raw feed value.
    ///
    /// Fractional headings are truncated. Anything outside `[0, 360)`,
    /// including the sentinel, is unknown.
    pub fn from_raw(raw: f64) -> Self {
        if raw.is_finite() && (0.0..360.0).contains(&raw) {
            Heading::Degrees(raw as u16)
        } else {
            Heading::Unknown
        }
    }

    pub fn degrees(&self) -> Option<u16> {
        match self {
            Heading::Degrees(d) => Some(*d),
            Heading::Unknown => None,
        }
    }
}

impl fmt::Display for Heading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Heading::Degrees(d) => write!(f, "{}°", d),
            Heading::Unknown => f.write_str("unknown"),
        }
    }
}

impl Serialize for Heading {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.degrees().unwrap_or(Self::UNKNOWN_SENTINEL))
    }
}

/// Ground speed reported by a vehicle
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Speed {
    Kmh(f64),
    /// Not a number, negative or infinite
    Invalid,
}

impl Speed {
    pub fn from_raw(raw: f64) -> Self {
        if raw.is_finite() && raw >= 0.0 {
            Speed::Kmh(raw)
        } else {
            Speed::Invalid
        }
    }

    pub fn kmh(&self) -> Option<f64> {
        match self {
            Speed::Kmh(v) => Some(*v),
            Speed::Invalid => None,
        }
    }
}

impl fmt::Display for Speed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Speed::Kmh(v) => write!(f, "{} km/h", v),
            Speed::Invalid => f.write_str("N/A"),
        }
    }
}

impl Serialize for Speed {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Speed::Kmh(v) => serializer.serialize_f64(*v),
            Speed::Invalid => serializer.serialize_none(),
        }
    }
}

/// One live vehicle position
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehiclePosition {
    pub latitude: f64,
    pub longitude: f64,
    /// Human-readable type ("bus", "tram", ...); empty when the feed has none
    pub transport_type: String,
    pub line_number: String,
    pub speed: Speed,
    pub heading: Heading,
}

impl VehiclePosition {
    /// A vehicle with unknown speed and heading; see [`Self::speed`] and [`Self::heading`]
    pub fn new(latitude: f64, longitude: f64, transport_type: &str, line_number: &str) -> Self {
        Self {
            latitude,
            longitude,
            transport_type: transport_type.to_string(),
            line_number: line_number.to_string(),
            speed: Speed::Invalid,
            heading: Heading::Unknown,
        }
    }

    pub fn speed(mut self, kmh: f64) -> Self {
        self.speed = Speed::from_raw(kmh);
        self
    }

    pub fn heading(mut self, degrees: f64) -> Self {
        self.heading = Heading::from_raw(degrees);
        self
    }
}

impl Positioned for VehiclePosition {
    fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// A transit stop
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StopPosition {
    pub lat: f64,
    pub lon: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl StopPosition {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            name: None,
        }
    }
}

impl Positioned for StopPosition {
    fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lon)
    }
}

/// Where the user is, as reported once by the location capability
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UserLocation {
    pub latitude: f64,
    pub longitude: f64,
}

impl UserLocation {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl Positioned for UserLocation {
    fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_sentinel_is_unknown() {
        assert_eq!(Heading::from_raw(999.0), Heading::Unknown);
        assert_eq!(Heading::from_raw(999.0).to_string(), "unknown");
    }

    #[test]
    fn test_heading_in_range_renders_degrees() {
        for raw in [0, 1, 90, 180, 359] {
            let heading = Heading::from_raw(raw as f64);
            assert_eq!(heading, Heading::Degrees(raw));
            assert_eq!(heading.to_string(), format!("{}°", raw));
        }
    }

    #[test]
    fn test_heading_out_of_range() {
        assert_eq!(Heading::from_raw(360.0), Heading::Unknown);
        assert_eq!(Heading::from_raw(-1.0), Heading::Unknown);
        assert_eq!(Heading::from_raw(f64::NAN), Heading::Unknown);
    }

    #[test]
    fn test_speed_display() {
        assert_eq!(Speed::from_raw(f64::NAN).to_string(), "N/A");
        assert_eq!(Speed::from_raw(30.0).to_string(), "30 km/h");
        assert_eq!(Speed::from_raw(12.5).to_string(), "12.5 km/h");
        assert_eq!(Speed::from_raw(0.0).to_string(), "0 km/h");
    }

    #[test]
    fn test_coordinate_finiteness() {
        assert!(Coordinate::new(59.4, 24.7).is_finite());
        assert!(!Coordinate::new(f64::NAN, 24.7).is_finite());
        assert!(!Coordinate::new(59.4, f64::INFINITY).is_finite());
    }

    #[test]
    fn test_vehicle_serializes_wire_shape() {
        let vehicle = VehiclePosition::new(59.4, 24.7, "bus", "5").speed(30.0);
        let json = serde_json::to_value(&vehicle).unwrap();
        assert_eq!(json["line_number"], "5");
        assert_eq!(json["speed"], 30.0);
        assert_eq!(json["heading"], 999);
    }
}
