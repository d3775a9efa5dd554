//! Response decoding
//!
//! The vehicles and stops endpoints are loosely typed: numbers may arrive as
//! JSON numbers, numeric strings, `null`, or bare `NaN` tokens. Decoding is
//! lenient per field; anything that is not a usable number becomes NaN and is
//! left for coordinate validation to drop.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::borrow::Cow;
use thiserror::Error;

use super::types::{Heading, Speed, StopPosition, VehiclePosition};

/// Errors decoding a response body
#[derive(Error, Debug)]
pub enum DecodeError {
    /// Body is not a JSON array
    #[error("Invalid response body: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct VehicleRecord {
    #[serde(default = "nan", deserialize_with = "lenient_f64")]
    latitude: f64,
    #[serde(default = "nan", deserialize_with = "lenient_f64")]
    longitude: f64,
    #[serde(default, deserialize_with = "lenient_string")]
    transport_type: String,
    #[serde(default, deserialize_with = "lenient_string")]
    line_number: String,
    #[serde(default = "nan", deserialize_with = "lenient_f64")]
    speed: f64,
    #[serde(default = "nan", deserialize_with = "lenient_f64")]
    heading: f64,
}

impl From<VehicleRecord> for VehiclePosition {
    fn from(r: VehicleRecord) -> Self {
        Self {
            latitude: r.latitude,
            longitude: r.longitude,
            transport_type: r.transport_type,
            line_number: r.line_number,
            speed: Speed::from_raw(r.speed),
            heading: Heading::from_raw(r.heading),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StopRecord {
    #[serde(default = "nan", deserialize_with = "lenient_f64")]
    lat: f64,
    #[serde(default = "nan", deserialize_with = "lenient_f64")]
    lon: f64,
    #[serde(default, deserialize_with = "lenient_string")]
    name: String,
}

impl From<StopRecord> for StopPosition {
    fn from(r: StopRecord) -> Self {
        Self {
            lat: r.lat,
            lon: r.lon,
            name: Some(r.name).filter(|n| !n.is_empty()),
        }
    }
}

/// Decode a vehicles response body, keeping server order.
///
/// Only the outer array must be well formed. An element that is not a
/// vehicle object decodes to a position without coordinates, so validation
/// drops and counts it like any other invalid record.
pub fn decode_vehicles(body: &str) -> Result<Vec<VehiclePosition>, DecodeError> {
    decode_array(body, |value| match VehicleRecord::deserialize(value) {
        Ok(record) => VehiclePosition::from(record),
        Err(e) => {
            tracing::debug!(error = %e, "Unreadable vehicle record");
            VehiclePosition::new(f64::NAN, f64::NAN, "", "")
        }
    })
}

/// Decode a stops response body, keeping server order.
///
/// Unreadable elements decode to a stop without coordinates.
pub fn decode_stops(body: &str) -> Result<Vec<StopPosition>, DecodeError> {
    decode_array(body, |value| match StopRecord::deserialize(value) {
        Ok(record) => StopPosition::from(record),
        Err(e) => {
            tracing::debug!(error = %e, "Unreadable stop record");
            StopPosition::new(f64::NAN, f64::NAN)
        }
    })
}

fn decode_array<T>(body: &str, decode: impl FnMut(Value) -> T) -> Result<Vec<T>, DecodeError> {
    let values: Vec<Value> = serde_json::from_str(&sanitize_non_finite(body))?;
    Ok(values.into_iter().map(decode).collect())
}

/// Replace bare `NaN`, `Infinity` and `-Infinity` tokens with `null`.
///
/// Text inside JSON strings is left alone. Returns the input unchanged when
/// it has nothing to rewrite.
pub fn sanitize_non_finite(body: &str) -> Cow<'_, str> {
    const TOKENS: [&str; 3] = ["-Infinity", "Infinity", "NaN"];

    if !body.contains("NaN") && !body.contains("Infinity") {
        return Cow::Borrowed(body);
    }

    let mut out = String::with_capacity(body.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut rest = body;

    while let Some(c) = rest.chars().next() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
        } else if c == '"' {
            in_string = true;
        } else if let Some(token) = TOKENS.iter().find(|t| rest.starts_with(**t)) {
            out.push_str("null");
            rest = &rest[token.len()..];
            continue;
        }

        out.push(c);
        rest = &rest[c.len_utf8()..];
    }

    Cow::Owned(out)
}

fn nan() -> f64 {
    f64::NAN
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => s.trim().parse().unwrap_or(f64::NAN),
        _ => f64::NAN,
    })
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_vehicles_numbers() {
        let body = r#"[{"latitude":59.4,"longitude":24.7,"transport_type":"bus","line_number":"5","speed":30,"heading":90}]"#;
        let vehicles = decode_vehicles(body).unwrap();

        assert_eq!(vehicles.len(), 1);
        assert_eq!(vehicles[0].latitude, 59.4);
        assert_eq!(vehicles[0].line_number, "5");
        assert_eq!(vehicles[0].speed, Speed::Kmh(30.0));
        assert_eq!(vehicles[0].heading, Heading::Degrees(90));
    }

    #[test]
    fn test_decode_vehicles_lenient_fields() {
        let body = r#"[
            {"latitude":null,"longitude":"24.7","transport_type":null,"line_number":5,"speed":null,"heading":999},
            {"longitude":24.7}
        ]"#;
        let vehicles = decode_vehicles(body).unwrap();

        assert_eq!(vehicles.len(), 2);
        assert!(vehicles[0].latitude.is_nan());
        assert_eq!(vehicles[0].longitude, 24.7);
        assert_eq!(vehicles[0].transport_type, "");
        assert_eq!(vehicles[0].line_number, "5");
        assert_eq!(vehicles[0].speed, Speed::Invalid);
        assert_eq!(vehicles[0].heading, Heading::Unknown);
        assert!(vehicles[1].latitude.is_nan());
    }

    #[test]
    fn test_decode_bare_nan_tokens() {
        let body = r#"[{"latitude":NaN,"longitude":24.7,"speed":NaN,"heading":-Infinity,"line_number":"NaN"}]"#;
        let vehicles = decode_vehicles(body).unwrap();

        assert!(vehicles[0].latitude.is_nan());
        assert_eq!(vehicles[0].speed, Speed::Invalid);
        assert_eq!(vehicles[0].heading, Heading::Unknown);
        // Inside a string the token is data, not a number
        assert_eq!(vehicles[0].line_number, "NaN");
    }

    #[test]
    fn test_decode_stops_string_coordinates() {
        let body = r#"[{"id":"1","lat":"59.43","lon":"24.75","name":"Viru"},{"lat":"","lon":"24.75"}]"#;
        let stops = decode_stops(body).unwrap();

        assert_eq!(stops.len(), 2);
        assert_eq!(stops[0].lat, 59.43);
        assert_eq!(stops[0].name.as_deref(), Some("Viru"));
        assert!(stops[1].lat.is_nan());
    }

    #[test]
    fn test_decode_vehicles_mixed_array() {
        let body = r#"[{"latitude":59.4,"longitude":24.7,"line_number":"5"}, 1, "x", null]"#;
        let vehicles = decode_vehicles(body).unwrap();

        assert_eq!(vehicles.len(), 4);
        assert_eq!(vehicles[0].line_number, "5");
        assert!(vehicles[1..].iter().all(|v| v.latitude.is_nan()));

        let fetched = crate::source::retain_finite(vehicles);
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched.dropped, 3);
    }

    #[test]
    fn test_decode_stops_mixed_array() {
        let body = r#"[{"lat":59.43,"lon":24.75,"name":"Viru"},{"lat":59.44,"lon":24.76,"name":42},[1,2]]"#;
        let stops = decode_stops(body).unwrap();

        assert_eq!(stops.len(), 3);
        assert_eq!(stops[1].lat, 59.44);
        assert_eq!(stops[1].name.as_deref(), Some("42"));
        assert!(stops[2].lat.is_nan());
    }

    #[test]
    fn test_decode_rejects_non_array() {
        assert!(decode_vehicles(r#"{"error":"nope"}"#).is_err());
        assert!(decode_stops("not json").is_err());
    }

    #[test]
    fn test_sanitize_leaves_clean_input_borrowed() {
        let body = r#"[{"a":1}]"#;
        assert!(matches!(sanitize_non_finite(body), Cow::Borrowed(_)));
    }

    #[test]
    fn test_sanitize_respects_escaped_quotes() {
        let body = r#"[{"name":"say \"NaN\"","v":NaN}]"#;
        assert_eq!(
            sanitize_non_finite(body),
            r#"[{"name":"say \"NaN\"","v":null}]"#
        );
    }
}
