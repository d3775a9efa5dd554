//! Map Data Model
//!
//! Vehicle positions, stops and the user's location, plus lenient decoding
//! of the two endpoint response shapes.

mod types;
mod wire;

pub use types::{
    Coordinate, Heading, Positioned, Speed, StopPosition, UserLocation, VehiclePosition,
};
pub use wire::{decode_stops, decode_vehicles, sanitize_non_finite, DecodeError};
