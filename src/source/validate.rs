//! Coordinate validation

use crate::model::Positioned;

use super::Fetched;

/// Keep records whose coordinates are finite, preserving order
pub fn retain_finite<T: Positioned>(records: Vec<T>) -> Fetched<T> {
    let total = records.len();
    let records: Vec<T> = records
        .into_iter()
        .filter(|r| r.coordinate().is_finite())
        .collect();

    Fetched {
        dropped: total - records.len(),
        records,
    }
}
