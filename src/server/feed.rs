//! GPS Feed
//!
//! Parses the upstream real-time GPS text feed. The feed is header-less CSV,
//! one vehicle per line:
//!
//! `transport_type, line_number, latitude, longitude, speed, heading, vehicle_number, vehicle_type, ...`
//!
//! Coordinates are integer micro-degrees. Fields that do not parse are kept
//! as absent rather than failing the row; clients drop vehicles without
//! usable coordinates themselves.

use serde::Serialize;

/// One vehicle as served by `/vehicles`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedRow {
    pub transport_type: Option<&'static str>,
    pub line_number: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub speed: f64,
    pub heading: Option<i64>,
    pub vehicle_number: Option<String>,
    pub vehicle_type: Option<String>,
}

/// Result of parsing one feed snapshot
#[derive(Debug, Default)]
pub struct FeedParse {
    pub rows: Vec<FeedRow>,
    pub rows_failed: usize,
}

const MICRO_DEGREES: f64 = 1_000_000.0;

/// Name for a numeric transport type code
pub fn transport_type_name(code: &str) -> Option<&'static str> {
    match code.trim().parse::<u8>().ok()? {
        1 => Some("trolleybus"),
        2 => Some("bus"),
        3 => Some("tram"),
        7 => Some("night bus"),
        _ => None,
    }
}

/// Parse a feed snapshot, keeping feed order
pub fn parse_feed(text: &str) -> FeedParse {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut parsed = FeedParse::default();

    for (line_num, result) in reader.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!(line = line_num + 1, error = %e, "Skipping unreadable feed line");
                parsed.rows_failed += 1;
                continue;
            }
        };

        let line_number = match record.get(1) {
            Some(line) => line.to_string(),
            None => {
                tracing::debug!(line = line_num + 1, "Skipping feed line without a line number");
                parsed.rows_failed += 1;
                continue;
            }
        };

        let field = |idx: usize| record.get(idx).filter(|s| !s.is_empty());
        let number = |idx: usize| {
            field(idx)
                .and_then(|s| s.parse::<f64>().ok())
                .filter(|v| v.is_finite())
        };

        parsed.rows.push(FeedRow {
            transport_type: field(0).and_then(transport_type_name),
            line_number,
            latitude: number(2).map(|v| v / MICRO_DEGREES),
            longitude: number(3).map(|v| v / MICRO_DEGREES),
            speed: number(4).unwrap_or(0.0),
            heading: number(5).map(|v| v as i64),
            vehicle_number: field(6).map(str::to_string),
            vehicle_type: field(7).map(str::to_string),
        });
    }

    parsed
}

/// Rows on `line`, matched verbatim; every row when no line is given
pub fn filter_line(rows: Vec<FeedRow>, line: Option<&str>) -> Vec<FeedRow> {
    match line {
        Some(line) => rows.into_iter().filter(|r| r.line_number == line).collect(),
        None => rows,
    }
}
