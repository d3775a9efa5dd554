//! Stops File
//!
//! Loads stops from the transit authority's XML export:
//!
//! ```xml
//! <stops>
//!   <stop id="1" id0="100" name="Vabaduse väljak" lat="59.4338" lon="24.7453">
//!     <route transport="bus" num="5" direction="a-b" directionName="Metsakooli" stopNum="3"/>
//!   </stop>
//! </stops>
//! ```
//!
//! A stop takes the attributes of its last `<route>`. Only stops of the
//! requested transport with every field present are kept.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StopsError {
    #[error("Failed to read stops file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid stops XML at byte {position}: {source}")]
    Xml {
        position: usize,
        #[source]
        source: quick_xml::Error,
    },
}

/// One stop as served by `/stops`. Coordinates stay as the file spells them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StopRecord {
    pub id: String,
    pub id0: String,
    pub name: String,
    pub lat: String,
    pub lon: String,
    pub transport: String,
    pub num: String,
    pub direction: String,
    #[serde(rename = "directionName")]
    pub direction_name: String,
    #[serde(rename = "stopNum")]
    pub stop_num: String,
}

/// A `<stop>` while its routes are being read
#[derive(Debug, Default)]
struct PartialStop {
    stop: HashMap<String, String>,
    route: HashMap<String, String>,
}

impl PartialStop {
    fn finish(mut self) -> Option<StopRecord> {
        let mut stop = |key: &str| self.stop.remove(key);
        let (id, id0, name, lat, lon) = (stop("id"), stop("id0"), stop("name"), stop("lat"), stop("lon"));
        let mut route = |key: &str| self.route.remove(key);

        Some(StopRecord {
            id: id?,
            id0: id0?,
            name: name?,
            lat: lat?,
            lon: lon?,
            transport: route("transport")?,
            num: route("num")?,
            direction: route("direction")?,
            direction_name: route("directionName")?,
            stop_num: route("stopNum")?,
        })
    }
}

/// Parse a stops document, keeping stops of `transport` in document order
pub fn parse_stops(xml: &str, transport: &str) -> Result<Vec<StopRecord>, StopsError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut stops = Vec::new();
    let mut current: Option<PartialStop> = None;
    let mut incomplete = 0usize;

    let mut keep = |partial: PartialStop, stops: &mut Vec<StopRecord>| match partial.finish() {
        Some(stop) if stop.transport == transport => stops.push(stop),
        Some(_) => {}
        None => incomplete += 1,
    };

    loop {
        let event = reader.read_event().map_err(|source| StopsError::Xml {
            position: reader.buffer_position(),
            source,
        })?;

        match event {
            Event::Start(e) if e.name().as_ref() == b"stop" => {
                current = Some(PartialStop {
                    stop: attributes(&e, &reader)?,
                    route: HashMap::new(),
                });
            }
            Event::Empty(e) if e.name().as_ref() == b"stop" => {
                let partial = PartialStop {
                    stop: attributes(&e, &reader)?,
                    route: HashMap::new(),
                };
                keep(partial, &mut stops);
            }
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"route" => {
                if let Some(partial) = current.as_mut() {
                    partial.route = attributes(&e, &reader)?;
                }
            }
            Event::End(e) if e.name().as_ref() == b"stop" => {
                if let Some(partial) = current.take() {
                    keep(partial, &mut stops);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if incomplete > 0 {
        tracing::debug!(incomplete, "Skipped stops with missing fields");
    }
    Ok(stops)
}

/// Read and parse a stops file
pub async fn load_stops(path: &Path, transport: &str) -> Result<Vec<StopRecord>, StopsError> {
    let xml = tokio::fs::read_to_string(path).await?;
    parse_stops(&xml, transport)
}

fn attributes(e: &BytesStart<'_>, reader: &Reader<&[u8]>) -> Result<HashMap<String, String>, StopsError> {
    let xml_error = |source: quick_xml::Error| StopsError::Xml {
        position: reader.buffer_position(),
        source,
    };

    let mut map = HashMap::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|e| xml_error(e.into()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(xml_error)?.into_owned();
        map.insert(key, value);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const STOPS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<stops>
  <stop id="1" id0="100" name="Vabaduse v&#228;ljak" lat="59.4338" lon="24.7453">
    <route transport="tram" num="3" direction="a-b" directionName="Kadriorg" stopNum="2"/>
    <route transport="bus" num="5" direction="a-b" directionName="Metsakooli" stopNum="3"/>
  </stop>
  <stop id="2" id0="200" name="Balti jaam" lat="59.4400" lon="24.7370">
    <route transport="bus" num="21" direction="b-a" directionName="Balti jaam" stopNum="1"/>
    <route transport="tram" num="1" direction="b-a" directionName="Kopli" stopNum="7"/>
  </stop>
  <stop id="3" id0="300" name="Kaubamaja" lat="59.4333" lon="24.7536">
    <route transport="bus" num="17" direction="a-b" stopNum="4"/>
  </stop>
  <stop id="4" id0="400" name="Lonely" lat="59.4" lon="24.7"/>
  <stop id="5" id0="500" name="Hobujaama" lat="59.4370" lon="24.7590">
    <route transport="bus" num="2" direction="a-b" directionName="Mõigu" stopNum="9"></route>
  </stop>
</stops>"#;

    #[test]
    fn test_last_route_wins() {
        let stops = parse_stops(STOPS, "bus").unwrap();
        let ids: Vec<_> = stops.iter().map(|s| s.id.as_str()).collect();

        // stop 2 ends on a tram route, stop 3 lacks a directionName, stop 4 has no route
        assert_eq!(ids, vec!["1", "5"]);
        assert_eq!(stops[0].num, "5");
        assert_eq!(stops[0].name, "Vabaduse väljak");
        assert_eq!(stops[0].lat, "59.4338");
        assert_eq!(stops[1].direction_name, "Mõigu");
    }

    #[test]
    fn test_other_transport() {
        let stops = parse_stops(STOPS, "tram").unwrap();
        assert_eq!(stops.len(), 1);
        assert_eq!(stops[0].id, "2");
        assert_eq!(stops[0].stop_num, "7");
    }

    #[test]
    fn test_serialized_field_names() {
        let stops = parse_stops(STOPS, "bus").unwrap();
        let json = serde_json::to_value(&stops[0]).unwrap();

        assert_eq!(json["directionName"], "Metsakooli");
        assert_eq!(json["stopNum"], "3");
        assert_eq!(json["lat"], "59.4338");
    }

    #[test]
    fn test_malformed_xml() {
        let result = parse_stops("<stops><stop id=\"1\"></route></stops>", "bus");
        assert!(matches!(result, Err(StopsError::Xml { .. })));
    }

    #[tokio::test]
    async fn test_load_stops() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(STOPS.as_bytes()).unwrap();

        let stops = load_stops(file.path(), "bus").await.unwrap();
        assert_eq!(stops.len(), 2);

        let missing = load_stops(Path::new("/nonexistent/stops.xml"), "bus").await;
        assert!(matches!(missing, Err(StopsError::Io(_))));
    }
}
