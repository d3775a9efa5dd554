//! # Transport Map
//!
//! Live transit map view: polls vehicle positions and stops from a backend,
//! drops records with invalid coordinates, and renders them as map markers
//! centered on the user's location.
//!
//! ## Modules
//!
//! - [`model`]: Vehicle, stop and location types, response decoding
//! - [`source`]: Data source seam and its HTTP implementation
//! - [`geo`]: One-shot user location
//! - [`view`]: View state store, line filter form, map view and renderers
//! - [`session`]: Wires everything into a live session
//! - [`server`]: Backend serving `/vehicles` and `/stops`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use transport_map::config::Config;
//! use transport_map::geo::UnsupportedLocator;
//! use transport_map::session::LiveSession;
//! use transport_map::source::HttpDataSource;
//! use transport_map::view::{MapView, TextRenderer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_default();
//!
//!     let source = Arc::new(HttpDataSource::new(config.source.clone())?);
//!     let session = LiveSession::new(source, Arc::new(UnsupportedLocator), config.session.clone())
//!         .with_filter("5");
//!
//!     // Redraw on every change
//!     let view = MapView::new(TextRenderer::stdout(), &config.map);
//!     tokio::spawn(view.follow(session.subscribe()));
//!
//!     session.mount().settled().await?;
//!     println!("{} vehicles", session.snapshot().vehicles.len());
//!
//!     session.shutdown();
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod geo;
pub mod logging;
pub mod model;
pub mod server;
pub mod session;
pub mod source;
pub mod view;

// Re-export top-level types for convenience
pub use model::{
    Coordinate, DecodeError, Heading, Positioned, Speed, StopPosition, UserLocation,
    VehiclePosition,
};

pub use source::{DataSource, FetchError, Fetched, HttpDataSource};

pub use geo::{GeoLocator, LocationError};

pub use view::{
    MapRenderer, MapView, Marker, QueryForm, ViewError, ViewState, ViewStore,
};

pub use session::LiveSession;

pub use server::{build_router, serve, ApiError, ServerState};

pub use config::{Config, ConfigError, LoggingConfig, ServerConfig, SessionConfig, SourceConfig};
