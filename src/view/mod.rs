//! Live Map View
//!
//! State store, line filter form and the marker rendering pipeline.
//!
//! Data flows one way: fetch results and the location land in the
//! [`ViewStore`], the store notifies subscribers, and a [`MapView`] turns
//! each snapshot into a full marker set for its [`MapRenderer`].

pub mod form;
pub mod icons;
pub mod map;
pub mod render;
pub mod state;

pub use form::{QueryForm, VehicleQuery};
pub use icons::{IconSet, IconSpec, IconsAlreadyInstalled};
pub use map::{build_markers, vehicle_popup, MapRenderer, MapView, Marker, MarkerKind, Popup, TileLayer};
pub use render::{MemoryRenderer, RenderCall, TextRenderer};
pub use state::{
    Applied, ErrorOrigin, LocationStatus, Phase, RequestKey, Ticket, ViewError, ViewState,
    ViewStore,
};
