//! Map View
//!
//! Turns view state snapshots into marker sets for a map engine. The engine
//! itself (tiles, projection, drawing) sits behind [`MapRenderer`].
//!
//! Every render replaces the full marker set. Re-centering is driven by a
//! change of target, not by rendering: the map moves when the user's
//! location first becomes known, or when [`MapView::focus`] picks a new spot.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;

use crate::config::MapConfig;
use crate::model::{Coordinate, Positioned, StopPosition, VehiclePosition};

use super::icons::{icons, IconSpec};
use super::state::ViewState;

/// Background imagery source
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileLayer {
    /// URL template with `{s}`, `{z}`, `{x}`, `{y}` placeholders
    pub url_template: String,
    pub attribution: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    Vehicle,
    Stop,
    User,
}

/// Text shown when a marker is opened
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Popup {
    pub title: Option<String>,
    pub lines: Vec<String>,
}

/// One pin on the map
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub kind: MarkerKind,
    pub position: Coordinate,
    pub popup: Option<Popup>,
    pub icon: &'static IconSpec,
}

/// The map engine a [`MapView`] drives
pub trait MapRenderer {
    /// Set the tile layer; called once before anything else is drawn
    fn set_tile_layer(&mut self, layer: &TileLayer);

    /// Move the viewport
    fn set_view(&mut self, center: Coordinate, zoom: u8);

    /// Replace every marker on the map
    fn replace_markers(&mut self, markers: Vec<Marker>);

    /// Show or hide the loading indicator
    fn set_loading(&mut self, _loading: bool) {}

    /// Show the current error message, or clear it
    fn show_error(&mut self, _message: Option<&str>) {}
}

/// Draws [`ViewState`] snapshots onto a [`MapRenderer`]
#[derive(Debug)]
pub struct MapView<R> {
    renderer: R,
    config: MapConfig,
    initialized: bool,
    /// Where the viewport was last centered by a target
    target: Option<Coordinate>,
    /// User location seen by the previous render
    last_user_location: Option<Coordinate>,
    last_loading: Option<bool>,
    last_error: Option<String>,
    renders: u64,
}

impl<R: MapRenderer> MapView<R> {
    pub fn new(renderer: R, config: &MapConfig) -> Self {
        Self {
            renderer,
            config: config.clone(),
            initialized: false,
            target: None,
            last_user_location: None,
            last_loading: None,
            last_error: None,
            renders: 0,
        }
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn into_renderer(self) -> R {
        self.renderer
    }

    /// Number of snapshots drawn so far
    pub fn renders(&self) -> u64 {
        self.renders
    }

    /// Draw one snapshot
    pub fn render(&mut self, state: &ViewState) {
        self.ensure_initialized();

        if self.last_loading != Some(state.loading) {
            self.renderer.set_loading(state.loading);
            self.last_loading = Some(state.loading);
        }

        let error = state.last_error.as_ref().map(|e| e.message.clone());
        if error != self.last_error {
            self.renderer.show_error(error.as_deref());
            self.last_error = error;
        }

        self.renderer.replace_markers(build_markers(state));

        let user = state.user_location.map(|u| u.coordinate());
        if user != self.last_user_location {
            self.last_user_location = user;
            if let Some(location) = user {
                self.focus(location);
            }
        }

        self.renders += 1;
    }

    /// Re-center on `target` at the focus zoom, unless already centered there
    pub fn focus(&mut self, target: Coordinate) {
        self.ensure_initialized();

        if self.target == Some(target) {
            return;
        }
        tracing::debug!(target = %target, zoom = self.config.focus_zoom, "Re-centering map");
        self.renderer.set_view(target, self.config.focus_zoom);
        self.target = Some(target);
    }

    /// Redraw on every change published to `rx` until its store goes away
    pub async fn follow(mut self, mut rx: watch::Receiver<Arc<ViewState>>) -> Self {
        let snapshot = Arc::clone(&rx.borrow_and_update());
        self.render(&snapshot);

        while rx.changed().await.is_ok() {
            let snapshot = Arc::clone(&rx.borrow_and_update());
            self.render(&snapshot);
        }

        self
    }

    /// Icons are resolved and the initial viewport set exactly once
    fn ensure_initialized(&mut self) {
        if self.initialized {
            return;
        }
        icons();
        self.renderer.set_tile_layer(&TileLayer {
            url_template: self.config.tile_url.clone(),
            attribution: self.config.attribution.clone(),
        });
        self.renderer
            .set_view(self.config.initial_center(), self.config.initial_zoom);
        self.initialized = true;
    }
}

/// Full marker set for a snapshot: vehicles, then stops, then the user
pub fn build_markers(state: &ViewState) -> Vec<Marker> {
    let icons = icons();
    let mut markers =
        Vec::with_capacity(state.vehicles.len() + state.stops.len() + 1);

    markers.extend(state.vehicles.iter().map(|v| Marker {
        kind: MarkerKind::Vehicle,
        position: v.coordinate(),
        popup: Some(vehicle_popup(v)),
        icon: &icons.default,
    }));

    markers.extend(state.stops.iter().map(|s| Marker {
        kind: MarkerKind::Stop,
        position: s.coordinate(),
        popup: stop_popup(s),
        icon: &icons.default,
    }));

    if let Some(user) = state.user_location {
        markers.push(Marker {
            kind: MarkerKind::User,
            position: user.coordinate(),
            popup: Some(Popup {
                title: None,
                lines: vec!["You are here.".to_string()],
            }),
            icon: &icons.user,
        });
    }

    markers
}

/// Type, line, speed and heading of a vehicle
pub fn vehicle_popup(vehicle: &VehiclePosition) -> Popup {
    let title = if vehicle.transport_type.is_empty() {
        None
    } else {
        Some(vehicle.transport_type.clone())
    };

    Popup {
        title,
        lines: vec![
            format!("Line: {}", vehicle.line_number),
            format!("Speed: {}", vehicle.speed),
            format!("Heading: {}", vehicle.heading),
        ],
    }
}

fn stop_popup(stop: &StopPosition) -> Option<Popup> {
    stop.name.as_ref().map(|name| Popup {
        title: Some(name.clone()),
        lines: Vec::new(),
    })
}
