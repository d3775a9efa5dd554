//! Map renderers
//!
//! - [`TextRenderer`]: prints the marker set as text, used by the `watch` command
//! - [`MemoryRenderer`]: records every call, for embedding and tests

use std::io::Write;

use crate::model::Coordinate;

use super::map::{MapRenderer, Marker, MarkerKind, TileLayer};

/// A call made on a [`MemoryRenderer`]
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCall {
    TileLayer(TileLayer),
    View(Coordinate, u8),
    Markers(Vec<Marker>),
    Loading(bool),
    Error(Option<String>),
}

/// Renderer that keeps a log of everything it was asked to draw
#[derive(Debug, Clone, Default)]
pub struct MemoryRenderer {
    pub calls: Vec<RenderCall>,
}

impl MemoryRenderer {
    /// Every viewport change, in order
    pub fn views(&self) -> Vec<(Coordinate, u8)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                RenderCall::View(center, zoom) => Some((*center, *zoom)),
                _ => None,
            })
            .collect()
    }

    /// Every marker set drawn, in order
    pub fn marker_sets(&self) -> Vec<&[Marker]> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                RenderCall::Markers(m) => Some(m.as_slice()),
                _ => None,
            })
            .collect()
    }

    /// Markers currently on the map
    pub fn current_markers(&self) -> &[Marker] {
        self.marker_sets().last().copied().unwrap_or(&[])
    }
}

impl MapRenderer for MemoryRenderer {
    fn set_tile_layer(&mut self, layer: &TileLayer) {
        self.calls.push(RenderCall::TileLayer(layer.clone()));
    }

    fn set_view(&mut self, center: Coordinate, zoom: u8) {
        self.calls.push(RenderCall::View(center, zoom));
    }

    fn replace_markers(&mut self, markers: Vec<Marker>) {
        self.calls.push(RenderCall::Markers(markers));
    }

    fn set_loading(&mut self, loading: bool) {
        self.calls.push(RenderCall::Loading(loading));
    }

    fn show_error(&mut self, message: Option<&str>) {
        self.calls.push(RenderCall::Error(message.map(str::to_string)));
    }
}

/// Renderer that writes a plain-text listing of the map
#[derive(Debug)]
pub struct TextRenderer<W> {
    out: W,
}

impl TextRenderer<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> TextRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, text: &str) {
        if let Err(e) = self.out.write_all(text.as_bytes()).and_then(|_| self.out.flush()) {
            tracing::warn!(error = %e, "Failed to write map output");
        }
    }
}

impl<W: Write> MapRenderer for TextRenderer<W> {
    fn set_tile_layer(&mut self, layer: &TileLayer) {
        let line = format!("tiles: {}\n", layer.url_template);
        self.emit(&line);
    }

    fn set_view(&mut self, center: Coordinate, zoom: u8) {
        let line = format!("view: {} @ zoom {}\n", center, zoom);
        self.emit(&line);
    }

    fn replace_markers(&mut self, markers: Vec<Marker>) {
        let count = |kind| markers.iter().filter(|m| m.kind == kind).count();
        let mut text = format!(
            "--- {} vehicles, {} stops{}\n",
            count(MarkerKind::Vehicle),
            count(MarkerKind::Stop),
            if count(MarkerKind::User) > 0 { ", you" } else { "" },
        );

        for marker in markers.iter().filter(|m| m.kind != MarkerKind::Stop) {
            let label = match &marker.popup {
                Some(popup) => {
                    let mut parts: Vec<&str> = popup.title.iter().map(String::as_str).collect();
                    parts.extend(popup.lines.iter().map(String::as_str));
                    parts.join(" | ")
                }
                None => String::new(),
            };
            text.push_str(&format!("  [{}] {}\n", marker.position, label));
        }

        self.emit(&text);
    }

    fn set_loading(&mut self, loading: bool) {
        if loading {
            self.emit("Loading...\n");
        }
    }

    fn show_error(&mut self, message: Option<&str>) {
        if let Some(message) = message {
            let line = format!("error: {}\n", message);
            self.emit(&line);
        }
    }
}
