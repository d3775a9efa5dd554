//! Marker icons
//!
//! The icon set is process-wide and installed at most once, before the first
//! render. After that it is read-only.

use serde::Serialize;
use std::sync::OnceLock;
use thiserror::Error;

static ICONS: OnceLock<IconSet> = OnceLock::new();

/// Image and geometry of one marker icon
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IconSpec {
    pub url: String,
    pub retina_url: Option<String>,
    pub shadow_url: Option<String>,
    /// `[width, height]` in pixels
    pub size: [u32; 2],
    /// Pixel of the image placed on the marker's coordinate
    pub anchor: [i32; 2],
    /// Where popups open, relative to `anchor`
    pub popup_anchor: [i32; 2],
}

/// Icons used by the map view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IconSet {
    /// Vehicles and stops
    pub default: IconSpec,
    /// The user's own position
    pub user: IconSpec,
}

impl Default for IconSet {
    fn default() -> Self {
        Self {
            default: IconSpec {
                url: "https://unpkg.com/leaflet@1.7.1/dist/images/marker-icon.png".to_string(),
                retina_url: Some(
                    "https://unpkg.com/leaflet@1.7.1/dist/images/marker-icon-2x.png".to_string(),
                ),
                shadow_url: Some(
                    "https://unpkg.com/leaflet@1.7.1/dist/images/marker-shadow.png".to_string(),
                ),
                size: [25, 41],
                anchor: [12, 41],
                popup_anchor: [1, -34],
            },
            user: IconSpec {
                url: "https://img.icons8.com/?size=100&id=41445&format=png&color=000000"
                    .to_string(),
                retina_url: None,
                shadow_url: None,
                size: [32, 32],
                anchor: [16, 32],
                popup_anchor: [0, -32],
            },
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Marker icons were already installed")]
pub struct IconsAlreadyInstalled;

/// Install a custom icon set. Must happen before anything is rendered.
pub fn install(icons: IconSet) -> Result<(), IconsAlreadyInstalled> {
    ICONS.set(icons).map_err(|_| IconsAlreadyInstalled)
}

/// The installed icon set, installing the defaults on first use
pub fn icons() -> &'static IconSet {
    ICONS.get_or_init(IconSet::default)
}
