//! Configuration for tile providers and the external services used by the panel.

use serde::{Deserialize, Serialize};

use crate::TileId;
use crate::projection::GeoPos;
use crate::routing::RouteAlgorithm;

/// Configuration for a map provider.
pub trait MapConfig: Send {
    /// Returns the URL for a given tile.
    fn tile_url(&self, tile: &TileId) -> String;

    /// Returns the attribution text to be displayed on the map. If returns `None`, no attribution is shown.
    fn attribution(&self) -> Option<&String>;

    /// Returns the attribution URL to be linked from the attribution text.
    fn attribution_url(&self) -> Option<&String>;

    /// The default geographical center of the map.
    fn default_center(&self) -> GeoPos;

    /// The default zoom level of the map.
    fn default_zoom(&self) -> u8;
}

/// Configuration for the OpenStreetMap tile server. Used for the light theme.
///
/// # Example
///
/// ```
/// use egui_location_map::config::OpenStreetMapConfig;
/// let config = OpenStreetMapConfig::default();
/// ```
pub struct OpenStreetMapConfig {
    base_url: String,
    attribution: String,
    attribution_url: String,
    default_center: GeoPos,
    default_zoom: u8,
}

impl Default for OpenStreetMapConfig {
    fn default() -> Self {
        Self {
            base_url: "https://tile.openstreetmap.org".to_string(),
            attribution: "© OpenStreetMap contributors".to_string(),
            attribution_url: "https://www.openstreetmap.org/copyright".to_string(),
            default_center: GeoPos { lon: 0.0, lat: 20.0 },
            default_zoom: 2,
        }
    }
}

impl MapConfig for OpenStreetMapConfig {
    fn tile_url(&self, tile: &TileId) -> String {
        format!("{}/{}/{}/{}.png", self.base_url, tile.z, tile.x, tile.y)
    }

    fn attribution(&self) -> Option<&String> {
        Some(&self.attribution)
    }

    fn attribution_url(&self) -> Option<&String> {
        Some(&self.attribution_url)
    }

    fn default_center(&self) -> GeoPos {
        self.default_center
    }

    fn default_zoom(&self) -> u8 {
        self.default_zoom
    }
}

/// Configuration for the CARTO "dark matter" tile server. Used for the dark theme.
pub struct CartoDarkConfig {
    base_url: String,
    attribution: String,
    attribution_url: String,
    default_center: GeoPos,
    default_zoom: u8,
}

impl Default for CartoDarkConfig {
    fn default() -> Self {
        Self {
            base_url: "https://a.basemaps.cartocdn.com/dark_all".to_string(),
            attribution: "© OpenStreetMap contributors © CARTO".to_string(),
            attribution_url: "https://carto.com/attributions".to_string(),
            default_center: GeoPos { lon: 0.0, lat: 20.0 },
            default_zoom: 2,
        }
    }
}

impl MapConfig for CartoDarkConfig {
    fn tile_url(&self, tile: &TileId) -> String {
        format!("{}/{}/{}/{}.png", self.base_url, tile.z, tile.x, tile.y)
    }

    fn attribution(&self) -> Option<&String> {
        Some(&self.attribution)
    }

    fn attribution_url(&self) -> Option<&String> {
        Some(&self.attribution_url)
    }

    fn default_center(&self) -> GeoPos {
        self.default_center
    }

    fn default_zoom(&self) -> u8 {
        self.default_zoom
    }
}

/// The visual theme of the map.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MapTheme {
    /// Light base tiles.
    #[default]
    Light,
    /// Dark base tiles.
    Dark,
}

impl MapTheme {
    /// Picks the theme matching the egui visuals.
    pub fn from_visuals(visuals: &egui::Visuals) -> Self {
        if visuals.dark_mode {
            Self::Dark
        } else {
            Self::Light
        }
    }

    /// The tile source for this theme.
    pub fn tile_config(&self) -> Box<dyn MapConfig> {
        match self {
            Self::Light => Box::new(OpenStreetMapConfig::default()),
            Self::Dark => Box::new(CartoDarkConfig::default()),
        }
    }
}

/// Endpoints and credentials for the routing API and the geocoding service.
///
/// Every field has a default, so a partial document deserializes fine:
///
/// ```
/// use egui_location_map::config::ServiceConfig;
/// let config: ServiceConfig =
///     serde_json::from_str(r#"{ "api_base_url": "https://flowsint.example" }"#).unwrap();
/// assert_eq!(config.api_base_url, "https://flowsint.example");
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Base URL of the backend hosting `/api/routing/*`.
    pub api_base_url: String,

    /// Search endpoint of a Nominatim compatible geocoder.
    pub geocoder_url: String,

    /// User-Agent sent with every request. Nominatim rejects anonymous clients.
    pub user_agent: String,

    /// Bearer token for the routing API.
    pub auth_token: Option<String>,

    /// Pathfinding algorithm requested from the routing API.
    pub algorithm: RouteAlgorithm,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:5001".to_string(),
            geocoder_url: "https://nominatim.openstreetmap.org/search".to_string(),
            user_agent: format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            auth_token: None,
            algorithm: RouteAlgorithm::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TileId;

    #[test]
    fn openstreetmap_config_tile_url() {
        let config = OpenStreetMapConfig::default();
        let tile_id = TileId { z: 10, x: 1, y: 2 };
        let url = config.tile_url(&tile_id);
        assert_eq!(url, "https://tile.openstreetmap.org/10/1/2.png");
    }

    #[test]
    fn carto_dark_config_tile_url() {
        let config = CartoDarkConfig::default();
        let tile_id = TileId { z: 3, x: 4, y: 5 };
        assert_eq!(
            config.tile_url(&tile_id),
            "https://a.basemaps.cartocdn.com/dark_all/3/4/5.png"
        );
        assert_eq!(
            config.attribution().map(String::as_str),
            Some("© OpenStreetMap contributors © CARTO")
        );
    }

    #[test]
    fn theme_selects_tile_source() {
        let tile_id = TileId { z: 1, x: 0, y: 0 };
        assert!(
            MapTheme::Light
                .tile_config()
                .tile_url(&tile_id)
                .starts_with("https://tile.openstreetmap.org")
        );
        assert!(
            MapTheme::Dark
                .tile_config()
                .tile_url(&tile_id)
                .contains("dark_all")
        );
    }

    #[test]
    fn theme_from_visuals() {
        assert_eq!(MapTheme::from_visuals(&egui::Visuals::dark()), MapTheme::Dark);
        assert_eq!(MapTheme::from_visuals(&egui::Visuals::light()), MapTheme::Light);
    }

    #[test]
    fn service_config_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(
            config.geocoder_url,
            "https://nominatim.openstreetmap.org/search"
        );
        assert!(config.auth_token.is_none());
        assert_eq!(config.algorithm, RouteAlgorithm::Dijkstra);
        assert!(config.user_agent.starts_with("egui-location-map/"));
    }

    #[test]
    fn service_config_partial_document() {
        let config: ServiceConfig =
            serde_json::from_str(r#"{ "auth_token": "secret", "algorithm": "astar" }"#).unwrap();
        assert_eq!(config.auth_token.as_deref(), Some("secret"));
        assert_eq!(config.algorithm, RouteAlgorithm::AStar);
        assert_eq!(config.api_base_url, ServiceConfig::default().api_base_url);
    }
}
