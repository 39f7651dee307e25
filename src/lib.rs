#![warn(missing_docs)]

//! A map panel for `egui` that plots the geographic nodes of an investigation graph.
//!
//! The crate is built from three pieces:
//!
//! * [`Map`], a slippy map widget with keyed [`layers`] (tiles, buildings, routes, markers).
//! * [`renderer::LocationMap`], which geocodes points lacking coordinates and rebuilds the
//!   [`Map`] whenever its inputs change.
//! * [`panel::MapPanel`], which derives location points from graph state and fetches a
//!   shortest-path route when exactly two nodes are selected.
//!
//! # Example
//!
//! ```no_run
//! use eframe::egui;
//! use egui_location_map::{config::ServiceConfig, location::GraphState, panel::MapPanel};
//!
//! struct MyApp {
//!     panel: MapPanel,
//!     state: GraphState,
//! }
//!
//! impl eframe::App for MyApp {
//!     fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
//!         egui::CentralPanel::default()
//!             .frame(egui::Frame::NONE)
//!             .show(ctx, |ui| {
//!                 self.panel.show(ui, &self.state);
//!             });
//!     }
//! }
//!
//! let app = MyApp {
//!     panel: MapPanel::new(ServiceConfig::default()),
//!     state: GraphState::default(),
//! };
//! ```

/// Configuration traits and types for the map widget and services.
pub mod config;

/// Building footprint parsing.
pub mod geometry;

/// Address lookups against a geocoding service.
pub mod geocode;

/// Layers drawn on top of the map.
pub mod layers;

/// Location points and routes derived from graph state.
pub mod location;

/// The panel controller.
pub mod panel;

/// Conversions between geographical and screen coordinates.
pub mod projection;

/// Keyed background queries.
pub mod query;

/// The map renderer.
pub mod renderer;

/// Client for the shortest-path routing API.
pub mod routing;

use eframe::egui;
use egui::{Color32, Rect, Response, Sense, Ui, Vec2, Widget, pos2};
use eyre::{Context, Result};
use log::{debug, error};
use once_cell::sync::Lazy;
use poll_promise::Promise;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::config::MapConfig;
use crate::layers::{Layer, tile::TileLayer};
use crate::projection::{GeoBounds, GeoPos, MapProjection};

// The size of a map tile in pixels.
pub(crate) const TILE_SIZE: u32 = 256;
/// The minimum zoom level.
pub const MIN_ZOOM: u8 = 0;
/// The maximum zoom level.
pub const MAX_ZOOM: u8 = 19;

/// The key of the base tile layer added by [`Map::new`].
pub const BASE_LAYER: &str = "base";

// Reuse the reqwest client for tiles, geocoding and routing.
pub(crate) static CLIENT: Lazy<reqwest::blocking::Client> = Lazy::new(|| {
    reqwest::blocking::Client::builder()
        .user_agent(format!(
            "{}/{}",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        ))
        .build()
        .expect("Failed to build reqwest client")
});

/// Errors that can occur while loading map data.
#[derive(Error, Debug)]
pub enum MapError {
    /// An error occurred while making a web request.
    #[error("Connection error")]
    ConnectionError(#[from] reqwest::Error),

    /// A map tile failed to download.
    #[error("A map tile failed to download. HTTP Status: `{0}`")]
    TileDownloadError(String),

    /// The downloaded tile bytes could not be converted to an image.
    #[error("Unable to convert downloaded map tile bytes as image")]
    TileBytesConversionError(#[from] image::ImageError),

    /// A service answered with a non-success status.
    #[error("`{url}` answered with HTTP status `{status}`")]
    ServiceStatus {
        /// The requested URL.
        url: String,
        /// The HTTP status line.
        status: String,
    },

    /// The routing service found no path between the two nodes.
    #[error("No route found: {0}")]
    NoRoute(String),

    /// A geometry string could not be turned into a polygon.
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),
}

/// A unique identifier for a map tile.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub struct TileId {
    /// The zoom level.
    pub z: u8,

    /// The x-coordinate of the tile.
    pub x: u32,

    /// The y-coordinate of the tile.
    pub y: u32,
}

/// The state of a tile in the cache.
pub(crate) enum Tile {
    /// The tile is being downloaded.
    Loading(Promise<Result<egui::ColorImage, Arc<eyre::Report>>>),

    /// The tile is in memory.
    Loaded(egui::TextureHandle),

    /// The tile failed to download.
    Failed(Arc<eyre::Report>),
}

/// A view change that needs the widget size before it can be applied.
#[derive(Clone, Copy, Debug, PartialEq)]
enum ViewRequest {
    Center { pos: GeoPos, zoom: u8 },
    Fit { bounds: GeoBounds, padding: f64 },
}

/// The map widget.
pub struct Map {
    /// The geographical center of the map.
    pub center: GeoPos,

    /// The zoom level of the map.
    pub zoom: u8,

    /// The geographical position under the mouse pointer, if any.
    pub mouse_pos: Option<GeoPos>,

    layers: Vec<(String, Box<dyn Layer>)>,
    attribution: Option<(String, Option<String>)>,
    pending_view: Option<ViewRequest>,
}

impl Map {
    /// Creates a new `Map` widget with a base tile layer.
    ///
    /// # Arguments
    ///
    /// * `config` - A type that implements `MapConfig`, which provides the tile source.
    pub fn new<C: MapConfig + 'static>(config: C) -> Self {
        Self::from_boxed_config(Box::new(config))
    }

    /// Same as [`Map::new`] for an already boxed configuration.
    pub fn from_boxed_config(config: Box<dyn MapConfig>) -> Self {
        let attribution = config
            .attribution()
            .map(|text| (text.clone(), config.attribution_url().cloned()));
        let center = config.default_center();
        let zoom = config.default_zoom();

        let mut map = Self {
            center,
            zoom,
            mouse_pos: None,
            layers: Vec::new(),
            attribution,
            pending_view: None,
        };
        map.add_layer(BASE_LAYER, TileLayer::from_boxed_config(config));
        map
    }

    /// Adds a layer on top of the existing ones. A layer with the same key is replaced in place.
    pub fn add_layer(&mut self, key: impl Into<String>, layer: impl Layer) {
        let key = key.into();
        let layer: Box<dyn Layer> = Box::new(layer);
        if let Some(slot) = self.layers.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = layer;
        } else {
            self.layers.push((key, layer));
        }
    }

    /// Removes a layer. Returns `true` if it existed.
    pub fn remove_layer(&mut self, key: &str) -> bool {
        let before = self.layers.len();
        self.layers.retain(|(k, _)| k != key);
        self.layers.len() != before
    }

    /// The keys of all layers, bottom first.
    pub fn layers(&self) -> Vec<&str> {
        self.layers.iter().map(|(k, _)| k.as_str()).collect()
    }

    /// Gets a layer by key, if it exists and is of type `T`.
    pub fn layer<T: Layer>(&self, key: &str) -> Option<&T> {
        self.layers
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, layer)| layer.as_any().downcast_ref::<T>())
    }

    /// Gets a mutable layer by key, if it exists and is of type `T`.
    pub fn layer_mut<T: Layer>(&mut self, key: &str) -> Option<&mut T> {
        self.layers
            .iter_mut()
            .find(|(k, _)| k == key)
            .and_then(|(_, layer)| layer.as_any_mut().downcast_mut::<T>())
    }

    /// Centers the map on `pos` at `zoom` on the next frame.
    pub fn center_on(&mut self, pos: GeoPos, zoom: u8) {
        self.pending_view = Some(ViewRequest::Center {
            pos,
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
        });
    }

    /// Fits the view to `bounds`, grown by `padding` of their size on every side, on the
    /// next frame.
    pub fn fit_bounds(&mut self, bounds: GeoBounds, padding: f64) {
        self.pending_view = Some(ViewRequest::Fit { bounds, padding });
    }

    fn apply_pending_view(&mut self, rect: &Rect) {
        match self.pending_view.take() {
            Some(ViewRequest::Center { pos, zoom }) => {
                self.center = pos;
                self.zoom = zoom;
            }
            Some(ViewRequest::Fit { bounds, padding }) => {
                let padded = bounds.pad(padding);
                self.zoom = padded.fit_zoom(rect.size());
                self.center = padded.center();
            }
            None => {}
        }
    }

    /// Converts a screen position inside `rect` to fractional tile coordinates.
    fn screen_to_tile(&self, rect: &Rect, screen: egui::Pos2, zoom: u8) -> (f64, f64) {
        let rel = screen - rect.min;
        let center_x = lon_to_x(self.center.lon, zoom);
        let center_y = lat_to_y(self.center.lat, zoom);
        (
            center_x + (rel.x as f64 - rect.width() as f64 / 2.0) / TILE_SIZE as f64,
            center_y + (rel.y as f64 - rect.height() as f64 / 2.0) / TILE_SIZE as f64,
        )
    }

    /// Handles user input for panning and zooming.
    fn handle_input(&mut self, ui: &Ui, rect: &Rect, response: &Response) {
        if response.dragged() {
            let delta = response.drag_delta();
            let world_size_in_tiles = 2.0_f64.powi(self.zoom as i32);
            let half_view_x = rect.width() as f64 / TILE_SIZE as f64 / 2.0;
            let half_view_y = rect.height() as f64 / TILE_SIZE as f64 / 2.0;

            let x = lon_to_x(self.center.lon, self.zoom) - delta.x as f64 / TILE_SIZE as f64;
            let y = lat_to_y(self.center.lat, self.zoom) - delta.y as f64 / TILE_SIZE as f64;

            // Keep the world inside the viewport, or centered if it is smaller.
            let clamp_axis = |value: f64, half_view: f64| {
                if half_view > world_size_in_tiles - half_view {
                    world_size_in_tiles / 2.0
                } else {
                    value.clamp(half_view, world_size_in_tiles - half_view)
                }
            };

            self.center = GeoPos {
                lon: x_to_lon(clamp_axis(x, half_view_x), self.zoom),
                lat: y_to_lat(clamp_axis(y, half_view_y), self.zoom),
            };
        }

        if response.double_clicked() {
            if let Some(pointer_pos) = response.interact_pointer_pos() {
                let new_zoom = (self.zoom + 1).clamp(MIN_ZOOM, MAX_ZOOM);
                if new_zoom != self.zoom {
                    let (x, y) = self.screen_to_tile(rect, pointer_pos, self.zoom);
                    self.center = GeoPos {
                        lon: x_to_lon(x, self.zoom),
                        lat: y_to_lat(y, self.zoom),
                    };
                    self.zoom = new_zoom;
                }
            }
        }

        let Some(hover_pos) = response.hover_pos().filter(|_| response.hovered()) else {
            self.mouse_pos = None;
            return;
        };

        let (target_x, target_y) = self.screen_to_tile(rect, hover_pos, self.zoom);
        let target = GeoPos {
            lon: x_to_lon(target_x, self.zoom),
            lat: y_to_lat(target_y, self.zoom),
        };
        self.mouse_pos = Some(target);

        let scroll = ui.input(|i| i.raw_scroll_delta.y);
        if scroll == 0.0 {
            return;
        }

        let old_zoom = self.zoom;
        let mut new_zoom = (old_zoom as i32 + scroll.signum() as i32)
            .clamp(MIN_ZOOM as i32, MAX_ZOOM as i32) as u8;

        // Refuse to zoom out past the point where the world is smaller than the widget.
        if scroll < 0.0 {
            let world_pixel_size = 2.0_f64.powi(new_zoom as i32) * TILE_SIZE as f64;
            if world_pixel_size < rect.width() as f64 || world_pixel_size < rect.height() as f64 {
                new_zoom = old_zoom;
            }
        }

        if new_zoom != old_zoom {
            // Keep the coordinate under the pointer fixed.
            let rel = hover_pos - rect.min;
            let new_target_x = lon_to_x(target.lon, new_zoom);
            let new_target_y = lat_to_y(target.lat, new_zoom);
            let new_center_x =
                new_target_x - (rel.x as f64 - rect.width() as f64 / 2.0) / TILE_SIZE as f64;
            let new_center_y =
                new_target_y - (rel.y as f64 - rect.height() as f64 / 2.0) / TILE_SIZE as f64;

            self.zoom = new_zoom;
            self.center = GeoPos {
                lon: x_to_lon(new_center_x, new_zoom),
                lat: y_to_lat(new_center_y, new_zoom),
            };
        }
    }

    /// Draws the attribution text.
    fn draw_attribution(&self, ui: &mut Ui, rect: &Rect) {
        let Some((text, url)) = &self.attribution else {
            return;
        };

        let bg_color = if ui.visuals().dark_mode {
            Color32::from_black_alpha(150)
        } else {
            Color32::from_white_alpha(150)
        };

        let frame = egui::Frame::NONE
            .inner_margin(egui::Margin::same(5))
            .fill(bg_color)
            .corner_radius(3.0);

        egui::Area::new(ui.id().with("attribution"))
            .fixed_pos(rect.left_bottom())
            .anchor(egui::Align2::LEFT_BOTTOM, egui::vec2(5.0, -5.0))
            .show(ui.ctx(), |ui| {
                frame.show(ui, |ui| {
                    ui.style_mut().override_text_style = Some(egui::TextStyle::Small);
                    ui.style_mut().wrap_mode = Some(egui::TextWrapMode::Extend);

                    if let Some(url) = url {
                        ui.hyperlink_to(text, url);
                    } else {
                        ui.label(text);
                    }
                });
            });
    }
}

/// Returns the tiles covering the projection's widget, with their screen positions.
pub(crate) fn visible_tiles(
    projection: &MapProjection,
) -> impl Iterator<Item = (TileId, egui::Pos2)> + use<> {
    let zoom = projection.zoom();
    let rect = projection.widget_rect();
    let center_x = lon_to_x(projection.center().lon, zoom);
    let center_y = lat_to_y(projection.center().lat, zoom);

    let half_w = rect.width() as f64 / 2.0 / TILE_SIZE as f64;
    let half_h = rect.height() as f64 / 2.0 / TILE_SIZE as f64;
    let world = 2_i64.pow(zoom as u32);

    let x_min = ((center_x - half_w).floor() as i64).max(0);
    let y_min = ((center_y - half_h).floor() as i64).max(0);
    let x_max = ((center_x + half_w).ceil() as i64).min(world - 1);
    let y_max = ((center_y + half_h).ceil() as i64).min(world - 1);

    let widget_center = rect.center();
    (x_min..=x_max).flat_map(move |x| {
        (y_min..=y_max).map(move |y| {
            let tile_id = TileId {
                z: zoom,
                x: x as u32,
                y: y as u32,
            };
            let screen_x = (x as f64 - center_x) as f32 * TILE_SIZE as f32;
            let screen_y = (y as f64 - center_y) as f32 * TILE_SIZE as f32;
            (tile_id, widget_center + Vec2::new(screen_x, screen_y))
        })
    })
}

/// Starts downloading a tile if it is not cached yet, and moves finished downloads into
/// textures.
pub(crate) fn load_tile(
    tiles: &mut HashMap<TileId, Tile>,
    config: &dyn MapConfig,
    ctx: &egui::Context,
    tile_id: TileId,
) {
    let tile_state = tiles.entry(tile_id).or_insert_with(|| {
        let url = config.tile_url(&tile_id);
        let promise =
            Promise::spawn_thread("download_tile", move || -> Result<_, Arc<eyre::Report>> {
                let result: Result<_, eyre::Report> = (|| {
                    debug!("Downloading tile from {}", &url);
                    let response = CLIENT.get(&url).send().map_err(MapError::from)?;

                    if !response.status().is_success() {
                        return Err(MapError::TileDownloadError(response.status().to_string()));
                    }

                    let bytes = response.bytes().map_err(MapError::from)?.to_vec();
                    let image = image::load_from_memory(&bytes)
                        .map_err(MapError::from)?
                        .to_rgba8();

                    let size = [image.width() as _, image.height() as _];
                    let pixels = image.into_raw();
                    Ok(egui::ColorImage::from_rgba_unmultiplied(size, &pixels))
                })()
                .with_context(|| format!("Failed to download tile from {}", &url));

                result.map_err(Arc::new)
            });
        Tile::Loading(promise)
    });

    if let Tile::Loading(promise) = tile_state {
        if let Some(result) = promise.ready() {
            match result {
                Ok(color_image) => {
                    let texture = ctx.load_texture(
                        format!("tile_{}_{}_{}", tile_id.z, tile_id.x, tile_id.y),
                        color_image.clone(),
                        Default::default(),
                    );
                    *tile_state = Tile::Loaded(texture);
                }
                Err(e) => {
                    error!("{:?}", e);
                    *tile_state = Tile::Failed(e.clone());
                }
            }
        }
    }
}

/// Draws a single tile, or a placeholder while it loads or after it failed.
pub(crate) fn draw_tile(
    tiles: &HashMap<TileId, Tile>,
    painter: &egui::Painter,
    tile_id: &TileId,
    tile_pos: egui::Pos2,
    tint: Color32,
) {
    let tile_rect = Rect::from_min_size(tile_pos, Vec2::new(TILE_SIZE as f32, TILE_SIZE as f32));

    let placeholder = |mark: &str, color: Color32| {
        painter.rect_filled(tile_rect, 0.0, Color32::from_gray(220));
        painter.rect_stroke(
            tile_rect,
            0.0,
            egui::Stroke::new(1.0, Color32::GRAY),
            egui::StrokeKind::Inside,
        );
        painter.text(
            tile_rect.center(),
            egui::Align2::CENTER_CENTER,
            mark,
            egui::FontId::proportional(40.0),
            color,
        );
    };

    match tiles.get(tile_id) {
        Some(Tile::Loaded(texture)) => {
            painter.image(
                texture.id(),
                tile_rect,
                Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0)),
                tint,
            );
        }
        Some(Tile::Failed(_)) => placeholder("!", Color32::RED),
        Some(Tile::Loading(_)) | None => {
            placeholder("?", Color32::ORANGE);
            // Keep polling until the download finishes.
            painter.ctx().request_repaint();
        }
    }
}

/// Converts longitude to the x-coordinate of a tile at a given zoom level.
pub(crate) fn lon_to_x(lon: f64, zoom: u8) -> f64 {
    (lon + 180.0) / 360.0 * (2.0_f64.powi(zoom as i32))
}

/// Converts latitude to the y-coordinate of a tile at a given zoom level.
pub(crate) fn lat_to_y(lat: f64, zoom: u8) -> f64 {
    (1.0 - lat.to_radians().tan().asinh() / std::f64::consts::PI) / 2.0
        * (2.0_f64.powi(zoom as i32))
}

/// Converts the x-coordinate of a tile to longitude at a given zoom level.
pub(crate) fn x_to_lon(x: f64, zoom: u8) -> f64 {
    x / (2.0_f64.powi(zoom as i32)) * 360.0 - 180.0
}

/// Converts the y-coordinate of a tile to latitude at a given zoom level.
pub(crate) fn y_to_lat(y: f64, zoom: u8) -> f64 {
    let n = std::f64::consts::PI - 2.0 * std::f64::consts::PI * y / (2.0_f64.powi(zoom as i32));
    n.sinh().atan().to_degrees()
}

impl Widget for &mut Map {
    fn ui(self, ui: &mut Ui) -> Response {
        let (rect, response) =
            ui.allocate_exact_size(ui.available_size(), Sense::drag().union(Sense::click()));

        self.apply_pending_view(&rect);

        let projection = MapProjection::new(self.zoom, self.center, rect);
        let mut input_handled = false;
        for (_, layer) in self.layers.iter_mut().rev() {
            let handled = layer.handle_input(&response, &projection);
            if input_handled {
                // A layer above took this interaction.
                layer.dismiss_popup();
            }
            input_handled |= handled;
        }

        if !input_handled {
            self.handle_input(ui, &rect, &response);
        }

        let projection = MapProjection::new(self.zoom, self.center, rect);
        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, 0.0, Color32::from_rgb(220, 220, 220));
        for (_, layer) in &self.layers {
            layer.draw(&painter, &projection);
        }

        self.draw_attribution(ui, &rect);

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OpenStreetMapConfig;
    use crate::layers::marker::MarkerLayer;
    use crate::layers::route::RouteLayer;
    use egui::vec2;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn test_coord_conversion_roundtrip() {
        let zoom: u8 = 10;
        for (lon, lat) in [(24.93545, 60.16952), (-122.4194, 37.7749), (2.3522, 48.8566)] {
            let final_lon = x_to_lon(lon_to_x(lon, zoom), zoom);
            let final_lat = y_to_lat(lat_to_y(lat, zoom), zoom);
            assert!((lon - final_lon).abs() < EPSILON);
            assert!((lat - final_lat).abs() < EPSILON);
        }
    }

    #[test]
    fn test_lat_to_y_conversion() {
        // lat, zoom, expected_y
        let test_cases = vec![
            (0.0, 0, 0.5),
            (0.0, 8, 128.0),
            (85.0511287798, 0, 0.0),
            (-85.0511287798, 8, 256.0),
            (51.5074, 8, 85.12653378959828),
        ];

        for (lat, zoom, expected_y) in test_cases {
            assert!((lat_to_y(lat, zoom) - expected_y).abs() < EPSILON);
        }
    }

    #[test]
    fn test_lon_to_x_conversion() {
        // lon, zoom, expected_x
        let test_cases = vec![
            (0.0, 0, 0.5),
            (-180.0, 8, 0.0),
            (180.0, 8, 256.0),
            (-0.1275, 8, 127.90933333333333),
        ];

        for (lon, zoom, expected_x) in test_cases {
            assert!((lon_to_x(lon, zoom) - expected_x).abs() < EPSILON);
        }
    }

    #[test]
    fn test_map_new_has_base_layer() {
        let config = OpenStreetMapConfig::default();
        let default_center = config.default_center();
        let default_zoom = config.default_zoom();

        let map = Map::new(config);

        assert_eq!(map.center, default_center);
        assert_eq!(map.zoom, default_zoom);
        assert!(map.mouse_pos.is_none());
        assert_eq!(map.layers(), vec![BASE_LAYER]);
        assert!(map.layer::<TileLayer>(BASE_LAYER).is_some());
    }

    #[test]
    fn test_layers_keep_insertion_order_and_replace_by_key() {
        let mut map = Map::new(OpenStreetMapConfig::default());
        map.add_layer("route", RouteLayer::default());
        map.add_layer("markers", MarkerLayer::default());
        map.add_layer("route", RouteLayer::default());
        assert_eq!(map.layers(), vec![BASE_LAYER, "route", "markers"]);

        assert!(map.layer_mut::<MarkerLayer>("markers").is_some());
        assert!(map.layer::<MarkerLayer>("route").is_none());

        assert!(map.remove_layer("route"));
        assert!(!map.remove_layer("route"));
        assert_eq!(map.layers(), vec![BASE_LAYER, "markers"]);
    }

    #[test]
    fn test_pending_center_is_applied() {
        let mut map = Map::new(OpenStreetMapConfig::default());
        let paris = GeoPos::from_lat_lon(48.8566, 2.3522);
        map.center_on(paris, 42);

        let rect = Rect::from_min_size(pos2(0.0, 0.0), vec2(800.0, 600.0));
        map.apply_pending_view(&rect);

        assert_eq!(map.center, paris);
        assert_eq!(map.zoom, MAX_ZOOM);
        assert!(map.pending_view.is_none());
    }

    #[test]
    fn test_pending_fit_is_applied() {
        let mut map = Map::new(OpenStreetMapConfig::default());
        let bounds = GeoBounds {
            min: GeoPos::from_lat_lon(-1.0, -1.0),
            max: GeoPos::from_lat_lon(1.0, 1.0),
        };
        map.fit_bounds(bounds, 0.1);

        let rect = Rect::from_min_size(pos2(0.0, 0.0), vec2(800.0, 600.0));
        map.apply_pending_view(&rect);

        assert!(map.center.lat.abs() < 1e-9);
        assert!(map.center.lon.abs() < 1e-9);
        assert_eq!(map.zoom, bounds.pad(0.1).fit_zoom(rect.size()));
    }

    #[test]
    fn test_visible_tiles_stay_inside_world() {
        let rect = Rect::from_min_size(pos2(0.0, 0.0), vec2(1024.0, 1024.0));
        let projection = MapProjection::new(1, GeoPos::default(), rect);
        let tiles: Vec<_> = visible_tiles(&projection).map(|(id, _)| id).collect();
        assert_eq!(tiles.len(), 4);
        assert!(tiles.iter().all(|t| t.x < 2 && t.y < 2 && t.z == 1));
    }
}
