//! A layer for location markers with click-to-open popups.
//!
//! # Example
//!
//! ```no_run
//! use egui_location_map::{Map, config::OpenStreetMapConfig, layers::marker::{Marker, MarkerKind, MarkerLayer}, projection::GeoPos};
//!
//! let mut map = Map::new(OpenStreetMapConfig::default());
//! let mut markers = MarkerLayer::default();
//! markers.add_marker(Marker::new(
//!     GeoPos::from_lat_lon(48.8584, 2.2945),
//!     MarkerKind::Origin,
//!     "Eiffel Tower",
//! ));
//! map.add_layer("markers", markers);
//! ```

use crate::layers::{Layer, click_pos, draw_popup};
use crate::projection::{GeoPos, MapProjection};
use egui::{Color32, Painter, Pos2, Response, Stroke};
use std::any::Any;

/// The role of a marker, which decides its color and stacking.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MarkerKind {
    /// A regular location.
    #[default]
    Default,
    /// The start of the selected route.
    Origin,
    /// The end of the selected route.
    Destination,
}

impl MarkerKind {
    /// The fill color of markers of this kind.
    pub fn color(&self) -> Color32 {
        match self {
            Self::Default => Color32::from_rgb(59, 130, 246),
            Self::Origin => Color32::from_rgb(34, 197, 94),
            Self::Destination => Color32::from_rgb(239, 68, 68),
        }
    }

    /// Markers with a higher stacking order are drawn above, and picked before, lower ones.
    pub fn z_index(&self) -> u8 {
        match self {
            Self::Default => 0,
            Self::Origin | Self::Destination => 1,
        }
    }
}

/// A single marker.
#[derive(Clone, Debug, PartialEq)]
pub struct Marker {
    /// Where the marker stands.
    pub pos: GeoPos,
    /// Its role.
    pub kind: MarkerKind,
    /// The popup text shown on click.
    pub popup: String,
}

impl Marker {
    /// Creates a marker.
    pub fn new(pos: GeoPos, kind: MarkerKind, popup: impl Into<String>) -> Self {
        Self {
            pos,
            kind,
            popup: popup.into(),
        }
    }
}

/// Layer implementation that draws markers.
#[derive(Clone)]
pub struct MarkerLayer {
    markers: Vec<Marker>,

    /// The radius of a marker in screen points.
    pub radius: f32,

    open_popup: Option<usize>,
}

impl Default for MarkerLayer {
    fn default() -> Self {
        Self {
            markers: Vec::new(),
            radius: 7.0,
            open_popup: None,
        }
    }
}

impl MarkerLayer {
    /// Adds a marker. Markers keep their insertion order within the same stacking level.
    pub fn add_marker(&mut self, marker: Marker) {
        self.markers.push(marker);
    }

    /// All markers in insertion order.
    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    /// The marker whose popup is open.
    pub fn open_popup(&self) -> Option<&Marker> {
        self.open_popup.and_then(|i| self.markers.get(i))
    }

    /// Marker indices in drawing order, bottom first.
    fn draw_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.markers.len()).collect();
        // Stable, so equal levels keep insertion order.
        order.sort_by_key(|&i| self.markers[i].kind.z_index());
        order
    }

    fn find_marker_at(&self, screen_pos: Pos2, projection: &MapProjection) -> Option<usize> {
        let tolerance_sq = (self.radius * 1.5).powi(2);
        self.draw_order().into_iter().rev().find(|&i| {
            projection
                .project(self.markers[i].pos)
                .distance_sq(screen_pos)
                < tolerance_sq
        })
    }
}

impl Layer for MarkerLayer {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn handle_input(&mut self, response: &Response, projection: &MapProjection) -> bool {
        if let Some(hover_pos) = response.hover_pos() {
            if self.find_marker_at(hover_pos, projection).is_some() {
                response.ctx.set_cursor_icon(egui::CursorIcon::PointingHand);
            }
        }

        let Some(pointer_pos) = click_pos(response) else {
            return false;
        };

        self.open_popup = self.find_marker_at(pointer_pos, projection);
        self.open_popup.is_some()
    }

    fn dismiss_popup(&mut self) {
        self.open_popup = None;
    }

    fn draw(&self, painter: &Painter, projection: &MapProjection) {
        for i in self.draw_order() {
            let marker = &self.markers[i];
            let center = projection.project(marker.pos);
            painter.circle_filled(
                center + egui::vec2(0.0, 1.5),
                self.radius,
                Color32::from_black_alpha(70),
            );
            painter.circle(
                center,
                self.radius,
                marker.kind.color(),
                Stroke::new(2.0, Color32::WHITE),
            );
        }

        if let Some(marker) = self.open_popup() {
            let anchor = projection.project(marker.pos) - egui::vec2(0.0, self.radius);
            draw_popup(painter, anchor, &marker.popup);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer_with(kinds: &[MarkerKind]) -> MarkerLayer {
        let mut layer = MarkerLayer::default();
        for (i, kind) in kinds.iter().enumerate() {
            layer.add_marker(Marker::new(
                GeoPos::from_lat_lon(i as f64, i as f64),
                *kind,
                format!("marker {i}"),
            ));
        }
        layer
    }

    #[test]
    fn marker_colors() {
        assert_eq!(MarkerKind::Origin.color(), Color32::from_rgb(34, 197, 94));
        assert_eq!(MarkerKind::Destination.color(), Color32::from_rgb(239, 68, 68));
        assert_ne!(MarkerKind::Default.color(), MarkerKind::Origin.color());
    }

    #[test]
    fn flagged_markers_are_drawn_last() {
        let layer = layer_with(&[
            MarkerKind::Origin,
            MarkerKind::Default,
            MarkerKind::Destination,
            MarkerKind::Default,
        ]);
        assert_eq!(layer.draw_order(), vec![1, 3, 0, 2]);
    }

    #[test]
    fn open_and_dismiss_popup() {
        let mut layer = layer_with(&[MarkerKind::Default, MarkerKind::Default]);
        assert!(layer.open_popup().is_none());

        layer.open_popup = Some(1);
        assert_eq!(layer.open_popup().map(|m| m.popup.as_str()), Some("marker 1"));

        layer.open_popup = Some(5);
        assert!(layer.open_popup().is_none());

        layer.dismiss_popup();
        assert!(layer.open_popup().is_none());
    }
}
