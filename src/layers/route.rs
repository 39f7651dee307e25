use egui::{Color32, Painter, Pos2, Response, Stroke};
use std::any::Any;

use crate::config::MapTheme;
use crate::layers::{Layer, click_pos, dist_sq_to_segment, draw_popup};
use crate::projection::{GeoPos, MapProjection};

/// Formats a route length for the route popup.
pub fn route_popup_text(distance_m: f64) -> String {
    format!("Route: {:.2} km", distance_m / 1000.0)
}

/// The route color used when the caller does not supply one.
pub fn default_route_color(theme: MapTheme) -> Color32 {
    match theme {
        MapTheme::Dark => Color32::from_rgb(96, 165, 250),
        MapTheme::Light => Color32::from_rgb(37, 99, 235),
    }
}

/// A layer that draws a route polyline.
///
/// # Example
///
/// ```no_run
/// use egui::{Color32, Stroke};
/// use egui_location_map::{Map, config::OpenStreetMapConfig, layers::route::RouteLayer, projection::GeoPos};
///
/// let mut map = Map::new(OpenStreetMapConfig::default());
/// let route = RouteLayer::new(
///     vec![GeoPos::from_lat_lon(0.0, 0.0), GeoPos::from_lat_lon(1.0, 1.0)],
///     Stroke::new(4.0, Color32::BLUE),
///     Some(1500.0),
/// );
/// map.add_layer("route", route);
/// ```
#[derive(Clone, Default)]
pub struct RouteLayer {
    points: Vec<GeoPos>,
    stroke: Stroke,
    popup: Option<String>,
    open_popup: Option<GeoPos>,
}

impl RouteLayer {
    /// Creates a route layer. The popup shows the distance when it is known.
    pub fn new(points: Vec<GeoPos>, stroke: Stroke, distance_m: Option<f64>) -> Self {
        Self {
            points,
            stroke,
            popup: distance_m.map(route_popup_text),
            open_popup: None,
        }
    }

    /// The route vertices.
    pub fn points(&self) -> &[GeoPos] {
        &self.points
    }

    /// The popup text, if the route has one.
    pub fn popup(&self) -> Option<&str> {
        self.popup.as_deref()
    }

    fn is_near_route(&self, screen_pos: Pos2, projection: &MapProjection) -> bool {
        let tolerance_sq = (self.stroke.width + 4.0).powi(2);
        let screen_points: Vec<Pos2> = self.points.iter().map(|p| projection.project(*p)).collect();
        screen_points
            .windows(2)
            .any(|w| dist_sq_to_segment(screen_pos, w[0], w[1]) < tolerance_sq)
    }
}

impl Layer for RouteLayer {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn handle_input(&mut self, response: &Response, projection: &MapProjection) -> bool {
        let Some(pointer_pos) = click_pos(response) else {
            return false;
        };

        self.open_popup = (self.popup.is_some() && self.is_near_route(pointer_pos, projection))
            .then(|| projection.unproject(pointer_pos));
        self.open_popup.is_some()
    }

    fn dismiss_popup(&mut self) {
        self.open_popup = None;
    }

    fn draw(&self, painter: &Painter, projection: &MapProjection) {
        if self.points.len() > 1 {
            let screen_points: Vec<Pos2> =
                self.points.iter().map(|p| projection.project(*p)).collect();
            painter.add(egui::Shape::line(screen_points, self.stroke));
        }

        if let (Some(pos), Some(text)) = (self.open_popup, &self.popup) {
            draw_popup(painter, projection.project(pos), text);
        }
    }
}
