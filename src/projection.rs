//! Map projection.

use egui::{Pos2, Rect};
use serde::{Deserialize, Serialize};

use crate::{MAX_ZOOM, MIN_ZOOM, TILE_SIZE, lat_to_y, lon_to_x, x_to_lon, y_to_lat};

/// A geographical position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoPos {
    /// Longitude in degrees.
    pub lon: f64,
    /// Latitude in degrees.
    pub lat: f64,
}

impl GeoPos {
    /// Creates a position from latitude and longitude, in that order.
    pub fn from_lat_lon(lat: f64, lon: f64) -> Self {
        Self { lon, lat }
    }
}

impl From<(f64, f64)> for GeoPos {
    /// Converts a `(longitude, latitude)` tuple.
    fn from((lon, lat): (f64, f64)) -> Self {
        Self { lon, lat }
    }
}

impl From<GeoPos> for (f64, f64) {
    fn from(pos: GeoPos) -> Self {
        (pos.lon, pos.lat)
    }
}

/// A geographical bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoBounds {
    /// The south-west corner.
    pub min: GeoPos,
    /// The north-east corner.
    pub max: GeoPos,
}

impl GeoBounds {
    /// Returns the smallest bounds containing all positions, or `None` for an empty input.
    pub fn from_points<I: IntoIterator<Item = GeoPos>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bounds = Self {
            min: first,
            max: first,
        };
        for p in iter {
            bounds.extend(p);
        }
        Some(bounds)
    }

    /// Grows the bounds to include `pos`.
    pub fn extend(&mut self, pos: GeoPos) {
        self.min.lon = self.min.lon.min(pos.lon);
        self.min.lat = self.min.lat.min(pos.lat);
        self.max.lon = self.max.lon.max(pos.lon);
        self.max.lat = self.max.lat.max(pos.lat);
    }

    /// Returns the bounds extended on every side by `ratio` of their width and height.
    pub fn pad(&self, ratio: f64) -> Self {
        let dlat = (self.max.lat - self.min.lat).abs() * ratio;
        let dlon = (self.max.lon - self.min.lon).abs() * ratio;
        Self {
            min: GeoPos {
                lon: self.min.lon - dlon,
                lat: self.min.lat - dlat,
            },
            max: GeoPos {
                lon: self.max.lon + dlon,
                lat: self.max.lat + dlat,
            },
        }
    }

    /// The center of the bounds in Web Mercator space.
    pub fn center(&self) -> GeoPos {
        let x = (lon_to_x(self.min.lon, 0) + lon_to_x(self.max.lon, 0)) / 2.0;
        let y = (lat_to_y(self.min.lat, 0) + lat_to_y(self.max.lat, 0)) / 2.0;
        GeoPos {
            lon: x_to_lon(x, 0),
            lat: y_to_lat(y, 0),
        }
    }

    /// The highest zoom level at which the bounds fit into a viewport of the given size.
    pub fn fit_zoom(&self, viewport: egui::Vec2) -> u8 {
        let mut zoom = MAX_ZOOM;
        while zoom > MIN_ZOOM {
            let width = (lon_to_x(self.max.lon, zoom) - lon_to_x(self.min.lon, zoom)).abs()
                * TILE_SIZE as f64;
            let height = (lat_to_y(self.min.lat, zoom) - lat_to_y(self.max.lat, zoom)).abs()
                * TILE_SIZE as f64;
            if width <= viewport.x as f64 && height <= viewport.y as f64 {
                break;
            }
            zoom -= 1;
        }
        zoom
    }
}

/// A helper for converting between geographical and screen coordinates.
pub struct MapProjection {
    zoom: u8,
    center: GeoPos,
    widget_rect: Rect,
}

impl MapProjection {
    /// Creates a new `MapProjection`.
    pub(crate) fn new(zoom: u8, center: GeoPos, widget_rect: Rect) -> Self {
        Self {
            zoom,
            center,
            widget_rect,
        }
    }

    /// The zoom level this projection was made for.
    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    /// The geographical center of the widget.
    pub fn center(&self) -> GeoPos {
        self.center
    }

    /// The screen rectangle of the widget.
    pub fn widget_rect(&self) -> Rect {
        self.widget_rect
    }

    /// Projects a geographical coordinate to a screen coordinate.
    pub fn project(&self, geo_pos: GeoPos) -> Pos2 {
        let center_x = lon_to_x(self.center.lon, self.zoom);
        let center_y = lat_to_y(self.center.lat, self.zoom);

        let tile_x = lon_to_x(geo_pos.lon, self.zoom);
        let tile_y = lat_to_y(geo_pos.lat, self.zoom);

        let dx = (tile_x - center_x) * TILE_SIZE as f64;
        let dy = (tile_y - center_y) * TILE_SIZE as f64;

        let widget_center = self.widget_rect.center();
        widget_center + egui::vec2(dx as f32, dy as f32)
    }

    /// Un-projects a screen coordinate to a geographical coordinate.
    pub fn unproject(&self, screen_pos: Pos2) -> GeoPos {
        let rel_pos = screen_pos - self.widget_rect.min;
        let widget_center_x = self.widget_rect.width() as f64 / 2.0;
        let widget_center_y = self.widget_rect.height() as f64 / 2.0;

        let center_x = lon_to_x(self.center.lon, self.zoom);
        let center_y = lat_to_y(self.center.lat, self.zoom);

        let target_x = center_x + (rel_pos.x as f64 - widget_center_x) / TILE_SIZE as f64;
        let target_y = center_y + (rel_pos.y as f64 - widget_center_y) / TILE_SIZE as f64;

        GeoPos {
            lon: x_to_lon(target_x, self.zoom),
            lat: y_to_lat(target_y, self.zoom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::{pos2, vec2};

    const EPSILON: f64 = 1e-6;

    #[test]
    fn project_unproject_roundtrip() {
        let rect = Rect::from_min_size(pos2(0.0, 0.0), vec2(800.0, 600.0));
        let projection = MapProjection::new(12, GeoPos::from_lat_lon(48.8566, 2.3522), rect);

        let eiffel = GeoPos::from_lat_lon(48.8584, 2.2945);
        let back = projection.unproject(projection.project(eiffel));

        // f32 screen positions lose some precision.
        assert!((back.lat - eiffel.lat).abs() < 1e-4);
        assert!((back.lon - eiffel.lon).abs() < 1e-4);
    }

    #[test]
    fn center_projects_to_widget_center() {
        let rect = Rect::from_min_size(pos2(10.0, 20.0), vec2(400.0, 300.0));
        let center = GeoPos::from_lat_lon(60.16952, 24.93545);
        let projection = MapProjection::new(8, center, rect);
        let screen = projection.project(center);
        assert!((screen.x - rect.center().x).abs() < 1e-3);
        assert!((screen.y - rect.center().y).abs() < 1e-3);
    }

    #[test]
    fn bounds_from_points() {
        assert!(GeoBounds::from_points(Vec::new()).is_none());

        let bounds = GeoBounds::from_points(vec![
            GeoPos::from_lat_lon(1.0, 5.0),
            GeoPos::from_lat_lon(-2.0, 3.0),
            GeoPos::from_lat_lon(0.5, 7.0),
        ])
        .unwrap();
        assert_eq!(bounds.min, GeoPos::from_lat_lon(-2.0, 3.0));
        assert_eq!(bounds.max, GeoPos::from_lat_lon(1.0, 7.0));
    }

    #[test]
    fn bounds_pad_by_ratio() {
        let bounds = GeoBounds {
            min: GeoPos::from_lat_lon(0.0, 0.0),
            max: GeoPos::from_lat_lon(10.0, 20.0),
        };
        let padded = bounds.pad(0.1);
        assert!((padded.min.lat + 1.0).abs() < EPSILON);
        assert!((padded.max.lat - 11.0).abs() < EPSILON);
        assert!((padded.min.lon + 2.0).abs() < EPSILON);
        assert!((padded.max.lon - 22.0).abs() < EPSILON);
    }

    #[test]
    fn bounds_center_on_equator() {
        let bounds = GeoBounds {
            min: GeoPos::from_lat_lon(-10.0, -20.0),
            max: GeoPos::from_lat_lon(10.0, 40.0),
        };
        let center = bounds.center();
        assert!(center.lat.abs() < EPSILON);
        assert!((center.lon - 10.0).abs() < EPSILON);
    }

    #[test]
    fn fit_zoom_shrinks_for_wide_bounds() {
        let viewport = vec2(800.0, 600.0);
        let city = GeoBounds {
            min: GeoPos::from_lat_lon(48.80, 2.25),
            max: GeoPos::from_lat_lon(48.90, 2.42),
        };
        let continent = GeoBounds {
            min: GeoPos::from_lat_lon(36.0, -10.0),
            max: GeoPos::from_lat_lon(60.0, 30.0),
        };
        let city_zoom = city.fit_zoom(viewport);
        let continent_zoom = continent.fit_zoom(viewport);
        assert!(city_zoom > continent_zoom);
        assert_eq!(continent_zoom, 4);
    }

    #[test]
    fn fit_zoom_of_single_point_is_max() {
        let p = GeoPos::from_lat_lon(1.0, 1.0);
        let bounds = GeoBounds { min: p, max: p };
        assert_eq!(bounds.fit_zoom(vec2(100.0, 100.0)), MAX_ZOOM);
    }
}
