//! A layer for building footprints and other filled polygons.
//!
//! # Example
//!
//! ```no_run
//! use egui_location_map::{Map, config::{MapTheme, OpenStreetMapConfig}, layers::area::{Area, AreaLayer}, projection::GeoPos};
//!
//! let mut map = Map::new(OpenStreetMapConfig::default());
//! let mut area_layer = AreaLayer::default();
//! area_layer.add_area(Area::building(
//!     vec![
//!         GeoPos { lon: 10.0, lat: 55.0 },
//!         GeoPos { lon: 11.0, lat: 55.0 },
//!         GeoPos { lon: 10.5, lat: 55.5 },
//!     ],
//!     MapTheme::Light,
//! ));
//! map.add_layer("buildings", area_layer);
//! ```

use crate::config::MapTheme;
use crate::layers::{Layer, click_pos, draw_popup, point_in_polygon};
use crate::projection::{GeoPos, MapProjection};
use egui::{Color32, Mesh, Painter, Pos2, Response, Shape, Stroke};
use log::warn;
use std::any::Any;

/// The popup text of building footprints.
pub const BUILDING_POPUP: &str = "Building";

/// A polygon area on the map.
#[derive(Clone, Debug, PartialEq)]
pub struct Area {
    /// The nodes of the polygon, without a closing duplicate. Must be 3 or more.
    pub points: Vec<GeoPos>,
    /// The stroke style for drawing the polygon outline.
    pub stroke: Stroke,
    /// The fill color of the polygon.
    pub fill: Color32,
    /// Text shown when the area is clicked.
    pub popup: Option<String>,
}

impl Area {
    /// A building footprint styled for `theme`.
    pub fn building(points: Vec<GeoPos>, theme: MapTheme) -> Self {
        let color = match theme {
            MapTheme::Dark => Color32::from_rgb(251, 191, 36),
            MapTheme::Light => Color32::from_rgb(234, 88, 12),
        };
        Self {
            points,
            stroke: Stroke::new(2.0, color),
            fill: color.gamma_multiply(0.3),
            popup: Some(BUILDING_POPUP.to_string()),
        }
    }
}

/// Layer implementation that draws filled polygons.
#[derive(Clone, Default)]
pub struct AreaLayer {
    areas: Vec<Area>,

    /// Index of the area with an open popup and where it was opened.
    open_popup: Option<(usize, GeoPos)>,
}

impl AreaLayer {
    /// Adds a new area to the layer. Areas with fewer than 3 nodes are ignored.
    pub fn add_area(&mut self, area: Area) {
        if area.points.len() >= 3 {
            self.areas.push(area);
        } else {
            warn!("Ignoring area with {} points", area.points.len());
        }
    }

    /// All areas in drawing order.
    pub fn areas(&self) -> &[Area] {
        &self.areas
    }

    fn find_area_at(&self, screen_pos: Pos2, projection: &MapProjection) -> Option<usize> {
        self.areas.iter().enumerate().rev().find_map(|(i, area)| {
            let screen_points: Vec<Pos2> =
                area.points.iter().map(|p| projection.project(*p)).collect();
            (area.popup.is_some() && point_in_polygon(screen_pos, &screen_points)).then_some(i)
        })
    }
}

impl Layer for AreaLayer {
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

        self.open_popup = self
            .find_area_at(pointer_pos, projection)
            .map(|i| (i, projection.unproject(pointer_pos)));
        self.open_popup.is_some()
    }

    fn dismiss_popup(&mut self) {
        self.open_popup = None;
    }

    fn draw(&self, painter: &Painter, projection: &MapProjection) {
        for area in &self.areas {
            let screen_points: Vec<Pos2> =
                area.points.iter().map(|p| projection.project(*p)).collect();

            // Triangulate for the fill, so concave footprints render correctly.
            let flat_points: Vec<f64> = screen_points
                .iter()
                .flat_map(|p| [p.x as f64, p.y as f64])
                .collect();
            match earcutr::earcut(&flat_points, &[], 2) {
                Ok(indices) => {
                    let mut mesh = Mesh::default();
                    mesh.vertices = screen_points
                        .iter()
                        .map(|p| egui::epaint::Vertex {
                            pos: *p,
                            uv: Default::default(),
                            color: area.fill,
                        })
                        .collect();
                    mesh.indices = indices.into_iter().map(|i| i as u32).collect();
                    painter.add(Shape::Mesh(mesh.into()));
                }
                Err(e) => warn!("Unable to triangulate area: {:?}", e),
            }

            painter.add(Shape::Path(egui::epaint::PathShape {
                points: screen_points,
                closed: true,
                fill: Color32::TRANSPARENT,
                stroke: area.stroke.into(),
            }));
        }

        if let Some((index, pos)) = self.open_popup {
            if let Some(text) = self.areas.get(index).and_then(|a| a.popup.as_deref()) {
                draw_popup(painter, projection.project(pos), text);
            }
        }
    }
}
