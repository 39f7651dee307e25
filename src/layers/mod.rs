//! Layers for the map view that can handle input, and draw on top of the map view different kinds of data.
//!
use egui::{Align2, Color32, FontId, Painter, Pos2, Rect, Response, Stroke};
use std::any::Any;

use crate::projection::MapProjection;

/// Building footprints.
pub mod area;

/// Location markers.
pub mod marker;

/// Route polyline.
pub mod route;

/// Tile layer
pub mod tile;

/// A trait for map layers.
pub trait Layer: Any {
    /// Handles user input for the layer. Returns `true` if the input was handled and should not be
    /// processed further by the map.
    fn handle_input(&mut self, response: &Response, projection: &MapProjection) -> bool;

    /// Draws the layer.
    fn draw(&self, painter: &Painter, projection: &MapProjection);

    /// Closes the layer's popup, if it has one open.
    fn dismiss_popup(&mut self) {}

    /// Gets the layer as a `dyn Any`.
    fn as_any(&self) -> &dyn Any;

    /// Gets the layer as a mutable `dyn Any`.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Returns the click position when the response is a plain primary click.
pub(crate) fn click_pos(response: &Response) -> Option<Pos2> {
    if response.clicked() && !response.dragged() {
        response.interact_pointer_pos()
    } else {
        None
    }
}

/// Draws a popup bubble with its tip at `anchor`.
pub(crate) fn draw_popup(painter: &Painter, anchor: Pos2, text: &str) {
    let dark = painter.ctx().style().visuals.dark_mode;
    let (text_color, background) = if dark {
        (Color32::from_gray(230), Color32::from_gray(40))
    } else {
        (Color32::from_gray(30), Color32::WHITE)
    };

    let galley = painter.layout_no_wrap(text.to_string(), FontId::proportional(13.0), text_color);
    let tip = anchor - egui::vec2(0.0, 8.0);
    let rect = Align2::CENTER_BOTTOM.anchor_rect(Rect::from_min_size(tip, galley.size()));
    let bubble = rect.expand(6.0);

    painter.add(egui::Shape::convex_polygon(
        vec![anchor, tip + egui::vec2(6.0, 0.0), tip - egui::vec2(6.0, 0.0)],
        background,
        Stroke::NONE,
    ));
    painter.rect_filled(bubble, 4.0, background);
    painter.rect_stroke(
        bubble,
        4.0,
        Stroke::new(1.0, Color32::from_black_alpha(60)),
        egui::StrokeKind::Outside,
    );
    painter.galley(rect.min, galley, text_color);
}

/// Calculates the squared distance from a point to a line segment.
pub(crate) fn dist_sq_to_segment(p: Pos2, a: Pos2, b: Pos2) -> f32 {
    let ab = b - a;
    let ap = p - a;
    let l2 = ab.length_sq();

    if l2 == 0.0 {
        // The segment is a point.
        return ap.length_sq();
    }

    // `t` is the normalized distance from a to the projection of p.
    let t = (ap.dot(ab) / l2).clamp(0.0, 1.0);
    p.distance_sq(a + t * ab)
}

/// Even-odd test for a point inside a closed polygon.
pub(crate) fn point_in_polygon(p: Pos2, polygon: &[Pos2]) -> bool {
    if polygon.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (a, b) = (polygon[i], polygon[j]);
        if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::pos2;

    const EPSILON: f32 = 1e-6;

    #[test]
    fn test_dist_sq_to_segment() {
        let a = pos2(0.0, 0.0);
        let b = pos2(10.0, 0.0);

        // On the segment
        assert!(dist_sq_to_segment(pos2(5.0, 0.0), a, b).abs() < EPSILON);

        // Projection falls on the segment
        assert!((dist_sq_to_segment(pos2(5.0, 5.0), a, b) - 25.0).abs() < EPSILON);

        // Projection falls before `a` and after `b`
        assert!((dist_sq_to_segment(pos2(-5.0, 5.0), a, b) - 50.0).abs() < EPSILON);
        assert!((dist_sq_to_segment(pos2(15.0, 5.0), a, b) - 50.0).abs() < EPSILON);

        // Zero-length segment
        let c = pos2(5.0, 5.0);
        assert!((dist_sq_to_segment(pos2(10.0, 10.0), c, c) - 50.0).abs() < EPSILON);
    }

    #[test]
    fn test_point_in_polygon() {
        let square = [
            pos2(0.0, 0.0),
            pos2(10.0, 0.0),
            pos2(10.0, 10.0),
            pos2(0.0, 10.0),
        ];
        assert!(point_in_polygon(pos2(5.0, 5.0), &square));
        assert!(!point_in_polygon(pos2(15.0, 5.0), &square));
        assert!(!point_in_polygon(pos2(-1.0, -1.0), &square));

        // Concave "L" shape: the notch is outside.
        let l_shape = [
            pos2(0.0, 0.0),
            pos2(10.0, 0.0),
            pos2(10.0, 4.0),
            pos2(4.0, 4.0),
            pos2(4.0, 10.0),
            pos2(0.0, 10.0),
        ];
        assert!(point_in_polygon(pos2(2.0, 8.0), &l_shape));
        assert!(!point_in_polygon(pos2(8.0, 8.0), &l_shape));

        // Degenerate input
        assert!(!point_in_polygon(pos2(0.0, 0.0), &square[..2]));
    }
}
