//! Location points and routes derived from graph state.

use egui::Color32;
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::projection::GeoPos;

/// Node types that are always plotted, coordinates or not.
pub const LOCATION_NODE_TYPES: [&str; 3] = ["location", "place", "building"];

/// A node of the investigation graph, as held by the graph store.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    /// Store identifier of the node.
    pub node_id: String,
    /// The node's type, e.g. `location` or `domain`.
    #[serde(default)]
    pub node_type: String,
    /// Display label computed by the store.
    #[serde(default)]
    pub node_label: Option<String>,
    /// Free-form properties.
    #[serde(default)]
    pub node_properties: JsonMap<String, JsonValue>,
}

impl GraphNode {
    fn number(&self, key: &str) -> Option<f64> {
        match self.node_properties.get(key)? {
            JsonValue::Number(n) => n.as_f64(),
            JsonValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
        .filter(|v: &f64| v.is_finite())
    }

    fn text(&self, key: &str) -> Option<String> {
        match self.node_properties.get(key)? {
            JsonValue::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            _ => None,
        }
    }

    /// The `latitude` property, if numeric.
    pub fn latitude(&self) -> Option<f64> {
        self.number("latitude")
    }

    /// The `longitude` property, if numeric.
    pub fn longitude(&self) -> Option<f64> {
        self.number("longitude")
    }

    /// Whether the node carries both a latitude and a longitude.
    pub fn has_coordinates(&self) -> bool {
        self.latitude().is_some() && self.longitude().is_some()
    }

    /// Whether the node is of a location-like type.
    pub fn is_location_type(&self) -> bool {
        LOCATION_NODE_TYPES
            .iter()
            .any(|t| self.node_type.eq_ignore_ascii_case(t))
    }

    /// Display label: `name`, else `label`, else the store's label.
    pub fn display_label(&self) -> Option<String> {
        self.text("name")
            .or_else(|| self.text("label"))
            .or_else(|| self.node_label.clone().filter(|l| !l.trim().is_empty()))
    }

    /// The address to geocode: `address`, extended with `city` and `country` when present.
    pub fn full_address(&self) -> Option<String> {
        let mut address = self.text("address")?;
        for key in ["city", "country"] {
            if let Some(part) = self.text(key) {
                address.push_str(", ");
                address.push_str(&part);
            }
        }
        Some(address)
    }
}

/// What the panel reads from the graph store every frame.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphState {
    /// The current sketch, if one is open.
    pub sketch_id: Option<String>,
    /// All nodes of the sketch.
    pub nodes: Vec<GraphNode>,
    /// Identifiers of the selected nodes, in selection order.
    pub selected_ids: Vec<String>,
}

/// A point handed to the renderer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationPoint {
    /// Latitude, when known.
    pub latitude: Option<f64>,
    /// Longitude, when known.
    pub longitude: Option<f64>,
    /// Free-text address used for geocoding.
    pub address: Option<String>,
    /// Popup label.
    pub label: Option<String>,
    /// First node of the selected pair.
    pub is_origin: bool,
    /// Second node of the selected pair.
    pub is_destination: bool,
    /// Footprint as WKT (or GeoJSON).
    pub geometry: Option<String>,
    /// Type of the node the point came from.
    pub node_type: Option<String>,
    /// Identifier of the node the point came from.
    pub node_id: Option<String>,
}

impl LocationPoint {
    /// A point at known coordinates.
    pub fn at(lat: f64, lon: f64) -> Self {
        Self {
            latitude: Some(lat),
            longitude: Some(lon),
            ..Default::default()
        }
    }

    /// A point that must be geocoded.
    pub fn with_address(address: impl Into<String>) -> Self {
        Self {
            address: Some(address.into()),
            ..Default::default()
        }
    }

    /// The explicit coordinates of the point.
    ///
    /// `(0, 0)` counts as unset: it is what a node without coordinates defaults to.
    pub fn coordinates(&self) -> Option<GeoPos> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) if !(lat == 0.0 && lon == 0.0) => {
                Some(GeoPos::from_lat_lon(lat, lon))
            }
            _ => None,
        }
    }

    /// The address to geocode, when the point has no coordinates of its own.
    pub fn geocode_address(&self) -> Option<&str> {
        if self.coordinates().is_some() {
            return None;
        }
        self.address.as_deref().filter(|a| !a.trim().is_empty())
    }

    /// Whether the point is a building footprint candidate.
    pub fn is_building(&self) -> bool {
        self.node_type
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case("building"))
    }
}

/// A route to overlay on the map.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RouteData {
    /// Route vertices as `(latitude, longitude)`.
    pub coordinates: Vec<(f64, f64)>,
    /// Total length in meters.
    pub distance_m: Option<f64>,
    /// Line color; the theme decides when absent.
    pub color: Option<Color32>,
}

impl RouteData {
    /// Route vertices as map positions.
    pub fn positions(&self) -> Vec<GeoPos> {
        self.coordinates
            .iter()
            .map(|&(lat, lon)| GeoPos::from_lat_lon(lat, lon))
            .collect()
    }

    /// Whether the route has enough vertices to be drawn.
    pub fn is_drawable(&self) -> bool {
        self.coordinates.len() >= 2
    }
}

/// Derives the renderer's points from the node set and the selection.
///
/// Keeps nodes of a location-like type and nodes carrying both coordinates, in their
/// original order. Origin/destination flags are set only when exactly two nodes are
/// selected.
pub fn derive_locations(nodes: &[GraphNode], selected_ids: &[String]) -> Vec<LocationPoint> {
    let pair = match selected_ids {
        [origin, destination] => Some((origin.as_str(), destination.as_str())),
        _ => None,
    };

    nodes
        .iter()
        .filter(|node| node.is_location_type() || node.has_coordinates())
        .map(|node| {
            let label = node.display_label();
            LocationPoint {
                latitude: node.latitude(),
                longitude: node.longitude(),
                address: node.full_address().or_else(|| label.clone()),
                label,
                is_origin: pair.is_some_and(|(o, _)| o == node.node_id),
                is_destination: pair.is_some_and(|(_, d)| d == node.node_id),
                geometry: node.text("geometry"),
                node_type: Some(node.node_type.clone()).filter(|t| !t.is_empty()),
                node_id: Some(node.node_id.clone()),
            }
        })
        .collect()
}

/// Identity of a route query.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RouteKey {
    /// The sketch holding the road network.
    pub sketch_id: String,
    /// Origin and destination node identifiers.
    pub node_ids: [String; 2],
}

impl RouteKey {
    /// The key for the current selection; `None` unless a sketch is open and exactly two
    /// nodes are selected.
    pub fn from_selection(sketch_id: Option<&str>, selected_ids: &[String]) -> Option<Self> {
        match (sketch_id, selected_ids) {
            (Some(sketch_id), [origin, destination]) => Some(Self {
                sketch_id: sketch_id.to_string(),
                node_ids: [origin.clone(), destination.clone()],
            }),
            _ => None,
        }
    }

    /// The origin node.
    pub fn origin(&self) -> &str {
        &self.node_ids[0]
    }

    /// The destination node.
    pub fn destination(&self) -> &str {
        &self.node_ids[1]
    }
}
