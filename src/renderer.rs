//! Renders location points and an optional route onto a [`Map`].
//!
//! Every frame the renderer works out which points still need geocoding, reads the keyed
//! geocoding batch for exactly that address list, merges the results, and compares the
//! outcome with the inputs the current map was built from. Any difference tears the map
//! down and builds a new one.

use eframe::egui;
use egui::{Stroke, Ui};
use log::debug;
use poll_promise::Promise;
use std::collections::HashSet;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;

use crate::Map;
use crate::config::{MapTheme, ServiceConfig};
use crate::geocode::{GeocodeResults, Geocoder, NominatimGeocoder, geocode_batch};
use crate::geometry::footprint_or_skip;
use crate::layers::area::{Area, AreaLayer};
use crate::layers::marker::{Marker, MarkerKind, MarkerLayer};
use crate::layers::route::{RouteLayer, default_route_color};
use crate::location::{LocationPoint, RouteData};
use crate::projection::{GeoBounds, GeoPos};
use crate::query::{QueryCache, QueryState};

/// Padding around a route when fitting the view to it, as a share of its size.
pub const ROUTE_PADDING: f64 = 0.1;

/// Key of the building footprint layer.
pub const BUILDINGS_LAYER: &str = "buildings";
/// Key of the route layer.
pub const ROUTE_LAYER: &str = "route";
/// Key of the marker layer.
pub const MARKERS_LAYER: &str = "markers";

/// Caller controlled view options.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MapOptions {
    /// Zoom used when centering on a single point.
    pub zoom: u8,
    /// Center on the first point instead of fitting all of them.
    pub center_on_first: bool,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            zoom: 13,
            center_on_first: false,
        }
    }
}

/// What the renderer shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderState {
    /// Addresses are being geocoded.
    Loading,
    /// The geocoding service could not be reached.
    Error,
    /// Nothing to plot.
    Empty,
    /// The live map.
    Rendered,
}

impl RenderState {
    /// The placeholder text shown instead of the map, if any.
    pub fn placeholder(&self) -> Option<&'static str> {
        match self {
            Self::Loading => Some("Loading map data…"),
            Self::Error => Some("Unable to load map"),
            Self::Empty => Some("No location to display"),
            Self::Rendered => None,
        }
    }
}

/// A point with coordinates, either its own or geocoded.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedPoint {
    /// Where to draw it.
    pub pos: GeoPos,
    /// The input it came from.
    pub point: LocationPoint,
}

/// How the view is set after a rebuild.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ViewPlan {
    /// Fit a drawn route, with padding.
    FitRoute(GeoBounds),
    /// Center on one point.
    Center(GeoPos),
    /// Fit every marker.
    FitMarkers(GeoBounds),
    /// Leave the map's default view.
    Keep,
}

/// Distinct addresses of points without coordinates, in input order.
pub fn addresses_to_geocode(points: &[LocationPoint]) -> Vec<String> {
    let mut seen = HashSet::new();
    points
        .iter()
        .filter_map(LocationPoint::geocode_address)
        .filter(|a| seen.insert(*a))
        .map(str::to_string)
        .collect()
}

/// Merges geocoding results back into the points. Points that resolve to nothing are dropped.
pub fn resolve_points(
    points: &[LocationPoint],
    geocoded: Option<&GeocodeResults>,
) -> Vec<ResolvedPoint> {
    points
        .iter()
        .filter_map(|point| {
            let pos = point.coordinates().or_else(|| {
                let address = point.geocode_address()?;
                geocoded?.get(address)
            })?;
            Some(ResolvedPoint {
                pos,
                point: point.clone(),
            })
        })
        .collect()
}

/// A stable identifier for a point list, so distinct sets get distinct surfaces.
pub fn surface_id(points: &[LocationPoint]) -> String {
    let serialized = serde_json::to_string(points).unwrap_or_default();
    let mut hasher = DefaultHasher::new();
    serialized.hash(&mut hasher);
    format!("location-map-{:016x}", hasher.finish())
}

/// Popup text of a marker: the label, else the address, else the coordinates.
pub fn marker_popup(resolved: &ResolvedPoint) -> String {
    let point = &resolved.point;
    point
        .label
        .clone()
        .filter(|l| !l.is_empty())
        .or_else(|| point.address.clone().filter(|a| !a.is_empty()))
        .unwrap_or_else(|| format!("{:.6}, {:.6}", resolved.pos.lat, resolved.pos.lon))
}

/// Picks the render state, in priority order loading, error, empty, rendered.
///
/// When no point could ever resolve the map is empty whatever the geocoder is doing.
pub fn render_state(
    points: &[LocationPoint],
    geocoding: &QueryState<'_, GeocodeResults>,
    resolved: &[ResolvedPoint],
) -> RenderState {
    let resolvable = points
        .iter()
        .any(|p| p.coordinates().is_some() || p.geocode_address().is_some());
    if !resolvable {
        return RenderState::Empty;
    }

    match geocoding {
        QueryState::Loading => RenderState::Loading,
        QueryState::Failed(_) => RenderState::Error,
        QueryState::Ready(_) if resolved.is_empty() => RenderState::Empty,
        QueryState::Ready(_) => RenderState::Rendered,
    }
}

/// Decides the view for a rebuilt map.
pub fn view_plan(
    resolved: &[ResolvedPoint],
    route: Option<&RouteData>,
    options: &MapOptions,
) -> ViewPlan {
    if let Some(route) = route.filter(|r| r.is_drawable()) {
        if let Some(bounds) = GeoBounds::from_points(route.positions()) {
            return ViewPlan::FitRoute(bounds);
        }
    }

    match resolved {
        [] => ViewPlan::Keep,
        [first, ..] if options.center_on_first => ViewPlan::Center(first.pos),
        [only] => ViewPlan::Center(only.pos),
        _ => GeoBounds::from_points(resolved.iter().map(|r| r.pos))
            .map_or(ViewPlan::Keep, ViewPlan::FitMarkers),
    }
}

/// Builds a fresh map with buildings, route and markers for the given inputs.
pub fn build_map(
    resolved: &[ResolvedPoint],
    route: Option<&RouteData>,
    options: &MapOptions,
    theme: MapTheme,
) -> Map {
    let mut map = Map::from_boxed_config(theme.tile_config());

    let mut buildings = AreaLayer::default();
    for r in resolved.iter().filter(|r| r.point.is_building()) {
        if let Some(points) = r.point.geometry.as_deref().and_then(footprint_or_skip) {
            buildings.add_area(Area::building(points, theme));
        }
    }
    map.add_layer(BUILDINGS_LAYER, buildings);

    if let Some(route) = route.filter(|r| r.is_drawable()) {
        let color = route.color.unwrap_or_else(|| default_route_color(theme));
        map.add_layer(
            ROUTE_LAYER,
            RouteLayer::new(route.positions(), Stroke::new(4.0, color), route.distance_m),
        );
    }

    let mut markers = MarkerLayer::default();
    for r in resolved {
        let kind = if r.point.is_origin {
            MarkerKind::Origin
        } else if r.point.is_destination {
            MarkerKind::Destination
        } else {
            MarkerKind::Default
        };
        markers.add_marker(Marker::new(r.pos, kind, marker_popup(r)));
    }
    map.add_layer(MARKERS_LAYER, markers);

    match view_plan(resolved, route, options) {
        ViewPlan::FitRoute(bounds) => map.fit_bounds(bounds, ROUTE_PADDING),
        ViewPlan::FitMarkers(bounds) => map.fit_bounds(bounds, 0.0),
        ViewPlan::Center(pos) => map.center_on(pos, options.zoom),
        ViewPlan::Keep => {}
    }

    map
}

/// Everything a map surface depends on.
#[derive(Clone, Debug, PartialEq)]
struct SurfaceKey {
    resolved: Vec<ResolvedPoint>,
    surface_id: String,
    options: MapOptions,
    theme: MapTheme,
    route: Option<RouteData>,
}

struct Surface {
    key: SurfaceKey,
    map: Map,
}

impl Drop for Surface {
    fn drop(&mut self) {
        debug!("Tearing down map surface {}", self.key.surface_id);
    }
}

/// The map renderer.
pub struct LocationMap {
    /// View options. Changing them rebuilds the map.
    pub options: MapOptions,

    geocoder: Arc<dyn Geocoder>,
    geocodes: QueryCache<Vec<String>, GeocodeResults>,
    surface: Option<Surface>,
    builds: u64,
}

impl LocationMap {
    /// Creates a renderer geocoding through Nominatim as configured.
    pub fn new(config: &ServiceConfig) -> Self {
        Self::with_geocoder(Arc::new(NominatimGeocoder::new(config)))
    }

    /// Creates a renderer with a custom geocoder.
    pub fn with_geocoder(geocoder: Arc<dyn Geocoder>) -> Self {
        Self {
            options: MapOptions::default(),
            geocoder,
            geocodes: QueryCache::default(),
            surface: None,
            builds: 0,
        }
    }

    /// The current map, if one is built.
    pub fn map(&self) -> Option<&Map> {
        self.surface.as_ref().map(|s| &s.map)
    }

    /// The identifier of the current map surface.
    pub fn surface_id(&self) -> Option<&str> {
        self.surface.as_ref().map(|s| s.key.surface_id.as_str())
    }

    /// How many map surfaces were built so far.
    pub fn builds(&self) -> u64 {
        self.builds
    }

    /// Resolves the inputs and rebuilds the map when they changed. Returns what to show.
    pub fn prepare(
        &mut self,
        points: &[LocationPoint],
        route: Option<&RouteData>,
        theme: MapTheme,
    ) -> RenderState {
        let addresses = addresses_to_geocode(points);
        // Only the current batch is of interest. A superseded one finishes unobserved.
        self.geocodes.retain_only((!addresses.is_empty()).then_some(&addresses));

        let empty = GeocodeResults::default();
        let geocoding = if addresses.is_empty() {
            QueryState::Ready(&empty)
        } else {
            let geocoder = self.geocoder.clone();
            let batch = addresses.clone();
            self.geocodes.fetch(&addresses, move || {
                Promise::spawn_thread("geocode", move || {
                    geocode_batch(&geocoder, &batch).map_err(Arc::new)
                })
            })
        };

        let resolved = resolve_points(points, geocoding.ready());
        let state = render_state(points, &geocoding, &resolved);

        if state != RenderState::Rendered {
            self.teardown();
            return state;
        }

        let key = SurfaceKey {
            resolved,
            surface_id: surface_id(points),
            options: self.options,
            theme,
            route: route.filter(|r| r.is_drawable()).cloned(),
        };

        if self.surface.as_ref().is_none_or(|s| s.key != key) {
            self.teardown();
            debug!(
                "Building map surface {} with {} points",
                key.surface_id,
                key.resolved.len()
            );
            let map = build_map(&key.resolved, key.route.as_ref(), &key.options, theme);
            self.surface = Some(Surface { key, map });
            self.builds += 1;
        }

        state
    }

    /// Drops the current map and everything it holds.
    pub fn teardown(&mut self) {
        self.surface = None;
    }

    /// Shows the map, or a placeholder, filling the available space.
    pub fn show(
        &mut self,
        ui: &mut Ui,
        points: &[LocationPoint],
        route: Option<&RouteData>,
    ) -> RenderState {
        let theme = MapTheme::from_visuals(ui.visuals());
        let state = self.prepare(points, route, theme);

        match (&mut self.surface, state.placeholder()) {
            (Some(surface), None) => {
                ui.add_sized(ui.available_size_before_wrap(), &mut surface.map);
            }
            (_, placeholder) => {
                let text = placeholder.unwrap_or_default();
                ui.centered_and_justified(|ui| {
                    if state == RenderState::Loading {
                        ui.horizontal_centered(|ui| {
                            ui.spinner();
                            ui.label(text);
                        });
                        ui.ctx().request_repaint();
                    } else {
                        ui.weak(text);
                    }
                });
            }
        }

        state
    }
}
