//! The map panel: graph state in, map with optional route out.

use eframe::egui;
use egui::{Color32, RichText, Ui};
use log::info;
use poll_promise::Promise;
use std::sync::Arc;

use crate::config::ServiceConfig;
use crate::geocode::{Geocoder, NominatimGeocoder};
use crate::layers::route::route_popup_text;
use crate::location::{GraphState, LocationPoint, RouteData, RouteKey, derive_locations};
use crate::query::{QueryCache, QueryState};
use crate::renderer::{LocationMap, RenderState};
use crate::routing::{
    HttpRoutingClient, NetworkStatus, RouteAlgorithm, RouteProvider, ShortestPathRequest,
};

/// Where the route for the current selection stands.
#[derive(Clone, Debug, PartialEq)]
pub enum RouteStatus {
    /// No route is wanted: the selection is not exactly two nodes, or no sketch is open.
    Idle,
    /// The routing service is working on it.
    Loading,
    /// The request failed. Not retried for the same selection.
    Failed(String),
    /// The route is known.
    Ready(RouteData),
}

/// Shows the located nodes of a graph on a map and routes between two selected nodes.
pub struct MapPanel {
    router: Arc<dyn RouteProvider>,
    algorithm: RouteAlgorithm,
    routes: QueryCache<RouteKey, RouteData>,
    networks: QueryCache<String, NetworkStatus>,
    renderer: LocationMap,
    dismissed: Option<RouteKey>,
}

impl MapPanel {
    /// Creates a panel talking to the services in `config`.
    pub fn new(config: ServiceConfig) -> Self {
        Self::with_services(
            config.algorithm,
            Arc::new(HttpRoutingClient::new(&config)),
            Arc::new(NominatimGeocoder::new(&config)),
        )
    }

    /// Creates a panel with custom routing and geocoding services.
    pub fn with_services(
        algorithm: RouteAlgorithm,
        router: Arc<dyn RouteProvider>,
        geocoder: Arc<dyn Geocoder>,
    ) -> Self {
        Self {
            router,
            algorithm,
            routes: QueryCache::default(),
            networks: QueryCache::default(),
            renderer: LocationMap::with_geocoder(geocoder),
            dismissed: None,
        }
    }

    /// The map renderer, e.g. to change its view options.
    pub fn renderer(&mut self) -> &mut LocationMap {
        &mut self.renderer
    }

    /// The points to plot for `state`.
    pub fn locations(state: &GraphState) -> Vec<LocationPoint> {
        derive_locations(&state.nodes, &state.selected_ids)
    }

    /// The route status for the current selection, requesting the route if the selection is new.
    pub fn route_status(&mut self, state: &GraphState) -> RouteStatus {
        let Some(key) = RouteKey::from_selection(state.sketch_id.as_deref(), &state.selected_ids)
        else {
            return RouteStatus::Idle;
        };

        let router = self.router.clone();
        let request = ShortestPathRequest::new(&key, self.algorithm);
        let query = self.routes.fetch(&key, move || {
            Promise::spawn_thread("route", move || {
                let route = router.shortest_path(&request).map_err(|e| {
                    Arc::new(eyre::Report::new(e).wrap_err(format!(
                        "Route {} -> {} failed",
                        request.origin_node_id, request.destination_node_id
                    )))
                })?;
                info!(
                    "Route {} -> {}: {} points",
                    request.origin_node_id,
                    request.destination_node_id,
                    route.coordinates.len()
                );
                Ok(route)
            })
        });

        match query {
            QueryState::Loading => RouteStatus::Loading,
            QueryState::Ready(route) => RouteStatus::Ready(route.clone()),
            QueryState::Failed(e) => RouteStatus::Failed(format!("{:#}", e)),
        }
    }

    /// Whether the open sketch is known to lack a road network. Only checked while two nodes
    /// are selected, once per sketch.
    pub fn missing_network(&mut self, state: &GraphState) -> bool {
        let Some(key) = RouteKey::from_selection(state.sketch_id.as_deref(), &state.selected_ids)
        else {
            return false;
        };

        let router = self.router.clone();
        let sketch_id = key.sketch_id;
        let spawn_id = sketch_id.clone();
        self.networks.retain_only(Some(&sketch_id));
        let query = self.networks.fetch(&sketch_id, move || {
            Promise::spawn_thread("network", move || {
                router
                    .network_status(&spawn_id)
                    .map_err(|e| Arc::new(eyre::Report::new(e).wrap_err("Network check failed")))
            })
        });

        query.ready().is_some_and(|status| !status.has_network)
    }

    /// Hides the route error of the current selection.
    pub fn dismiss_route_error(&mut self, state: &GraphState) {
        self.dismissed = RouteKey::from_selection(state.sketch_id.as_deref(), &state.selected_ids);
    }

    fn error_dismissed(&self, state: &GraphState) -> bool {
        self.dismissed.is_some()
            && self.dismissed
                == RouteKey::from_selection(state.sketch_id.as_deref(), &state.selected_ids)
    }

    /// Shows the panel, filling the available space.
    pub fn show(&mut self, ui: &mut Ui, state: &GraphState) -> RenderState {
        let points = Self::locations(state);
        let status = self.route_status(state);
        let missing_network = self.missing_network(state);

        let mut dismiss = false;
        match &status {
            RouteStatus::Idle => {}
            RouteStatus::Loading => {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("Calculating route…");
                });
                ui.ctx().request_repaint();
            }
            RouteStatus::Failed(message) => {
                if !self.error_dismissed(state) {
                    ui.horizontal(|ui| {
                        ui.label(
                            RichText::new(format!("Route unavailable: {}", message))
                                .color(ui.visuals().error_fg_color),
                        );
                        dismiss = ui.small_button("✕").on_hover_text("Dismiss").clicked();
                    });
                }
            }
            RouteStatus::Ready(route) => {
                let text = route
                    .distance_m
                    .map_or_else(|| "Route found".to_string(), route_popup_text);
                ui.label(RichText::new(text).color(Color32::from_rgb(34, 197, 94)));
            }
        }
        if missing_network {
            ui.weak("No road network is loaded for this sketch, so routes cannot be computed.");
        }
        if dismiss {
            self.dismiss_route_error(state);
        }

        let route = match &status {
            RouteStatus::Ready(route) => Some(route),
            _ => None,
        };
        self.renderer.show(ui, &points, route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geocode::tests::FakeGeocoder;
    use crate::location::GraphNode;
    use crate::routing::tests::FakeRouter;
    use serde_json::json;
    use std::time::Duration;

    fn node(id: &str, lat: f64, lon: f64) -> GraphNode {
        serde_json::from_value(json!({
            "nodeId": id,
            "nodeType": "location",
            "nodeProperties": { "latitude": lat, "longitude": lon },
        }))
        .unwrap()
    }

    fn state(selected: &[&str]) -> GraphState {
        GraphState {
            sketch_id: Some("sketch-1".to_string()),
            nodes: vec![node("a", 48.85, 2.29), node("b", 48.86, 2.30), node("c", 48.87, 2.31)],
            selected_ids: selected.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn make_panel(router: Arc<FakeRouter>) -> MapPanel {
        MapPanel::with_services(
            RouteAlgorithm::AStar,
            router,
            Arc::new(FakeGeocoder::default()),
        )
    }

    fn settle(panel: &mut MapPanel, state: &GraphState) -> RouteStatus {
        for _ in 0..400 {
            let status = panel.route_status(state);
            if status != RouteStatus::Loading {
                return status;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        panic!("route query did not settle");
    }

    #[test]
    fn no_route_without_two_selected_nodes() {
        let router = Arc::new(FakeRouter::default());
        let mut panel = make_panel(router.clone());

        for selected in [&[][..], &["a"][..], &["a", "b", "c"][..]] {
            assert_eq!(panel.route_status(&state(selected)), RouteStatus::Idle);
            assert!(!panel.missing_network(&state(selected)));
        }

        let mut no_sketch = state(&["a", "b"]);
        no_sketch.sketch_id = None;
        assert_eq!(panel.route_status(&no_sketch), RouteStatus::Idle);

        assert!(router.requests.lock().unwrap().is_empty());
        assert!(panel.routes.is_empty());
    }

    #[test]
    fn route_requested_once_per_selection() {
        let router = Arc::new(FakeRouter::default());
        let mut panel = make_panel(router.clone());
        let selected = state(&["a", "b"]);

        match settle(&mut panel, &selected) {
            RouteStatus::Ready(route) => assert_eq!(route.distance_m, Some(1500.0)),
            other => panic!("unexpected {other:?}"),
        }
        settle(&mut panel, &selected);
        assert_eq!(router.requests.lock().unwrap().len(), 1);

        let request = router.requests.lock().unwrap()[0].clone();
        assert_eq!(request.sketch_id, "sketch-1");
        assert_eq!(request.origin_node_id, "a");
        assert_eq!(request.destination_node_id, "b");
        assert_eq!(request.algorithm, RouteAlgorithm::AStar);

        // Reversing the selection is a different route.
        settle(&mut panel, &state(&["b", "a"]));
        assert_eq!(router.requests.lock().unwrap().len(), 2);
        assert_eq!(panel.routes.len(), 2);
    }

    #[test]
    fn failed_route_is_not_retried_and_can_be_dismissed() {
        let router = Arc::new(FakeRouter {
            fail: true,
            ..Default::default()
        });
        let mut panel = make_panel(router.clone());
        let selected = state(&["a", "c"]);

        match settle(&mut panel, &selected) {
            RouteStatus::Failed(message) => assert!(message.contains("no road network")),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(panel.route_status(&selected), RouteStatus::Failed(_)));
        assert_eq!(router.requests.lock().unwrap().len(), 1);

        assert!(!panel.error_dismissed(&selected));
        panel.dismiss_route_error(&selected);
        assert!(panel.error_dismissed(&selected));
        assert!(!panel.error_dismissed(&state(&["a", "b"])));
    }

    #[test]
    fn missing_network_hint() {
        let router = Arc::new(FakeRouter {
            fail: true,
            ..Default::default()
        });
        let mut panel = make_panel(router);
        let selected = state(&["a", "b"]);

        let mut missing = false;
        for _ in 0..400 {
            missing = panel.missing_network(&selected);
            if missing {
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(missing);
        assert_eq!(panel.networks.len(), 1);

        let mut other = state(&["a", "b"]);
        other.sketch_id = Some("sketch-2".to_string());
        panel.missing_network(&other);
        assert_eq!(panel.networks.len(), 1);
        assert!(panel.networks.get(&"sketch-2".to_string()).is_some());

        let mut healthy = make_panel(Arc::new(FakeRouter::default()));
        for _ in 0..50 {
            assert!(!healthy.missing_network(&selected));
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn locations_flag_selected_pair() {
        let points = MapPanel::locations(&state(&["b", "c"]));
        assert_eq!(points.len(), 3);
        assert!(!points[0].is_origin && !points[0].is_destination);
        assert!(points[1].is_origin);
        assert!(points[2].is_destination);
    }
}
