//! Client for the backend's shortest-path routing API.
//!
//! The backend computes routes over a road network stored with the sketch; this crate only
//! asks for them and draws the answer.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::ServiceConfig;
use crate::location::{RouteData, RouteKey};
use crate::{CLIENT, MapError};

/// Pathfinding algorithm run by the backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteAlgorithm {
    /// Dijkstra over road segment lengths.
    #[default]
    Dijkstra,
    /// A* with a straight-line distance heuristic.
    AStar,
}

/// Body of `POST /api/routing/shortest-path`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ShortestPathRequest {
    /// Sketch holding the road network.
    pub sketch_id: String,
    /// Origin node.
    pub origin_node_id: String,
    /// Destination node.
    pub destination_node_id: String,
    /// Algorithm to run.
    pub algorithm: RouteAlgorithm,
}

impl ShortestPathRequest {
    /// The request for a route query key.
    pub fn new(key: &RouteKey, algorithm: RouteAlgorithm) -> Self {
        Self {
            sketch_id: key.sketch_id.clone(),
            origin_node_id: key.origin().to_string(),
            destination_node_id: key.destination().to_string(),
            algorithm,
        }
    }
}

/// Response of `POST /api/routing/shortest-path`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ShortestPathResponse {
    /// Whether a path was found.
    pub success: bool,
    /// Route as `[[lat, lon], ...]`.
    pub route: Vec<[f64; 2]>,
    /// Total length in meters.
    pub distance_m: Option<f64>,
    /// Number of intersections along the path.
    pub intersection_count: Option<u32>,
    /// Human readable status.
    pub message: Option<String>,
}

impl ShortestPathResponse {
    /// Converts a response into route data, failing when the backend reports no path.
    pub fn into_route(self) -> Result<RouteData, MapError> {
        if !self.success {
            return Err(MapError::NoRoute(
                self.message
                    .unwrap_or_else(|| "the routing service reported a failure".to_string()),
            ));
        }
        Ok(RouteData {
            coordinates: self.route.into_iter().map(|[lat, lon]| (lat, lon)).collect(),
            distance_m: self.distance_m,
            color: None,
        })
    }
}

/// Response of `GET /api/routing/check-network/{sketch_id}`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct NetworkStatus {
    /// Intersections in the road network.
    pub intersection_count: u64,
    /// Road segments in the network.
    pub segment_count: u64,
    /// Sketch locations linked to their nearest intersection.
    pub linked_locations: u64,
    /// Whether routing can work at all.
    pub has_network: bool,
}

/// Asks an external service for routes.
pub trait RouteProvider: Send + Sync {
    /// Fetches the shortest path for `request`.
    fn shortest_path(&self, request: &ShortestPathRequest) -> Result<RouteData, MapError>;

    /// Fetches the road network status of a sketch.
    fn network_status(&self, sketch_id: &str) -> Result<NetworkStatus, MapError>;
}

/// [`RouteProvider`] speaking to the backend over HTTP.
#[derive(Clone, Debug)]
pub struct HttpRoutingClient {
    base_url: String,
    auth_token: Option<String>,
}

impl HttpRoutingClient {
    /// Creates a client for the API at `config.api_base_url`.
    pub fn new(config: &ServiceConfig) -> Self {
        Self {
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/routing/{}", self.base_url, path)
    }

    fn authorize(
        &self,
        request: reqwest::blocking::RequestBuilder,
    ) -> reqwest::blocking::RequestBuilder {
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn check_status(
        url: &str,
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, MapError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(MapError::ServiceStatus {
                url: url.to_string(),
                status: response.status().to_string(),
            })
        }
    }
}

impl RouteProvider for HttpRoutingClient {
    fn shortest_path(&self, request: &ShortestPathRequest) -> Result<RouteData, MapError> {
        let url = self.url("shortest-path");
        debug!(
            "Requesting route {} -> {} in sketch {}",
            request.origin_node_id, request.destination_node_id, request.sketch_id
        );

        let response = self.authorize(CLIENT.post(&url).json(request)).send()?;
        let body: ShortestPathResponse = Self::check_status(&url, response)?.json()?;
        if let Some(message) = &body.message {
            info!("{}", message);
        }
        body.into_route()
    }

    fn network_status(&self, sketch_id: &str) -> Result<NetworkStatus, MapError> {
        let url = self.url(&format!("check-network/{sketch_id}"));
        let response = self.authorize(CLIENT.get(&url)).send()?;
        Ok(Self::check_status(&url, response)?.json()?)
    }
}
