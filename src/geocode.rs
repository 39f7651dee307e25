//! Address lookups against a Nominatim compatible geocoding service.

use log::{debug, warn};
use serde::Deserialize;
use std::sync::Arc;

use crate::config::ServiceConfig;
use crate::projection::GeoPos;
use crate::{CLIENT, MapError};

/// Resolves free-text addresses to coordinates.
pub trait Geocoder: Send + Sync {
    /// Looks up one address. `Ok(None)` means the service found nothing.
    fn lookup(&self, address: &str) -> Result<Option<GeoPos>, MapError>;
}

/// One entry of a Nominatim search response. Coordinates are string encoded.
#[derive(Debug, Deserialize)]
struct SearchHit {
    lat: Option<String>,
    lon: Option<String>,
}

impl SearchHit {
    fn position(&self) -> Option<GeoPos> {
        let lat: f64 = self.lat.as_deref()?.trim().parse().ok()?;
        let lon: f64 = self.lon.as_deref()?.trim().parse().ok()?;
        (lat.is_finite() && lon.is_finite()).then(|| GeoPos::from_lat_lon(lat, lon))
    }
}

/// Geocoder backed by the Nominatim search API.
#[derive(Clone, Debug)]
pub struct NominatimGeocoder {
    search_url: String,
    user_agent: String,
}

impl NominatimGeocoder {
    /// Creates a geocoder for the search endpoint in `config`.
    pub fn new(config: &ServiceConfig) -> Self {
        Self {
            search_url: config.geocoder_url.clone(),
            user_agent: config.user_agent.clone(),
        }
    }
}

impl Geocoder for NominatimGeocoder {
    fn lookup(&self, address: &str) -> Result<Option<GeoPos>, MapError> {
        debug!("Geocoding {:?}", address);
        let response = CLIENT
            .get(&self.search_url)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .query(&[("q", address), ("format", "json"), ("limit", "1")])
            .send()?;

        if !response.status().is_success() {
            return Err(MapError::ServiceStatus {
                url: self.search_url.clone(),
                status: response.status().to_string(),
            });
        }

        let hits: Option<Vec<SearchHit>> = response.json()?;
        Ok(first_position(hits.unwrap_or_default()))
    }
}

fn first_position(hits: Vec<SearchHit>) -> Option<GeoPos> {
    hits.first().and_then(SearchHit::position)
}

/// The outcome of one geocoding batch: one optional position per address, in request order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GeocodeResults {
    entries: Vec<(String, Option<GeoPos>)>,
}

impl GeocodeResults {
    /// Builds results from `(address, position)` pairs.
    pub fn new(entries: Vec<(String, Option<GeoPos>)>) -> Self {
        Self { entries }
    }

    /// The position found for `address`, if any.
    pub fn get(&self, address: &str) -> Option<GeoPos> {
        self.entries
            .iter()
            .find(|(a, _)| a == address)
            .and_then(|(_, pos)| *pos)
    }
}

/// Looks up every address in order, one request at a time.
///
/// A failed or empty lookup yields `None` for that address. The batch as a whole fails only
/// when every lookup failed at the transport or HTTP level, which means the service is
/// unreachable rather than the addresses unknown.
pub fn geocode_batch(
    geocoder: &Arc<dyn Geocoder>,
    addresses: &[String],
) -> eyre::Result<GeocodeResults> {
    let mut entries = Vec::with_capacity(addresses.len());
    let mut last_error = None;
    let mut failures = 0;

    for address in addresses {
        let position = match geocoder.lookup(address) {
            Ok(Some(pos)) => Some(pos),
            Ok(None) => {
                debug!("No coordinates found for {:?}", address);
                None
            }
            Err(e) => {
                warn!("Geocoding failed for {:?}: {}", address, e);
                failures += 1;
                last_error = Some(e);
                None
            }
        };
        entries.push((address.clone(), position));
    }

    if let Some(e) = last_error {
        if failures == addresses.len() {
            return Err(eyre::Report::new(e)
                .wrap_err(format!("Geocoding service failed for all {} addresses", failures)));
        }
    }

    Ok(GeocodeResults::new(entries))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Answers from a fixed table and records every lookup.
    #[derive(Default)]
    pub(crate) struct FakeGeocoder {
        pub(crate) known: HashMap<String, GeoPos>,
        pub(crate) unreachable: bool,
        pub(crate) calls: Mutex<Vec<String>>,
    }

    impl FakeGeocoder {
        pub(crate) fn with(known: &[(&str, GeoPos)]) -> Self {
            Self {
                known: known.iter().map(|(a, p)| (a.to_string(), *p)).collect(),
                ..Default::default()
            }
        }

        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Geocoder for FakeGeocoder {
        fn lookup(&self, address: &str) -> Result<Option<GeoPos>, MapError> {
            self.calls.lock().unwrap().push(address.to_string());
            if self.unreachable {
                return Err(MapError::ServiceStatus {
                    url: "fake".to_string(),
                    status: "503 Service Unavailable".to_string(),
                });
            }
            Ok(self.known.get(address).copied())
        }
    }

    fn addresses(list: &[&str]) -> Vec<String> {
        list.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn search_hit_parses_string_coordinates() {
        let hits: Vec<SearchHit> =
            serde_json::from_str(r#"[{"lat":"48.8584","lon":"2.2945","display_name":"x"}]"#)
                .unwrap();
        assert_eq!(first_position(hits), Some(GeoPos::from_lat_lon(48.8584, 2.2945)));
    }

    #[test]
    fn empty_or_broken_response_is_not_found() {
        assert_eq!(first_position(Vec::new()), None);

        let hits: Vec<SearchHit> = serde_json::from_str(r#"[{"lat":"north","lon":"2"}]"#).unwrap();
        assert_eq!(first_position(hits), None);

        let hits: Vec<SearchHit> = serde_json::from_str(r#"[{"display_name":"x"}]"#).unwrap();
        assert_eq!(first_position(hits), None);
    }

    #[test]
    fn batch_keeps_input_order_and_tolerates_misses() {
        let paris = GeoPos::from_lat_lon(48.8566, 2.3522);
        let fake = Arc::new(FakeGeocoder::with(&[("Paris", paris)]));
        let geocoder: Arc<dyn Geocoder> = fake.clone();

        let results = geocode_batch(&geocoder, &addresses(&["Atlantis", "Paris"])).unwrap();
        assert_eq!(fake.calls(), vec!["Atlantis", "Paris"]);
        assert_eq!(
            results,
            GeocodeResults::new(vec![
                ("Atlantis".to_string(), None),
                ("Paris".to_string(), Some(paris)),
            ])
        );
        assert_eq!(results.get("Paris"), Some(paris));
        assert_eq!(results.get("Atlantis"), None);
    }

    #[test]
    fn batch_fails_when_service_is_unreachable() {
        let geocoder: Arc<dyn Geocoder> = Arc::new(FakeGeocoder {
            unreachable: true,
            ..Default::default()
        });
        assert!(geocode_batch(&geocoder, &addresses(&["a", "b"])).is_err());
    }

    #[test]
    fn nominatim_geocoder_uses_config() {
        let config = ServiceConfig {
            geocoder_url: "http://geo.local/search".to_string(),
            ..Default::default()
        };
        let geocoder = NominatimGeocoder::new(&config);
        assert_eq!(geocoder.search_url, "http://geo.local/search");
        assert_eq!(geocoder.user_agent, config.user_agent);
    }
}
