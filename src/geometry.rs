//! Parsing of stored building footprints.
//!
//! Footprints arrive as WKT (`POLYGON((lon lat, lon lat, ...))`) or, when the `geojson`
//! feature is enabled, as a GeoJSON `Polygon` geometry. Only the outer ring is used.

use geo_types::Polygon;
use wkt::TryFromWkt;

use crate::MapError;
use crate::projection::GeoPos;

/// Parses a footprint into its outer ring, without the closing duplicate point.
///
/// Fails for unparsable input, non-polygon geometries and rings with fewer than 3 distinct
/// nodes.
///
/// ```
/// use egui_location_map::geometry::parse_footprint;
///
/// let ring = parse_footprint("POLYGON((10 20, 11 21, 12 19))").unwrap();
/// let lat_lon: Vec<[f64; 2]> = ring.iter().map(|p| [p.lat, p.lon]).collect();
/// assert_eq!(lat_lon, vec![[20.0, 10.0], [21.0, 11.0], [19.0, 12.0]]);
/// ```
pub fn parse_footprint(geometry: &str) -> Result<Vec<GeoPos>, MapError> {
    let geometry = geometry.trim();

    #[cfg(feature = "geojson")]
    {
        if geometry.starts_with('{') {
            return outer_ring(geojson_polygon(geometry)?);
        }
    }

    let polygon = Polygon::<f64>::try_from_wkt_str(geometry)
        .map_err(|e| MapError::InvalidGeometry(format!("{e}")))?;
    outer_ring(polygon)
}

/// Like [`parse_footprint`], but logs and swallows the error.
pub fn footprint_or_skip(geometry: &str) -> Option<Vec<GeoPos>> {
    match parse_footprint(geometry) {
        Ok(ring) => Some(ring),
        Err(e) => {
            log::warn!("Skipping building geometry {:?}: {}", geometry, e);
            None
        }
    }
}

fn outer_ring(polygon: Polygon<f64>) -> Result<Vec<GeoPos>, MapError> {
    let mut ring: Vec<GeoPos> = polygon
        .exterior()
        .coords()
        .map(|c| GeoPos { lon: c.x, lat: c.y })
        .collect();

    // Rings are stored closed; drop the repeated first node.
    if ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }

    if ring.len() < 3 {
        return Err(MapError::InvalidGeometry(format!(
            "polygon has {} distinct points, need at least 3",
            ring.len()
        )));
    }
    Ok(ring)
}

#[cfg(feature = "geojson")]
fn geojson_polygon(geometry: &str) -> Result<Polygon<f64>, MapError> {
    let parsed: geojson::Geometry = serde_json::from_str(geometry)
        .map_err(|e| MapError::InvalidGeometry(e.to_string()))?;
    Polygon::<f64>::try_from(parsed.value)
        .map_err(|e: geojson::Error| MapError::InvalidGeometry(e.to_string()))
}
