use std::fmt;
use std::str::FromStr;

use geo::algorithm::contains::Contains;
use geo::algorithm::haversine_distance::HaversineDistance;
use geo::{LineString, Point, Polygon};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::QueryError;

/// A GeoJSON geometry, in lon/lat degrees.
///
/// `Circle` is the `AeroCircle` extension: a center position and a radius
/// in meters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeoJson {
    Point { lon: f64, lat: f64 },
    /// Outer ring only.
    Polygon(Vec<(f64, f64)>),
    Circle { lon: f64, lat: f64, radius: f64 },
}

impl GeoJson {
    pub const fn point(lon: f64, lat: f64) -> Self {
        GeoJson::Point { lon, lat }
    }

    pub const fn circle(lon: f64, lat: f64, radius: f64) -> Self {
        GeoJson::Circle { lon, lat, radius }
    }

    /// Whether `other` lies within this region.
    ///
    /// Only points can be tested; any other geometry yields `None`.
    pub fn contains(&self, other: &GeoJson) -> Option<bool> {
        let GeoJson::Point { lon, lat } = other else {
            return None;
        };
        let point = Point::new(*lon, *lat);
        match self {
            GeoJson::Point { .. } => Some(self == other),
            GeoJson::Polygon(ring) => {
                let polygon = Polygon::new(LineString::from(ring.clone()), vec![]);
                Some(polygon.contains(&point))
            }
            GeoJson::Circle { lon, lat, radius } => {
                Some(Point::new(*lon, *lat).haversine_distance(&point) <= *radius)
            }
        }
    }
}

fn invalid(msg: impl Into<String>) -> QueryError {
    QueryError::InvalidGeoJson(msg.into())
}

fn position(v: &serde_json::Value) -> Result<(f64, f64), QueryError> {
    match v.as_array().map(Vec::as_slice) {
        Some([lon, lat, ..]) => match (lon.as_f64(), lat.as_f64()) {
            (Some(lon), Some(lat)) => Ok((lon, lat)),
            _ => Err(invalid("position must be numeric")),
        },
        _ => Err(invalid("position must be [lon, lat]")),
    }
}

impl FromStr for GeoJson {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let json: serde_json::Value =
            serde_json::from_str(s).map_err(|e| invalid(e.to_string()))?;
        let kind = json
            .get("type")
            .and_then(|t| t.as_str())
            .ok_or_else(|| invalid("missing `type`"))?;
        let coords = json
            .get("coordinates")
            .ok_or_else(|| invalid("missing `coordinates`"))?;

        match kind {
            "Point" => {
                let (lon, lat) = position(coords)?;
                Ok(GeoJson::Point { lon, lat })
            }
            "Polygon" => {
                let ring = coords
                    .get(0)
                    .and_then(|r| r.as_array())
                    .ok_or_else(|| invalid("polygon needs an outer ring"))?;
                let points = ring.iter().map(position).collect::<Result<Vec<_>, _>>()?;
                if points.len() < 3 {
                    return Err(invalid("polygon ring needs at least 3 positions"));
                }
                Ok(GeoJson::Polygon(points))
            }
            "AeroCircle" => {
                let (lon, lat) = position(coords.get(0).ok_or_else(|| invalid("missing center"))?)?;
                let radius = coords
                    .get(1)
                    .and_then(|r| r.as_f64())
                    .ok_or_else(|| invalid("missing radius"))?;
                if radius < 0.0 {
                    return Err(invalid("radius must not be negative"));
                }
                Ok(GeoJson::Circle { lon, lat, radius })
            }
            other => Err(invalid(format!("unsupported geometry type `{other}`"))),
        }
    }
}

impl fmt::Display for GeoJson {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = match self {
            GeoJson::Point { lon, lat } => json!({ "type": "Point", "coordinates": [lon, lat] }),
            GeoJson::Polygon(ring) => {
                let ring: Vec<[f64; 2]> = ring.iter().map(|(lon, lat)| [*lon, *lat]).collect();
                json!({ "type": "Polygon", "coordinates": [ring] })
            }
            GeoJson::Circle { lon, lat, radius } => {
                json!({ "type": "AeroCircle", "coordinates": [[lon, lat], radius] })
            }
        };
        write!(f, "{json}")
    }
}
