//! Viewport envelopes used as the spatial half of a query filter.

use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// WGS84 spatial reference id used for every envelope.
pub const WGS84_WKID: u32 = 4326;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("envelope needs four comma-separated numbers, got `{0}`")]
    Malformed(String),
    #[error("envelope minimum exceeds maximum: {0}")]
    Inverted(String),
}

/// Axis-aligned envelope in WGS84 degrees, e.g. the current map extent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Geometry {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl Geometry {
    /// The whole world.
    pub const WORLD: Geometry = Geometry {
        xmin: -180.0,
        ymin: -90.0,
        xmax: 180.0,
        ymax: 90.0,
    };

    pub fn envelope(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Result<Self, GeometryError> {
        let geometry = Self {
            xmin,
            ymin,
            xmax,
            ymax,
        };
        if xmin > xmax || ymin > ymax || [xmin, ymin, xmax, ymax].iter().any(|v| v.is_nan()) {
            return Err(GeometryError::Inverted(geometry.to_string()));
        }
        Ok(geometry)
    }

    /// Edge-touching envelopes intersect.
    pub fn intersects(&self, other: &Geometry) -> bool {
        self.xmin <= other.xmax
            && other.xmin <= self.xmax
            && self.ymin <= other.ymax
            && other.ymin <= self.ymax
    }

    /// Esri JSON envelope with spatial reference, as the query endpoint expects.
    pub fn to_esri_json(&self) -> Value {
        json!({
            "xmin": self.xmin,
            "ymin": self.ymin,
            "xmax": self.xmax,
            "ymax": self.ymax,
            "spatialReference": { "wkid": WGS84_WKID },
        })
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self::WORLD
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.xmin, self.ymin, self.xmax, self.ymax)
    }
}

impl FromStr for Geometry {
    type Err = GeometryError;

    /// Parses `xmin,ymin,xmax,ymax`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = s
            .split(',')
            .map(|part| part.trim().parse::<f64>())
            .collect::<Result<Vec<f64>, _>>()
            .map_err(|_| GeometryError::Malformed(s.to_string()))?;
        match values.as_slice() {
            [xmin, ymin, xmax, ymax] => Geometry::envelope(*xmin, *ymin, *xmax, *ymax),
            _ => Err(GeometryError::Malformed(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlapping_envelopes_intersect() {
        let a = Geometry::envelope(0.0, 0.0, 10.0, 10.0).unwrap();
        let b = Geometry::envelope(5.0, 5.0, 15.0, 15.0).unwrap();
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
    }

    #[test]
    fn touching_edges_intersect() {
        let a = Geometry::envelope(0.0, 0.0, 10.0, 10.0).unwrap();
        let b = Geometry::envelope(10.0, 0.0, 20.0, 10.0).unwrap();
        assert!(a.intersects(&b));
    }

    #[test]
    fn disjoint_envelopes_do_not_intersect() {
        let europe = Geometry::envelope(-10.0, 35.0, 40.0, 70.0).unwrap();
        let australia = Geometry::envelope(113.0, -44.0, 154.0, -10.0).unwrap();
        assert!(!europe.intersects(&australia));
        assert!(Geometry::WORLD.intersects(&australia));
    }

    #[test]
    fn parse_from_cli_argument() {
        let g: Geometry = "-10, 35, 40, 70".parse().unwrap();
        assert_eq!(g, Geometry::envelope(-10.0, 35.0, 40.0, 70.0).unwrap());
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert!(matches!(
            "1,2,3".parse::<Geometry>(),
            Err(GeometryError::Malformed(_))
        ));
        assert!(matches!(
            "a,b,c,d".parse::<Geometry>(),
            Err(GeometryError::Malformed(_))
        ));
        assert!(matches!(
            "10,0,0,10".parse::<Geometry>(),
            Err(GeometryError::Inverted(_))
        ));
    }

    #[test]
    fn esri_json_carries_spatial_reference() {
        let json = Geometry::WORLD.to_esri_json();
        assert_eq!(json["spatialReference"]["wkid"], 4326);
        assert_eq!(json["xmin"], -180.0);
    }
}
