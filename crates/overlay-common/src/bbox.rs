//! Geographic bounds used both as crop requests and as result extents.

use serde::{Deserialize, Serialize};

/// A geographic rectangle in degrees.
///
/// Used as the optional crop on render requests and as the extent reported
/// back with every rendered overlay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub south: f64,
    pub north: f64,
    pub west: f64,
    pub east: f64,
}

impl GeoBounds {
    pub fn new(south: f64, north: f64, west: f64, east: f64) -> Self {
        Self {
            south,
            north,
            west,
            east,
        }
    }

    /// Parse a WMS-style "minlon,minlat,maxlon,maxlat" string.
    pub fn from_wms_string(s: &str) -> Result<Self, BboxParseError> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(BboxParseError::InvalidFormat(s.to_string()));
        }

        let parse = |p: &str| {
            p.parse::<f64>()
                .map_err(|_| BboxParseError::InvalidNumber(p.to_string()))
        };

        let west = parse(parts[0])?;
        let south = parse(parts[1])?;
        let east = parse(parts[2])?;
        let north = parse(parts[3])?;

        if south >= north || west >= east {
            return Err(BboxParseError::Inverted(s.to_string()));
        }

        Ok(Self::new(south, north, west, east))
    }

    pub fn width(&self) -> f64 {
        self.east - self.west
    }

    pub fn height(&self) -> f64 {
        self.north - self.south
    }

    /// Inclusive containment check.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.south && lat <= self.north && lon >= self.west && lon <= self.east
    }

    pub fn intersects(&self, other: &GeoBounds) -> bool {
        self.west <= other.east
            && self.east >= other.west
            && self.south <= other.north
            && self.north >= other.south
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BboxParseError {
    #[error("Invalid BBOX format: {0}. Expected 'minlon,minlat,maxlon,maxlat'")]
    InvalidFormat(String),

    #[error("Invalid number in BBOX: {0}")]
    InvalidNumber(String),

    #[error("BBOX has min >= max: {0}")]
    Inverted(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wms_bbox() {
        let b = GeoBounds::from_wms_string("-125.0,24.0,-66.0,50.0").unwrap();
        assert_eq!(b.west, -125.0);
        assert_eq!(b.south, 24.0);
        assert_eq!(b.east, -66.0);
        assert_eq!(b.north, 50.0);
    }

    #[test]
    fn test_parse_rejects_inverted() {
        assert!(GeoBounds::from_wms_string("-60,24,-125,50").is_err());
        assert!(GeoBounds::from_wms_string("1,2,3").is_err());
        assert!(GeoBounds::from_wms_string("a,2,3,4").is_err());
    }

    #[test]
    fn test_contains_is_inclusive() {
        let b = GeoBounds::new(30.0, 40.0, -100.0, -90.0);
        assert!(b.contains(30.0, -100.0));
        assert!(b.contains(40.0, -90.0));
        assert!(!b.contains(40.01, -95.0));
    }
}
