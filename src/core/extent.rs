use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Error, Result};

/// EPSG code of geographic lon/lat coordinates.
pub const WGS84: u32 = 4326;

/// Hard upper bound on the area of interest.
pub const MAX_AREA_KM2: f64 = 2500.0;

/// Areas above this still run but are slow to iterate on.
pub const RECOMMENDED_AREA_KM2: f64 = 250.0;

const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Unvalidated bounding box as drawn or typed by the user.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
    #[serde(default = "default_epsg")]
    pub epsg: u32,
}

fn default_epsg() -> u32 {
    WGS84
}

impl BoundingBox {
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
            epsg: WGS84,
        }
    }

    pub fn with_epsg(mut self, epsg: u32) -> Self {
        self.epsg = epsg;
        self
    }

    fn validate_coordinates(&self) -> Result<()> {
        let coords = [self.west, self.south, self.east, self.north];
        if coords.iter().any(|c| !c.is_finite()) {
            return Err(Error::InvalidExtent {
                reason: format!("non-finite coordinate in {:?}", coords),
            });
        }
        if self.west >= self.east || self.south >= self.north {
            return Err(Error::InvalidExtent {
                reason: format!(
                    "expected west < east and south < north, got ({}, {}, {}, {})",
                    self.west, self.south, self.east, self.north
                ),
            });
        }
        if self.epsg == WGS84
            && (self.west < -180.0 || self.east > 180.0 || self.south < -90.0 || self.north > 90.0)
        {
            return Err(Error::InvalidExtent {
                reason: "longitude must lie in [-180, 180] and latitude in [-90, 90]".to_string(),
            });
        }
        Ok(())
    }

    /// Enclosed area in km².
    ///
    /// Lon/lat boxes use the spherical-Earth formula `R² · Δλ · |sin φn − sin φs|`;
    /// any other CRS is assumed to be projected in metres.
    pub fn area_km2(&self) -> f64 {
        if self.epsg == WGS84 {
            let d_lon = (self.east - self.west).to_radians();
            let band = self.north.to_radians().sin() - self.south.to_radians().sin();
            EARTH_RADIUS_KM * EARTH_RADIUS_KM * d_lon * band.abs()
        } else {
            (self.east - self.west) * (self.north - self.south) / 1.0e6
        }
    }

    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.west < other.east
            && other.west < self.east
            && self.south < other.north
            && other.south < self.north
    }
}

/// Validated area of interest: ordered coordinates and at most [`MAX_AREA_KM2`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BoundingBox", into = "BoundingBox")]
pub struct SpatialExtent {
    bbox: BoundingBox,
    area_km2: f64,
}

impl SpatialExtent {
    pub fn new(bbox: BoundingBox) -> Result<Self> {
        Self::with_limit(bbox, MAX_AREA_KM2)
    }

    fn with_limit(bbox: BoundingBox, limit_km2: f64) -> Result<Self> {
        bbox.validate_coordinates()?;
        let area_km2 = bbox.area_km2();
        if area_km2 > limit_km2 {
            return Err(Error::AreaTooLarge {
                area_km2,
                limit_km2,
            });
        }
        Ok(Self { bbox, area_km2 })
    }

    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    pub fn area_km2(&self) -> f64 {
        self.area_km2
    }

    pub fn epsg(&self) -> u32 {
        self.bbox.epsg
    }
}

impl TryFrom<BoundingBox> for SpatialExtent {
    type Error = Error;

    fn try_from(bbox: BoundingBox) -> Result<Self> {
        SpatialExtent::new(bbox)
    }
}

impl From<SpatialExtent> for BoundingBox {
    fn from(extent: SpatialExtent) -> Self {
        extent.bbox
    }
}

impl std::fmt::Display for SpatialExtent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let b = &self.bbox;
        write!(
            f,
            "({}, {}, {}, {}) EPSG:{} [{:.1} km²]",
            b.west, b.south, b.east, b.north, b.epsg, self.area_km2
        )
    }
}

/// GeoJSON geometry coming back from the map widget's draw control.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum DrawnGeometry {
    Polygon(Vec<Vec<[f64; 2]>>),
    MultiPolygon(Vec<Vec<Vec<[f64; 2]>>>),
}

impl DrawnGeometry {
    /// Accepts either a bare geometry or a `Feature` wrapping one.
    /// A feature without geometry means nothing was drawn yet.
    pub fn from_geojson(text: &str) -> Result<Option<Self>> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        let geometry = if value.get("type").and_then(|t| t.as_str()) == Some("Feature") {
            match value.get("geometry") {
                None | Some(serde_json::Value::Null) => return Ok(None),
                Some(g) => g.clone(),
            }
        } else {
            value
        };
        Ok(Some(serde_json::from_value(geometry)?))
    }

    fn points(&self) -> Vec<[f64; 2]> {
        match self {
            DrawnGeometry::Polygon(rings) => rings.iter().flatten().copied().collect(),
            DrawnGeometry::MultiPolygon(polys) => {
                polys.iter().flatten().flatten().copied().collect()
            }
        }
    }

    pub fn bounds(&self) -> Result<BoundingBox> {
        let points = self.points();
        if points.is_empty() {
            return Err(Error::InvalidExtent {
                reason: "drawn geometry has no coordinates".to_string(),
            });
        }
        let mut bbox = BoundingBox::new(f64::MAX, f64::MAX, f64::MIN, f64::MIN);
        for [x, y] in points {
            bbox.west = bbox.west.min(x);
            bbox.east = bbox.east.max(x);
            bbox.south = bbox.south.min(y);
            bbox.north = bbox.north.max(y);
        }
        Ok(bbox)
    }
}

/// Validates user-drawn areas of interest against the area limits.
#[derive(Debug, Clone, Copy)]
pub struct AreaSelector {
    hard_limit_km2: f64,
    soft_limit_km2: f64,
}

impl Default for AreaSelector {
    fn default() -> Self {
        Self {
            hard_limit_km2: MAX_AREA_KM2,
            soft_limit_km2: RECOMMENDED_AREA_KM2,
        }
    }
}

impl AreaSelector {
    /// The hard limit is capped at [`MAX_AREA_KM2`].
    pub fn new(hard_limit_km2: f64, soft_limit_km2: f64) -> Self {
        let hard_limit_km2 = hard_limit_km2.min(MAX_AREA_KM2);
        Self {
            hard_limit_km2,
            soft_limit_km2: soft_limit_km2.min(hard_limit_km2),
        }
    }

    /// Validate the last drawn shape, if any.
    pub fn select(&self, last_draw: Option<&DrawnGeometry>) -> Result<SpatialExtent> {
        let geometry = last_draw.ok_or(Error::NoDrawing)?;
        self.validate(geometry.bounds()?)
    }

    pub fn validate(&self, bbox: BoundingBox) -> Result<SpatialExtent> {
        let extent = SpatialExtent::with_limit(bbox, self.hard_limit_km2)?;
        if extent.area_km2() > self.soft_limit_km2 {
            warn!(
                "Area of interest is {:.1} km²; areas up to {:.0} km² are recommended for quick runs",
                extent.area_km2(),
                self.soft_limit_km2
            );
        }
        info!("Your area of interest: {}", extent);
        Ok(extent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Degrees spanning `km` along a great circle.
    fn deg(km: f64) -> f64 {
        (km / EARTH_RADIUS_KM).to_degrees()
    }

    #[test]
    fn small_square_is_accepted() {
        let bbox = BoundingBox::new(0.0, 0.0, deg(10.0), deg(10.0));
        let extent = AreaSelector::default().validate(bbox).unwrap();
        assert!((extent.area_km2() - 100.0).abs() < 0.1);
    }

    #[test]
    fn large_square_is_rejected() {
        let bbox = BoundingBox::new(0.0, 0.0, deg(60.0), deg(60.0));
        match AreaSelector::default().validate(bbox) {
            Err(Error::AreaTooLarge { area_km2, limit_km2 }) => {
                assert!((area_km2 - 3600.0).abs() < 5.0);
                assert_eq!(limit_km2, MAX_AREA_KM2);
            }
            other => panic!("expected AreaTooLarge, got {:?}", other),
        }
    }

    #[test]
    fn limit_is_inclusive() {
        let bbox = BoundingBox::new(0.0, 0.0, 50_000.0, 50_000.0).with_epsg(32631);
        assert_eq!(bbox.area_km2(), 2500.0);
        assert!(SpatialExtent::new(bbox).is_ok());

        let bbox = BoundingBox::new(0.0, 0.0, 50_000.0, 50_001.0).with_epsg(32631);
        assert!(matches!(SpatialExtent::new(bbox), Err(Error::AreaTooLarge { .. })));
    }

    #[test]
    fn threshold_sweep_matches_area() {
        for side_km in [1.0, 20.0, 49.0, 49.99, 50.01, 51.0, 80.0] {
            let side_m = side_km * 1000.0;
            let bbox = BoundingBox::new(600_000.0, 5_600_000.0, 600_000.0 + side_m, 5_600_000.0 + side_m)
                .with_epsg(32631);
            let accepted = SpatialExtent::new(bbox).is_ok();
            assert_eq!(accepted, bbox.area_km2() <= MAX_AREA_KM2, "side {side_km} km");
        }
    }

    #[test]
    fn projected_extent_from_original_example() {
        let bbox = BoundingBox::new(664000.0, 5611134.0, 665000.0, 5612134.0).with_epsg(32631);
        let extent = SpatialExtent::new(bbox).unwrap();
        assert_eq!(extent.area_km2(), 1.0);
        assert_eq!(extent.epsg(), 32631);
    }

    #[test]
    fn unordered_or_out_of_range_coordinates_are_invalid() {
        let flipped = BoundingBox::new(5.0, 50.0, 4.0, 51.0);
        assert!(matches!(SpatialExtent::new(flipped), Err(Error::InvalidExtent { .. })));
        let out_of_range = BoundingBox::new(179.9, 50.0, 180.1, 50.1);
        assert!(matches!(SpatialExtent::new(out_of_range), Err(Error::InvalidExtent { .. })));
    }

    #[test]
    fn custom_hard_limit_cannot_exceed_max() {
        let selector = AreaSelector::new(10_000.0, 5_000.0);
        let bbox = BoundingBox::new(0.0, 0.0, 60_000.0, 60_000.0).with_epsg(3857);
        assert!(matches!(selector.validate(bbox), Err(Error::AreaTooLarge { .. })));

        let strict = AreaSelector::new(50.0, 25.0);
        let bbox = BoundingBox::new(0.0, 0.0, 10_000.0, 10_000.0).with_epsg(3857);
        assert!(matches!(strict.validate(bbox), Err(Error::AreaTooLarge { .. })));
    }

    #[test]
    fn drawn_feature_bounds_become_extent() {
        let json = r#"{"type":"Feature","properties":{},"geometry":{"type":"Polygon",
            "coordinates":[[[4.5,51.0],[4.6,51.0],[4.6,51.1],[4.5,51.1],[4.5,51.0]]]}}"#;
        let geometry = DrawnGeometry::from_geojson(json).unwrap();
        let extent = AreaSelector::default().select(geometry.as_ref()).unwrap();
        assert_eq!(extent.bbox().west, 4.5);
        assert_eq!(extent.bbox().north, 51.1);
    }

    #[test]
    fn nothing_drawn_is_reported() {
        let json = r#"{"type":"Feature","geometry":null}"#;
        let geometry = DrawnGeometry::from_geojson(json).unwrap();
        assert!(geometry.is_none());
        assert!(matches!(AreaSelector::default().select(None), Err(Error::NoDrawing)));
    }

    #[test]
    fn extent_round_trips_through_serde_with_validation() {
        let json = r#"{"west":4.5,"south":51.0,"east":4.6,"north":51.1}"#;
        let extent: SpatialExtent = serde_json::from_str(json).unwrap();
        assert_eq!(extent.epsg(), WGS84);

        let too_big = r#"{"west":0,"south":0,"east":100000,"north":100000,"epsg":32631}"#;
        assert!(serde_json::from_str::<SpatialExtent>(too_big).is_err());
    }
}
