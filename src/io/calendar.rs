//! File-backed crop calendar answering season lookups per calendar zone.
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::extent::{BoundingBox, SpatialExtent, WGS84};
use crate::core::season::{Season, SeasonInfo, SeasonLookup, SeasonLookupOutcome, UnavailableReason};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarZone {
    pub id: String,
    pub bbox: BoundingBox,
    pub seasons: Vec<Season>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeasonCalendar {
    pub zones: Vec<CalendarZone>,
}

impl SeasonCalendar {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let calendar: SeasonCalendar = serde_json::from_str(&text)?;
        debug!("Loaded {} calendar zone(s) from {:?}", calendar.zones.len(), path);
        Ok(calendar)
    }
}

impl SeasonLookup for SeasonCalendar {
    fn lookup(&self, extent: &SpatialExtent) -> Result<SeasonLookupOutcome> {
        if extent.epsg() != WGS84 {
            return Ok(SeasonLookupOutcome::Unavailable(UnavailableReason::UnsupportedCrs {
                epsg: extent.epsg(),
            }));
        }

        let hits: Vec<&CalendarZone> = self
            .zones
            .iter()
            .filter(|z| z.bbox.intersects(extent.bbox()))
            .collect();

        let Some(first) = hits.first() else {
            return Ok(SeasonLookupOutcome::Unavailable(UnavailableReason::NoCoverage));
        };

        if hits.iter().any(|z| z.seasons != first.seasons) {
            let zones = hits.iter().map(|z| z.id.clone()).collect();
            return Ok(SeasonLookupOutcome::Unavailable(
                UnavailableReason::Heterogeneous { zones },
            ));
        }

        Ok(SeasonLookupOutcome::Found(SeasonInfo {
            zone: (hits.len() == 1).then(|| first.id.clone()),
            seasons: first.seasons.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CALENDAR: &str = r#"{"zones":[
        {"id":"west","bbox":{"west":0.0,"south":50.0,"east":5.0,"north":52.0},
         "seasons":[{"name":"winter","start":"10-01","end":"07-31"},{"name":"summer","start":"04-01","end":"10-15"}]},
        {"id":"east","bbox":{"west":5.0,"south":50.0,"east":10.0,"north":52.0},
         "seasons":[{"name":"winter","start":"09-15","end":"07-15"}]},
        {"id":"east-dup","bbox":{"west":10.0,"south":50.0,"east":12.0,"north":52.0},
         "seasons":[{"name":"winter","start":"09-15","end":"07-15"}]}
    ]}"#;

    fn calendar() -> SeasonCalendar {
        serde_json::from_str(CALENDAR).unwrap()
    }

    fn extent(w: f64, s: f64, e: f64, n: f64) -> SpatialExtent {
        SpatialExtent::new(BoundingBox::new(w, s, e, n)).unwrap()
    }

    #[test]
    fn single_zone_is_found() {
        match calendar().lookup(&extent(4.5, 51.0, 4.6, 51.1)).unwrap() {
            SeasonLookupOutcome::Found(info) => {
                assert_eq!(info.zone.as_deref(), Some("west"));
                assert_eq!(info.seasons.len(), 2);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn zone_straddle_is_heterogeneous() {
        let outcome = calendar().lookup(&extent(4.95, 51.0, 5.05, 51.1)).unwrap();
        assert_eq!(
            outcome,
            SeasonLookupOutcome::Unavailable(UnavailableReason::Heterogeneous {
                zones: vec!["west".into(), "east".into()]
            })
        );
    }

    #[test]
    fn identical_neighbouring_zones_still_resolve() {
        match calendar().lookup(&extent(9.95, 51.0, 10.05, 51.1)).unwrap() {
            SeasonLookupOutcome::Found(info) => {
                assert_eq!(info.zone, None);
                assert_eq!(info.seasons[0].name, "winter");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn uncovered_and_projected_areas_are_unavailable() {
        let outcome = calendar().lookup(&extent(30.0, 0.0, 30.1, 0.1)).unwrap();
        assert_eq!(outcome, SeasonLookupOutcome::Unavailable(UnavailableReason::NoCoverage));

        let projected = SpatialExtent::new(
            BoundingBox::new(664000.0, 5611134.0, 665000.0, 5612134.0).with_epsg(32631),
        )
        .unwrap();
        let outcome = calendar().lookup(&projected).unwrap();
        assert_eq!(
            outcome,
            SeasonLookupOutcome::Unavailable(UnavailableReason::UnsupportedCrs { epsg: 32631 })
        );
    }
}
