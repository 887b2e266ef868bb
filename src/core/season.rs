//! Agricultural season lookup and season-aligned processing period advice.
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::extent::SpatialExtent;
use crate::core::period::ProcessingPeriod;
use crate::error::{Error, Result};

const DAYS: usize = 365;
// Day-of-year arithmetic runs on a fixed non-leap year.
const REFERENCE_YEAR: i32 = 2001;

pub const UNAVAILABLE_GUIDANCE: &str = "Season information cannot be retrieved for this area. \
Consult an external crop calendar for the region and choose a one-year processing period \
that starts and ends between two growing seasons.";

/// Calendar day without a year, serialized as `MM-DD`. 29 February is not representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MonthDay {
    month: u32,
    day: u32,
}

impl MonthDay {
    pub fn new(month: u32, day: u32) -> Result<Self> {
        NaiveDate::from_ymd_opt(REFERENCE_YEAR, month, day)
            .map(|_| Self { month, day })
            .ok_or_else(|| Error::InvalidArgument {
                arg: "month_day",
                value: format!("{:02}-{:02}", month, day),
            })
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    fn ordinal0(&self) -> usize {
        NaiveDate::from_ymd_opt(REFERENCE_YEAR, self.month, self.day)
            .map(|d| d.ordinal0() as usize)
            .unwrap_or(0)
    }

    fn from_ordinal0(ordinal0: usize) -> Self {
        let date = NaiveDate::from_yo_opt(REFERENCE_YEAR, (ordinal0 % DAYS) as u32 + 1)
            .unwrap_or(NaiveDate::MIN);
        Self {
            month: date.month(),
            day: date.day(),
        }
    }

    pub fn in_year(&self, year: i32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(year, self.month, self.day)
    }
}

impl TryFrom<String> for MonthDay {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        let invalid = || Error::InvalidArgument {
            arg: "month_day",
            value: s.clone(),
        };
        let (m, d) = s.split_once('-').ok_or_else(invalid)?;
        let month = m.trim().parse().map_err(|_| invalid())?;
        let day = d.trim().parse().map_err(|_| invalid())?;
        MonthDay::new(month, day)
    }
}

impl From<MonthDay> for String {
    fn from(md: MonthDay) -> Self {
        md.to_string()
    }
}

impl std::fmt::Display for MonthDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}-{:02}", self.month, self.day)
    }
}

/// A named recurring growing season, both ends inclusive. May wrap the year end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Season {
    pub name: String,
    pub start: MonthDay,
    pub end: MonthDay,
}

impl Season {
    fn contains(&self, ordinal0: usize) -> bool {
        let (s, e) = (self.start.ordinal0(), self.end.ordinal0());
        if s <= e {
            s <= ordinal0 && ordinal0 <= e
        } else {
            ordinal0 >= s || ordinal0 <= e
        }
    }

    /// True when a window boundary between `ordinal0 - 1` and `ordinal0` splits this season.
    /// A boundary on the season's own start day never does.
    fn is_cut_at(&self, ordinal0: usize) -> bool {
        ordinal0 != self.start.ordinal0()
            && self.contains(ordinal0)
            && self.contains((ordinal0 + DAYS - 1) % DAYS)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonInfo {
    /// Calendar zone the seasons were taken from, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    pub seasons: Vec<Season>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum UnavailableReason {
    /// The area spans zones with different season calendars.
    Heterogeneous { zones: Vec<String> },
    NoCoverage,
    UnsupportedCrs { epsg: u32 },
}

impl std::fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnavailableReason::Heterogeneous { zones } => write!(
                f,
                "area spans zones with different crop calendars ({})",
                zones.join(", ")
            ),
            UnavailableReason::NoCoverage => write!(f, "no crop calendar covers this area"),
            UnavailableReason::UnsupportedCrs { epsg } => {
                write!(f, "crop calendar lookup needs EPSG:4326 coordinates, got EPSG:{epsg}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeasonLookupOutcome {
    Found(SeasonInfo),
    Unavailable(UnavailableReason),
}

/// Source of locally known crop season boundaries.
pub trait SeasonLookup {
    fn lookup(&self, extent: &SpatialExtent) -> Result<SeasonLookupOutcome>;
}

impl<T: SeasonLookup + ?Sized> SeasonLookup for &T {
    fn lookup(&self, extent: &SpatialExtent) -> Result<SeasonLookupOutcome> {
        (**self).lookup(extent)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SeasonAdvice {
    Recommended {
        info: SeasonInfo,
        period: ProcessingPeriod,
        /// Seasons the recommended window could not avoid splitting.
        truncated: Vec<String>,
    },
    Unavailable {
        reason: UnavailableReason,
        guidance: &'static str,
    },
}

/// Window start day plus the seasons that boundary splits.
pub fn recommended_start(info: &SeasonInfo) -> (MonthDay, Vec<String>) {
    if info.seasons.is_empty() {
        return (MonthDay::from_ordinal0(0), Vec::new());
    }

    let cuts: Vec<usize> = (0..DAYS)
        .map(|d| info.seasons.iter().filter(|s| s.is_cut_at(d)).count())
        .collect();
    let min_cut = cuts.iter().copied().min().unwrap_or(0);
    let best: Vec<bool> = cuts.iter().map(|&c| c == min_cut).collect();

    let chosen = match best.iter().position(|&b| !b) {
        None => 0,
        Some(anchor) => {
            // (first boundary, length) of every circular run of best boundaries
            let mut runs: Vec<(usize, usize)> = Vec::new();
            let mut current: Option<(usize, usize)> = None;
            for step in 1..=DAYS {
                let d = (anchor + step) % DAYS;
                match (best[d], current.as_mut()) {
                    (true, Some(run)) => run.1 += 1,
                    (true, None) => current = Some((d, 1)),
                    (false, _) => {
                        if let Some(run) = current.take() {
                            runs.push(run);
                        }
                    }
                }
            }
            let longest = runs.iter().map(|r| r.1).max().unwrap_or(0);
            let candidates: Vec<(usize, usize)> =
                runs.into_iter().filter(|r| r.1 == longest).collect();

            // Prefer the run that opens the earliest listed season.
            let run_end = |r: &(usize, usize)| (r.0 + r.1 - 1) % DAYS;
            let preferred = info.seasons.iter().find_map(|s| {
                let start = s.start.ordinal0();
                candidates.iter().find(|r| run_end(r) == start).copied()
            });
            let (first, len) = preferred.unwrap_or(candidates[0]);
            (first + (len - 1) / 2) % DAYS
        }
    };

    let truncated = info
        .seasons
        .iter()
        .filter(|s| s.is_cut_at(chosen))
        .map(|s| s.name.clone())
        .collect();
    (MonthDay::from_ordinal0(chosen), truncated)
}

/// Season-aligned processing period whose end date falls in `end_year`.
pub fn recommend_period(info: &SeasonInfo, end_year: i32) -> Result<(ProcessingPeriod, Vec<String>)> {
    let (start_day, truncated) = recommended_start(info);
    let invalid = || Error::InvalidArgument {
        arg: "end_year",
        value: end_year.to_string(),
    };
    let start = start_day.in_year(end_year - 1).ok_or_else(invalid)?;
    let mut period = ProcessingPeriod::starting(start)?;
    if period.end_year() != end_year {
        period = ProcessingPeriod::starting(start_day.in_year(end_year).ok_or_else(invalid)?)?;
    }
    Ok((period, truncated))
}

/// Recommends processing periods from a season lookup.
pub struct SeasonAdvisor<L> {
    lookup: L,
}

impl<L: SeasonLookup> SeasonAdvisor<L> {
    pub fn new(lookup: L) -> Self {
        Self { lookup }
    }

    pub fn seasons(&self, extent: &SpatialExtent) -> Result<SeasonLookupOutcome> {
        self.lookup.lookup(extent)
    }

    pub fn recommend(&self, info: &SeasonInfo, end_year: i32) -> Result<ProcessingPeriod> {
        Ok(recommend_period(info, end_year)?.0)
    }

    pub fn advise(&self, extent: &SpatialExtent, end_year: i32) -> Result<SeasonAdvice> {
        match self.lookup.lookup(extent)? {
            SeasonLookupOutcome::Found(info) => {
                let (period, truncated) = recommend_period(&info, end_year)?;
                for s in &info.seasons {
                    debug!("Season {}: {} to {}", s.name, s.start, s.end);
                }
                info!("Recommended processing period: {}", period);
                Ok(SeasonAdvice::Recommended {
                    info,
                    period,
                    truncated,
                })
            }
            SeasonLookupOutcome::Unavailable(reason) => {
                info!("Season information unavailable: {}", reason);
                Ok(SeasonAdvice::Unavailable {
                    reason,
                    guidance: UNAVAILABLE_GUIDANCE,
                })
            }
        }
    }
}
