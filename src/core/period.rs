use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One-year processing window, both ends inclusive.
///
/// Either `end = start + 12 months - 1 day` or `start = end - 12 months + 1 day`;
/// the two only differ where month clamping hits 29 February. The window covers
/// 365 or 366 days depending on whether it contains a 29 February.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawPeriod", into = "RawPeriod")]
pub struct ProcessingPeriod {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Serialize, Deserialize)]
struct RawPeriod {
    start_date: NaiveDate,
    end_date: NaiveDate,
}

fn one_year_end(start: NaiveDate) -> Option<NaiveDate> {
    start.checked_add_months(Months::new(12))?.pred_opt()
}

fn one_year_start(end: NaiveDate) -> Option<NaiveDate> {
    end.checked_sub_months(Months::new(12))?.succ_opt()
}

impl ProcessingPeriod {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        let expected_end = one_year_end(start);
        if expected_end != Some(end) && one_year_start(end) != Some(start) {
            return Err(Error::InvalidPeriod {
                start: start.to_string(),
                end: end.to_string(),
                expected_end: expected_end
                    .map_or_else(|| "out of range".to_string(), |d| d.to_string()),
            });
        }
        let days = (end - start).num_days() + 1;
        debug_assert!(days == 365 || days == 366);
        Ok(Self { start, end })
    }

    pub fn starting(start: NaiveDate) -> Result<Self> {
        let end = one_year_end(start).ok_or_else(|| Error::InvalidArgument {
            arg: "start_date",
            value: start.to_string(),
        })?;
        Self::new(start, end)
    }

    pub fn ending(end: NaiveDate) -> Result<Self> {
        let start = one_year_start(end).ok_or_else(|| Error::InvalidArgument {
            arg: "end_date",
            value: end.to_string(),
        })?;
        Self::new(start, end)
    }

    /// Parse ISO `YYYY-MM-DD` dates.
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        let start = NaiveDate::parse_from_str(start, "%Y-%m-%d")?;
        let end = NaiveDate::parse_from_str(end, "%Y-%m-%d")?;
        Self::new(start, end)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn end_year(&self) -> i32 {
        self.end.year()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl TryFrom<RawPeriod> for ProcessingPeriod {
    type Error = Error;

    fn try_from(raw: RawPeriod) -> Result<Self> {
        ProcessingPeriod::new(raw.start_date, raw.end_date)
    }
}

impl From<ProcessingPeriod> for RawPeriod {
    fn from(p: ProcessingPeriod) -> Self {
        RawPeriod {
            start_date: p.start,
            end_date: p.end,
        }
    }
}

impl std::fmt::Display for ProcessingPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} – {}", self.start, self.end)
    }
}
