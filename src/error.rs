//! Crate-level error type and `Result` alias for stable, structured error handling.
//! Converts underlying I/O, TIFF, JSON and XML errors, and provides semantic variants
//! for area, period and request validation as well as raster contract violations.
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Date parse error: {0}")]
    Date(#[from] chrono::ParseError),

    #[error("Please first draw a rectangle on the map before proceeding.")]
    NoDrawing,

    #[error("Invalid spatial extent: {reason}")]
    InvalidExtent { reason: String },

    #[error("Area of interest is {area_km2:.1} km², which exceeds the {limit_km2:.0} km² limit; please draw a smaller area")]
    AreaTooLarge { area_km2: f64, limit_km2: f64 },

    #[error("Processing period {start}..{end} must span exactly one year; a period starting {start} ends {expected_end}")]
    InvalidPeriod {
        start: String,
        end: String,
        expected_end: String,
    },

    #[error("Incompatible options: {0}")]
    IncompatibleOptions(String),

    #[error("Malformed raster {path:?}: {reason}")]
    MalformedRaster { path: PathBuf, reason: String },

    #[error("Product `{product}` has no downloaded file to post-process")]
    MissingDownload { product: String },

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("Mapping job failed: {0}")]
    Job(String),

    #[error("Invalid argument: {arg}={value}")]
    InvalidArgument { arg: &'static str, value: String },

    #[error("Missing required argument: {arg}")]
    MissingArgument { arg: String },

    #[error("External error: {0}")]
    External(String),
}

impl Error {
    pub fn external<E: std::fmt::Display>(e: E) -> Self {
        Error::External(e.to_string())
    }

    pub(crate) fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::MalformedRaster {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
