//! I/O layer: job result metadata, the file-backed crop calendar, the two-band
//! GeoTIFF reader, fixed color maps, and `writers` for split outputs.
pub mod calendar;
pub use calendar::{CalendarZone, SeasonCalendar};

pub mod colormap;
pub mod job;
pub use job::{JobResult, JobSubmitter, LookupTable, ProductAsset};

pub mod raster;
pub use raster::{GeoTags, LabelBand, TwoBandRaster, open_two_band, read_two_band};

#[cfg(feature = "gdal")]
pub mod gdal_reader;

pub mod writers;
