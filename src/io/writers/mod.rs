//! Output writers: single-band GeoTIFFs and the GDAL metadata embedded in them.
pub mod metadata;
pub mod tiff;
