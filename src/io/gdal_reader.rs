//! GDAL-backed fallback for combined downloads the TIFF decoder cannot open
//! (e.g. tiled or JPEG-compressed GeoTIFFs). Enabled with the `gdal` feature.
use std::path::Path;

use ::gdal::Dataset;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::io::raster::{GeoTags, Samples, TwoBandRaster, assemble};

/// Minimal GeoKeyDirectory for an EPSG code: geographic for 4326, projected otherwise.
fn geo_keys_for_epsg(epsg: u16) -> Vec<u16> {
    if epsg == 4326 {
        vec![1, 1, 0, 3, 1024, 0, 1, 2, 1025, 0, 1, 1, 2048, 0, 1, epsg]
    } else {
        vec![1, 1, 0, 3, 1024, 0, 1, 1, 1025, 0, 1, 1, 3072, 0, 1, epsg]
    }
}

fn geo_tags(dataset: &Dataset) -> GeoTags {
    let mut geo = GeoTags::default();
    if let Ok(gt) = dataset.geo_transform() {
        if gt[2] == 0.0 && gt[4] == 0.0 {
            geo.pixel_scale = Some(vec![gt[1], -gt[5], 0.0]);
            geo.tiepoint = Some(vec![0.0, 0.0, 0.0, gt[0], gt[3], 0.0]);
        } else {
            geo.transformation = Some(vec![
                gt[1], gt[2], 0.0, gt[0], gt[4], gt[5], 0.0, gt[3], 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
                0.0, 1.0,
            ]);
        }
    }
    match dataset.spatial_ref().and_then(|srs| srs.auth_code()) {
        Ok(code) => match u16::try_from(code) {
            Ok(epsg) => geo.geo_key_directory = Some(geo_keys_for_epsg(epsg)),
            Err(_) => warn!("EPSG:{} cannot be stored as a GeoTIFF key; CRS dropped", code),
        },
        Err(e) => warn!("No EPSG authority for dataset CRS ({}); CRS dropped", e),
    }
    geo
}

pub fn read_two_band_gdal(path: &Path) -> Result<TwoBandRaster> {
    let dataset = Dataset::open(path).map_err(Error::external)?;
    let bands = dataset.raster_count() as usize;
    if bands != 2 {
        return Err(Error::malformed(path, format!("expected two bands, found {bands}")));
    }
    let (cols, rows) = dataset.raster_size();
    let read = |index: usize| -> Result<Vec<u16>> {
        let band = dataset.rasterband(index).map_err(Error::external)?;
        let buf = band
            .read_as::<u16>((0, 0), (cols, rows), (cols, rows), None)
            .map_err(Error::external)?;
        Ok(buf.data().to_vec())
    };
    let labels = read(1)?;
    let probability = read(2)?;
    debug!("Read {}x{} two-band raster {:?} through GDAL", cols, rows, path);
    assemble(
        path,
        rows,
        cols,
        Samples::U16(labels),
        Samples::U16(probability),
        geo_tags(&dataset),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geographic_and_projected_keys_differ() {
        assert_eq!(geo_keys_for_epsg(4326)[7], 2);
        assert_eq!(geo_keys_for_epsg(32631)[12], 3072);
        assert_eq!(geo_keys_for_epsg(32631)[15], 32631);
    }
}
