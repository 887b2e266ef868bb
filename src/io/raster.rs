//! Reader for the combined two-band (label, probability) GeoTIFF the backend returns.
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::{Path, PathBuf};

use ndarray::Array2;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;
use tracing::{debug, warn};

use crate::error::{Error, Result};

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const MODEL_TRANSFORMATION: u16 = 34264;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GEO_DOUBLE_PARAMS: u16 = 34736;
const GEO_ASCII_PARAMS: u16 = 34737;
const GDAL_NODATA: u16 = 42113;

pub(crate) fn tag(code: u16) -> Tag {
    Tag::from_u16_exhaustive(code)
}

/// GeoTIFF georeferencing tags carried over verbatim to split outputs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoTags {
    pub pixel_scale: Option<Vec<f64>>,
    pub tiepoint: Option<Vec<f64>>,
    pub transformation: Option<Vec<f64>>,
    pub geo_key_directory: Option<Vec<u16>>,
    pub geo_double_params: Option<Vec<f64>>,
    pub geo_ascii_params: Option<String>,
    pub gdal_nodata: Option<String>,
}

impl GeoTags {
    pub fn read<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Self> {
        Ok(Self {
            pixel_scale: f64_tag(decoder, MODEL_PIXEL_SCALE)?,
            tiepoint: f64_tag(decoder, MODEL_TIEPOINT)?,
            transformation: f64_tag(decoder, MODEL_TRANSFORMATION)?,
            geo_key_directory: u16_tag(decoder, GEO_KEY_DIRECTORY)?,
            geo_double_params: f64_tag(decoder, GEO_DOUBLE_PARAMS)?,
            geo_ascii_params: ascii_tag(decoder, GEO_ASCII_PARAMS)?,
            gdal_nodata: ascii_tag(decoder, GDAL_NODATA)?,
        })
    }

    /// `(tag code, values)` pairs in ascending tag order.
    pub(crate) fn f64_entries(&self) -> Vec<(u16, &[f64])> {
        [
            (MODEL_PIXEL_SCALE, &self.pixel_scale),
            (MODEL_TIEPOINT, &self.tiepoint),
            (MODEL_TRANSFORMATION, &self.transformation),
            (GEO_DOUBLE_PARAMS, &self.geo_double_params),
        ]
        .into_iter()
        .filter_map(|(code, v)| v.as_deref().map(|v| (code, v)))
        .collect()
    }

    pub(crate) fn ascii_entries(&self) -> Vec<(u16, &str)> {
        [
            (GEO_ASCII_PARAMS, &self.geo_ascii_params),
            (GDAL_NODATA, &self.gdal_nodata),
        ]
        .into_iter()
        .filter_map(|(code, v)| v.as_deref().map(|v| (code, v)))
        .collect()
    }

    pub(crate) fn geo_key_directory_entry(&self) -> Option<(u16, &[u16])> {
        self.geo_key_directory.as_deref().map(|v| (GEO_KEY_DIRECTORY, v))
    }
}

fn f64_tag<R: Read + Seek>(decoder: &mut Decoder<R>, code: u16) -> Result<Option<Vec<f64>>> {
    if decoder.find_tag(tag(code))?.is_none() {
        return Ok(None);
    }
    Ok(Some(decoder.get_tag_f64_vec(tag(code))?))
}

fn u16_tag<R: Read + Seek>(decoder: &mut Decoder<R>, code: u16) -> Result<Option<Vec<u16>>> {
    if decoder.find_tag(tag(code))?.is_none() {
        return Ok(None);
    }
    Ok(Some(decoder.get_tag_u16_vec(tag(code))?))
}

fn ascii_tag<R: Read + Seek>(decoder: &mut Decoder<R>, code: u16) -> Result<Option<String>> {
    if decoder.find_tag(tag(code))?.is_none() {
        return Ok(None);
    }
    Ok(Some(decoder.get_tag_ascii_string(tag(code))?))
}

#[derive(Debug, Clone, PartialEq)]
pub enum LabelBand {
    U8(Array2<u8>),
    U16(Array2<u16>),
}

impl LabelBand {
    /// 16-bit labels that all fit in a byte become 8-bit so a palette can be attached.
    pub fn narrowed(self) -> Self {
        match self {
            LabelBand::U16(arr) if arr.iter().all(|&v| v <= u8::MAX as u16) => {
                LabelBand::U8(arr.mapv(|v| v as u8))
            }
            other => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TwoBandRaster {
    pub path: PathBuf,
    pub labels: LabelBand,
    /// Class probability in percent; 255 marks nodata
    pub probability: Array2<u8>,
    pub geo: GeoTags,
}

impl TwoBandRaster {
    /// (rows, cols)
    pub fn dim(&self) -> (usize, usize) {
        self.probability.dim()
    }
}

pub(crate) enum Samples {
    U8(Vec<u8>),
    U16(Vec<u16>),
}

impl Samples {
    fn from_decoded(result: DecodingResult, path: &Path) -> Result<Self> {
        match result {
            DecodingResult::U8(v) => Ok(Samples::U8(v)),
            DecodingResult::U16(v) => Ok(Samples::U16(v)),
            _ => Err(Error::malformed(path, "expected 8- or 16-bit unsigned integer bands")),
        }
    }

    fn len(&self) -> usize {
        match self {
            Samples::U8(v) => v.len(),
            Samples::U16(v) => v.len(),
        }
    }

    fn deinterleave(self) -> (Samples, Samples) {
        fn split<T: Copy>(v: Vec<T>) -> (Vec<T>, Vec<T>) {
            let first = v.iter().step_by(2).copied().collect();
            let second = v.iter().skip(1).step_by(2).copied().collect();
            (first, second)
        }
        match self {
            Samples::U8(v) => {
                let (a, b) = split(v);
                (Samples::U8(a), Samples::U8(b))
            }
            Samples::U16(v) => {
                let (a, b) = split(v);
                (Samples::U16(a), Samples::U16(b))
            }
        }
    }
}

/// Read a two-band GeoTIFF, either pixel-interleaved or as two single-band pages.
pub fn read_two_band(path: &Path) -> Result<TwoBandRaster> {
    let file = File::open(path)?;
    let mut decoder = Decoder::new(BufReader::new(file))?;
    let (cols, rows) = decoder.dimensions()?;
    let (cols, rows) = (cols as usize, rows as usize);
    let geo = GeoTags::read(&mut decoder)?;

    let samples_per_pixel = match decoder.find_tag(Tag::SamplesPerPixel)? {
        Some(v) => v.into_u16()?,
        None => 1,
    };

    let (band1, band2) = match samples_per_pixel {
        2 => {
            let all = Samples::from_decoded(decoder.read_image()?, path)?;
            if all.len() != rows * cols * 2 {
                return Err(Error::malformed(path, "pixel data does not match image size"));
            }
            all.deinterleave()
        }
        1 => {
            let first = Samples::from_decoded(decoder.read_image()?, path)?;
            if !decoder.more_images() {
                return Err(Error::malformed(path, "expected two bands, found one"));
            }
            decoder.next_image()?;
            if decoder.dimensions()? != (cols as u32, rows as u32) {
                return Err(Error::malformed(path, "band size mismatch"));
            }
            let second = Samples::from_decoded(decoder.read_image()?, path)?;
            (first, second)
        }
        n => {
            return Err(Error::malformed(path, format!("expected two bands, found {n}")));
        }
    };

    debug!("Read {}x{} two-band raster {:?}", cols, rows, path);
    assemble(path, rows, cols, band1, band2, geo)
}

/// [`read_two_band`], retrying through GDAL when built with the `gdal` feature
/// and the TIFF decoder rejects the file.
pub fn open_two_band(path: &Path) -> Result<TwoBandRaster> {
    match read_two_band(path) {
        #[cfg(feature = "gdal")]
        Err(Error::Tiff(e)) => {
            warn!("TIFF decoder failed on {:?} ({}), retrying with GDAL", path, e);
            crate::io::gdal_reader::read_two_band_gdal(path)
        }
        #[cfg(not(feature = "gdal"))]
        Err(Error::Tiff(e)) => {
            warn!("TIFF decoder failed on {:?}; rebuild with the `gdal` feature for tiled or compressed inputs", path);
            Err(Error::Tiff(e))
        }
        other => other,
    }
}

pub(crate) fn assemble(
    path: &Path,
    rows: usize,
    cols: usize,
    band1: Samples,
    band2: Samples,
    geo: GeoTags,
) -> Result<TwoBandRaster> {
    let shape_err = |e: ndarray::ShapeError| Error::malformed(path, e.to_string());
    let labels = match band1 {
        Samples::U8(v) => LabelBand::U8(Array2::from_shape_vec((rows, cols), v).map_err(shape_err)?),
        Samples::U16(v) => {
            LabelBand::U16(Array2::from_shape_vec((rows, cols), v).map_err(shape_err)?)
        }
    };

    let values: Vec<u8> = match band2 {
        Samples::U8(v) => v,
        Samples::U16(v) => v
            .into_iter()
            .map(|p| {
                u8::try_from(p)
                    .map_err(|_| Error::malformed(path, format!("probability value {p} outside 0-100")))
            })
            .collect::<Result<_>>()?,
    };
    if let Some(bad) = values.iter().find(|&&p| p > 100 && p != 255) {
        return Err(Error::malformed(
            path,
            format!("probability value {bad} outside 0-100"),
        ));
    }
    let probability = Array2::from_shape_vec((rows, cols), values).map_err(shape_err)?;

    Ok(TwoBandRaster {
        path: path.to_path_buf(),
        labels,
        probability,
        geo,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::writers::tiff::test_support::{
        write_interleaved_fixture, write_single_page_fixture, write_two_page_fixture,
        write_two_page_u16_fixture,
    };

    #[test]
    fn reads_two_page_layout_with_geotags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("combined.tif");
        write_two_page_fixture(&path, 3, 2, &[0, 1, 1, 0, 1, 255], &[10, 90, 80, 5, 100, 255]);

        let raster = read_two_band(&path).unwrap();
        assert_eq!(raster.dim(), (2, 3));
        match &raster.labels {
            LabelBand::U8(arr) => assert_eq!(arr[[0, 1]], 1),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(raster.probability[[1, 1]], 100);
        assert_eq!(raster.geo.pixel_scale.as_deref(), Some(&[10.0, 10.0, 0.0][..]));
        assert!(raster.geo.geo_key_directory.is_some());
    }

    #[test]
    fn reads_pixel_interleaved_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("interleaved.tif");
        write_interleaved_fixture(&path, 2, 1, &[1, 90, 0, 40]);

        let raster = read_two_band(&path).unwrap();
        assert_eq!(raster.dim(), (1, 2));
        match &raster.labels {
            LabelBand::U8(arr) => assert_eq!(arr.iter().copied().collect::<Vec<_>>(), vec![1, 0]),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(raster.probability.iter().copied().collect::<Vec<_>>(), vec![90, 40]);
        assert!(raster.geo.tiepoint.is_some());
    }

    #[test]
    fn reads_16_bit_labels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("croptype.tif");
        write_two_page_u16_fixture(&path, 2, 1, &[1100, 255], &[70, 255]);
        match read_two_band(&path).unwrap().labels {
            LabelBand::U16(arr) => assert_eq!(arr[[0, 0]], 1100),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn probability_over_100_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("combined.tif");
        write_two_page_fixture(&path, 2, 1, &[0, 1], &[50, 180]);
        assert!(matches!(read_two_band(&path), Err(Error::MalformedRaster { .. })));
    }

    #[test]
    fn single_band_input_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("single.tif");
        write_single_page_fixture(&path, 2, 1, &[0, 1]);
        assert!(matches!(read_two_band(&path), Err(Error::MalformedRaster { .. })));
    }

    #[test]
    fn narrowing_keeps_wide_codes() {
        let small = LabelBand::U16(Array2::from_elem((1, 2), 9u16)).narrowed();
        assert!(matches!(small, LabelBand::U8(_)));
        let wide = LabelBand::U16(Array2::from_elem((1, 2), 1100u16)).narrowed();
        assert!(matches!(wide, LabelBand::U16(_)));
    }
}
