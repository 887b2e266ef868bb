//! Split the backend's combined (label, probability) rasters into styled single-band files.
use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::io::colormap::ColorMap;
use crate::io::job::{JobResult, ProductAsset};
use crate::io::raster::{LabelBand, TwoBandRaster, open_two_band};
use crate::io::writers::metadata::BandMetadata;
use crate::io::writers::tiff::{BandData, SingleBandTiff, write_single_band_tiff};

/// Output files produced for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SplitProduct {
    pub product: String,
    pub classification: PathBuf,
    pub probability: PathBuf,
}

pub fn classification_file_name(product: &str, asset: &ProductAsset) -> String {
    let p = &asset.temporal_extent;
    format!("{}_classification_{}_{}.tif", product, p.start(), p.end())
}

pub fn probability_file_name(product: &str, asset: &ProductAsset) -> String {
    let p = &asset.temporal_extent;
    format!("{}_probability_{}_{}.tif", product, p.start(), p.end())
}

pub struct ResultPostprocessor {
    output_dir: PathBuf,
}

impl ResultPostprocessor {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Split every product of `result`. Re-running regenerates identical files;
    /// the combined downloads are left in place.
    pub fn run(&self, result: &JobResult) -> Result<Vec<SplitProduct>> {
        std::fs::create_dir_all(&self.output_dir)?;
        let mut outputs = Vec::with_capacity(result.products.len());
        for (name, asset) in &result.products {
            outputs.push(self.split_product(name, asset)?);
        }
        info!(
            "Post-processed {} product(s) of job {} into {:?}",
            outputs.len(),
            result.job_id,
            self.output_dir
        );
        Ok(outputs)
    }

    pub fn split_product(&self, name: &str, asset: &ProductAsset) -> Result<SplitProduct> {
        check_product_name(name)?;
        let source = asset.path.as_deref().ok_or_else(|| Error::MissingDownload {
            product: name.to_string(),
        })?;
        let raster = open_two_band(source)?;

        let classification = self.output_dir.join(classification_file_name(name, asset));
        let probability = self.output_dir.join(probability_file_name(name, asset));

        write_classification(&classification, name, asset, &raster)?;
        write_probability(&probability, name, &raster)?;

        info!("{}: {:?} -> {:?}, {:?}", name, source, classification, probability);
        Ok(SplitProduct {
            product: name.to_string(),
            classification,
            probability,
        })
    }
}

/// Product names become file name prefixes and must stay inside the output directory.
fn check_product_name(name: &str) -> Result<()> {
    let mut components = Path::new(name).components();
    let single_normal = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if !single_normal || name.contains(['/', '\\']) || name.contains("..") {
        return Err(Error::InvalidArgument {
            arg: "product",
            value: name.to_string(),
        });
    }
    Ok(())
}

fn write_classification(
    output: &Path,
    name: &str,
    asset: &ProductAsset,
    raster: &TwoBandRaster,
) -> Result<()> {
    let (rows, cols) = raster.dim();
    let cmap = ColorMap::for_product(asset.product_type, &asset.lookup_table);
    let mut metadata = BandMetadata::new()
        .item("PRODUCT", name)
        .item("PRODUCT_TYPE", asset.product_type.as_str())
        .item("START_DATE", asset.temporal_extent.start().to_string())
        .item("END_DATE", asset.temporal_extent.end().to_string())
        .item("BAND_NAME", "classification")
        .lookup_table(&asset.lookup_table)?
        .description("classification");

    match raster.labels.clone().narrowed() {
        LabelBand::U8(arr) => {
            let data: Vec<u8> = arr.iter().copied().collect();
            let palette = cmap.to_tiff_palette();
            let xml = metadata.to_gdal_xml()?;
            write_single_band_tiff(
                output,
                &SingleBandTiff {
                    cols,
                    rows,
                    data: BandData::U8(&data),
                    palette: Some(palette.as_slice()),
                    geo: &raster.geo,
                    gdal_metadata: &xml,
                },
            )
        }
        LabelBand::U16(arr) => {
            warn!("{}: labels exceed 8 bits, color map stored as metadata only", name);
            metadata = metadata.item("COLOR_MAP", cmap.to_metadata_string());
            let data: Vec<u16> = arr.iter().copied().collect();
            let xml = metadata.to_gdal_xml()?;
            write_single_band_tiff(
                output,
                &SingleBandTiff {
                    cols,
                    rows,
                    data: BandData::U16(&data),
                    palette: None,
                    geo: &raster.geo,
                    gdal_metadata: &xml,
                },
            )
        }
    }
}

fn write_probability(output: &Path, name: &str, raster: &TwoBandRaster) -> Result<()> {
    let (rows, cols) = raster.dim();
    let xml = BandMetadata::new()
        .item("PRODUCT", name)
        .item("BAND_NAME", "probability")
        .item("UNITS", "percent")
        .description("probability")
        .to_gdal_xml()?;
    let data: Vec<u8> = raster.probability.iter().copied().collect();
    write_single_band_tiff(
        output,
        &SingleBandTiff {
            cols,
            rows,
            data: BandData::U8(&data),
            palette: None,
            geo: &raster.geo,
            gdal_metadata: &xml,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::period::ProcessingPeriod;
    use crate::io::job::LookupTable;
    use crate::io::writers::tiff::test_support::{write_two_page_fixture, write_two_page_u16_fixture};
    use crate::types::Product;
    use std::collections::BTreeMap;
    use std::fs::File;
    use tiff::decoder::{Decoder, DecodingResult};

    fn job(dir: &Path) -> JobResult {
        let combined = dir.join("cropland-combined.tif");
        write_two_page_fixture(&combined, 3, 2, &[0, 1, 1, 0, 255, 1], &[91, 80, 77, 64, 255, 100]);
        let lut: LookupTable = [("other".to_string(), 0u16), ("cropland".to_string(), 1)]
            .into_iter()
            .collect();
        let mut products = BTreeMap::new();
        products.insert(
            "cropland".to_string(),
            ProductAsset {
                product_type: Product::Cropland,
                temporal_extent: ProcessingPeriod::parse("2020-11-01", "2021-10-31").unwrap(),
                lookup_table: lut,
                url: None,
                path: Some(combined),
            },
        );
        JobResult {
            job_id: "j-test".to_string(),
            metadata_path: None,
            products,
        }
    }

    #[test]
    fn one_product_yields_exactly_two_named_files() {
        let work = tempfile::tempdir().unwrap();
        let out = work.path().join("maps");
        let result = job(work.path());

        let split = ResultPostprocessor::new(&out).run(&result).unwrap();
        assert_eq!(split.len(), 1);
        assert_eq!(
            split[0].classification,
            out.join("cropland_classification_2020-11-01_2021-10-31.tif")
        );
        assert_eq!(
            split[0].probability,
            out.join("cropland_probability_2020-11-01_2021-10-31.tif")
        );

        let mut names: Vec<String> = std::fs::read_dir(&out)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "cropland_classification_2020-11-01_2021-10-31.tif",
                "cropland_probability_2020-11-01_2021-10-31.tif"
            ]
        );
        assert!(work.path().join("cropland-combined.tif").exists());
    }

    #[test]
    fn rerun_is_byte_identical() {
        let work = tempfile::tempdir().unwrap();
        let out = work.path().join("maps");
        let result = job(work.path());
        let post = ResultPostprocessor::new(&out);

        let first = post.run(&result).unwrap();
        let a = std::fs::read(&first[0].classification).unwrap();
        let b = std::fs::read(&first[0].probability).unwrap();
        let second = post.run(&result).unwrap();
        assert_eq!(first, second);
        assert_eq!(std::fs::read(&second[0].classification).unwrap(), a);
        assert_eq!(std::fs::read(&second[0].probability).unwrap(), b);
    }

    #[test]
    fn outputs_carry_bands_lut_and_palette() {
        let work = tempfile::tempdir().unwrap();
        let split = ResultPostprocessor::new(work.path().join("maps"))
            .run(&job(work.path()))
            .unwrap();

        let mut labels = Decoder::new(File::open(&split[0].classification).unwrap()).unwrap();
        assert_eq!(labels.get_tag_u32(tiff::tags::Tag::PhotometricInterpretation).unwrap(), 3);
        let palette = labels.get_tag_u16_vec(tiff::tags::Tag::ColorMap).unwrap();
        assert_eq!(palette[1], 224 * 257);
        let xml = labels
            .get_tag_ascii_string(tiff::tags::Tag::from_u16_exhaustive(42112))
            .unwrap();
        assert!(xml.contains("LOOKUP_TABLE"));
        assert!(xml.contains("&quot;cropland&quot;:1"));
        assert!(labels.get_tag_f64_vec(tiff::tags::Tag::from_u16_exhaustive(33550)).is_ok());

        let mut probs = Decoder::new(File::open(&split[0].probability).unwrap()).unwrap();
        match probs.read_image().unwrap() {
            DecodingResult::U8(v) => assert_eq!(v, vec![91, 80, 77, 64, 255, 100]),
            _ => panic!("expected 8-bit probabilities"),
        }
    }

    #[test]
    fn wide_croptype_codes_stay_16_bit_with_colors_in_metadata() {
        let work = tempfile::tempdir().unwrap();
        let combined = work.path().join("croptype-combined.tif");
        write_two_page_u16_fixture(&combined, 3, 1, &[1100, 1200, 255], &[70, 85, 255]);
        let lut: LookupTable = [("maize".to_string(), 1100u16), ("wheat".to_string(), 1200)]
            .into_iter()
            .collect();
        let mut products = BTreeMap::new();
        products.insert(
            "croptype".to_string(),
            ProductAsset {
                product_type: Product::Croptype,
                temporal_extent: ProcessingPeriod::parse("2020-11-01", "2021-10-31").unwrap(),
                lookup_table: lut,
                url: None,
                path: Some(combined),
            },
        );
        let result = JobResult {
            job_id: "j-wide".to_string(),
            metadata_path: None,
            products,
        };
        let split = ResultPostprocessor::new(work.path().join("maps")).run(&result).unwrap();

        let mut labels = Decoder::new(File::open(&split[0].classification).unwrap()).unwrap();
        assert!(labels.find_tag(tiff::tags::Tag::ColorMap).unwrap().is_none());
        assert_eq!(labels.get_tag_u32(tiff::tags::Tag::PhotometricInterpretation).unwrap(), 1);
        let xml = labels
            .get_tag_ascii_string(tiff::tags::Tag::from_u16_exhaustive(42112))
            .unwrap();
        assert!(xml.contains("COLOR_MAP"));
        assert!(xml.contains("1100:#"));
        assert!(xml.contains("LOOKUP_TABLE"));
        match labels.read_image().unwrap() {
            DecodingResult::U16(v) => assert_eq!(v, vec![1100, 1200, 255]),
            _ => panic!("expected 16-bit labels"),
        }
    }

    #[test]
    fn product_names_cannot_escape_output_dir() {
        let work = tempfile::tempdir().unwrap();
        let out = work.path().join("maps");
        for bad in ["../x", "a/b", "..", "", "/abs"] {
            let mut result = job(work.path());
            let asset = result.products.remove("cropland").unwrap();
            result.products.insert(bad.to_string(), asset);
            let err = ResultPostprocessor::new(&out).run(&result).unwrap_err();
            assert!(matches!(err, Error::InvalidArgument { arg: "product", .. }), "{bad}: {err}");
        }
        assert!(!work.path().join("x_classification_2020-11-01_2021-10-31.tif").exists());
    }

    #[test]
    fn product_without_download_is_reported() {
        let work = tempfile::tempdir().unwrap();
        let mut result = job(work.path());
        if let Some(asset) = result.products.get_mut("cropland") {
            asset.path = None;
        }
        let err = ResultPostprocessor::new(work.path()).run(&result).unwrap_err();
        assert!(matches!(err, Error::MissingDownload { product } if product == "cropland"));
    }
}
