//! High-level library API: area checks, season advice from a calendar file, job
//! request building and post-processing of downloaded job results. Prefer these
//! entrypoints over the `core`/`io` building blocks when integrating cropmap.
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::core::extent::{AreaSelector, BoundingBox, DrawnGeometry, SpatialExtent};
use crate::core::params::PipelineConfig;
use crate::core::period::ProcessingPeriod;
use crate::core::request::{JobRequest, JobRequestBuilder};
use crate::core::season::{SeasonAdvice, SeasonAdvisor};
use crate::error::{Error, Result};
use crate::io::calendar::SeasonCalendar;
use crate::io::job::JobResult;
use crate::postprocess::{ResultPostprocessor, SplitProduct};
use crate::types::{OutputFormat, Product};

fn selector(config: &PipelineConfig) -> AreaSelector {
    AreaSelector::new(config.max_area_km2, config.recommended_area_km2)
}

/// Validate a bounding box against the configured area limits
pub fn check_area(bbox: BoundingBox, config: &PipelineConfig) -> Result<SpatialExtent> {
    selector(config).validate(bbox)
}

/// Validate the last drawn GeoJSON shape (geometry, or a Feature wrapping one)
pub fn check_drawn_area(geojson: &str, config: &PipelineConfig) -> Result<SpatialExtent> {
    let drawn = DrawnGeometry::from_geojson(geojson)?;
    selector(config).select(drawn.as_ref())
}

/// Season advice for `extent` from a JSON crop calendar
pub fn advise_from_calendar(
    calendar: &Path,
    extent: &SpatialExtent,
    end_year: i32,
) -> Result<SeasonAdvice> {
    let calendar = SeasonCalendar::from_json_file(calendar)?;
    SeasonAdvisor::new(calendar).advise(extent, end_year)
}

/// Typed request options; output directory and job options come from the config
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestOptions {
    pub product: Product,
    pub format: OutputFormat,
    pub apply_cropland_mask: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            product: Product::Cropland,
            format: OutputFormat::GTiff,
            apply_cropland_mask: false,
        }
    }
}

pub fn build_request(
    extent: SpatialExtent,
    period: ProcessingPeriod,
    options: RequestOptions,
    config: &PipelineConfig,
) -> Result<JobRequest> {
    JobRequestBuilder::new()
        .spatial_extent(extent)
        .temporal_extent(period)
        .product(options.product)
        .out_format(options.format)
        .apply_cropland_mask(options.apply_cropland_mask)
        .output_dir(config.output_dir.clone())
        .job_options(config.job_options.clone())
        .build()
}

/// Split every product listed in a job result metadata file into `output_dir`
pub fn postprocess_job_result_file(metadata: &Path, output_dir: &Path) -> Result<Vec<SplitProduct>> {
    let result = JobResult::from_json_file(metadata)?;
    ResultPostprocessor::new(output_dir).run(&result)
}

/// Batch post-processing report
#[derive(Debug, Default)]
pub struct PostprocessReport {
    pub processed: usize,
    /// JSON files that are not job results
    pub skipped: usize,
    pub outputs: Vec<SplitProduct>,
    pub errors: Vec<(PathBuf, String)>,
}

/// Job result metadata files (`*.json`) directly inside `dir`, sorted by name
pub fn iterate_job_results(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|e| e.eq_ignore_ascii_case("json")) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Post-process every job result in `input_dir` into `output_dir`.
/// JSON files that do not deserialize as a [`JobResult`] (configs, requests) are skipped.
/// If `continue_on_error` is true, failures are recorded in the report and processing continues; otherwise, the first error is returned.
pub fn postprocess_directory(
    input_dir: &Path,
    output_dir: &Path,
    continue_on_error: bool,
) -> Result<PostprocessReport> {
    if !input_dir.is_dir() {
        return Err(Error::InvalidArgument {
            arg: "input_dir",
            value: input_dir.display().to_string(),
        });
    }
    let mut report = PostprocessReport::default();
    let postprocessor = ResultPostprocessor::new(output_dir);
    for metadata in iterate_job_results(input_dir)? {
        let result = match JobResult::from_json_file(&metadata) {
            Ok(result) => result,
            Err(Error::Json(e)) => {
                warn!("Skipping {:?}: not a job result ({})", metadata, e);
                report.skipped += 1;
                continue;
            }
            Err(e) if continue_on_error => {
                warn!("Skipping {:?}: {}", metadata, e);
                report.errors.push((metadata, e.to_string()));
                continue;
            }
            Err(e) => return Err(e),
        };
        match postprocessor.run(&result) {
            Ok(outputs) => {
                report.processed += 1;
                report.outputs.extend(outputs);
            }
            Err(e) if continue_on_error => {
                warn!("Skipping {:?}: {}", metadata, e);
                report.errors.push((metadata, e.to_string()));
            }
            Err(e) => return Err(e),
        }
    }
    info!(
        "Post-processed {} job result(s), {} skipped, {} error(s)",
        report.processed,
        report.skipped,
        report.errors.len()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::job::ProductAsset;
    use crate::io::writers::tiff::test_support::write_two_page_fixture;
    use std::collections::BTreeMap;

    #[test]
    fn drawn_feature_is_checked() {
        let geojson = r#"{"type":"Feature","properties":{},"geometry":{"type":"Polygon",
            "coordinates":[[[4.50,51.00],[4.55,51.00],[4.55,51.05],[4.50,51.05],[4.50,51.00]]]}}"#;
        let extent = check_drawn_area(geojson, &PipelineConfig::default()).unwrap();
        assert!(extent.area_km2() < 25.0);
        assert_eq!(extent.bbox().west, 4.50);
    }

    #[test]
    fn empty_drawing_asks_for_a_rectangle() {
        let geojson = r#"{"type":"Feature","properties":{},"geometry":null}"#;
        assert!(matches!(
            check_drawn_area(geojson, &PipelineConfig::default()),
            Err(Error::NoDrawing)
        ));
    }

    #[test]
    fn configured_limit_tightens_area_check() {
        let config = PipelineConfig {
            max_area_km2: 10.0,
            recommended_area_km2: 5.0,
            ..PipelineConfig::default()
        };
        let bbox = BoundingBox::new(500_000.0, 5_600_000.0, 505_000.0, 5_605_000.0).with_epsg(32631);
        assert!(matches!(check_area(bbox, &config), Err(Error::AreaTooLarge { .. })));
    }

    #[test]
    fn request_uses_config_output_dir() {
        let config = PipelineConfig {
            output_dir: PathBuf::from("/tmp/maps"),
            ..PipelineConfig::default()
        };
        let extent = check_area(BoundingBox::new(4.5, 51.0, 4.55, 51.05), &config).unwrap();
        let period = ProcessingPeriod::parse("2020-11-01", "2021-10-31").unwrap();
        let request = build_request(
            extent,
            period,
            RequestOptions {
                product: Product::Croptype,
                apply_cropland_mask: true,
                ..RequestOptions::default()
            },
            &config,
        )
        .unwrap();
        assert_eq!(request.output_dir, PathBuf::from("/tmp/maps"));
        assert!(request.apply_cropland_mask);
    }

    fn write_job_result(dir: &Path, file: &str, with_download: bool) {
        let combined = dir.join(format!("{file}.tif"));
        write_two_page_fixture(&combined, 2, 1, &[0, 1], &[55, 90]);
        let mut products = BTreeMap::new();
        products.insert(
            "cropland".to_string(),
            ProductAsset {
                product_type: Product::Cropland,
                temporal_extent: ProcessingPeriod::parse("2020-11-01", "2021-10-31").unwrap(),
                lookup_table: [("cropland".to_string(), 1u16)].into_iter().collect(),
                url: None,
                path: with_download.then_some(combined),
            },
        );
        let result = JobResult {
            job_id: file.to_string(),
            metadata_path: None,
            products,
        };
        result.write_json_file(&dir.join(format!("{file}.json"))).unwrap();
    }

    #[test]
    fn batch_skips_json_that_is_not_a_job_result() {
        let dir = tempfile::tempdir().unwrap();
        let config = serde_json::to_string(&PipelineConfig::default()).unwrap();
        std::fs::write(dir.path().join("config.json"), config).unwrap();
        std::fs::write(dir.path().join("broken.json"), "{not json").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        write_job_result(dir.path(), "job-a", true);
        let out = dir.path().join("out");

        let report = postprocess_directory(dir.path(), &out, false).unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.outputs.len(), 1);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn batch_records_failures_when_continuing() {
        let dir = tempfile::tempdir().unwrap();
        write_job_result(dir.path(), "job-a", true);
        write_job_result(dir.path(), "job-b", false);
        let out = dir.path().join("out");

        let report = postprocess_directory(dir.path(), &out, true).unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].0.ends_with("job-b.json"));
        assert!(matches!(
            postprocess_directory(dir.path(), &out, false),
            Err(Error::MissingDownload { .. })
        ));
    }
}
