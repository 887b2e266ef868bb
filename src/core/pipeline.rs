//! Linear mapping workflow: select → advise → request → submit → postprocess.
//!
//! Each step is a plain method taking the previous step's value, so a caller
//! (CLI, notebook-style driver, test) can stop, inspect, or loop back between
//! steps. The only external calls are the season lookup and the job submitter.
use tracing::{error, info};

use crate::core::extent::{AreaSelector, BoundingBox, DrawnGeometry, SpatialExtent};
use crate::core::params::PipelineConfig;
use crate::core::period::ProcessingPeriod;
use crate::core::request::{JobRequest, JobRequestBuilder};
use crate::core::season::{SeasonAdvice, SeasonAdvisor, SeasonLookup};
use crate::error::Result;
use crate::io::job::{JobResult, JobSubmitter};
use crate::postprocess::{ResultPostprocessor, SplitProduct};
use crate::types::{OutputFormat, Product};

/// Outcome of a submitted run.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingRun {
    pub result: JobResult,
    /// Empty for NetCDF requests, which are not split.
    pub outputs: Vec<SplitProduct>,
}

pub struct MappingPipeline<L, S> {
    config: PipelineConfig,
    selector: AreaSelector,
    advisor: SeasonAdvisor<L>,
    submitter: S,
}

impl<L: SeasonLookup, S: JobSubmitter> MappingPipeline<L, S> {
    pub fn new(config: PipelineConfig, lookup: L, submitter: S) -> Self {
        let selector = AreaSelector::new(config.max_area_km2, config.recommended_area_km2);
        Self {
            config,
            selector,
            advisor: SeasonAdvisor::new(lookup),
            submitter,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn select_area(&self, last_draw: Option<&DrawnGeometry>) -> Result<SpatialExtent> {
        self.selector.select(last_draw)
    }

    pub fn validate_area(&self, bbox: BoundingBox) -> Result<SpatialExtent> {
        self.selector.validate(bbox)
    }

    pub fn advise(&self, extent: &SpatialExtent, end_year: i32) -> Result<SeasonAdvice> {
        self.advisor.advise(extent, end_year)
    }

    /// Builder pre-filled with the configured output directory and job options.
    pub fn request_builder(&self) -> JobRequestBuilder {
        JobRequestBuilder::new()
            .output_dir(self.config.output_dir.clone())
            .job_options(self.config.job_options.clone())
    }

    pub fn request(
        &self,
        extent: SpatialExtent,
        period: ProcessingPeriod,
        product: Product,
        apply_cropland_mask: bool,
    ) -> Result<JobRequest> {
        self.request_builder()
            .spatial_extent(extent)
            .temporal_extent(period)
            .product(product)
            .apply_cropland_mask(apply_cropland_mask)
            .build()
    }

    /// Blocks until the backend finishes. Failures are returned as-is.
    pub fn submit(&self, request: &JobRequest) -> Result<JobResult> {
        info!(
            "Submitting {} job for {} over {}",
            request.product, request.spatial_extent, request.temporal_extent
        );
        match self.submitter.submit(request) {
            Ok(result) => {
                info!("Job {} finished with {} product(s)", result.job_id, result.products.len());
                Ok(result)
            }
            Err(e) => {
                error!("Mapping job failed, resubmit manually: {}", e);
                Err(e)
            }
        }
    }

    pub fn postprocess(&self, result: &JobResult) -> Result<Vec<SplitProduct>> {
        ResultPostprocessor::new(&self.config.output_dir).run(result)
    }

    pub fn run(&self, request: &JobRequest) -> Result<MappingRun> {
        let result = self.submit(request)?;
        let outputs = match request.out_format {
            OutputFormat::GTiff => self.postprocess(&result)?,
            OutputFormat::NetCdf => {
                info!("NetCDF results are left as downloaded");
                Vec::new()
            }
        };
        Ok(MappingRun { result, outputs })
    }
}
