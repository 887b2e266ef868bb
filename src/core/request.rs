use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::extent::SpatialExtent;
use crate::core::params::JobOptions;
use crate::core::period::ProcessingPeriod;
use crate::error::{Error, Result};
use crate::types::{OutputFormat, Product};

/// Validated request for an external mapping job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRequest {
    pub spatial_extent: SpatialExtent,
    pub temporal_extent: ProcessingPeriod,
    pub product: Product,
    pub out_format: OutputFormat,
    pub apply_cropland_mask: bool,
    pub output_dir: PathBuf,
    pub job_options: JobOptions,
}

impl JobRequest {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[derive(Debug, Clone, Default)]
pub struct JobRequestBuilder {
    spatial_extent: Option<SpatialExtent>,
    temporal_extent: Option<ProcessingPeriod>,
    product: Option<Product>,
    out_format: OutputFormat,
    apply_cropland_mask: bool,
    output_dir: Option<PathBuf>,
    job_options: JobOptions,
}

impl JobRequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spatial_extent(mut self, extent: SpatialExtent) -> Self {
        self.spatial_extent = Some(extent);
        self
    }

    pub fn temporal_extent(mut self, period: ProcessingPeriod) -> Self {
        self.temporal_extent = Some(period);
        self
    }

    pub fn product(mut self, product: Product) -> Self {
        self.product = Some(product);
        self
    }

    pub fn out_format(mut self, format: OutputFormat) -> Self {
        self.out_format = format;
        self
    }

    pub fn apply_cropland_mask(mut self, apply: bool) -> Self {
        self.apply_cropland_mask = apply;
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn job_options(mut self, options: JobOptions) -> Self {
        self.job_options = options;
        self
    }

    pub fn build(self) -> Result<JobRequest> {
        let spatial_extent = self.spatial_extent.ok_or_else(|| missing("spatial_extent"))?;
        let temporal_extent = self.temporal_extent.ok_or_else(|| missing("temporal_extent"))?;
        let output_dir = self.output_dir.ok_or_else(|| missing("output_dir"))?;
        let product = self.product.unwrap_or(Product::Cropland);

        // Re-check: the period may have been built by hand elsewhere.
        ProcessingPeriod::new(temporal_extent.start(), temporal_extent.end())?;

        if product == Product::Cropland && self.apply_cropland_mask {
            return Err(Error::IncompatibleOptions(
                "Cannot apply a cropland mask on a cropland workflow.".to_string(),
            ));
        }

        Ok(JobRequest {
            spatial_extent,
            temporal_extent,
            product,
            out_format: self.out_format,
            apply_cropland_mask: self.apply_cropland_mask,
            output_dir,
            job_options: self.job_options,
        })
    }
}

fn missing(arg: &str) -> Error {
    Error::MissingArgument {
        arg: arg.to_string(),
    }
}
