//! Mapping job results as returned by the processing backend, and the
//! submission seam the pipeline hands requests to.
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::period::ProcessingPeriod;
use crate::core::request::JobRequest;
use crate::error::Result;
use crate::types::Product;

/// Class name to label code, embedded in the classification output.
pub type LookupTable = BTreeMap<String, u16>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductAsset {
    #[serde(rename = "type")]
    pub product_type: Product,
    pub temporal_extent: ProcessingPeriod,
    #[serde(rename = "lut", default)]
    pub lookup_table: LookupTable,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Local copy of the combined two-band download
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    pub job_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_path: Option<PathBuf>,
    pub products: BTreeMap<String, ProductAsset>,
}

impl JobResult {
    /// Load result metadata; relative product paths resolve against the file's directory.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let mut result: JobResult = serde_json::from_str(&text)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        for asset in result.products.values_mut() {
            if let Some(p) = asset.path.as_mut() {
                if p.is_relative() {
                    *p = base.join(&*p);
                }
            }
        }
        if result.metadata_path.is_none() {
            result.metadata_path = Some(path.to_path_buf());
        }
        debug!(
            "Loaded job {} with {} product(s) from {:?}",
            result.job_id,
            result.products.len(),
            path
        );
        Ok(result)
    }

    pub fn write_json_file(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Runs a mapping job to completion: authenticate, submit, wait, download.
///
/// Failures of the remote job come back as [`crate::Error::Job`]; no retry is attempted.
pub trait JobSubmitter {
    fn submit(&self, request: &JobRequest) -> Result<JobResult>;
}

impl<T: JobSubmitter + ?Sized> JobSubmitter for &T {
    fn submit(&self, request: &JobRequest) -> Result<JobResult> {
        (**self).submit(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESULT: &str = r#"{
        "job_id": "j-2406abc",
        "products": {
            "cropland": {
                "type": "cropland",
                "temporal_extent": {"start_date": "2020-11-01", "end_date": "2021-10-31"},
                "lut": {"other": 0, "cropland": 1},
                "url": "https://example.org/assets/cropland.tif",
                "path": "cropland.tif"
            }
        }
    }"#;

    #[test]
    fn relative_paths_resolve_next_to_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let meta = dir.path().join("job-results.json");
        std::fs::write(&meta, RESULT).unwrap();

        let result = JobResult::from_json_file(&meta).unwrap();
        let asset = &result.products["cropland"];
        assert_eq!(asset.path.as_deref(), Some(dir.path().join("cropland.tif").as_path()));
        assert_eq!(asset.lookup_table["cropland"], 1);
        assert_eq!(result.metadata_path.as_deref(), Some(meta.as_path()));
    }

    #[test]
    fn invalid_temporal_extent_is_rejected() {
        let bad = RESULT.replace("2021-10-31", "2021-06-30");
        assert!(serde_json::from_str::<JobResult>(&bad).is_err());
    }
}
