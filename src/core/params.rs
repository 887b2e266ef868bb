use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::core::extent::{MAX_AREA_KM2, RECOMMENDED_AREA_KM2};
use crate::error::Result;

pub const ONNX_DEPS_ARCHIVE: &str = "https://artifactory.vgt.vito.be/artifactory/auxdata-public/openeo/onnx_dependencies_1.16.3.zip#onnx_deps";

/// Cluster resource sizing handed to the job-submission backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobOptions {
    pub driver_memory: Option<String>,
    pub driver_memory_overhead: Option<String>,
    pub executor_memory: Option<String>,
    pub executor_memory_overhead: Option<String>,
    pub executor_count: Option<u32>,
    pub queue: Option<String>,
    pub udf_dependency_archives: Vec<String>,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            driver_memory: Some("4g".to_string()),
            driver_memory_overhead: None,
            executor_memory: None,
            executor_memory_overhead: Some("4g".to_string()),
            executor_count: None,
            queue: None,
            udf_dependency_archives: vec![ONNX_DEPS_ARCHIVE.to_string()],
        }
    }
}

impl JobOptions {
    /// Launcher-style option map; unset entries are left out.
    pub fn to_job_options(&self) -> BTreeMap<String, Value> {
        let mut map = BTreeMap::new();
        let mut put = |key: &str, value: Option<Value>| {
            if let Some(v) = value {
                map.insert(key.to_string(), v);
            }
        };
        put("driver-memory", self.driver_memory.clone().map(Value::from));
        put("driver-memoryOverhead", self.driver_memory_overhead.clone().map(Value::from));
        put("executor-memory", self.executor_memory.clone().map(Value::from));
        put("executor-memoryOverhead", self.executor_memory_overhead.clone().map(Value::from));
        put("num-executors", self.executor_count.map(Value::from));
        put("queue", self.queue.clone().map(Value::from));
        if !self.udf_dependency_archives.is_empty() {
            put("udf-dependency-archives", Some(Value::from(self.udf_dependency_archives.clone())));
        }
        map
    }
}

/// Pipeline settings suitable for config files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Where downloads and split products are written
    pub output_dir: PathBuf,
    pub max_area_km2: f64,
    pub recommended_area_km2: f64,
    pub job_options: JobOptions,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("outputs"),
            max_area_km2: MAX_AREA_KM2,
            recommended_area_km2: RECOMMENDED_AREA_KM2,
            job_options: JobOptions::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&text)?;
        debug!("Loaded pipeline config from {:?}", path);
        Ok(config)
    }
}
