#![doc = r#"
cropmap — area checks, season-aligned processing periods and result post-processing
for cropland and crop type mapping jobs.

The mapping itself runs on a remote processing backend. This crate owns everything
around it: validating the area of interest, recommending a one-year processing
period that does not cut local growing seasons, building a validated job request,
and splitting the backend's combined two-band GeoTIFF into a styled classification
file and a probability file.

Stability
---------
The public library API is experimental in initial releases and may evolve.

Requirements
------------
- Rust 2024 edition toolchain.
- GDAL development headers only when the optional `gdal` feature is enabled.

Add dependency
--------------
```toml
[dependencies]
cropmap = "0.1"
```

Check an area and build a request
---------------------------------
```rust,no_run
use cropmap::api::{build_request, check_area, RequestOptions};
use cropmap::{BoundingBox, PipelineConfig, ProcessingPeriod, Product};

fn main() -> cropmap::Result<()> {
    let config = PipelineConfig::default();
    let extent = check_area(BoundingBox::new(4.50, 51.00, 4.55, 51.05), &config)?;
    let period = ProcessingPeriod::parse("2020-11-01", "2021-10-31")?;

    let request = build_request(
        extent,
        period,
        RequestOptions { product: Product::Croptype, apply_cropland_mask: true, ..Default::default() },
        &config,
    )?;
    println!("{}", request.to_json()?);
    Ok(())
}
```

Season advice from a crop calendar
----------------------------------
```rust,no_run
use std::path::Path;
use cropmap::api::{advise_from_calendar, check_area};
use cropmap::{BoundingBox, PipelineConfig, SeasonAdvice};

fn main() -> cropmap::Result<()> {
    let extent = check_area(BoundingBox::new(4.50, 51.00, 4.55, 51.05), &PipelineConfig::default())?;
    match advise_from_calendar(Path::new("resources/crop_calendar.json"), &extent, 2021)? {
        SeasonAdvice::Recommended { period, .. } => println!("use {period}"),
        SeasonAdvice::Unavailable { reason, guidance } => println!("{reason}: {guidance}"),
    }
    Ok(())
}
```

Post-process a downloaded job result
------------------------------------
```rust,no_run
use std::path::Path;
use cropmap::api::postprocess_job_result_file;

fn main() -> cropmap::Result<()> {
    for split in postprocess_job_result_file(Path::new("outputs/job-result.json"), Path::new("outputs"))? {
        println!("{} -> {:?}, {:?}", split.product, split.classification, split.probability);
    }
    Ok(())
}
```

Plugging in a backend
---------------------
Implement [`JobSubmitter`] (and optionally [`SeasonLookup`]) and drive the
whole workflow through [`MappingPipeline`].

Error handling
--------------
All public functions return `cropmap::Result<T>`; match on `cropmap::Error` to handle
specific cases. Missing season information is not an error but a
[`SeasonAdvice::Unavailable`] value.
```rust,no_run
use cropmap::api::check_area;
use cropmap::{BoundingBox, Error, PipelineConfig};

fn main() {
    match check_area(BoundingBox::new(4.0, 50.0, 5.0, 51.0), &PipelineConfig::default()) {
        Ok(extent) => println!("{extent}"),
        Err(Error::AreaTooLarge { area_km2, .. }) => eprintln!("redraw: {area_km2:.0} km²"),
        Err(other) => eprintln!("Other error: {other}"),
    }
}
```

Feature flags
-------------
- `gdal`: GDAL-backed fallback reader for combined downloads the pure TIFF decoder rejects.

Useful modules
--------------
- [`api`] — high-level, ergonomic entry points.
- [`core`] — area, period, season and request logic plus the pipeline.
- [`io`] — job results, crop calendar, raster reader, color maps and writers.
- [`error`] — crate-level `Error` and `Result`.
"#]

// Core modules (public)
pub mod api;
pub mod core;
pub mod error;
pub mod io;
pub mod postprocess;
pub mod types;

// Curated public API surface
// Types
pub use types::{OutputFormat, Product};

// Domain values
pub use crate::core::extent::{AreaSelector, BoundingBox, DrawnGeometry, SpatialExtent};
pub use crate::core::params::{JobOptions, PipelineConfig};
pub use crate::core::period::ProcessingPeriod;
pub use crate::core::pipeline::{MappingPipeline, MappingRun};
pub use crate::core::request::{JobRequest, JobRequestBuilder};
pub use crate::core::season::{
    MonthDay, Season, SeasonAdvice, SeasonAdvisor, SeasonInfo, SeasonLookup,
    SeasonLookupOutcome, UnavailableReason,
};

// I/O collaborators
pub use crate::io::{JobResult, JobSubmitter, LookupTable, ProductAsset, SeasonCalendar};
pub use postprocess::{ResultPostprocessor, SplitProduct};

// Errors
pub use error::{Error, Result};
