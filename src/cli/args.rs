use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use cropmap::types::{OutputFormat, Product};

#[derive(Parser)]
#[command(name = "cropmap", version, about = "Cropland and crop type mapping workflow CLI")]
pub struct CliArgs {
    /// Enable logging
    #[arg(long, default_value_t = false, global = true)]
    pub log: bool,

    /// Pipeline config file (JSON)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Compute the area of interest and check it against the limits
    Area(AreaArgs),
    /// Recommend a season-aligned processing period
    Advise(AdviseArgs),
    /// Build a validated job request
    Request(RequestArgs),
    /// Split downloaded two-band results into classification and probability files
    Postprocess(PostprocessArgs),
}

#[derive(Args, Clone)]
pub struct AoiArgs {
    /// Bounding box as west,south,east,north
    #[arg(long, allow_hyphen_values = true)]
    pub bbox: Option<String>,

    /// GeoJSON file holding the last drawn geometry (or a Feature)
    #[arg(long, conflicts_with = "bbox")]
    pub geometry: Option<PathBuf>,

    /// EPSG code of the bbox coordinates
    #[arg(long, default_value_t = 4326)]
    pub epsg: u32,
}

#[derive(Args)]
pub struct AreaArgs {
    #[command(flatten)]
    pub aoi: AoiArgs,
}

#[derive(Args)]
pub struct AdviseArgs {
    #[command(flatten)]
    pub aoi: AoiArgs,

    /// Crop calendar file (JSON)
    #[arg(long, default_value = "resources/crop_calendar.json")]
    pub calendar: PathBuf,

    /// Year the processing period should end in
    #[arg(long)]
    pub end_year: i32,

    /// Print the advice as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args)]
pub struct RequestArgs {
    #[command(flatten)]
    pub aoi: AoiArgs,

    /// First day of the processing period (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<String>,

    /// Last day of the processing period (YYYY-MM-DD)
    #[arg(long)]
    pub end: Option<String>,

    /// Product to map
    #[arg(long, value_enum, default_value_t = Product::Cropland)]
    pub product: Product,

    /// Result format (gtiff or netcdf)
    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::GTiff)]
    pub format: OutputFormat,

    /// Mask a croptype map with the cropland map
    #[arg(long, default_value_t = false)]
    pub apply_cropland_mask: bool,

    /// Output directory for the job (overrides config)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Write the request JSON here instead of stdout
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Args)]
pub struct PostprocessArgs {
    /// Job result metadata file (single result mode)
    #[arg(long)]
    pub job_result: Option<PathBuf>,

    /// Directory of job result metadata files (batch mode)
    #[arg(long, conflicts_with = "job_result")]
    pub input_dir: Option<PathBuf>,

    /// Output directory for split products (overrides config)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Batch mode: continue with other results when one fails
    #[arg(long, default_value_t = false)]
    pub batch: bool,
}
