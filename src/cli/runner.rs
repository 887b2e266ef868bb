use std::fs;

use chrono::NaiveDate;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cropmap::api::{self, RequestOptions};
use cropmap::core::extent::{BoundingBox, SpatialExtent};
use cropmap::{PipelineConfig, ProcessingPeriod, SeasonAdvice};

use super::args::{AdviseArgs, AoiArgs, AreaArgs, CliArgs, Command, PostprocessArgs, RequestArgs};
use super::errors::AppError;

fn init_logging(log: bool) {
    if log {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    } else {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn parse_bbox(text: &str, epsg: u32) -> Result<BoundingBox, AppError> {
    let invalid = || AppError::InvalidBbox {
        bbox: text.to_string(),
    };
    let values = text
        .split(',')
        .map(|v| v.trim().parse::<f64>().map_err(|_| invalid()))
        .collect::<Result<Vec<_>, _>>()?;
    match values.as_slice() {
        [west, south, east, north] => {
            Ok(BoundingBox::new(*west, *south, *east, *north).with_epsg(epsg))
        }
        _ => Err(invalid()),
    }
}

fn resolve_extent(aoi: &AoiArgs, config: &PipelineConfig) -> Result<SpatialExtent, AppError> {
    if let Some(path) = &aoi.geometry {
        let text = fs::read_to_string(path)?;
        return Ok(api::check_drawn_area(&text, config)?);
    }
    let bbox = aoi.bbox.as_deref().ok_or(AppError::MissingArgument {
        arg: "--bbox or --geometry".to_string(),
    })?;
    Ok(api::check_area(parse_bbox(bbox, aoi.epsg)?, config)?)
}

fn parse_date(text: &str) -> Result<NaiveDate, cropmap::Error> {
    Ok(NaiveDate::parse_from_str(text, "%Y-%m-%d")?)
}

fn resolve_period(start: Option<&str>, end: Option<&str>) -> Result<ProcessingPeriod, AppError> {
    let period = match (start, end) {
        (Some(s), Some(e)) => ProcessingPeriod::parse(s, e)?,
        (Some(s), None) => ProcessingPeriod::starting(parse_date(s)?)?,
        (None, Some(e)) => ProcessingPeriod::ending(parse_date(e)?)?,
        (None, None) => {
            return Err(AppError::MissingArgument {
                arg: "--start or --end".to_string(),
            });
        }
    };
    Ok(period)
}

fn run_area(args: &AreaArgs, config: &PipelineConfig) -> Result<(), AppError> {
    let extent = resolve_extent(&args.aoi, config)?;
    println!("{}", extent);
    println!("area: {:.1} km² (limit {:.0} km²)", extent.area_km2(), config.max_area_km2);
    if extent.area_km2() > config.recommended_area_km2 {
        println!(
            "note: areas up to {:.0} km² are recommended for quick runs",
            config.recommended_area_km2
        );
    }
    Ok(())
}

fn run_advise(args: &AdviseArgs, config: &PipelineConfig) -> Result<(), AppError> {
    let extent = resolve_extent(&args.aoi, config)?;
    let advice = api::advise_from_calendar(&args.calendar, &extent, args.end_year)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&advice).map_err(cropmap::Error::from)?);
        return Ok(());
    }
    match advice {
        SeasonAdvice::Recommended {
            info,
            period,
            truncated,
        } => {
            if let Some(zone) = &info.zone {
                println!("zone: {}", zone);
            }
            for season in &info.seasons {
                println!("season {}: {} to {}", season.name, season.start, season.end);
            }
            println!("recommended period: {} to {}", period.start(), period.end());
            if !truncated.is_empty() {
                println!("unavoidably truncated: {}", truncated.join(", "));
            }
        }
        SeasonAdvice::Unavailable { reason, guidance } => {
            println!("season information unavailable: {}", reason);
            println!("{}", guidance);
        }
    }
    Ok(())
}

fn run_request(args: &RequestArgs, config: &PipelineConfig) -> Result<(), AppError> {
    let mut config = config.clone();
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }
    let extent = resolve_extent(&args.aoi, &config)?;
    let period = resolve_period(args.start.as_deref(), args.end.as_deref())?;
    let options = RequestOptions {
        product: args.product,
        format: args.format,
        apply_cropland_mask: args.apply_cropland_mask,
    };
    let request = api::build_request(extent, period, options, &config)?;
    let json = request.to_json()?;
    match &args.out {
        Some(path) => {
            fs::write(path, json)?;
            info!("Wrote job request to {:?}", path);
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn run_postprocess(args: &PostprocessArgs, config: &PipelineConfig) -> Result<(), AppError> {
    let output_dir = args.output_dir.clone().unwrap_or_else(|| config.output_dir.clone());
    if let Some(metadata) = &args.job_result {
        for split in api::postprocess_job_result_file(metadata, &output_dir)? {
            println!("{}: {}", split.product, split.classification.display());
            println!("{}: {}", split.product, split.probability.display());
        }
        return Ok(());
    }
    let input_dir = args.input_dir.as_ref().ok_or(AppError::MissingArgument {
        arg: "--job-result or --input-dir".to_string(),
    })?;
    let report = api::postprocess_directory(input_dir, &output_dir, args.batch)?;
    for split in &report.outputs {
        println!("{}: {}", split.product, split.classification.display());
        println!("{}: {}", split.product, split.probability.display());
    }
    for (path, error) in &report.errors {
        eprintln!("failed {}: {}", path.display(), error);
    }
    println!(
        "Done: processed={}, skipped={}, errors={}",
        report.processed,
        report.skipped,
        report.errors.len()
    );
    Ok(())
}

pub fn run(args: CliArgs) -> Result<(), Box<dyn std::error::Error>> {
    init_logging(args.log);

    let config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };

    match &args.command {
        Command::Area(a) => run_area(a, &config)?,
        Command::Advise(a) => run_advise(a, &config)?,
        Command::Request(a) => run_request(a, &config)?,
        Command::Postprocess(a) => run_postprocess(a, &config)?,
    }
    Ok(())
}
