use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use reachbands::api::{AddressRecord, Geocoder, OpenRouteService, jobs_for, resolve_addresses, run_queue};
use reachbands::bands::{self, RunReport, RunRequest};
use reachbands::config::{CoverageMode, FileConfig, Locale};
use reachbands::coverage::{BufferCoverage, CoverageSource, IsochroneCoverage, IsochroneRecord};
use reachbands::domain::{Boundary, Category, DiagnosticKind, PointTable, Thresholds};
use reachbands::error::InputDataError;
use reachbands::geometry::{Crs, Reprojection};
use reachbands::io::{
    OutputContext, read_boundary, read_isochrones, read_point_records, write_bands,
    write_diagnostics, write_isochrones, write_point_records,
};

/// Partition land into nested distance or travel-time bands around points
///
/// Examples:
///   # Distance bands of 10, 15 and 20 km around every institution
///   reachbands bands -p institutions.json -b gemeenten.geojson
///
///   # Travel-time bands from pre-fetched isochrones, Dutch labels
///   reachbands bands -m isochrone -p institutions.json -b gemeenten.geojson \
///       --isochrones isochrones.geojson --locale nl
///
///   # Resolve addresses, then fetch isochrones for them
///   reachbands geocode -i addresses.json -o institutions.json
///   reachbands isochrones -p institutions.json -o isochrones.geojson
#[derive(Parser, Debug)]
#[command(name = "reachbands")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to config file (optional, auto-searches reachbands.toml if not provided)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decompose coverage into bands per category
    Bands(BandsArgs),
    /// Resolve an address table to a point table
    Geocode(GeocodeArgs),
    /// Fetch isochrones for every point of a point table
    Isochrones(IsochronesArgs),
}

#[derive(Args, Debug)]
struct BandsArgs {
    /// Point table (JSON records or GeoJSON points)
    #[arg(short = 'p', long)]
    points: Option<PathBuf>,

    /// Land/water boundary (GeoJSON)
    #[arg(short = 'b', long)]
    boundary: Option<PathBuf>,

    /// Isochrone table, required in isochrone mode
    #[arg(long)]
    isochrones: Option<PathBuf>,

    /// Coverage mode
    #[arg(short = 'm', long, value_enum)]
    mode: Option<CoverageMode>,

    /// Thresholds, comma separated (meters for buffers, seconds for isochrones)
    #[arg(short = 't', long, value_delimiter = ',')]
    thresholds: Vec<f64>,

    /// Categories to process, in output order (defaults to every category in the point table)
    #[arg(short = 'c', long = "category", value_delimiter = ',')]
    categories: Vec<String>,

    /// Output directory
    #[arg(short = 'o', long)]
    output_dir: Option<PathBuf>,

    /// Segments per buffer circle
    #[arg(long)]
    segments: Option<usize>,

    /// Language for labels and file names
    #[arg(long, value_enum)]
    locale: Option<Locale>,

    /// Allowed partition error as a fraction of the dry land area
    #[arg(long)]
    area_tolerance: Option<f64>,

    /// CRS of the boundary when the file does not declare one
    #[arg(long)]
    boundary_crs: Option<String>,

    /// CRS of the point table when the file does not declare one
    #[arg(long)]
    points_crs: Option<String>,
}

#[derive(Args, Debug)]
struct GeocodeArgs {
    /// Address table (JSON array of {id, category, street, postalcode, city, country})
    #[arg(short = 'i', long)]
    input: PathBuf,

    /// Point table to write
    #[arg(short = 'o', long)]
    output: PathBuf,

    /// Country for addresses that do not name one
    #[arg(short = 'C', long)]
    country: Option<String>,
}

#[derive(Args, Debug)]
struct IsochronesArgs {
    /// Point table (geographic coordinates)
    #[arg(short = 'p', long)]
    points: PathBuf,

    /// Isochrone table to write
    #[arg(short = 'o', long)]
    output: PathBuf,

    /// Ranges in seconds, comma separated
    #[arg(short = 't', long, value_delimiter = ',')]
    thresholds: Vec<f64>,

    /// Routing profile, e.g. driving-car or cycling-regular
    #[arg(long)]
    profile: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let file_config: FileConfig = if let Some(ref config_path) = cli.config {
        if config_path.exists() {
            let contents = std::fs::read_to_string(config_path)
                .context(format!("Failed to read config file: {:?}", config_path))?;
            toml::from_str(&contents).context("Failed to parse config file")?
        } else {
            bail!("Config file not found: {:?}", config_path);
        }
    } else {
        FileConfig::load().unwrap_or_default()
    };

    match cli.command {
        Command::Bands(args) => run_bands(args, file_config),
        Command::Geocode(args) => run_geocode(args, file_config),
        Command::Isochrones(args) => run_isochrones(args, file_config),
    }
}

fn run_bands(args: BandsArgs, file: FileConfig) -> Result<()> {
    let total_start = Instant::now();

    let mode = args.mode.or(file.mode).unwrap_or_default();
    let thresholds = if !args.thresholds.is_empty() {
        args.thresholds
    } else {
        file.thresholds
            .clone()
            .unwrap_or_else(|| mode.default_thresholds())
    };
    let thresholds = Thresholds::new(thresholds)?;
    let points_path = args
        .points
        .or(file.points.clone())
        .context("No point table given (--points)")?;
    let boundary_path = args
        .boundary
        .or(file.boundary.clone())
        .context("No boundary given (--boundary)")?;
    let output_dir = args
        .output_dir
        .or(file.output_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."));
    let segments = args.segments.unwrap_or(file.segments);
    let locale = args.locale.or(file.locale).unwrap_or_default();
    let area_tolerance = args.area_tolerance.unwrap_or(file.area_tolerance);
    let boundary_source = file.boundary_source.clone().unwrap_or_default();
    let categories = if !args.categories.is_empty() {
        args.categories
    } else {
        file.categories.clone().unwrap_or_default()
    };

    info!(
        mode = mode.name(),
        thresholds = ?thresholds.as_slice(),
        ?locale,
        "starting band decomposition"
    );

    let spinner = create_spinner("Loading boundary...");
    let start = Instant::now();
    let boundary = read_boundary(&boundary_path, &boundary_source, args.boundary_crs.as_deref())?;
    let plan = Reprojection::plan(&boundary);
    let boundary = plan.boundary(&boundary)?;
    spinner.finish_with_message(format!(
        "Loaded boundary in {} [{:.1}s]",
        plan.target(),
        start.elapsed().as_secs_f32()
    ));

    let spinner = create_spinner("Loading points...");
    let start = Instant::now();
    let input = read_point_records(&points_path)?;
    let points_crs = args
        .points_crs
        .or(input.declared_crs)
        .unwrap_or_else(|| "EPSG:4326".to_string());
    let (points, mut diagnostics) = PointTable::from_records(input.records, Crs::parse(&points_crs)?)?;
    let points = plan.points(&points)?;
    spinner.finish_with_message(format!(
        "Loaded {} located points, {} without coordinates [{:.1}s]",
        points.sites().len(),
        diagnostics.len(),
        start.elapsed().as_secs_f32()
    ));

    let categories = if categories.is_empty() {
        points.categories().into_iter().collect()
    } else {
        categories
            .into_iter()
            .map(Category::new)
            .collect::<Result<Vec<_>, _>>()?
    };
    let mut request = RunRequest::new(categories, thresholds);
    request.area_tolerance = area_tolerance;

    let report = match mode {
        CoverageMode::Buffer => {
            let source = BufferCoverage::new(&points, segments)?;
            decompose_with_spinner(&request, &points, &source, &boundary)?
        }
        CoverageMode::Isochrone => {
            let path = args
                .isochrones
                .or(file.isochrones.clone())
                .context("Isochrone mode needs an isochrone table (--isochrones)")?;
            let records = load_isochrones(&path, &plan)?;
            let source = IsochroneCoverage::new(&points, records);
            decompose_with_spinner(&request, &points, &source, &boundary)?
        }
    };

    let ctx = OutputContext {
        mode,
        strings: locale.strings(),
        reprojection: &plan,
    };
    diagnostics.extend(report.diagnostics.iter().cloned());
    let bands_path = write_bands(&output_dir, &report, &ctx)?;
    let diagnostics_path = write_diagnostics(&output_dir, &diagnostics, &ctx)?;

    println!();
    print_summary(&report, &ctx);
    println!();
    if report.flagged_count() > 0 {
        warn!(
            bands = report.flagged_count(),
            "some bands could not be computed and were written empty"
        );
    }
    let tolerance_failures = diagnostics
        .iter()
        .filter(|d| d.kind == DiagnosticKind::PartitionTolerance)
        .count();
    if tolerance_failures > 0 {
        warn!(
            categories = tolerance_failures,
            "partition check failed, see diagnostics"
        );
    }
    println!(
        "Done! Total time: {:.1}s",
        total_start.elapsed().as_secs_f32()
    );
    println!("Bands:       {}", bands_path.display());
    println!(
        "Diagnostics: {} ({} entries)",
        diagnostics_path.display(),
        diagnostics.len()
    );

    Ok(())
}

fn load_isochrones(path: &Path, plan: &Reprojection) -> Result<Vec<IsochroneRecord>> {
    let spinner = create_spinner("Loading isochrones...");
    let start = Instant::now();
    let (records, crs) = read_isochrones(path)?;
    let records = records
        .into_iter()
        .map(|record| {
            let geometry = plan.geometry("isochrone table", &record.geometry, &crs)?;
            Ok(IsochroneRecord { geometry, ..record })
        })
        .collect::<Result<Vec<_>, InputDataError>>()?;
    spinner.finish_with_message(format!(
        "Loaded {} isochrones [{:.1}s]",
        records.len(),
        start.elapsed().as_secs_f32()
    ));
    Ok(records)
}

fn decompose_with_spinner(
    request: &RunRequest,
    points: &PointTable,
    source: &dyn CoverageSource,
    boundary: &Boundary,
) -> Result<RunReport> {
    let spinner = create_spinner(&format!(
        "Decomposing {} categories ({} coverage)...",
        request.categories.len(),
        source.mode()
    ));
    let start = Instant::now();
    let report = bands::run(request, points, source, boundary)?;
    spinner.finish_with_message(format!(
        "Computed {} bands [{:.1}s]",
        report.band_count(),
        start.elapsed().as_secs_f32()
    ));
    Ok(report)
}

fn print_summary(report: &RunReport, ctx: &OutputContext) {
    println!("{}", ctx.strings.legend_title(ctx.mode));
    println!("================================");
    for category in &report.categories {
        println!("{}", ctx.strings.legend_name(&category.category));
        for band in &category.bands {
            let flag = if band.is_flagged() { "  (failed)" } else { "" };
            println!(
                "  {:<12} {:>12.2} km2{}",
                ctx.strings.band_label(ctx.mode, band.lower, band.upper),
                band.area() / 1_000_000.0,
                flag
            );
        }
    }
}

fn run_geocode(args: GeocodeArgs, file: FileConfig) -> Result<()> {
    let start = Instant::now();
    let mut config = file.geocoder.clone().unwrap_or_default();
    if let Some(country) = args.country {
        config.country = country;
    }

    let contents = std::fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read address table: {:?}", args.input))?;
    let addresses: Vec<AddressRecord> =
        serde_json::from_str(&contents).context("Failed to parse address table")?;

    let mut geocoder = Geocoder::new(config)?;
    let country = geocoder.country().to_string();
    let spinner = create_spinner(&format!("Geocoding {} addresses...", addresses.len()));
    let mut done = 0;
    let records = resolve_addresses(&addresses, &country, |query| {
        done += 1;
        spinner.set_message(format!("Geocoding {}/{}: {}", done, addresses.len(), query));
        geocoder.geocode(query)
    });
    let resolved = records.iter().filter(|r| r.latitude.is_some()).count();
    spinner.finish_with_message(format!(
        "Geocoded {}/{} addresses [{:.1}s]",
        resolved,
        records.len(),
        start.elapsed().as_secs_f32()
    ));

    write_point_records(&args.output, &records)?;
    println!("Output: {}", args.output.display());
    Ok(())
}

fn run_isochrones(args: IsochronesArgs, file: FileConfig) -> Result<()> {
    let start = Instant::now();
    let mut config = file.routing.clone().unwrap_or_default();
    if let Some(profile) = args.profile {
        config.profile = profile;
    }
    let thresholds = if !args.thresholds.is_empty() {
        args.thresholds
    } else {
        file.thresholds
            .clone()
            .unwrap_or_else(|| CoverageMode::Isochrone.default_thresholds())
    };
    let thresholds = Thresholds::new(thresholds)?;

    let input = read_point_records(&args.points)?;
    let crs = match input.declared_crs {
        Some(id) => Crs::parse(&id)?,
        None => Crs::Geographic,
    };
    let (points, skipped) = PointTable::from_records(input.records, crs)?;
    if !skipped.is_empty() {
        warn!(points = skipped.len(), "points without coordinates are skipped");
    }

    let service = OpenRouteService::from_env(config)?;
    let jobs = jobs_for(&points)?;
    let spinner = create_spinner(&format!("Fetching isochrones for {} points...", jobs.len()));
    let outcome = run_queue(jobs, service.min_delay(), |job| {
        spinner.set_message(format!("Fetching isochrones for {}...", job.point_id));
        service.fetch(job, thresholds.as_slice())
    });
    spinner.finish_with_message(format!(
        "Fetched {} isochrones, {} points failed [{:.1}s]",
        outcome.records.len(),
        outcome.failed.len(),
        start.elapsed().as_secs_f32()
    ));
    for (point_id, reason) in &outcome.failed {
        println!("  {}: {}", point_id, reason);
    }

    write_isochrones(&args.output, &outcome.records, &Crs::Geographic)?;
    println!("Output: {}", args.output.display());
    Ok(())
}

fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}
