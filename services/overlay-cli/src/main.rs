//! Map overlay command-line tool.
//!
//! Lists the field and product registries, warms projection caches, and
//! renders overlays from a directory-backed forecast hour.

mod hour;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use map_overlay::{
    FlatImageOptions, GeoBounds, MapOverlayEngine, ModelConfigRegistry, ModelOverlayConfig, OverlayConfig,
    OverlayResult,
};
use overlay_common::{Field2D, MemoryForecastHour};
use std::fs;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use hour::{read_f32_le, DirectoryHour};

#[derive(Parser, Debug)]
#[command(name = "overlay-cli")]
#[command(about = "Reproject model fields and render map overlays")]
struct Cli {
    /// Directory holding models/*.yaml
    #[arg(long, env = "OVERLAY_MODEL_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// Projection cache root
    #[arg(long, env = "OVERLAY_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List registered fields
    Fields {
        /// Report availability against this forecast hour
        #[arg(long)]
        hour: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// List composite products
    Products {
        #[arg(long)]
        json: bool,
    },
    /// Build (or load) a model's projection map from raw coordinate files and
    /// persist it to the cache
    BuildProjection(BuildProjectionArgs),
    /// Render one field as binary floats or a PNG
    Render(RenderArgs),
    /// Render a composite product as PNG
    Composite {
        #[command(flatten)]
        target: TargetArgs,
        #[arg(long)]
        product: String,
        #[arg(long)]
        opacity: Option<f32>,
    },
}

#[derive(Args, Debug)]
struct BuildProjectionArgs {
    #[arg(long)]
    model: String,
    /// Native latitudes, little-endian f32, row-major
    #[arg(long)]
    lats: PathBuf,
    /// Native longitudes, little-endian f32, row-major
    #[arg(long)]
    lons: PathBuf,
    #[arg(long)]
    ny: usize,
    #[arg(long)]
    nx: usize,
    /// Domain threshold override (chord on the unit sphere)
    #[arg(long)]
    threshold: Option<f64>,
}

#[derive(Args, Debug)]
struct TargetArgs {
    /// Forecast hour directory (manifest.yaml plus <name>.f32 files)
    #[arg(long)]
    hour: PathBuf,
    #[arg(long)]
    model: String,
    /// Crop box as west,south,east,north
    #[arg(long)]
    bbox: Option<String>,
    /// Output file
    #[arg(short, long)]
    out: PathBuf,
    /// Print response headers
    #[arg(long)]
    headers: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Binary,
    Png,
}

#[derive(Args, Debug)]
struct RenderArgs {
    #[command(flatten)]
    target: TargetArgs,
    #[arg(long)]
    field: String,
    /// Pressure level (hPa) for isobaric fields
    #[arg(long)]
    level: Option<f64>,
    #[arg(long, value_enum, default_value = "png")]
    format: Format,
    /// Ramp name override
    #[arg(long)]
    ramp: Option<String>,
    #[arg(long, requires = "vmax")]
    vmin: Option<f32>,
    #[arg(long, requires = "vmin")]
    vmax: Option<f32>,
    #[arg(long)]
    opacity: Option<f32>,
}

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_json);

    let mut config = OverlayConfig::from_env();
    if let Some(dir) = &cli.config_dir {
        config.model_config_dir = dir.clone();
    }
    if let Some(dir) = &cli.cache_dir {
        config.cache_dir = dir.clone();
    }
    config.validate().map_err(anyhow::Error::msg)?;

    match &cli.command {
        Command::Fields { hour, json } => list_fields(hour.as_ref(), *json),
        Command::Products { json } => list_products(*json),
        Command::BuildProjection(args) => build_projection(&config, args),
        Command::Render(args) => render(&config, args),
        Command::Composite {
            target,
            product,
            opacity,
        } => composite(&config, target, product, *opacity),
    }
}

fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn engine_for(config: &OverlayConfig, model: &str) -> Result<MapOverlayEngine> {
    let registry = ModelConfigRegistry::load_from_directory(&config.model_config_dir);
    engine_with(config, registry.get(model))
}

fn engine_with(config: &OverlayConfig, model: ModelOverlayConfig) -> Result<MapOverlayEngine> {
    let engine = MapOverlayEngine::from_config(config, model)?;
    let model = engine.model();
    info!(model, grid = ?engine.grid().shape(), "Engine ready");
    Ok(engine)
}

fn parse_bbox(bbox: Option<&String>) -> Result<Option<GeoBounds>> {
    bbox.map(|s| GeoBounds::from_wms_string(s).with_context(|| format!("invalid bbox {:?}", s)))
        .transpose()
}

fn list_fields(hour: Option<&PathBuf>, json: bool) -> Result<()> {
    let hour = hour.map(DirectoryHour::open).transpose()?;
    let engine = MapOverlayEngine::new("registry", None, None)?;
    let fields = engine.list_fields(hour.as_ref().map(|h| h as &dyn map_overlay::ForecastHour));

    if json {
        println!("{}", serde_json::to_string_pretty(&fields)?);
        return Ok(());
    }
    for f in &fields {
        let level = if f.needs_level { " [level]" } else { "" };
        let missing = if f.available { "" } else { " (unavailable)" };
        println!(
            "{:<20} {:<22} {:<10} {:<12} {}{}",
            f.id, f.name, f.units, format!("{:?}", f.category).to_lowercase(), level, missing
        );
    }
    Ok(())
}

fn list_products(json: bool) -> Result<()> {
    let engine = MapOverlayEngine::new("registry", None, None)?;
    let products = engine.list_products();

    if json {
        println!("{}", serde_json::to_string_pretty(&products)?);
        return Ok(());
    }
    for p in &products {
        println!("{:<18} {:<22} {}", p.id, p.name, p.description);
    }
    Ok(())
}

fn build_projection(config: &OverlayConfig, args: &BuildProjectionArgs) -> Result<()> {
    let len = args.ny * args.nx;
    let lats = Field2D::new(args.ny, args.nx, read_f32_le(&args.lats, len)?)?;
    let lons = Field2D::new(args.ny, args.nx, read_f32_le(&args.lons, len)?)?;
    let coords = MemoryForecastHour::new().with("lats", lats).with("lons", lons);

    let registry = ModelConfigRegistry::load_from_directory(&config.model_config_dir);
    let mut model_config = registry.get(&args.model);
    if let Some(threshold) = args.threshold {
        model_config.domain_threshold = threshold;
    }
    let engine = engine_with(config, model_config)?;
    let map = engine.ensure_projection(&coords)?;
    let model = engine.model();

    match map.index_map() {
        Some(index) => info!(
            model,
            cells = index.len(),
            masked = index.masked_count(),
            cache = %config.cache_dir.display(),
            "Projection map ready"
        ),
        None => info!(model, "Regular native grid, no index map needed"),
    }
    Ok(())
}

fn render(config: &OverlayConfig, args: &RenderArgs) -> Result<()> {
    let target = &args.target;
    let hour = DirectoryHour::open(&target.hour)?;
    let engine = engine_for(config, &target.model)?;
    let bbox = parse_bbox(target.bbox.as_ref())?;

    let result = match args.format {
        Format::Binary => engine.render_binary(&hour, &args.field, args.level, bbox.as_ref())?,
        Format::Png => {
            let mut options: FlatImageOptions = engine.default_flat_options();
            options.ramp = args.ramp.clone();
            options.range = args.vmin.zip(args.vmax);
            if let Some(opacity) = args.opacity {
                options.opacity = opacity;
            }
            engine.render_flat_image(&hour, &args.field, args.level, bbox.as_ref(), &options)?
        }
    };
    write_result(target, &result)
}

fn composite(config: &OverlayConfig, target: &TargetArgs, product: &str, opacity: Option<f32>) -> Result<()> {
    if let Some(o) = opacity {
        if !(0.0..=1.0).contains(&o) {
            bail!("opacity must be within 0-1, got {}", o);
        }
    }
    let hour = DirectoryHour::open(&target.hour)?;
    let engine = engine_for(config, &target.model)?;
    let bbox = parse_bbox(target.bbox.as_ref())?;
    let result = engine.render_composite(&hour, product, bbox.as_ref(), opacity)?;
    write_result(target, &result)
}

fn write_result(target: &TargetArgs, result: &OverlayResult) -> Result<()> {
    fs::write(&target.out, &result.data).with_context(|| format!("writing {}", target.out.display()))?;
    info!(
        path = %target.out.display(),
        bytes = result.data.len(),
        kind = result.content_kind.as_str(),
        nx = result.nx,
        ny = result.ny,
        "Wrote overlay"
    );
    if target.headers {
        for (name, value) in result.headers() {
            println!("{}: {}", name, value);
        }
    }
    Ok(())
}
