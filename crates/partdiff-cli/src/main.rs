//! partdiff CLI — run part inspections against a master image.

use clap::{Args, Parser, Subcommand};
use image::RgbImage;
use std::path::{Path, PathBuf};

use partdiff::{DirectoryStore, InspectConfig, Inspector};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "partdiff")]
#[command(about = "Inspect captured part images against a master reference (pass/fail + diff artifacts)")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect candidate frames against a master image.
    Inspect(InspectArgs),

    /// Registration debug: align one candidate and dump the
    /// intermediate images.
    Align(AlignArgs),
}

#[derive(Debug, Clone, Args)]
struct ThresholdArgs {
    /// Lowe ratio-test bound for descriptor matching.
    #[arg(long, default_value = "0.75")]
    match_ratio: f32,

    /// RANSAC reprojection threshold in pixels.
    #[arg(long, default_value = "2.0")]
    reproj_threshold: f64,

    /// Maximum RANSAC iterations.
    #[arg(long, default_value = "2000")]
    ransac_iters: usize,

    /// Keypoint cap per image.
    #[arg(long, default_value = "10000")]
    max_keypoints: usize,

    /// Components at or below this pixel count are dropped as noise.
    #[arg(long, default_value = "30")]
    min_component_area: u32,

    /// Bounding-box extent below which a component is one-pixel-thin.
    #[arg(long, default_value = "2")]
    line_thickness: u32,

    /// Maximum long-axis extent for a thin component to count as a
    /// registration seam.
    #[arg(long, default_value = "1000")]
    line_length: u32,

    /// Shape-similarity cutoff for matching candidate contours against
    /// master geometry (strict less-than).
    #[arg(long, default_value = "0.1")]
    shape_match_threshold: f64,

    /// Minimum clean frames required for a pass verdict.
    #[arg(long, default_value = "2")]
    min_clean_frames: usize,
}

impl ThresholdArgs {
    fn to_config(&self) -> InspectConfig {
        let mut config = InspectConfig::default();
        config.register.matching.ratio = self.match_ratio;
        config.register.ransac.reproj_threshold = self.reproj_threshold;
        config.register.ransac.max_iters = self.ransac_iters;
        config.register.features.max_keypoints = self.max_keypoints;
        config.clean.min_component_area = self.min_component_area;
        config.clean.line_thickness = self.line_thickness;
        config.clean.line_length = self.line_length;
        config.classify.shape_match_threshold = self.shape_match_threshold;
        config.consensus.min_clean_frames = self.min_clean_frames;
        config
    }
}

#[derive(Debug, Clone, Args)]
struct InspectArgs {
    /// Path to the master image.
    #[arg(long)]
    master: PathBuf,

    /// Candidate frame image (repeat for each capture).
    #[arg(long = "frame", required = true)]
    frames: Vec<PathBuf>,

    /// Serial number of the inspected part (artifact file stem).
    #[arg(long)]
    serial: String,

    /// Model name (artifact subdirectory).
    #[arg(long)]
    model: String,

    /// Path to write the JSON inspection report.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Directory to persist the representative image + diff pair under.
    #[arg(long)]
    artifact_dir: Option<PathBuf>,

    #[command(flatten)]
    thresholds: ThresholdArgs,
}

#[derive(Debug, Clone, Args)]
struct AlignArgs {
    /// Path to the master image.
    #[arg(long)]
    master: PathBuf,

    /// Path to the candidate image.
    #[arg(long)]
    candidate: PathBuf,

    /// Directory to write the debug images into.
    #[arg(long, default_value = "align-debug")]
    out_dir: PathBuf,

    #[command(flatten)]
    thresholds: ThresholdArgs,
}

fn load_rgb(path: &Path) -> CliResult<RgbImage> {
    Ok(image::open(path)
        .map_err(|e| format!("cannot open {}: {e}", path.display()))?
        .to_rgb8())
}

fn run_inspect(args: &InspectArgs) -> CliResult<()> {
    let master = load_rgb(&args.master)?;
    let frames = args
        .frames
        .iter()
        .map(|p| load_rgb(p))
        .collect::<CliResult<Vec<_>>>()?;

    let inspector = Inspector::with_config(args.thresholds.to_config());
    let inspection = inspector.inspect(&master, &frames)?;
    let report = inspection.report();

    if let Some(dir) = &args.artifact_dir {
        let store = DirectoryStore::new(dir);
        inspection.persist(&store, "inspections", &args.model, &args.serial)?;
    }

    let json = serde_json::to_string_pretty(&report)?;
    match &args.out {
        Some(path) => std::fs::write(path, &json)?,
        None => println!("{json}"),
    }

    tracing::info!(
        "serial {} ({}): {:?}, operator_dependent = {}",
        args.serial,
        args.model,
        report.verdict,
        report.operator_dependent
    );
    Ok(())
}

fn run_align(args: &AlignArgs) -> CliResult<()> {
    let master = load_rgb(&args.master)?;
    let candidate = load_rgb(&args.candidate)?;

    let config = args.thresholds.to_config();
    let reg = partdiff::register::align(&master, &candidate, &config.register)?;
    let diff = partdiff::threshold::emphasize_raised(&reg.mask);
    let cleaned = partdiff::components::clean(&diff, &config.clean);

    std::fs::create_dir_all(&args.out_dir)?;
    reg.aligned.save(args.out_dir.join("aligned.png"))?;
    reg.absolute_diff
        .save(args.out_dir.join("absolute_diff.png"))?;
    reg.master_foreground
        .save(args.out_dir.join("master_foreground.png"))?;
    reg.mask.save(args.out_dir.join("raw_mask.png"))?;
    diff.save(args.out_dir.join("diff.png"))?;
    cleaned.save(args.out_dir.join("cleaned.png"))?;

    println!(
        "aligned with {} matches; {} master contours; debug images in {}",
        reg.match_count,
        reg.master_contours.len(),
        args.out_dir.display()
    );
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let result = match &cli.command {
        Commands::Inspect(args) => run_inspect(args),
        Commands::Align(args) => run_align(args),
    };
    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
