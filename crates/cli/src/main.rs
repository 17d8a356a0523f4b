//! TerraShade CLI - terrain shading, generalization and illuminated contours

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use terrashade_algorithms::filters::{local_filter, LocalFilterParams};
use terrashade_algorithms::pyramid::{generalize, GeneralizationParams, LaplacianPyramid};
use terrashade_algorithms::terrain::{normal_map, plan_oblique, shade_grid, NormalMapParams, ShadingParams};
use terrashade_colormap::{ColorRamp, ColorVisualization};
use terrashade_core::io::{read_geotiff, write_geotiff, write_rgba_tiff};
use terrashade_core::{ArgbImage, Grid};
use terrashade_parallel::{ProcessingMode, ProgressSink, TaskContext};
use terrashade_render::{ForegroundVisualization, Model, Settings};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "terrashade")]
#[command(author, version, about = "Terrain visualization for digital elevation models", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Number of worker threads (default: all cores)
    #[arg(short = 'j', long, global = true)]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a grid file
    Info {
        /// Input grid file
        input: PathBuf,
    },
    /// Render a background visualization with an optional contour foreground
    Render {
        /// Input grid file
        input: PathBuf,
        /// Output RGBA TIFF
        output: PathBuf,
        /// JSON settings file; flags below override its values
        #[arg(short, long)]
        settings: Option<PathBuf>,
        /// Background: gray_shading, hypsometric, hypsometric_shading, slope, ...
        #[arg(short, long)]
        background: Option<String>,
        /// Foreground: none, illuminated_contours, shaded_contours
        #[arg(short, long)]
        foreground: Option<String>,
        /// Predefined color ramp name
        #[arg(short, long)]
        ramp: Option<String>,
        /// Light azimuth in degrees (0=North, clockwise)
        #[arg(short, long)]
        azimuth: Option<f64>,
        /// Light zenith angle in degrees (0=overhead)
        #[arg(short, long)]
        zenith: Option<f64>,
        /// Generalization details in [-1, 1]
        #[arg(short, long, allow_negative_numbers = true)]
        details: Option<f64>,
        /// Contour interval in elevation units
        #[arg(short, long)]
        interval: Option<f64>,
        /// Plan oblique inclination in degrees, 90 disables
        #[arg(long)]
        plan_oblique: Option<f64>,
        /// First bivariate attribute grid
        #[arg(long, requires = "attribute2")]
        attribute1: Option<PathBuf>,
        /// Second bivariate attribute grid
        #[arg(long, requires = "attribute1")]
        attribute2: Option<PathBuf>,
        /// Output pixels per grid vertex
        #[arg(long, default_value = "1")]
        scale: usize,
    },
    /// Gray shading as a float grid in 0..=255
    Shade {
        /// Input grid file
        input: PathBuf,
        /// Output file
        output: PathBuf,
        /// Light azimuth in degrees (0=North, clockwise)
        #[arg(short, long, default_value = "315")]
        azimuth: f64,
        /// Light zenith angle in degrees (0=overhead)
        #[arg(short, long, default_value = "45")]
        zenith: f64,
        /// Ambient term added to the cosine, in [-0.5, 0.5]
        #[arg(long, default_value = "0", allow_negative_numbers = true)]
        ambient: f64,
        /// Vertical exaggeration
        #[arg(short = 'e', long, default_value = "1.0")]
        exaggeration: f64,
    },
    /// Remove or accentuate terrain detail with a Laplacian pyramid
    Generalize {
        /// Input grid file
        input: PathBuf,
        /// Output file
        output: PathBuf,
        /// Number of fine pyramid levels affected
        #[arg(short, long, default_value = "2")]
        max_levels: usize,
        /// -1 keeps all detail, 0 and above removes it, below 0 attenuates
        #[arg(short, long, default_value = "0", allow_negative_numbers = true)]
        details: f64,
    },
    /// Local hypsometric filter (high pass over local standard deviation)
    Local {
        /// Input grid file
        input: PathBuf,
        /// Output file
        output: PathBuf,
        /// Weight of the fine pyramid levels
        #[arg(short = 'w', long, default_value = "1.5")]
        high_pass_weight: f64,
        /// Pyramid levels spanned by the standard deviation window
        #[arg(short = 'l', long, default_value = "3")]
        std_dev_levels: usize,
    },
    /// Encode surface normals as an RGB normal map
    Normals {
        /// Input grid file
        input: PathBuf,
        /// Output RGBA TIFF
        output: PathBuf,
        /// Vertical exaggeration
        #[arg(short = 'e', long, default_value = "1.0")]
        exaggeration: f64,
        #[arg(long)]
        invert_x: bool,
        #[arg(long)]
        invert_y: bool,
        #[arg(long)]
        invert_z: bool,
    },
    /// Shear a grid into a plan oblique relief
    PlanOblique {
        /// Input grid file
        input: PathBuf,
        /// Output file
        output: PathBuf,
        /// Inclination angle in degrees, in (0, 90]
        #[arg(short, long, default_value = "45")]
        angle: f64,
    },
    /// Print the default settings as JSON
    Settings {
        /// Write to a file instead of stdout
        output: Option<PathBuf>,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set default subscriber")
}

fn spinner(msg: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    Ok(pb)
}

/// Forwards operator progress to a terminal bar
struct BarSink(ProgressBar);

impl ProgressSink for BarSink {
    fn progress(&self, percent: u32) {
        self.0.set_position(percent as u64);
    }

    fn message(&self, message: &str) {
        self.0.set_message(message.to_string());
    }
}

fn progress_bar(msg: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar().template("{msg} [{bar:40.cyan/blue}] {pos:>3}%")?,
    );
    pb.set_message(msg.to_string());
    Ok(pb)
}

fn processing_mode(threads: Option<usize>) -> ProcessingMode {
    match threads {
        Some(1) => ProcessingMode::Sequential,
        Some(n) => ProcessingMode::ParallelWith(n),
        None => ProcessingMode::Parallel,
    }
}

fn task_context(threads: Option<usize>, pb: &ProgressBar) -> TaskContext {
    TaskContext::new()
        .with_mode(processing_mode(threads))
        .with_progress(Arc::new(BarSink(pb.clone())))
}

/// Context of the grid-to-grid commands, which report no progress
fn grid_context(threads: Option<usize>) -> TaskContext {
    TaskContext::new().with_mode(processing_mode(threads))
}

fn read_grid(path: &Path) -> Result<Grid> {
    let pb = spinner("Reading grid...")?;
    let grid = read_geotiff(path)
        .with_context(|| format!("Failed to read grid {}", path.display()))?;
    pb.finish_and_clear();
    info!("Input: {} x {}", grid.cols(), grid.rows());
    Ok(grid)
}

fn write_grid(grid: &Grid, path: &Path) -> Result<()> {
    let pb = spinner("Writing output...")?;
    write_geotiff(grid, path).context("Failed to write output")?;
    pb.finish_and_clear();
    Ok(())
}

fn write_image(image: &ArgbImage, path: &Path) -> Result<()> {
    let pb = spinner("Writing output...")?;
    write_rgba_tiff(image, path).context("Failed to write output")?;
    pb.finish_and_clear();
    Ok(())
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let Some(path) = path else {
        return Ok(Settings::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings {}", path.display()))?;
    let settings: Settings = serde_json::from_str(&text)
        .with_context(|| format!("Invalid settings in {}", path.display()))?;
    Ok(settings)
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Info { input } => {
            let grid = read_grid(&input)?;
            println!("File: {}", input.display());
            println!(
                "Dimensions: {} x {} ({} vertices)",
                grid.cols(),
                grid.rows(),
                grid.len()
            );
            println!("Cell size: {}", grid.cell_size());
            if grid.georef().is_geographic() {
                println!("  Geographic, about {:.1} m", grid.georef().metric_cell_size());
            }
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                grid.west(),
                grid.south(),
                grid.east(),
                grid.north()
            );
            match grid.min_max() {
                Some((min, max)) => println!("Elevation: {:.4} - {:.4}", min, max),
                None => println!("Elevation: all vertices are void"),
            }
            println!(
                "Void vertices: {} ({:.1}%)",
                grid.void_count(),
                100.0 * grid.void_count() as f64 / grid.len() as f64
            );
        }

        Commands::Render {
            input,
            output,
            settings,
            background,
            foreground,
            ramp,
            azimuth,
            zenith,
            details,
            interval,
            plan_oblique,
            attribute1,
            attribute2,
            scale,
        } => {
            let mut settings = load_settings(settings.as_deref())?;
            if let Some(name) = background {
                settings.background = name.parse::<ColorVisualization>()?;
            }
            if let Some(name) = foreground {
                settings.foreground = name.parse::<ForegroundVisualization>()?;
            }
            if let Some(name) = ramp {
                settings.ramp = ColorRamp::by_name(&name).with_context(|| {
                    let names: Vec<String> = ColorRamp::predefined()
                        .iter()
                        .map(|r| r.name().to_string())
                        .collect();
                    format!("Unknown ramp '{}', expected one of {}", name, names.join(", "))
                })?;
            }
            if let Some(azimuth) = azimuth {
                settings.shading.azimuth = azimuth;
            }
            if let Some(zenith) = zenith {
                settings.shading.zenith = zenith;
            }
            if let Some(details) = details {
                settings.generalization.details = details;
            }
            if let Some(interval) = interval {
                settings.contours.interval = interval;
            }
            if let Some(angle) = plan_oblique {
                settings.plan_oblique_angle = angle;
            }

            let grid = read_grid(&input)?;
            let start = Instant::now();
            let mut model = Model::with_settings(settings).context("Invalid settings")?;
            model.set_processing_mode(processing_mode(cli.threads));
            model.set_grid(grid).context("Failed to prepare grid")?;
            if model.settings().background == ColorVisualization::Bivariate {
                if let Some(warning) = model.bivariate().warning() {
                    if attribute1.is_none() {
                        warn!("{}", warning);
                    }
                }
            }
            if let (Some(a1), Some(a2)) = (attribute1, attribute2) {
                let bivariate = model.bivariate_mut();
                bivariate.set_attribute1_grid(read_grid(&a1)?);
                bivariate.set_attribute2_grid(read_grid(&a2)?);
            }

            let pb = progress_bar("Rendering")?;
            let ctx = task_context(cli.threads, &pb);
            let image = model.render(scale, &ctx).context("Failed to render")?;
            pb.finish_and_clear();
            let elapsed = start.elapsed();
            let image = image.context("Rendering was cancelled")?;
            write_image(&image, &output)?;
            done("Rendering", &output, elapsed);
        }

        Commands::Shade {
            input,
            output,
            azimuth,
            zenith,
            ambient,
            exaggeration,
        } => {
            let params = ShadingParams {
                azimuth,
                zenith,
                ambient,
                vertical_exaggeration: exaggeration,
            };
            let grid = read_grid(&input)?;
            let start = Instant::now();
            let ctx = grid_context(cli.threads);
            let result = shade_grid(&grid, &params, &ctx)
                .context("Failed to shade")?
                .context("Shading was cancelled")?;
            let elapsed = start.elapsed();
            write_grid(&result, &output)?;
            done("Shading", &output, elapsed);
        }

        Commands::Generalize {
            input,
            output,
            max_levels,
            details,
        } => {
            let params = GeneralizationParams {
                max_levels,
                details,
            };
            params.validate()?;
            let grid = read_grid(&input)?;
            let start = Instant::now();
            let ctx = grid_context(cli.threads);
            let pyramid = LaplacianPyramid::from_grid(&grid, &ctx)
                .context("Failed to build pyramid")?
                .context("Pyramid construction was cancelled")?;
            let result = generalize(&grid, &pyramid, &params, &ctx)
                .context("Failed to generalize")?
                .context("Generalization was cancelled")?;
            let elapsed = start.elapsed();
            write_grid(&result, &output)?;
            done("Generalization", &output, elapsed);
        }

        Commands::Local {
            input,
            output,
            high_pass_weight,
            std_dev_levels,
        } => {
            let params = LocalFilterParams {
                high_pass_weight,
                std_dev_levels,
            };
            let grid = read_grid(&input)?;
            let start = Instant::now();
            let ctx = grid_context(cli.threads);
            let pyramid = LaplacianPyramid::from_grid(&grid, &ctx)
                .context("Failed to build pyramid")?
                .context("Pyramid construction was cancelled")?;
            let result = local_filter(&grid, &pyramid, &params, &ctx)
                .context("Failed to filter")?
                .context("Local filter was cancelled")?;
            let elapsed = start.elapsed();
            write_grid(&result, &output)?;
            done("Local filter", &output, elapsed);
        }

        Commands::Normals {
            input,
            output,
            exaggeration,
            invert_x,
            invert_y,
            invert_z,
        } => {
            let params = NormalMapParams {
                invert_x,
                invert_y,
                invert_z,
                vertical_exaggeration: exaggeration,
                ..Default::default()
            };
            let grid = read_grid(&input)?;
            let start = Instant::now();
            let pb = progress_bar("Normals")?;
            let ctx = task_context(cli.threads, &pb);
            let image = normal_map(&grid, &params, &ctx).context("Failed to compute normals")?;
            pb.finish_and_clear();
            let elapsed = start.elapsed();
            let image = image.context("Normal map was cancelled")?;
            write_image(&image, &output)?;
            done("Normal map", &output, elapsed);
        }

        Commands::PlanOblique {
            input,
            output,
            angle,
        } => {
            let grid = read_grid(&input)?;
            let start = Instant::now();
            let ctx = grid_context(cli.threads);
            let result = plan_oblique(&grid, angle, &ctx)
                .context("Failed to shear grid")?
                .context("Plan oblique was cancelled")?;
            let elapsed = start.elapsed();
            write_grid(&result, &output)?;
            done("Plan oblique", &output, elapsed);
        }

        Commands::Settings { output } => {
            let json = serde_json::to_string_pretty(&Settings::default())?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("Settings saved to: {}", path.display());
                }
                None => println!("{}", json),
            }
        }
    }

    Ok(())
}
