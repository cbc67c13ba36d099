use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rust_webgpu_galaxy::app::GalaxyApp;
use rust_webgpu_galaxy::camera::MAX_PIXEL_RATIO;
use rust_webgpu_galaxy::controller::ControllerSettings;
use rust_webgpu_galaxy::galaxy::{generate_with_rng, GalaxyParams, GalaxyStats, Rgb};
use rust_webgpu_galaxy::quality::QualityTier;

/// Procedural spiral galaxy rendered as an additive point cloud
#[derive(Parser, Debug)]
#[command(name = "galaxy", version, about)]
struct Cli {
    /// JSON file with the starting parameter set
    #[arg(long)]
    params: Option<PathBuf>,

    #[arg(long)]
    count: Option<u32>,

    #[arg(long)]
    size: Option<f32>,

    #[arg(long)]
    radius: Option<f32>,

    #[arg(long)]
    branches: Option<u32>,

    #[arg(long, allow_hyphen_values = true)]
    spin: Option<f32>,

    #[arg(long)]
    randomness: Option<f32>,

    #[arg(long)]
    randomness_power: Option<f32>,

    /// Core color as #rrggbb
    #[arg(long)]
    inside_color: Option<String>,

    /// Rim color as #rrggbb
    #[arg(long)]
    outside_color: Option<String>,

    /// Pull out-of-range values into the panel bounds instead of rejecting them
    #[arg(long, default_value_t = false)]
    clamp: bool,

    #[arg(long, value_enum, default_value_t = QualityTier::DesktopHigh)]
    quality: QualityTier,

    /// Seed the particle RNG for reproducible galaxies
    #[arg(long)]
    seed: Option<u64>,

    /// Generate once, print statistics and exit without opening a window
    #[arg(long, default_value_t = false)]
    headless: bool,

    /// Print the effective parameter set as JSON and exit
    #[arg(long, default_value_t = false)]
    print_params: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,wgpu_core=warn,wgpu_hal=warn")),
        )
        .init();

    let cli = Cli::parse();
    let params = resolve_params(&cli)?;

    if cli.print_params {
        println!("{}", serde_json::to_string_pretty(&params)?);
        return Ok(());
    }
    if cli.headless {
        return run_headless(&params, cli.seed);
    }

    let budget = cli.quality.budget();
    let settings = ControllerSettings {
        seed: cli.seed,
        max_pixel_ratio: budget.max_pixel_ratio.min(MAX_PIXEL_RATIO),
        ..ControllerSettings::default()
    };
    info!(quality = ?cli.quality, count = params.count, "starting galaxy viewer");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Galaxy")
            .with_inner_size([1280.0, 720.0]),
        renderer: eframe::Renderer::Wgpu,
        ..Default::default()
    };
    eframe::run_native(
        "galaxy",
        options,
        Box::new(move |cc: &eframe::CreationContext<'_>| create_app(cc, params, settings)),
    )
    .map_err(|err| anyhow::anyhow!("viewer exited with an error: {err}"))
}

fn create_app(
    cc: &eframe::CreationContext<'_>,
    params: GalaxyParams,
    settings: ControllerSettings,
) -> Result<Box<dyn eframe::App>, Box<dyn std::error::Error + Send + Sync>> {
    Ok(Box::new(GalaxyApp::new(cc, params, settings)?))
}

fn resolve_params(cli: &Cli) -> Result<GalaxyParams> {
    let mut params = match &cli.params {
        Some(path) => GalaxyParams::from_json_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => GalaxyParams {
            count: cli.quality.budget().default_particles,
            ..GalaxyParams::default()
        },
    };

    if let Some(count) = cli.count {
        params.count = count;
    }
    if let Some(size) = cli.size {
        params.size = size;
    }
    if let Some(radius) = cli.radius {
        params.radius = radius;
    }
    if let Some(branches) = cli.branches {
        params.branches = branches;
    }
    if let Some(spin) = cli.spin {
        params.spin = spin;
    }
    if let Some(randomness) = cli.randomness {
        params.randomness = randomness;
    }
    if let Some(power) = cli.randomness_power {
        params.randomness_power = power;
    }
    if let Some(hex) = &cli.inside_color {
        params.inside_color = Rgb::from_hex(hex)?;
    }
    if let Some(hex) = &cli.outside_color {
        params.outside_color = Rgb::from_hex(hex)?;
    }

    if cli.clamp {
        params = params.clamped();
    }
    params.validate_bounds()?;
    Ok(params)
}

fn run_headless(params: &GalaxyParams, seed: Option<u64>) -> Result<()> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    println!(
        "Galaxy headless run: count={} branches={} radius={:.2} spin={:.3} randomness={:.3}^{:.2}",
        params.count,
        params.branches,
        params.radius,
        params.spin,
        params.randomness,
        params.randomness_power
    );

    let started = Instant::now();
    let buffer = generate_with_rng(params, &mut rng)?;
    let elapsed = started.elapsed();
    let stats = GalaxyStats::from_buffer(&buffer, params);

    println!(
        "generated {} particles in {:.2}ms",
        stats.particle_count,
        elapsed.as_secs_f64() * 1000.0
    );
    for (branch, count) in stats.per_branch.iter().enumerate() {
        println!("  branch {branch}: {count}");
    }
    println!(
        "horizontal extent: max={:.3} mean={:.3}",
        stats.max_horizontal_extent, stats.mean_horizontal_extent
    );
    println!(
        "vertical spread: [{:.4}, {:.4}]",
        stats.vertical_range.0, stats.vertical_range.1
    );

    Ok(())
}
