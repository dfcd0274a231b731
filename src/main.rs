use anyhow::{bail, Context};
use blastgrid::{
    init_logging, shared, CanvasGeometry, Config, DrawingSurface, DrillPointFactory,
    DrillPointRenderer, FileStore, GridPatternSpec, GridPitchEstimator, GridRenderingEngine,
    KeyValueStore, MemoryStore, MemorySurface, PatternPersistenceGateway, PatternStateStore,
    SettingsPatch, ViewTransform,
};
use blastgrid_designer::{save_png, GroupAttrs};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

/// Lay out a drilling pattern, render it and round-trip it through storage.
#[derive(Parser, Debug)]
#[command(name = "blastgrid", version, about)]
struct Cli {
    /// Configuration file (.toml or .json); the platform default when omitted
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    #[arg(long, default_value_t = 1)]
    project: u64,

    #[arg(long, default_value_t = 1)]
    site: u64,

    #[arg(long, default_value_t = 5)]
    rows: usize,

    #[arg(long, default_value_t = 8)]
    cols: usize,

    /// Override the configured spacing (m)
    #[arg(long)]
    spacing: Option<f64>,

    /// Override the configured burden (m)
    #[arg(long)]
    burden: Option<f64>,

    /// Override the configured hole depth (m)
    #[arg(long)]
    depth: Option<f64>,

    /// Give the first hole this depth instead of the global one
    #[arg(long, value_name = "METERS")]
    first_hole_depth: Option<f64>,

    /// Draw intersection markers
    #[arg(long)]
    precise: bool,

    /// Zoom factor of the preview
    #[arg(long, default_value_t = 1.0)]
    zoom: f64,

    /// Keep patterns in memory instead of the configured storage directory
    #[arg(long)]
    in_memory: bool,

    /// Directory receiving the exported JSON and the PNG preview
    #[arg(long, default_value = "blastgrid-out")]
    out_dir: PathBuf,

    /// Preview size in pixels, WIDTHxHEIGHT
    #[arg(long, default_value = "1200x800", value_parser = parse_size)]
    size: (u32, u32),
}

fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let (w, h) = value
        .split_once('x')
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", value))?;
    let w = w.parse::<u32>().map_err(|e| e.to_string())?;
    let h = h.parse::<u32>().map_err(|e| e.to_string())?;
    if w == 0 || h == 0 {
        return Err("width and height must be positive".to_string());
    }
    Ok((w, h))
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    let path = match path {
        Some(path) => return Config::load_from_file(path).context("Failed to load config"),
        None => Config::default_path()?,
    };
    Config::load_or_default(&path).context("Failed to load config")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging()?;
    let cli = Cli::parse();
    tracing::info!("BlastGrid {} (built {})", blastgrid::VERSION, blastgrid::BUILD_DATE);

    let config = load_config(cli.config.as_ref())?;

    // Pattern state
    let store = PatternStateStore::from_config(&config, cli.project, cli.site);
    store.update_settings(SettingsPatch {
        spacing: cli.spacing,
        burden: cli.burden,
        depth: cli.depth,
        ..Default::default()
    });
    if cli.precise {
        store.toggle_precise_mode();
    }

    let settings = store.snapshot().settings;
    let factory = DrillPointFactory::new();
    let points =
        factory.generate_grid_pattern(&GridPatternSpec::from_settings(cli.rows, cli.cols, &settings));
    if points.len() > store.max_points() {
        bail!(
            "{}x{} lattice has {} holes, the limit is {}",
            cli.rows,
            cli.cols,
            points.len(),
            store.max_points()
        );
    }
    for point in points {
        store.add_drill_point(point);
    }
    if let (Some(depth), Some(first)) = (cli.first_hole_depth, store.snapshot().drill_points.first())
    {
        store.select_point(Some(&first.id));
        store.update_selected_hole_depth(depth);
        store.select_point(None);
    }

    let state = store.snapshot();
    let pitch = GridPitchEstimator::new().estimate(&state.drill_points);
    tracing::info!(
        "Estimated pitch {} x {} from {} holes",
        pitch.spacing,
        pitch.burden,
        state.point_count()
    );

    let status = store.validation_status();
    for warning in &status.warnings {
        tracing::warn!("{}", warning.message);
    }
    if !status.is_valid {
        bail!("Pattern is invalid: {}", status.error_messages().join("; "));
    }

    // Scene
    let (width, height) = cli.size;
    let surface = shared(MemorySurface::new(width as f64, height as f64));
    let view = ViewTransform::new(config.canvas.clamp_zoom(cli.zoom), 0.0, 0.0);

    let mut grid = GridRenderingEngine::from_config(&config);
    grid.initialize(surface.clone())?;
    grid.set_grid_pitch(pitch.spacing, pitch.burden)?;
    grid.show_precise_mode(state.ui.is_precise_mode)?;
    grid.set_view(view);
    let outcome = grid.render()?;
    tracing::info!("Grid drawn with {} primitives", outcome.primitives);

    let mut points_renderer = DrillPointRenderer::new(CanvasGeometry::from(&config.canvas));
    {
        let mut surface = surface.lock();
        let root = surface.root();
        let layer = surface.create_group(root, GroupAttrs::named("drill-points"))?;
        points_renderer.render_points(&mut *surface, layer, &state, &view)?;
    }

    // Storage
    let backend: Arc<dyn KeyValueStore> = if cli.in_memory {
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(FileStore::new(config.storage.directory.clone()))
    };
    let gateway = PatternPersistenceGateway::new(backend);
    let metadata = gateway.save_store(&store).await?;
    let reloaded = gateway.load(metadata.project_id, metadata.site_id).await?;
    if reloaded.point_count() != state.point_count() {
        bail!(
            "Reloaded pattern has {} holes, expected {}",
            reloaded.point_count(),
            state.point_count()
        );
    }

    // Outputs
    std::fs::create_dir_all(&cli.out_dir)
        .with_context(|| format!("Failed to create {}", cli.out_dir.display()))?;
    let export = gateway.export_pattern(&reloaded)?;
    let export_path = cli
        .out_dir
        .join(format!("pattern-{}-{}.json", cli.project, cli.site));
    std::fs::write(&export_path, serde_json::to_string_pretty(&export)?)
        .with_context(|| format!("Failed to write {}", export_path.display()))?;

    let preview_path = cli.out_dir.join("preview.png");
    save_png(&surface.lock(), &preview_path)?;
    grid.destroy();

    println!(
        "{} holes, pitch {} x {} m, exported to {} and {}",
        export.drill_points.len(),
        pitch.spacing,
        pitch.burden,
        export_path.display(),
        preview_path.display()
    );
    Ok(())
}
