use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use glowshader::{generate, ParameterSet};
use presets::{GlowConfig, PresetLibrary};
use renderer::export::{encode_png, ExportedImage};
use renderer::{
    capture, capture_one, export_frame, export_strip, PreviewSession, SoftwareSurface,
    SurfaceConfig,
};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{GlowArgs, OutputArgs, PreviewArgs, RenderArgs, StripArgs};
use crate::paths::AppPaths;

const PREVIEW_FILE: &str = "preview.png";

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Resolved directories plus the user's `config.toml`.
pub struct AppContext {
    pub paths: AppPaths,
    pub config: GlowConfig,
}

impl AppContext {
    pub fn load() -> Result<Self> {
        let paths = AppPaths::discover()?;
        let config_file = paths.config_file();
        let config = GlowConfig::load_or_default(&config_file)
            .with_context(|| format!("failed to load config at {}", config_file.display()))?;
        debug!(
            config = %paths.config_dir().display(),
            data = %paths.data_dir().display(),
            output = %paths.output_dir().display(),
            "resolved spritegen paths"
        );
        Ok(Self { paths, config })
    }

    pub fn library(&self) -> Result<PresetLibrary> {
        let path = self.paths.library_file();
        PresetLibrary::load_or_default(&path)
            .with_context(|| format!("failed to load preset library at {}", path.display()))
    }

    fn output_dir(&self, output: &OutputArgs) -> PathBuf {
        output
            .out_dir
            .clone()
            .or_else(|| self.config.output.directory.clone())
            .unwrap_or_else(|| self.paths.output_dir().to_path_buf())
    }

    fn output_name<'a>(&'a self, output: &'a OutputArgs) -> Option<&'a str> {
        output.name.as_deref().or(self.config.output.name.as_deref())
    }
}

/// Builds the parameter set described by `args`: preset (or defaults), then
/// the shape's tuned defaults when `--shape` is given, then explicit flags.
pub fn resolve_glow(args: &GlowArgs, ctx: &AppContext) -> Result<ParameterSet> {
    let mut params = match &args.preset {
        Some(key) => ctx.library()?.find(key)?.settings.clone(),
        None => ParameterSet::default(),
    };
    apply_glow_args(&mut params, args);

    let issues = params.issues();
    if !issues.is_empty() {
        for issue in &issues {
            warn!("{issue}");
        }
        params.validate().context("invalid glow parameters")?;
    }
    Ok(params)
}

pub fn apply_glow_args(params: &mut ParameterSet, args: &GlowArgs) {
    if let Some(shape) = args.shape {
        params.select_shape(shape);
    }

    macro_rules! set_if_given {
        ($($field:ident),* $(,)?) => {
            $(
                if let Some(value) = args.$field {
                    params.$field = value;
                }
            )*
        };
    }
    set_if_given!(
        color,
        intensity,
        gain,
        contrast,
        falloff,
        ring_radius,
        ring_width,
        ring_opacity,
        points,
        pos_x,
        pos_y,
        scale,
        size_x,
        size_y,
        twist,
        dist_str,
        freq,
        seed,
        speed,
        time,
        pixel_count,
    );

    if args.no_grid {
        params.show_grid = false;
    }
}

pub fn render(args: RenderArgs, ctx: &AppContext) -> Result<()> {
    let params = resolve_glow(&args.glow, ctx)?;
    let size = params.export_size();

    let mut surface = SoftwareSurface::new(SurfaceConfig::export(size))?;
    let frame = capture_one(&mut surface, &params, size).context("failed to render frame")?;
    let exported = export_frame(&frame, ctx.output_name(&args.output), Utc::now())?;

    let path = write_export(&ctx.output_dir(&args.output), &exported)?;
    println!("{}", path.display());
    Ok(())
}

pub fn strip(args: StripArgs, ctx: &AppContext) -> Result<()> {
    let params = resolve_glow(&args.glow, ctx)?;
    let defaults = &ctx.config.animation;
    let mode = args.mode.unwrap_or(defaults.mode);
    let amount = args.amount.unwrap_or(defaults.amount);
    let frame_count = args.frames.unwrap_or(defaults.frames);

    let frames = generate(&params, mode, amount, frame_count)
        .context("failed to build animation sequence")?;
    let size = params.export_size();
    info!(%mode, amount, frames = frame_count, size, "capturing sprite strip");

    let mut surface = SoftwareSurface::new(SurfaceConfig::export(size))?;
    let strip = capture(&mut surface, &frames).context("failed to capture sprite strip")?;
    let exported = export_strip(&strip, ctx.output_name(&args.output))?;

    let path = write_export(&ctx.output_dir(&args.output), &exported)?;
    println!("{}", path.display());
    Ok(())
}

pub fn preview(args: PreviewArgs, ctx: &AppContext) -> Result<()> {
    let params = resolve_glow(&args.glow, ctx)?;

    let defaults = &ctx.config.preview;
    let canvas = args.canvas.unwrap_or(defaults.canvas);
    let pixel_ratio = args.pixel_ratio.unwrap_or(defaults.pixel_ratio);
    let elapsed = match args.elapsed {
        Some(seconds) => Duration::try_from_secs_f32(seconds)
            .with_context(|| format!("invalid --elapsed value {seconds}"))?,
        None => defaults.elapsed,
    };
    if canvas == 0 {
        bail!("--canvas must be greater than zero");
    }

    let config = SurfaceConfig::canvas(canvas, canvas, pixel_ratio);
    let surface = SoftwareSurface::new(config)?;
    let mut session = PreviewSession::new(surface, params, config)?;
    if args.paused && !session.params().paused {
        session.toggle_pause();
    }
    session.advance(elapsed);
    let image = session.render().context("failed to render preview")?;
    info!(
        canvas,
        pixel_ratio,
        time = session.params().time,
        "rendered preview"
    );

    let path = match args.out {
        Some(path) => path,
        None => ctx.output_dir(&OutputArgs::default()).join(PREVIEW_FILE),
    };
    write_file(&path, &encode_png(&image)?)?;
    println!("{}", path.display());
    Ok(())
}

fn write_export(dir: &Path, exported: &ExportedImage) -> Result<PathBuf> {
    let path = dir.join(&exported.file_name);
    write_file(&path, &exported.png)?;
    info!(
        path = %path.display(),
        width = exported.width,
        height = exported.height,
        "wrote export"
    );
    Ok(path)
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create output directory {}", dir.display()))?;
    }
    fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))
}
