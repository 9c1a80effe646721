use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use glowshader::params::{CONTINUOUS_PIXEL_COUNT, PIXEL_COUNTS};
use glowshader::{AnimationMode, Rgb, ShapeMode};

#[derive(Parser, Debug)]
#[command(
    name = "spritegen",
    author,
    version,
    about = "Procedural glow sprite generator",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render a single frame to PNG at the glow's pixel count.
    Render(RenderArgs),
    /// Animate the glow and export the frames as one vertical sprite strip.
    Strip(StripArgs),
    /// Render the live preview canvas (grid overlay included) to PNG.
    Preview(PreviewArgs),
    /// Manage saved glow presets.
    Preset(PresetCommand),
    /// Print resolved config, data, and output directories.
    Where,
}

/// Parameters describing one glow. Values given here override the preset.
#[derive(Args, Debug, Clone, Default)]
pub struct GlowArgs {
    /// Start from a saved preset (id or name).
    #[arg(long, value_name = "ID|NAME")]
    pub preset: Option<String>,

    /// Shape to draw; applies that shape's tuned defaults before other flags.
    #[arg(long, value_name = "SHAPE", value_parser = parse_shape)]
    pub shape: Option<ShapeMode>,

    /// Glow color as `#rrggbb` or `#rgb`.
    #[arg(long, value_name = "HEX", value_parser = parse_color)]
    pub color: Option<Rgb>,

    #[arg(long)]
    pub intensity: Option<f32>,
    #[arg(long)]
    pub gain: Option<f32>,
    #[arg(long)]
    pub contrast: Option<f32>,
    #[arg(long)]
    pub falloff: Option<f32>,

    #[arg(long)]
    pub ring_radius: Option<f32>,
    #[arg(long)]
    pub ring_width: Option<f32>,
    #[arg(long)]
    pub ring_opacity: Option<f32>,
    /// Star points or polygon sides (3-20).
    #[arg(long)]
    pub points: Option<u32>,

    #[arg(long, allow_hyphen_values = true)]
    pub pos_x: Option<f32>,
    #[arg(long, allow_hyphen_values = true)]
    pub pos_y: Option<f32>,
    #[arg(long)]
    pub scale: Option<f32>,
    #[arg(long)]
    pub size_x: Option<f32>,
    #[arg(long)]
    pub size_y: Option<f32>,
    /// Rotation in radians.
    #[arg(long, allow_hyphen_values = true)]
    pub twist: Option<f32>,

    /// Noise distortion strength.
    #[arg(long)]
    pub dist_str: Option<f32>,
    #[arg(long)]
    pub freq: Option<f32>,
    #[arg(long, allow_hyphen_values = true)]
    pub seed: Option<f32>,
    #[arg(long)]
    pub speed: Option<f32>,
    /// Animation time in seconds.
    #[arg(long)]
    pub time: Option<f32>,

    /// Output resolution: 32, 64, 128, 256, 512, 1024, or `continuous`.
    #[arg(long, value_name = "PIXELS", value_parser = parse_pixel_count)]
    pub pixel_count: Option<u32>,

    /// Hide the preview grid overlay.
    #[arg(long)]
    pub no_grid: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct OutputArgs {
    /// Directory for exported PNGs (defaults to the configured output directory).
    #[arg(long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Base name for the exported file.
    #[arg(long, value_name = "NAME")]
    pub name: Option<String>,
}

#[derive(Args, Debug)]
pub struct RenderArgs {
    #[command(flatten)]
    pub glow: GlowArgs,
    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args, Debug)]
pub struct StripArgs {
    #[command(flatten)]
    pub glow: GlowArgs,
    #[command(flatten)]
    pub output: OutputArgs,

    /// Field swept across frames: `seed` or `twist`.
    #[arg(long, value_name = "MODE", value_parser = parse_mode)]
    pub mode: Option<AnimationMode>,

    /// Seed step per frame, or full turns across the strip for `twist`.
    #[arg(long)]
    pub amount: Option<f32>,

    /// Number of frames (4-128).
    #[arg(long)]
    pub frames: Option<usize>,
}

#[derive(Args, Debug)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub glow: GlowArgs,

    /// Canvas edge in logical pixels.
    #[arg(long, value_name = "PIXELS")]
    pub canvas: Option<u32>,

    /// Device pixel ratio applied to the canvas.
    #[arg(long, value_name = "RATIO")]
    pub pixel_ratio: Option<f32>,

    /// Seconds to advance the glow clock before rendering.
    #[arg(long, value_name = "SECONDS")]
    pub elapsed: Option<f32>,

    /// Hold the clock still.
    #[arg(long)]
    pub paused: bool,

    /// Destination PNG (defaults to `preview.png` in the output directory).
    #[arg(long, value_name = "PATH")]
    pub out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct PresetCommand {
    #[command(subcommand)]
    pub action: PresetAction,
}

#[derive(Subcommand, Debug)]
pub enum PresetAction {
    /// Save a glow to the library.
    Save {
        #[command(flatten)]
        glow: GlowArgs,
        /// Preset name (defaults to `Glow N`).
        #[arg(long)]
        name: Option<String>,
    },
    /// List saved presets, newest first.
    List,
    /// Print a preset's settings as JSON.
    Show {
        #[arg(value_name = "ID|NAME")]
        key: String,
    },
    /// Remove a preset from the library.
    Delete {
        #[arg(value_name = "ID|NAME")]
        key: String,
    },
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_shape(value: &str) -> Result<ShapeMode, String> {
    ShapeMode::parse(value).map_err(|err| err.to_string())
}

pub fn parse_color(value: &str) -> Result<Rgb, String> {
    Rgb::from_hex(value).map_err(|err| err.to_string())
}

pub fn parse_mode(value: &str) -> Result<AnimationMode, String> {
    AnimationMode::parse(value).map_err(|err| err.to_string())
}

pub fn parse_pixel_count(value: &str) -> Result<u32, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("pixel count must not be empty".to_string());
    }

    let normalized = trimmed.to_ascii_lowercase();
    if matches!(normalized.as_str(), "continuous" | "smooth" | "off") {
        return Ok(CONTINUOUS_PIXEL_COUNT);
    }

    let count: u32 = normalized
        .parse()
        .map_err(|_| format!("invalid pixel count '{trimmed}'"))?;
    if count >= CONTINUOUS_PIXEL_COUNT || PIXEL_COUNTS.contains(&count) {
        return Ok(count);
    }
    let allowed = PIXEL_COUNTS.map(|c| c.to_string()).join(", ");
    Err(format!(
        "unsupported pixel count {count}; expected one of {allowed}, or continuous"
    ))
}
