//! Parameter model for a single glow.
//!
//! `ParameterSet` is the full visual state fed to the evaluator: transform,
//! shape selection, shape geometry, tone controls, noise/motion and the output
//! grid. Sets are plain values; cloning one yields a fully independent copy,
//! which is what the sequencer relies on when deriving animation frames.
//!
//! The serialized form is camelCase with the color stored as `#rrggbb` so the
//! preset library stays readable and tolerant of sparse documents (every field
//! falls back to its default when missing).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Pixel counts offered by the editor and the CLI.
pub const PIXEL_COUNTS: [u32; 6] = [32, 64, 128, 256, 512, 1024];

/// Pixel counts at or above this value disable quantization.
pub const CONTINUOUS_PIXEL_COUNT: u32 = 4096;

/// The grid overlay is only drawn below this pixel count.
pub const GRID_PIXEL_LIMIT: u32 = 600;

/// Export size used when quantization is disabled.
pub const CONTINUOUS_EXPORT_SIZE: u32 = 1024;

pub const MIN_POINTS: u32 = 3;
pub const MAX_POINTS: u32 = 20;

#[derive(Debug, thiserror::Error)]
pub enum ParamError {
    #[error("invalid color '{0}'; expected #rrggbb or #rgb")]
    Color(String),
    #[error("unknown shape '{0}'; expected center, ring, nebula, star, or polygon")]
    Shape(String),
    #[error("invalid parameter set: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

/// Closed set of shapes the evaluator knows how to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeMode {
    Center,
    Ring,
    Nebula,
    Star,
    Polygon,
}

impl ShapeMode {
    pub const ALL: [ShapeMode; 5] = [
        ShapeMode::Center,
        ShapeMode::Ring,
        ShapeMode::Nebula,
        ShapeMode::Star,
        ShapeMode::Polygon,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ShapeMode::Center => "center",
            ShapeMode::Ring => "ring",
            ShapeMode::Nebula => "nebula",
            ShapeMode::Star => "star",
            ShapeMode::Polygon => "polygon",
        }
    }

    /// Parses a shape name or its legacy numeric index (`0..=4`).
    pub fn parse(value: &str) -> Result<Self, ParamError> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "center" | "0" => Ok(ShapeMode::Center),
            "ring" | "1" => Ok(ShapeMode::Ring),
            "nebula" | "2" => Ok(ShapeMode::Nebula),
            "star" | "3" => Ok(ShapeMode::Star),
            "polygon" | "poly" | "4" => Ok(ShapeMode::Polygon),
            _ => Err(ParamError::Shape(value.to_string())),
        }
    }

    /// Whether `points` carries meaning for this shape.
    pub fn uses_points(self) -> bool {
        matches!(self, ShapeMode::Star | ShapeMode::Polygon)
    }

    /// Tuned starting values applied when the user switches to this shape.
    pub fn defaults(self) -> ShapeDefaults {
        match self {
            ShapeMode::Center => ShapeDefaults {
                intensity: 0.5,
                gain: 2.0,
                contrast: 1.0,
                ring_radius: 0.0,
                ring_width: 0.0,
                ring_opacity: 0.0,
                dist_str: 0.0,
                freq: None,
                points: None,
            },
            ShapeMode::Ring => ShapeDefaults {
                intensity: 0.2,
                gain: 2.5,
                contrast: 1.2,
                ring_radius: 0.4,
                ring_width: 0.05,
                ring_opacity: 1.0,
                dist_str: 0.0,
                freq: None,
                points: None,
            },
            ShapeMode::Nebula => ShapeDefaults {
                intensity: 0.8,
                gain: 1.5,
                contrast: 0.9,
                ring_radius: 0.0,
                ring_width: 0.0,
                ring_opacity: 0.0,
                dist_str: 1.0,
                freq: Some(4.0),
                points: None,
            },
            ShapeMode::Star => ShapeDefaults {
                intensity: 0.6,
                gain: 3.0,
                contrast: 1.5,
                ring_radius: 0.1,
                ring_width: 0.0,
                ring_opacity: 0.0,
                dist_str: 0.0,
                freq: None,
                points: Some(5),
            },
            ShapeMode::Polygon => ShapeDefaults {
                intensity: 0.3,
                gain: 2.0,
                contrast: 1.0,
                ring_radius: 0.4,
                ring_width: 0.02,
                ring_opacity: 1.0,
                dist_str: 0.0,
                freq: None,
                points: Some(4),
            },
        }
    }
}

impl fmt::Display for ShapeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-shape starting values. `None` leaves the current field untouched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeDefaults {
    pub intensity: f32,
    pub gain: f32,
    pub contrast: f32,
    pub ring_radius: f32,
    pub ring_width: f32,
    pub ring_opacity: f32,
    pub dist_str: f32,
    pub freq: Option<f32>,
    pub points: Option<u32>,
}

/// RGB color with 8 bits per channel, serialized as a `#rrggbb` string.
///
/// Channels are quantized on construction, so a color survives a trip through
/// its hex form unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb([u8; 3]);

impl Rgb {
    pub const WHITE: Rgb = Rgb([255; 3]);

    /// Builds a color from `[0,1]` channels, rounding each to the nearest of
    /// 256 levels. Out-of-range and NaN inputs clamp.
    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self([r, g, b].map(quantize))
    }

    pub const fn from_bytes(bytes: [u8; 3]) -> Self {
        Self(bytes)
    }

    pub fn from_hex(value: &str) -> Result<Self, ParamError> {
        let trimmed = value.trim();
        let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);
        let expanded: String = match digits.len() {
            3 => digits.chars().flat_map(|c| [c, c]).collect(),
            6 => digits.to_string(),
            _ => return Err(ParamError::Color(value.to_string())),
        };
        let channel = |range: std::ops::Range<usize>| {
            expanded
                .get(range)
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                .ok_or_else(|| ParamError::Color(value.to_string()))
        };
        Ok(Self([channel(0..2)?, channel(2..4)?, channel(4..6)?]))
    }

    pub fn to_hex(self) -> String {
        let [r, g, b] = self.0;
        format!("#{r:02x}{g:02x}{b:02x}")
    }

    pub fn to_bytes(self) -> [u8; 3] {
        self.0
    }

    pub fn to_array(self) -> [f32; 3] {
        self.0.map(|byte| f32::from(byte) / 255.0)
    }
}

fn quantize(channel: f32) -> u8 {
    if channel.is_nan() {
        return 0;
    }
    (channel.clamp(0.0, 1.0) * 255.0).round() as u8
}

impl Default for Rgb {
    fn default() -> Self {
        Self::WHITE
    }
}

impl TryFrom<String> for Rgb {
    type Error = ParamError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Rgb::from_hex(&value)
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_hex()
    }
}

/// Complete visual state of one glow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParameterSet {
    // transform
    pub pos_x: f32,
    pub pos_y: f32,
    pub scale: f32,
    pub size_x: f32,
    pub size_y: f32,
    pub twist: f32,

    pub shape_mode: ShapeMode,

    // geometry
    pub ring_radius: f32,
    pub ring_width: f32,
    pub ring_opacity: f32,
    pub points: u32,

    // shading
    pub color: Rgb,
    pub intensity: f32,
    pub gain: f32,
    pub contrast: f32,
    pub falloff: f32,

    // noise / motion
    pub dist_str: f32,
    pub freq: f32,
    pub seed: f32,
    pub speed: f32,
    pub time: f32,
    #[serde(rename = "isPaused")]
    pub paused: bool,

    // output
    pub pixel_count: u32,
    pub show_grid: bool,
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self {
            pos_x: 0.0,
            pos_y: 0.0,
            scale: 1.0,
            size_x: 1.0,
            size_y: 1.0,
            twist: 0.0,
            shape_mode: ShapeMode::Polygon,
            ring_radius: 0.4,
            ring_width: 0.05,
            ring_opacity: 0.5,
            points: 4,
            color: Rgb::WHITE,
            intensity: 0.5,
            gain: 2.0,
            contrast: 1.0,
            falloff: 1.0,
            dist_str: 0.0,
            freq: 3.0,
            seed: 0.0,
            speed: 1.0,
            time: 0.0,
            paused: false,
            pixel_count: 64,
            show_grid: true,
        }
    }
}

impl ParameterSet {
    /// Switches shape and applies that shape's tuned defaults.
    pub fn select_shape(&mut self, mode: ShapeMode) {
        let defaults = mode.defaults();
        self.shape_mode = mode;
        self.intensity = defaults.intensity;
        self.gain = defaults.gain;
        self.contrast = defaults.contrast;
        self.ring_radius = defaults.ring_radius;
        self.ring_width = defaults.ring_width;
        self.ring_opacity = defaults.ring_opacity;
        self.dist_str = defaults.dist_str;
        if let Some(freq) = defaults.freq {
            self.freq = freq;
        }
        if let Some(points) = defaults.points {
            self.points = points;
        }
    }

    /// True when sampled coordinates snap to the `pixel_count` lattice.
    pub fn quantizes(&self) -> bool {
        self.pixel_count > 0 && self.pixel_count < CONTINUOUS_PIXEL_COUNT
    }

    /// Edge length, in pixels, of an exported frame.
    pub fn export_size(&self) -> u32 {
        if self.quantizes() {
            self.pixel_count
        } else {
            CONTINUOUS_EXPORT_SIZE
        }
    }

    /// Human-readable problems with this set; empty when valid.
    pub fn issues(&self) -> Vec<String> {
        let mut issues = Vec::new();

        let finite = [
            ("posX", self.pos_x),
            ("posY", self.pos_y),
            ("scale", self.scale),
            ("sizeX", self.size_x),
            ("sizeY", self.size_y),
            ("twist", self.twist),
            ("ringRadius", self.ring_radius),
            ("ringWidth", self.ring_width),
            ("ringOpacity", self.ring_opacity),
            ("intensity", self.intensity),
            ("gain", self.gain),
            ("contrast", self.contrast),
            ("falloff", self.falloff),
            ("distStr", self.dist_str),
            ("freq", self.freq),
            ("seed", self.seed),
            ("speed", self.speed),
            ("time", self.time),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                issues.push(format!("{name} must be a finite number"));
            }
        }

        for (name, value) in [
            ("scale", self.scale),
            ("sizeX", self.size_x),
            ("sizeY", self.size_y),
            ("contrast", self.contrast),
        ] {
            if value <= 0.0 {
                issues.push(format!("{name} must be greater than zero (got {value})"));
            }
        }

        for (name, value) in [
            ("ringRadius", self.ring_radius),
            ("ringWidth", self.ring_width),
            ("ringOpacity", self.ring_opacity),
        ] {
            if !(0.0..=1.0).contains(&value) {
                issues.push(format!("{name} must lie in [0, 1] (got {value})"));
            }
        }

        for (name, value) in [
            ("intensity", self.intensity),
            ("gain", self.gain),
            ("falloff", self.falloff),
            ("distStr", self.dist_str),
            ("freq", self.freq),
            ("speed", self.speed),
            ("time", self.time),
        ] {
            if value < 0.0 {
                issues.push(format!("{name} must not be negative (got {value})"));
            }
        }

        if self.shape_mode.uses_points() && !(MIN_POINTS..=MAX_POINTS).contains(&self.points) {
            issues.push(format!(
                "points must lie in {MIN_POINTS}..={MAX_POINTS} for {} (got {})",
                self.shape_mode, self.points
            ));
        }

        if self.pixel_count == 0 {
            issues.push("pixelCount must be a positive integer".to_string());
        }

        issues
    }

    pub fn validate(&self) -> Result<(), ParamError> {
        let issues = self.issues();
        if issues.is_empty() {
            Ok(())
        } else {
            Err(ParamError::Invalid(issues))
        }
    }
}
