//! PNG encoding and export file naming.
//!
//! The renderer never touches the filesystem; callers receive an
//! `ExportedImage` (file name plus encoded bytes) and decide where it goes.

use chrono::{DateTime, Utc};
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbaImage};
use tracing::info;

use crate::capture::{FrameImage, SpriteStrip};

const FRAME_STEM: &str = "vfx-glow";
const STRIP_STEM: &str = "spritesheet";

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to encode PNG: {0}")]
    Encode(#[from] image::ImageError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedImage {
    pub file_name: String,
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, ExportError> {
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes).write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        ExtendedColorType::Rgba8,
    )?;
    Ok(bytes)
}

/// `<name|vfx-glow>-<size>px-<unix-ms>.png`
pub fn frame_file_name(name: Option<&str>, size: u32, at: DateTime<Utc>) -> String {
    format!(
        "{}-{size}px-{}.png",
        file_stem(name, FRAME_STEM),
        at.timestamp_millis()
    )
}

/// `<name|spritesheet>-<W>x<H>.png`, where `H` is the full strip height.
pub fn strip_file_name(name: Option<&str>, width: u32, height: u32) -> String {
    format!("{}-{width}x{height}.png", file_stem(name, STRIP_STEM))
}

pub fn export_frame(
    frame: &FrameImage,
    name: Option<&str>,
    at: DateTime<Utc>,
) -> Result<ExportedImage, ExportError> {
    let (width, height) = frame.image.dimensions();
    let exported = ExportedImage {
        file_name: frame_file_name(name, width, at),
        width,
        height,
        png: encode_png(&frame.image)?,
    };
    info!(file = %exported.file_name, bytes = exported.png.len(), "encoded frame");
    Ok(exported)
}

pub fn export_strip(strip: &SpriteStrip, name: Option<&str>) -> Result<ExportedImage, ExportError> {
    let (width, height) = strip.image.dimensions();
    let exported = ExportedImage {
        file_name: strip_file_name(name, width, height),
        width,
        height,
        png: encode_png(&strip.image)?,
    };
    info!(
        file = %exported.file_name,
        frames = strip.frame_count,
        bytes = exported.png.len(),
        "encoded sprite strip"
    );
    Ok(exported)
}

/// Filesystem-safe stem: runs of anything other than ASCII alphanumerics,
/// `-` and `_` collapse into a single `-`.
fn file_stem(name: Option<&str>, fallback: &str) -> String {
    let mut stem = String::new();
    for ch in name.unwrap_or_default().trim().chars() {
        if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
            stem.push(ch);
        } else if !stem.ends_with('-') {
            stem.push('-');
        }
    }
    let stem = stem.trim_matches('-');
    if stem.is_empty() {
        fallback.to_string()
    } else {
        stem.to_string()
    }
}
