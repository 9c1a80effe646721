//! Off-screen capture of glow frames.
//!
//! ```text
//!   acquire lease (save config)
//!        │
//!        ├─▶ for each frame: upload ─▶ tick (verify generation) ─▶ export config
//!        │                   ─▶ render(Export) ─▶ read_pixels ─▶ strip rows i·S..(i+1)·S
//!        ▼
//!   release lease (restore config)   ◀── also runs from Drop on error/unwind
//! ```
//!
//! The lease holds the only `&mut` to the surface for the whole capture, so a
//! preview cannot draw in between frames.

use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use glowshader::{ParameterSet, RenderPass};
use image::imageops;
use image::RgbaImage;
use tracing::{debug, info, warn};

use crate::surface::{RenderSurface, SurfaceConfig, SurfaceError, MAX_DIMENSION};
use crate::uniforms::GlowUniforms;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CaptureError {
    #[error("rendering surface is not ready")]
    NotReady,
    #[error("cannot capture an empty sequence")]
    EmptySequence,
    #[error("frame size {0} is outside 1..={MAX_DIMENSION}")]
    InvalidSize(u32),
    #[error("frame {index} exports at {size}px but the sequence starts at {expected}px")]
    MixedFrameSizes {
        index: usize,
        size: u32,
        expected: u32,
    },
    #[error("strip of {frames} frames at {size}px exceeds the maximum image height")]
    StripTooTall { frames: usize, size: u32 },
    #[error("capture cancelled after {completed} frame(s)")]
    Cancelled { completed: usize },
    #[error("upload {expected} was not committed by the host tick (surface reports {committed})")]
    StaleUpload { expected: u64, committed: u64 },
    #[error("frame {index} read back as {width}x{height}, expected {size}x{size}")]
    FrameSize {
        index: usize,
        width: u32,
        height: u32,
        size: u32,
    },
    #[error(transparent)]
    Surface(#[from] SurfaceError),
}

/// Cooperative cancellation flag checked between frames.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Exclusive use of a surface. The configuration present at acquisition is
/// written back when the lease is released or dropped.
pub struct SurfaceLease<'a, S: RenderSurface + ?Sized> {
    surface: &'a mut S,
    saved: SurfaceConfig,
    restored: bool,
}

impl<'a, S: RenderSurface + ?Sized> SurfaceLease<'a, S> {
    pub fn acquire(surface: &'a mut S) -> Result<Self, CaptureError> {
        if !surface.is_ready() {
            return Err(CaptureError::NotReady);
        }
        let saved = surface.config();
        Ok(Self {
            surface,
            saved,
            restored: false,
        })
    }

    pub fn surface(&mut self) -> &mut S {
        &mut *self.surface
    }

    /// Restores the saved configuration, reporting failure to the caller.
    pub fn release(mut self) -> Result<(), SurfaceError> {
        self.restored = true;
        self.surface.apply_config(&self.saved)
    }
}

impl<S: RenderSurface + ?Sized> Drop for SurfaceLease<'_, S> {
    fn drop(&mut self) {
        if self.restored {
            return;
        }
        if let Err(err) = self.surface.apply_config(&self.saved) {
            warn!(error = %err, "failed to restore surface configuration");
        }
    }
}

/// One rendered frame and the parameters that produced it.
#[derive(Debug, Clone)]
pub struct FrameImage {
    pub image: RgbaImage,
    pub params: ParameterSet,
}

impl FrameImage {
    pub fn size(&self) -> u32 {
        self.image.width()
    }
}

/// Frames stacked top to bottom in sequence order.
#[derive(Debug, Clone)]
pub struct SpriteStrip {
    pub image: RgbaImage,
    pub frame_size: u32,
    pub frame_count: usize,
}

impl SpriteStrip {
    /// Pixel rows occupied by frame `index`, or `None` past the last frame.
    pub fn frame_rows(&self, index: usize) -> Option<Range<u32>> {
        if index >= self.frame_count {
            return None;
        }
        let start = u32::try_from(index).ok()?.checked_mul(self.frame_size)?;
        Some(start..start.checked_add(self.frame_size)?)
    }

    pub fn frame(&self, index: usize) -> Option<RgbaImage> {
        let rows = self.frame_rows(index)?;
        Some(imageops::crop_imm(&self.image, 0, rows.start, self.frame_size, self.frame_size).to_image())
    }
}

/// Renders `frames` and stacks them into a strip. Every frame is drawn at the
/// export size of the first one.
pub fn capture<S: RenderSurface + ?Sized>(
    surface: &mut S,
    frames: &[ParameterSet],
) -> Result<SpriteStrip, CaptureError> {
    capture_with_cancel(surface, frames, &CancelToken::new())
}

pub fn capture_with_cancel<S: RenderSurface + ?Sized>(
    surface: &mut S,
    frames: &[ParameterSet],
    cancel: &CancelToken,
) -> Result<SpriteStrip, CaptureError> {
    let size = sequence_size(frames)?;
    let height = (frames.len() as u64) * u64::from(size);
    if height > u64::from(u32::MAX) {
        return Err(CaptureError::StripTooTall {
            frames: frames.len(),
            size,
        });
    }

    let mut lease = SurfaceLease::acquire(surface)?;
    let mut strip = RgbaImage::new(size, height as u32);
    for (index, params) in frames.iter().enumerate() {
        if cancel.is_cancelled() {
            info!(completed = index, "capture cancelled");
            return Err(CaptureError::Cancelled { completed: index });
        }
        let image = render_frame(&mut lease, params, size, index)?;
        imageops::replace(&mut strip, &image, 0, i64::from(size) * index as i64);
    }
    lease.release()?;

    info!(frames = frames.len(), size, "captured sprite strip");
    Ok(SpriteStrip {
        image: strip,
        frame_size: size,
        frame_count: frames.len(),
    })
}

/// Renders a single `size`×`size` frame.
pub fn capture_one<S: RenderSurface + ?Sized>(
    surface: &mut S,
    params: &ParameterSet,
    size: u32,
) -> Result<FrameImage, CaptureError> {
    check_size(size)?;
    let mut lease = SurfaceLease::acquire(surface)?;
    let image = render_frame(&mut lease, params, size, 0)?;
    lease.release()?;

    info!(size, shape = %params.shape_mode, "captured frame");
    Ok(FrameImage {
        image,
        params: params.clone(),
    })
}

/// Export size shared by every frame of `frames`.
fn sequence_size(frames: &[ParameterSet]) -> Result<u32, CaptureError> {
    let first = frames.first().ok_or(CaptureError::EmptySequence)?;
    let expected = first.export_size();
    if let Some((index, size)) = frames
        .iter()
        .map(ParameterSet::export_size)
        .enumerate()
        .find(|(_, size)| *size != expected)
    {
        return Err(CaptureError::MixedFrameSizes {
            index,
            size,
            expected,
        });
    }
    check_size(expected)?;
    Ok(expected)
}

fn check_size(size: u32) -> Result<(), CaptureError> {
    if size == 0 || size > MAX_DIMENSION {
        return Err(CaptureError::InvalidSize(size));
    }
    Ok(())
}

fn render_frame<S: RenderSurface + ?Sized>(
    lease: &mut SurfaceLease<'_, S>,
    params: &ParameterSet,
    size: u32,
    index: usize,
) -> Result<RgbaImage, CaptureError> {
    let surface = lease.surface();

    let ticket = surface.upload(&GlowUniforms::from_params(params));
    let committed = surface.tick();
    if committed != ticket.generation() {
        return Err(CaptureError::StaleUpload {
            expected: ticket.generation(),
            committed,
        });
    }

    // the host may have resized during the tick; re-assert every frame
    surface.apply_config(&SurfaceConfig::export(size))?;
    surface.render(RenderPass::Export)?;
    let image = surface.read_pixels()?;

    let (width, height) = image.dimensions();
    if (width, height) != (size, size) {
        return Err(CaptureError::FrameSize {
            index,
            width,
            height,
            size,
        });
    }
    debug!(index, size, seed = params.seed, twist = params.twist, "captured frame");
    Ok(image)
}

#[cfg(test)]
mod tests {
    use crate::surface::SoftwareSurface;

    use super::*;

    fn preview_surface() -> SoftwareSurface {
        let mut config = SurfaceConfig::canvas(48, 32, 2.0);
        config.scissor_test = true;
        config.clear_color = [0.1, 0.1, 0.1, 1.0];
        SoftwareSurface::new(config).unwrap()
    }

    #[test]
    fn lease_restores_on_drop() {
        let mut surface = preview_surface();
        let before = surface.config();
        {
            let mut lease = SurfaceLease::acquire(&mut surface).unwrap();
            lease
                .surface()
                .apply_config(&SurfaceConfig::export(16))
                .unwrap();
        }
        assert_eq!(surface.config(), before);
    }

    #[test]
    fn pending_surface_is_not_ready() {
        let mut surface = SoftwareSurface::pending(SurfaceConfig::export(8)).unwrap();
        let err = capture_one(&mut surface, &ParameterSet::default(), 8).unwrap_err();
        assert_eq!(err, CaptureError::NotReady);
    }

    #[test]
    fn capture_one_renders_at_the_requested_size() {
        let mut surface = preview_surface();
        let before = surface.config();
        let frame = capture_one(&mut surface, &ParameterSet::default(), 32).unwrap();
        assert_eq!(frame.image.dimensions(), (32, 32));
        assert_eq!(frame.size(), 32);
        assert_eq!(surface.config(), before);
    }

    #[test]
    fn empty_and_zero_sized_requests_are_rejected() {
        let mut surface = preview_surface();
        assert_eq!(
            capture(&mut surface, &[]).unwrap_err(),
            CaptureError::EmptySequence
        );
        assert_eq!(
            capture_one(&mut surface, &ParameterSet::default(), 0).unwrap_err(),
            CaptureError::InvalidSize(0)
        );
    }

    #[test]
    fn strip_size_follows_the_pixel_count() {
        let mut surface = preview_surface();
        let frames = vec![
            ParameterSet {
                pixel_count: 32,
                ..ParameterSet::default()
            };
            4
        ];
        let strip = capture(&mut surface, &frames).unwrap();
        assert_eq!(strip.frame_size, 32);
        assert_eq!(strip.image.dimensions(), (32, 128));
    }

    #[test]
    fn mixed_pixel_counts_are_rejected() {
        let mut surface = preview_surface();
        let before = surface.config();
        let mut frames = vec![
            ParameterSet {
                pixel_count: 32,
                ..ParameterSet::default()
            };
            4
        ];
        frames[2].pixel_count = 64;
        assert_eq!(
            capture(&mut surface, &frames).unwrap_err(),
            CaptureError::MixedFrameSizes {
                index: 2,
                size: 64,
                expected: 32,
            }
        );
        assert_eq!(surface.config(), before);
    }

    #[test]
    fn frame_rows_stop_at_the_last_frame() {
        let strip = SpriteStrip {
            image: RgbaImage::new(16, 64),
            frame_size: 16,
            frame_count: 4,
        };
        assert_eq!(strip.frame_rows(3), Some(48..64));
        assert_eq!(strip.frame_rows(4), None);
        assert_eq!(strip.frame_rows(usize::MAX), None);
        assert!(strip.frame(usize::MAX).is_none());
    }

    #[test]
    fn cancelled_token_stops_before_the_first_frame() {
        let mut surface = preview_surface();
        let before = surface.config();
        let token = CancelToken::new();
        token.cancel();
        let frames = vec![ParameterSet::default(); 4];
        let err = capture_with_cancel(&mut surface, &frames, &token).unwrap_err();
        assert_eq!(err, CaptureError::Cancelled { completed: 0 });
        assert_eq!(surface.config(), before);
    }
}
