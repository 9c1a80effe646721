use std::time::{Duration, Instant};

use glowshader::{generate, AnimationMode, ParameterSet, RenderPass, ShapeMode};
use image::RgbaImage;
use tracing::{debug, warn};

use crate::capture::{self, CaptureError, CancelToken, FrameImage, SpriteStrip};
use crate::surface::{RenderSurface, SurfaceConfig, SurfaceError};
use crate::uniforms::GlowUniforms;

/// Advances `ParameterSet::time` while the glow is not paused.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlowClock {
    last_tick: Option<Instant>,
}

impl GlowClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances by the wall time since the previous call. The first call only
    /// records the starting instant.
    pub fn tick(&mut self, params: &mut ParameterSet, now: Instant) {
        let elapsed = self
            .last_tick
            .replace(now)
            .map(|previous| now.saturating_duration_since(previous))
            .unwrap_or(Duration::ZERO);
        Self::advance(params, elapsed);
    }

    pub fn advance(params: &mut ParameterSet, elapsed: Duration) {
        if !params.paused {
            params.time += elapsed.as_secs_f32();
        }
    }

    /// Flips the paused flag and forgets the last instant so resuming does not
    /// jump forward by the paused interval.
    pub fn toggle_pause(&mut self, params: &mut ParameterSet) -> bool {
        params.paused = !params.paused;
        self.last_tick = None;
        params.paused
    }
}

/// Live view of one glow on a shared surface.
pub struct PreviewSession<S: RenderSurface> {
    surface: S,
    params: ParameterSet,
    clock: GlowClock,
    canvas: SurfaceConfig,
}

impl<S: RenderSurface> PreviewSession<S> {
    pub fn new(
        mut surface: S,
        params: ParameterSet,
        canvas: SurfaceConfig,
    ) -> Result<Self, SurfaceError> {
        surface.apply_config(&canvas)?;
        Ok(Self {
            surface,
            params,
            clock: GlowClock::new(),
            canvas,
        })
    }

    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn select_shape(&mut self, mode: ShapeMode) {
        self.params.select_shape(mode);
    }

    pub fn toggle_pause(&mut self) -> bool {
        self.clock.toggle_pause(&mut self.params)
    }

    pub fn advance(&mut self, elapsed: Duration) {
        GlowClock::advance(&mut self.params, elapsed);
    }

    pub fn tick(&mut self, now: Instant) {
        self.clock.tick(&mut self.params, now);
    }

    /// Draws the current parameters with the grid overlay and returns the
    /// canvas pixels.
    pub fn render(&mut self) -> Result<RgbaImage, SurfaceError> {
        if !self.surface.is_ready() {
            warn!("preview surface not ready; skipping frame");
            return Err(SurfaceError::NotReady);
        }
        if self.surface.config() != self.canvas {
            self.surface.apply_config(&self.canvas)?;
        }
        self.surface.upload(&GlowUniforms::from_params(&self.params));
        self.surface.tick();
        self.surface.render(RenderPass::Preview)?;
        debug!(time = self.params.time, shape = %self.params.shape_mode, "preview frame");
        self.surface.read_pixels()
    }

    /// Exports the current parameters at their export size.
    pub fn capture_frame(&mut self) -> Result<FrameImage, CaptureError> {
        let size = self.params.export_size();
        capture::capture_one(&mut self.surface, &self.params, size)
    }

    /// Sweeps the current parameters and exports the resulting strip.
    pub fn capture_strip(
        &mut self,
        mode: AnimationMode,
        amount: f32,
        frame_count: usize,
        cancel: &CancelToken,
    ) -> Result<SpriteStrip, PreviewCaptureError> {
        let frames = generate(&self.params, mode, amount, frame_count)?;
        Ok(capture::capture_with_cancel(&mut self.surface, &frames, cancel)?)
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PreviewCaptureError {
    #[error(transparent)]
    Sequence(#[from] glowshader::SequenceError),
    #[error(transparent)]
    Capture(#[from] CaptureError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::SoftwareSurface;

    #[test]
    fn paused_clock_holds_time() {
        let mut params = ParameterSet::default();
        GlowClock::advance(&mut params, Duration::from_millis(500));
        assert!((params.time - 0.5).abs() < 1e-6);

        let mut clock = GlowClock::new();
        assert!(clock.toggle_pause(&mut params));
        GlowClock::advance(&mut params, Duration::from_secs(3));
        assert!((params.time - 0.5).abs() < 1e-6);
    }

    #[test]
    fn tick_measures_between_instants() {
        let mut params = ParameterSet::default();
        let mut clock = GlowClock::new();
        let start = Instant::now();
        clock.tick(&mut params, start);
        assert_eq!(params.time, 0.0);
        clock.tick(&mut params, start + Duration::from_millis(250));
        assert!((params.time - 0.25).abs() < 1e-4);
    }

    #[test]
    fn session_exports_the_selected_shape() {
        let canvas = SurfaceConfig::canvas(32, 32, 1.0);
        let surface = SoftwareSurface::new(canvas).unwrap();
        let params = ParameterSet {
            pixel_count: 16,
            show_grid: true,
            ..ParameterSet::default()
        };
        let mut session = PreviewSession::new(surface, params, canvas).unwrap();
        session.select_shape(ShapeMode::Star);
        assert_eq!(session.params().shape_mode, ShapeMode::Star);

        let start = Instant::now();
        session.tick(start);
        session.tick(start + Duration::from_millis(100));
        assert!(session.params().time > 0.0);

        let frame = session.capture_frame().unwrap();
        assert_eq!(frame.size(), 16);
        assert_eq!(frame.params.shape_mode, ShapeMode::Star);
        assert_eq!(session.surface().config(), canvas);
    }

    #[test]
    fn capture_leaves_the_preview_canvas_intact() {
        let canvas = SurfaceConfig::canvas(40, 40, 1.5);
        let surface = SoftwareSurface::new(SurfaceConfig::export(4)).unwrap();
        let mut session = PreviewSession::new(surface, ParameterSet::default(), canvas).unwrap();
        session.render().unwrap();

        let strip = session
            .capture_strip(AnimationMode::SeedSweep, 1.0, 4, &CancelToken::new())
            .unwrap();
        assert_eq!(strip.image.dimensions(), (64, 256));
        assert_eq!(session.surface().config(), canvas);

        let preview = session.render().unwrap();
        assert_eq!(preview.dimensions(), (60, 60));
    }
}
