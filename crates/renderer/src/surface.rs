//! Rendering surfaces.
//!
//! A surface owns a framebuffer, a uniform block and the presentation state a
//! capture has to save and restore (`SurfaceConfig`). Uniform uploads are
//! double buffered: `upload` only stages bytes and `tick` commits them, which
//! mirrors a host that applies uniform changes on its next frame.
//!
//! Types
//! - `SurfaceConfig` / `ScissorRect`: presentation state snapshot.
//! - `UploadTicket`: generation of a staged upload.
//! - `RenderSurface`: the seam captures and previews drive.
//! - `SoftwareSurface`: CPU implementation shading with `GlowProgram`.

use glowshader::{GlowProgram, RenderPass, Shaded, Vec2};
use image::{Rgba, RgbaImage};
use tracing::{debug, trace};

use crate::uniforms::GlowUniforms;

/// Largest physical edge a surface accepts.
pub const MAX_DIMENSION: u32 = 8192;

#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum SurfaceError {
    #[error("surface size {width}x{height} is outside 1..={MAX_DIMENSION}")]
    InvalidSize { width: u32, height: u32 },
    #[error("pixel ratio {0} must be a positive finite number")]
    InvalidPixelRatio(f32),
    #[error("surface is not ready")]
    NotReady,
    #[error("no uniforms have been committed to the surface")]
    NoUniforms,
    #[error("surface lost: {0}")]
    Lost(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScissorRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl ScissorRect {
    fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && y >= self.y && x - self.x < self.width && y - self.y < self.height
    }
}

/// Presentation state of a surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceConfig {
    pub pixel_ratio: f32,
    /// Logical width before `pixel_ratio` is applied.
    pub width: u32,
    pub height: u32,
    /// Horizontal sampling stretch; `1.0` keeps sprites square.
    pub aspect: f32,
    pub scissor_test: bool,
    pub scissor: ScissorRect,
    /// Premultiplied RGBA written before shading.
    pub clear_color: [f32; 4],
}

impl SurfaceConfig {
    /// Square, unscaled, unclipped, transparent: the state every export renders in.
    pub fn export(size: u32) -> Self {
        Self {
            pixel_ratio: 1.0,
            width: size,
            height: size,
            aspect: 1.0,
            scissor_test: false,
            scissor: ScissorRect::default(),
            clear_color: [0.0; 4],
        }
    }

    /// Interactive canvas of `width`×`height` logical pixels.
    pub fn canvas(width: u32, height: u32, pixel_ratio: f32) -> Self {
        Self {
            pixel_ratio,
            width,
            height,
            aspect: width as f32 / height.max(1) as f32,
            scissor_test: false,
            scissor: ScissorRect::default(),
            clear_color: [0.0; 4],
        }
    }

    pub fn physical_size(&self) -> (u32, u32) {
        let scale = |v: u32| (v as f32 * self.pixel_ratio).round() as u32;
        (scale(self.width), scale(self.height))
    }

    pub fn validate(&self) -> Result<(), SurfaceError> {
        if !self.pixel_ratio.is_finite() || self.pixel_ratio <= 0.0 {
            return Err(SurfaceError::InvalidPixelRatio(self.pixel_ratio));
        }
        let (width, height) = self.physical_size();
        let in_range = |v: u32| (1..=MAX_DIMENSION).contains(&v);
        if !in_range(width) || !in_range(height) {
            return Err(SurfaceError::InvalidSize { width, height });
        }
        Ok(())
    }
}

/// Generation assigned to a staged upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct UploadTicket(u64);

impl UploadTicket {
    pub fn new(generation: u64) -> Self {
        Self(generation)
    }

    pub fn generation(self) -> u64 {
        self.0
    }
}

pub trait RenderSurface {
    /// False until the surface can accept uploads and render.
    fn is_ready(&self) -> bool;

    fn config(&self) -> SurfaceConfig;

    fn apply_config(&mut self, config: &SurfaceConfig) -> Result<(), SurfaceError>;

    /// Stages a uniform block; it takes effect on the next `tick`.
    fn upload(&mut self, uniforms: &GlowUniforms) -> UploadTicket;

    /// Advances one host frame, committing staged uniforms. Returns the
    /// generation now in effect (0 before the first commit).
    fn tick(&mut self) -> u64;

    /// Shades the framebuffer with the committed uniforms.
    fn render(&mut self, pass: RenderPass) -> Result<(), SurfaceError>;

    /// Copy of the framebuffer at its physical size.
    fn read_pixels(&self) -> Result<RgbaImage, SurfaceError>;
}

/// CPU surface.
#[derive(Debug)]
pub struct SoftwareSurface {
    config: SurfaceConfig,
    ready: bool,
    staged: Option<(u64, Vec<u8>)>,
    committed: Option<(u64, GlowUniforms)>,
    next_generation: u64,
    framebuffer: RgbaImage,
}

impl SoftwareSurface {
    pub fn new(config: SurfaceConfig) -> Result<Self, SurfaceError> {
        config.validate()?;
        let (width, height) = config.physical_size();
        Ok(Self {
            config,
            ready: true,
            staged: None,
            committed: None,
            next_generation: 1,
            framebuffer: RgbaImage::new(width, height),
        })
    }

    /// A surface that exists but has not finished initialising.
    pub fn pending(config: SurfaceConfig) -> Result<Self, SurfaceError> {
        let mut surface = Self::new(config)?;
        surface.ready = false;
        Ok(surface)
    }

    pub fn committed(&self) -> Option<&GlowUniforms> {
        self.committed.as_ref().map(|(_, uniforms)| uniforms)
    }

    fn clear_pixel(&self) -> Rgba<u8> {
        let byte = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        let [r, g, b, a] = self.config.clear_color;
        Rgba([byte(r), byte(g), byte(b), byte(a)])
    }

    fn blend_over_clear(&self, shaded: Shaded) -> Shaded {
        let [r, g, b, a] = self.config.clear_color;
        let keep = 1.0 - shaded.alpha;
        Shaded {
            color: [
                shaded.color[0] + r * keep,
                shaded.color[1] + g * keep,
                shaded.color[2] + b * keep,
            ],
            alpha: shaded.alpha + a * keep,
        }
    }
}

impl RenderSurface for SoftwareSurface {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn config(&self) -> SurfaceConfig {
        self.config
    }

    fn apply_config(&mut self, config: &SurfaceConfig) -> Result<(), SurfaceError> {
        config.validate()?;
        let (width, height) = config.physical_size();
        if self.framebuffer.dimensions() != (width, height) {
            trace!(width, height, "resizing software framebuffer");
            self.framebuffer = RgbaImage::new(width, height);
        }
        self.config = *config;
        Ok(())
    }

    fn upload(&mut self, uniforms: &GlowUniforms) -> UploadTicket {
        let generation = self.next_generation;
        self.next_generation += 1;
        self.staged = Some((generation, bytemuck::bytes_of(uniforms).to_vec()));
        UploadTicket::new(generation)
    }

    fn tick(&mut self) -> u64 {
        if let Some((generation, bytes)) = self.staged.take() {
            let uniforms: GlowUniforms = bytemuck::pod_read_unaligned(&bytes);
            self.committed = Some((generation, uniforms));
        }
        self.committed.as_ref().map_or(0, |(generation, _)| *generation)
    }

    fn render(&mut self, pass: RenderPass) -> Result<(), SurfaceError> {
        let (_, uniforms) = self.committed.as_ref().ok_or(SurfaceError::NoUniforms)?;
        let program = GlowProgram::new(&uniforms.to_params());
        let (width, height) = self.framebuffer.dimensions();
        let aspect = self.config.aspect;
        let clear = self.clear_pixel();
        let scissor = self.config.scissor_test.then_some(self.config.scissor);

        let mut framebuffer = std::mem::take(&mut self.framebuffer);
        for (x, y, pixel) in framebuffer.enumerate_pixels_mut() {
            if scissor.is_some_and(|rect| !rect.contains(x, y)) {
                continue;
            }
            let u = (x as f32 + 0.5) / width as f32;
            let v = 1.0 - (y as f32 + 0.5) / height as f32;
            let uv = Vec2::new(0.5 + (u - 0.5) * aspect, v);
            let shaded = program.shade(uv, pass);
            *pixel = if shaded.alpha <= 0.0 {
                clear
            } else {
                Rgba(self.blend_over_clear(shaded).to_rgba8())
            };
        }
        self.framebuffer = framebuffer;

        debug!(width, height, ?pass, "software surface rendered");
        Ok(())
    }

    fn read_pixels(&self) -> Result<RgbaImage, SurfaceError> {
        Ok(self.framebuffer.clone())
    }
}

#[cfg(test)]
mod tests {
    use glowshader::ParameterSet;

    use super::*;

    #[test]
    fn uploads_take_effect_on_tick() {
        let mut surface = SoftwareSurface::new(SurfaceConfig::export(8)).unwrap();
        assert_eq!(surface.tick(), 0);
        assert_eq!(surface.render(RenderPass::Export), Err(SurfaceError::NoUniforms));

        let ticket = surface.upload(&GlowUniforms::from_params(&ParameterSet::default()));
        assert!(surface.committed().is_none());
        assert_eq!(surface.tick(), ticket.generation());
        assert!(surface.committed().is_some());
        surface.render(RenderPass::Export).unwrap();
    }

    #[test]
    fn pixel_ratio_scales_the_framebuffer() {
        let mut surface = SoftwareSurface::new(SurfaceConfig::canvas(20, 10, 2.0)).unwrap();
        surface.upload(&GlowUniforms::from_params(&ParameterSet::default()));
        surface.tick();
        surface.render(RenderPass::Preview).unwrap();
        assert_eq!(surface.read_pixels().unwrap().dimensions(), (40, 20));
    }

    #[test]
    fn invalid_configs_are_rejected() {
        assert!(matches!(
            SoftwareSurface::new(SurfaceConfig::export(0)),
            Err(SurfaceError::InvalidSize { .. })
        ));
        let mut config = SurfaceConfig::export(16);
        config.pixel_ratio = f32::NAN;
        assert!(matches!(
            config.validate(),
            Err(SurfaceError::InvalidPixelRatio(_))
        ));
        config.pixel_ratio = 1.0;
        config.width = MAX_DIMENSION + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn scissor_limits_the_shaded_region() {
        let mut config = SurfaceConfig::export(16);
        config.clear_color = [0.0, 0.0, 0.0, 1.0];
        config.scissor_test = true;
        config.scissor = ScissorRect {
            x: 0,
            y: 0,
            width: 4,
            height: 4,
        };
        let mut surface = SoftwareSurface::new(config).unwrap();
        let params = ParameterSet {
            shape_mode: glowshader::ShapeMode::Center,
            ..ParameterSet::default()
        };
        surface.upload(&GlowUniforms::from_params(&params));
        surface.tick();
        surface.render(RenderPass::Export).unwrap();
        let pixels = surface.read_pixels().unwrap();
        // untouched pixels keep the freshly allocated (zeroed) contents
        assert_eq!(pixels.get_pixel(8, 8), &Rgba([0, 0, 0, 0]));
        assert_eq!(pixels.get_pixel(0, 0).0[3], 255);
    }
}
