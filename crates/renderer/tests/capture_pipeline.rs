use std::panic::{self, AssertUnwindSafe};

use glowshader::{generate, AnimationMode, ParameterSet, RenderPass, ShapeMode};
use image::RgbaImage;
use renderer::{
    capture, capture_one, CaptureError, GlowUniforms, RenderSurface, ScissorRect,
    SoftwareSurface, SurfaceConfig, SurfaceError, UploadTicket,
};

fn preview_config() -> SurfaceConfig {
    let mut config = SurfaceConfig::canvas(96, 64, 2.0);
    config.scissor_test = true;
    config.scissor = ScissorRect {
        x: 8,
        y: 8,
        width: 64,
        height: 48,
    };
    config.clear_color = [0.05, 0.05, 0.08, 1.0];
    config
}

fn nebula() -> ParameterSet {
    let mut params = ParameterSet {
        pixel_count: 32,
        seed: 1.5,
        ..ParameterSet::default()
    };
    params.select_shape(ShapeMode::Nebula);
    params
}

/// Wraps a software surface and misbehaves in configurable ways.
struct HostSurface {
    inner: SoftwareSurface,
    frames_rendered: usize,
    fail_on_render: Option<usize>,
    panic_on_render: Option<usize>,
    resize_on_tick: Option<SurfaceConfig>,
    drop_uploads: bool,
}

impl HostSurface {
    fn new() -> Self {
        Self {
            inner: SoftwareSurface::new(preview_config()).unwrap(),
            frames_rendered: 0,
            fail_on_render: None,
            panic_on_render: None,
            resize_on_tick: None,
            drop_uploads: false,
        }
    }
}

impl RenderSurface for HostSurface {
    fn is_ready(&self) -> bool {
        self.inner.is_ready()
    }

    fn config(&self) -> SurfaceConfig {
        self.inner.config()
    }

    fn apply_config(&mut self, config: &SurfaceConfig) -> Result<(), SurfaceError> {
        self.inner.apply_config(config)
    }

    fn upload(&mut self, uniforms: &GlowUniforms) -> UploadTicket {
        if self.drop_uploads {
            // hand out a generation the host will never commit
            return UploadTicket::new(u64::MAX);
        }
        self.inner.upload(uniforms)
    }

    fn tick(&mut self) -> u64 {
        if let Some(config) = self.resize_on_tick {
            self.inner.apply_config(&config).unwrap();
        }
        self.inner.tick()
    }

    fn render(&mut self, pass: RenderPass) -> Result<(), SurfaceError> {
        let index = self.frames_rendered;
        self.frames_rendered += 1;
        if self.fail_on_render == Some(index) {
            return Err(SurfaceError::Lost(format!("device lost on frame {index}")));
        }
        if self.panic_on_render == Some(index) {
            panic!("backend panicked on frame {index}");
        }
        self.inner.render(pass)
    }

    fn read_pixels(&self) -> Result<RgbaImage, SurfaceError> {
        self.inner.read_pixels()
    }
}

#[test]
fn strip_stacks_frames_in_order() {
    let frames = generate(&nebula(), AnimationMode::SeedSweep, 2.0, 5).unwrap();
    let mut surface = SoftwareSurface::new(preview_config()).unwrap();

    let strip = capture(&mut surface, &frames).unwrap();
    assert_eq!(strip.image.dimensions(), (32, 160));
    assert_eq!(strip.frame_count, 5);
    assert_eq!(strip.frame_rows(3), Some(96..128));

    for (index, params) in frames.iter().enumerate() {
        let single = capture_one(&mut surface, params, 32).unwrap();
        assert_eq!(strip.frame(index).unwrap(), single.image, "frame {index}");
    }
    assert!(strip.frame(5).is_none());
    assert_ne!(strip.frame(0), strip.frame(1));
}

#[test]
fn capture_restores_configuration_every_time() {
    let mut surface = SoftwareSurface::new(preview_config()).unwrap();
    let frames = generate(&nebula(), AnimationMode::TwistSweep, 1.0, 4).unwrap();
    let small = ParameterSet {
        pixel_count: 16,
        ..nebula()
    };
    let small_frames = generate(&small, AnimationMode::TwistSweep, 1.0, 4).unwrap();

    capture(&mut surface, &small_frames).unwrap();
    assert_eq!(surface.config(), preview_config());
    capture(&mut surface, &frames).unwrap();
    assert_eq!(surface.config(), preview_config());
}

#[test]
fn failed_frame_restores_configuration() {
    let mut surface = HostSurface::new();
    surface.fail_on_render = Some(2);
    let frames = generate(&nebula(), AnimationMode::SeedSweep, 1.0, 4).unwrap();

    let err = capture(&mut surface, &frames).unwrap_err();
    assert_eq!(
        err,
        CaptureError::Surface(SurfaceError::Lost("device lost on frame 2".into()))
    );
    assert_eq!(surface.config(), preview_config());
}

#[test]
fn panicking_backend_still_restores_configuration() {
    let mut surface = HostSurface::new();
    surface.panic_on_render = Some(1);
    let frames = generate(&nebula(), AnimationMode::SeedSweep, 1.0, 4).unwrap();

    let result = panic::catch_unwind(AssertUnwindSafe(|| capture(&mut surface, &frames)));
    assert!(result.is_err());
    assert_eq!(surface.config(), preview_config());
}

#[test]
fn host_resize_between_frames_is_overridden() {
    let mut surface = HostSurface::new();
    surface.resize_on_tick = Some(SurfaceConfig::canvas(300, 200, 1.0));
    let frames = generate(&nebula(), AnimationMode::SeedSweep, 1.0, 4).unwrap();

    let strip = capture(&mut surface, &frames).unwrap();
    assert_eq!(strip.image.dimensions(), (32, 128));

    let mut reference = SoftwareSurface::new(preview_config()).unwrap();
    let expected = capture(&mut reference, &frames).unwrap();
    assert_eq!(strip.image, expected.image);
}

#[test]
fn uncommitted_upload_is_reported() {
    let mut surface = HostSurface::new();
    surface.drop_uploads = true;

    let err = capture_one(&mut surface, &nebula(), 32).unwrap_err();
    assert!(matches!(
        err,
        CaptureError::StaleUpload {
            expected: u64::MAX,
            ..
        }
    ));
    assert_eq!(surface.config(), preview_config());
}

#[test]
fn export_ignores_preview_only_state() {
    let params = ParameterSet {
        pixel_count: 32,
        show_grid: true,
        ..ParameterSet::default()
    };
    let mut with_grid = SoftwareSurface::new(preview_config()).unwrap();
    let mut without_grid = SoftwareSurface::new(SurfaceConfig::export(8)).unwrap();

    let a = capture_one(&mut with_grid, &params, 32).unwrap();
    let b = capture_one(
        &mut without_grid,
        &ParameterSet {
            show_grid: false,
            ..params.clone()
        },
        32,
    )
    .unwrap();
    assert_eq!(a.image, b.image);
    // transparent clear: corners outside the glow carry no alpha
    assert_eq!(a.image.get_pixel(0, 0).0[3], 0);
}

#[test]
fn continuous_pixel_count_exports_at_fixed_size() {
    let params = ParameterSet {
        pixel_count: 4096,
        ..ParameterSet::default()
    };
    assert_eq!(params.export_size(), 1024);
    let mut surface = SoftwareSurface::new(SurfaceConfig::export(8)).unwrap();
    let frame = capture_one(&mut surface, &params, 64).unwrap();
    assert_eq!(frame.image.dimensions(), (64, 64));
}
