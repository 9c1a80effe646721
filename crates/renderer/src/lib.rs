//! Renderer crate for the glow sprite generator.
//!
//! Drives a `RenderSurface` with glow uniforms, captures exact-size frames and
//! stacks them into sprite strips. The overall flow is:
//!
//! ```text
//!   PreviewSession ──▶ upload ─▶ tick ─▶ render(Preview) ─▶ canvas pixels
//!          │
//!          └─▶ capture / capture_one ──▶ SurfaceLease ──▶ render(Export) per frame
//!                                               │
//!                                               └─▶ SpriteStrip ─▶ export::encode_png
//! ```
//!
//! `SoftwareSurface` shades on the CPU with `glowshader::GlowProgram`; any other
//! backend plugs in by implementing `RenderSurface`.

pub mod capture;
pub mod export;
pub mod preview;
pub mod surface;
pub mod uniforms;

pub use capture::{
    capture, capture_one, capture_with_cancel, CancelToken, CaptureError, FrameImage,
    SpriteStrip, SurfaceLease,
};
pub use export::{export_frame, export_strip, ExportError, ExportedImage};
pub use preview::{GlowClock, PreviewCaptureError, PreviewSession};
pub use surface::{
    RenderSurface, ScissorRect, SoftwareSurface, SurfaceConfig, SurfaceError, UploadTicket,
};
pub use uniforms::GlowUniforms;
