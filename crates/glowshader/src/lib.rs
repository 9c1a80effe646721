//! Procedural glow shading for sprite generation.
//!
//! ```text
//!   ParameterSet ──▶ GlowProgram::shade(uv) ──▶ Shaded (premultiplied RGBA)
//!        │
//!        └──▶ sequence::generate ──▶ Vec<ParameterSet> (one per frame)
//! ```
//!
//! Everything here is pure computation. Surfaces, capture and file output live
//! in the `renderer` and `spritegen` crates.

pub mod math;
pub mod noise;
pub mod params;
pub mod sequence;
pub mod shader;

pub use math::Vec2;
pub use params::{ParamError, ParameterSet, Rgb, ShapeDefaults, ShapeMode};
pub use sequence::{generate, AnimationMode, SequenceError};
pub use shader::{evaluate, GlowProgram, RenderPass, Shaded, Shape, ShapeField};
