//! Procedural glow evaluator.
//!
//! Maps a normalized coordinate in `[0,1]²` plus a `ParameterSet` to a
//! premultiplied color. The stages run in a fixed order:
//!
//! ```text
//!   uv ─▶ quantize ─▶ recenter/twist/stretch ─▶ distort ─▶ shape
//!                                                            │
//!   Shaded ◀─ grid (preview) ◀─ composite ◀─ tone map ◀─ edge mask
//! ```
//!
//! `GlowProgram` caches everything derived from the parameter set so a surface
//! can shade millions of pixels without re-deriving the shape per call. The
//! free function `evaluate` is the one-shot convenience wrapper. Both are pure:
//! identical inputs always produce bit-identical output.

mod shapes;

pub use shapes::{
    CenterGlow, Nebula, Polygon, RingBand, Shape, ShapeField, ShapeSample, Star,
};

use crate::math::{smoothstep, Vec2, DIVISOR_EPSILON};
use crate::noise::simplex2;
use crate::params::{ParameterSet, GRID_PIXEL_LIMIT};

const DISTORTION_SCALE: f32 = 0.15;
const GRID_EDGE: f32 = 0.05;

/// Which consumer is shading. Export never draws the grid overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPass {
    Preview,
    Export,
}

/// Premultiplied color: `color` is already scaled by `alpha`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shaded {
    pub color: [f32; 3],
    pub alpha: f32,
}

impl Shaded {
    pub fn to_rgba8(self) -> [u8; 4] {
        let byte = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        [
            byte(self.color[0]),
            byte(self.color[1]),
            byte(self.color[2]),
            byte(self.alpha),
        ]
    }
}

/// Parameter set prepared for repeated shading.
#[derive(Debug, Clone, PartialEq)]
pub struct GlowProgram {
    quantize: Option<f32>,
    grid: bool,
    offset: Vec2,
    twist: f32,
    stretch: Vec2,
    freq: f32,
    seed: f32,
    dist_str: f32,
    phase: f32,
    gain: f32,
    contrast: f32,
    color: [f32; 3],
    shape: Shape,
}

impl GlowProgram {
    pub fn new(params: &ParameterSet) -> Self {
        let quantize = params.quantizes().then_some(params.pixel_count as f32);
        let grid = params.show_grid && quantize.is_some() && params.pixel_count < GRID_PIXEL_LIMIT;
        let scale = positive_or_epsilon(params.scale);
        let stretch = Vec2::new(
            positive_or_epsilon(params.size_x) * scale,
            positive_or_epsilon(params.size_y) * scale,
        );

        Self {
            quantize,
            grid,
            offset: Vec2::new(finite_or(params.pos_x, 0.0), finite_or(params.pos_y, 0.0)),
            twist: finite_or(params.twist, 0.0),
            stretch: Vec2::new(
                stretch.x.max(DIVISOR_EPSILON),
                stretch.y.max(DIVISOR_EPSILON),
            ),
            freq: finite_or(params.freq, 0.0),
            seed: finite_or(params.seed, 0.0),
            dist_str: finite_or(params.dist_str, 0.0),
            phase: finite_or(params.time * params.speed, 0.0),
            gain: finite_or(params.gain, 0.0),
            contrast: positive_or_epsilon(params.contrast),
            color: params.color.to_array(),
            shape: Shape::from_params(params),
        }
    }

    pub fn shade(&self, uv: Vec2, pass: RenderPass) -> Shaded {
        let sampled = match self.quantize {
            Some(cells) => (uv * cells).floor() * cells.recip(),
            None => uv,
        };

        let centered = sampled - Vec2::splat(0.5) - self.offset;
        let stretched = centered.rotate(self.twist) / self.stretch;

        let drift = Vec2::new(
            self.seed + self.phase * 0.2,
            self.seed - self.phase * 0.1,
        );
        let noise = simplex2(stretched * self.freq + drift);
        let distorted = stretched + Vec2::splat(noise * self.dist_str * DISTORTION_SCALE);

        let sample = ShapeSample::new(centered, distorted, self.phase);
        let mut brightness = bounded(self.shape.brightness(&sample));

        brightness *= smoothstep(0.8, 0.5, sample.dist);
        brightness = bounded(brightness * self.gain);
        brightness = bounded(brightness.powf(self.contrast)).clamp(0.0, 1.0);

        let mut shaded = Shaded {
            color: self.color.map(|channel| (channel * brightness).clamp(0.0, 1.0)),
            alpha: brightness,
        };

        if self.grid && pass == RenderPass::Preview {
            if let Some(cells) = self.quantize {
                if on_grid_line(uv * cells) {
                    shaded.color = shaded.color.map(|channel| channel * 0.5);
                    shaded.alpha = shaded.alpha.max(0.1);
                }
            }
        }

        shaded
    }
}

/// One-shot evaluation of `params` at `uv`.
pub fn evaluate(uv: Vec2, params: &ParameterSet, pass: RenderPass) -> Shaded {
    GlowProgram::new(params).shade(uv, pass)
}

fn on_grid_line(cell_coord: Vec2) -> bool {
    let within = cell_coord.fract();
    [within.x, within.y]
        .into_iter()
        .any(|f| f < GRID_EDGE || f > 1.0 - GRID_EDGE)
}

fn positive_or_epsilon(value: f32) -> f32 {
    if value.is_finite() && value > DIVISOR_EPSILON {
        value
    } else {
        DIVISOR_EPSILON
    }
}

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

/// Non-negative and finite: NaN collapses to zero, overflow saturates.
fn bounded(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, f32::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ShapeMode;

    fn centered_ring() -> ParameterSet {
        ParameterSet {
            shape_mode: ShapeMode::Ring,
            ring_radius: 0.25,
            ring_width: 0.05,
            ring_opacity: 1.0,
            gain: 2.0,
            contrast: 1.0,
            pixel_count: 4096,
            ..ParameterSet::default()
        }
    }

    #[test]
    fn evaluation_is_deterministic() {
        let params = ParameterSet {
            shape_mode: ShapeMode::Nebula,
            dist_str: 1.0,
            seed: 4.2,
            time: 1.5,
            ..ParameterSet::default()
        };
        let uv = Vec2::new(0.37, 0.61);
        let first = evaluate(uv, &params, RenderPass::Export);
        let second = evaluate(uv, &params, RenderPass::Export);
        assert_eq!(first, second);
    }

    #[test]
    fn output_is_premultiplied_by_alpha() {
        let mut params = centered_ring();
        params.color = crate::params::Rgb::new(1.0, 0.5, 0.0);
        let green = params.color.to_array()[1];
        let shaded = evaluate(Vec2::new(0.75, 0.5), &params, RenderPass::Export);
        assert!(shaded.alpha > 0.5);
        assert!((shaded.color[0] - shaded.alpha).abs() < 1e-6);
        assert!((shaded.color[1] - shaded.alpha * green).abs() < 1e-6);
        assert_eq!(shaded.color[2], 0.0);
    }

    #[test]
    fn cells_share_a_value_when_quantized() {
        let params = ParameterSet {
            pixel_count: 32,
            shape_mode: ShapeMode::Nebula,
            dist_str: 0.7,
            ..ParameterSet::default()
        };
        // both coordinates fall in cell (12, 20) of a 32x32 grid
        let a = evaluate(Vec2::new(12.1 / 32.0, 20.2 / 32.0), &params, RenderPass::Export);
        let b = evaluate(Vec2::new(12.9 / 32.0, 20.8 / 32.0), &params, RenderPass::Export);
        assert_eq!(a, b);
    }

    #[test]
    fn continuous_output_varies_inside_a_cell() {
        let params = ParameterSet {
            pixel_count: 4096,
            shape_mode: ShapeMode::Center,
            ..ParameterSet::default()
        };
        let a = evaluate(Vec2::new(0.55, 0.5), &params, RenderPass::Export);
        let b = evaluate(Vec2::new(0.551, 0.5), &params, RenderPass::Export);
        assert_ne!(a, b);
    }

    #[test]
    fn shape_mode_changes_output() {
        let base = ParameterSet {
            pixel_count: 4096,
            ..ParameterSet::default()
        };
        let uv = Vec2::new(0.62, 0.55);
        let mut outputs = Vec::new();
        for mode in ShapeMode::ALL {
            let params = ParameterSet {
                shape_mode: mode,
                ..base.clone()
            };
            outputs.push(evaluate(uv, &params, RenderPass::Export));
        }
        for (i, a) in outputs.iter().enumerate() {
            for b in outputs.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn degenerate_inputs_never_produce_nan() {
        for mode in ShapeMode::ALL {
            let params = ParameterSet {
                shape_mode: mode,
                intensity: 0.0,
                scale: 0.0,
                size_x: 0.0,
                size_y: -1.0,
                ring_width: 0.0,
                ring_radius: 0.0,
                contrast: 0.0,
                gain: f32::INFINITY,
                pixel_count: 4096,
                ..ParameterSet::default()
            };
            for uv in [Vec2::new(0.5, 0.5), Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.3)] {
                let shaded = evaluate(uv, &params, RenderPass::Export);
                assert!(shaded.alpha.is_finite() && (0.0..=1.0).contains(&shaded.alpha));
                assert!(shaded.color.iter().all(|c| c.is_finite()));
            }
            // the collapsed transform pushes the corner far outside the edge mask
            let corner = evaluate(Vec2::new(0.0, 0.0), &params, RenderPass::Export);
            assert_eq!(corner.alpha, 0.0, "{mode}");
        }
    }

    #[test]
    fn zero_contrast_keeps_masked_pixels_dark() {
        let params = ParameterSet {
            contrast: 0.0,
            pixel_count: 4096,
            ..ParameterSet::default()
        };
        let corner = evaluate(Vec2::new(0.0, 0.0), &params, RenderPass::Export);
        assert_eq!(corner.alpha, 0.0);
        assert_eq!(corner.color, [0.0; 3]);
    }

    #[test]
    fn edge_mask_blacks_out_far_corners() {
        let params = ParameterSet {
            shape_mode: ShapeMode::Center,
            scale: 0.5,
            pixel_count: 4096,
            ..ParameterSet::default()
        };
        let corner = evaluate(Vec2::new(0.0, 0.0), &params, RenderPass::Export);
        assert_eq!(corner.alpha, 0.0);
    }

    #[test]
    fn grid_overlay_is_preview_only() {
        let params = ParameterSet {
            pixel_count: 32,
            show_grid: true,
            ..ParameterSet::default()
        };
        // lands on the left boundary of a cell
        let uv = Vec2::new(10.01 / 32.0, 5.5 / 32.0);
        let preview = evaluate(uv, &params, RenderPass::Preview);
        let export = evaluate(uv, &params, RenderPass::Export);
        assert!(preview.alpha >= 0.1);
        assert_ne!(preview, export);
    }
}
