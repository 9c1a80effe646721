//! Per-shape brightness fields.
//!
//! Each shape owns exactly the parameters it reads, so inactive fields on a
//! `ParameterSet` never leak into the evaluation. `Shape::from_params` is the
//! only place that maps the shape tag onto an implementation.

use std::f32::consts::{PI, TAU};

use crate::math::{mix, smoothstep, Vec2, DIVISOR_EPSILON};
use crate::noise::simplex2;
use crate::params::{ParameterSet, ShapeMode, MAX_POINTS, MIN_POINTS};

/// Geometry handed to a shape after transform and distortion.
#[derive(Debug, Clone, Copy)]
pub struct ShapeSample {
    /// Recentered coordinate before twist/scale/distortion.
    pub centered: Vec2,
    /// Fully transformed and distorted coordinate.
    pub distorted: Vec2,
    /// `distorted.length()`.
    pub dist: f32,
    /// `distorted.angle()`.
    pub phi: f32,
    /// Animation phase (`time * speed`).
    pub phase: f32,
}

impl ShapeSample {
    pub fn new(centered: Vec2, distorted: Vec2, phase: f32) -> Self {
        Self {
            centered,
            distorted,
            dist: distorted.length(),
            phi: distorted.angle(),
            phase,
        }
    }
}

/// Raw (pre edge-mask, pre tone-map) brightness of a shape.
pub trait ShapeField {
    fn brightness(&self, sample: &ShapeSample) -> f32;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CenterGlow {
    pub intensity: f32,
}

impl ShapeField for CenterGlow {
    fn brightness(&self, sample: &ShapeSample) -> f32 {
        let exponent = 1.2 / self.intensity.max(0.01);
        (0.02 / sample.dist.max(0.001)).powf(exponent)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingBand {
    pub radius: f32,
    pub width: f32,
    pub opacity: f32,
}

impl ShapeField for RingBand {
    fn brightness(&self, sample: &ShapeSample) -> f32 {
        let width = self.width.max(DIVISOR_EPSILON);
        smoothstep(width, width * 0.2, (sample.dist - self.radius).abs()) * self.opacity
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nebula {
    pub intensity: f32,
    pub freq: f32,
    pub seed: f32,
}

impl ShapeField for Nebula {
    fn brightness(&self, sample: &ShapeSample) -> f32 {
        let drift = Vec2::splat(sample.phase * 0.2 + self.seed * 10.0);
        let field = simplex2(sample.centered * (self.freq * 2.0) + drift);
        (field * 0.5 + 0.5) * smoothstep(1.0, 0.0, sample.dist) * self.intensity * 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Star {
    pub inner_radius: f32,
    pub points: f32,
    pub intensity: f32,
}

impl ShapeField for Star {
    fn brightness(&self, sample: &ShapeSample) -> f32 {
        let wave = (sample.phi * self.points + sample.phase).cos();
        let bound = mix(self.inner_radius, 1.0, wave * 0.5 + 0.5).max(DIVISOR_EPSILON);
        let d = ((sample.dist * 0.5) / bound).max(DIVISOR_EPSILON);
        (0.02 / d).powf(1.5 - self.intensity) * smoothstep(1.0, 0.2, sample.dist)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Polygon {
    pub sides: f32,
    pub radius: f32,
    pub border: f32,
    pub opacity: f32,
    pub intensity: f32,
}

impl Polygon {
    /// Distance from the origin to `p` measured along the nearest edge normal
    /// of a regular polygon with `sides` sides.
    fn edge_distance(&self, p: Vec2) -> f32 {
        let angle = p.x.atan2(p.y) + PI;
        let sector = TAU / self.sides;
        let offset = (0.5 + angle / sector).floor() * sector - angle;
        offset.cos() * p.length()
    }
}

impl ShapeField for Polygon {
    fn brightness(&self, sample: &ShapeSample) -> f32 {
        let distance = self.edge_distance(sample.distorted);
        let half = (self.radius * 0.5).max(DIVISOR_EPSILON);
        let border = smoothstep(self.border.max(DIVISOR_EPSILON), 0.0, (distance - half).abs());
        let fill = smoothstep(half, 0.0, distance);
        border.max(fill * self.opacity) + fill * self.intensity * 0.5
    }
}

/// Shape selected by a parameter set's `shape_mode`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Center(CenterGlow),
    Ring(RingBand),
    Nebula(Nebula),
    Star(Star),
    Polygon(Polygon),
}

impl Shape {
    pub fn from_params(params: &ParameterSet) -> Self {
        let points = params.points.clamp(MIN_POINTS, MAX_POINTS) as f32;
        match params.shape_mode {
            ShapeMode::Center => Shape::Center(CenterGlow {
                intensity: params.intensity,
            }),
            ShapeMode::Ring => Shape::Ring(RingBand {
                radius: params.ring_radius,
                width: params.ring_width,
                opacity: params.ring_opacity,
            }),
            ShapeMode::Nebula => Shape::Nebula(Nebula {
                intensity: params.intensity,
                freq: params.freq,
                seed: params.seed,
            }),
            ShapeMode::Star => Shape::Star(Star {
                inner_radius: params.ring_radius,
                points,
                intensity: params.intensity,
            }),
            ShapeMode::Polygon => Shape::Polygon(Polygon {
                sides: points,
                radius: params.ring_radius,
                border: params.ring_width,
                opacity: params.ring_opacity,
                intensity: params.intensity,
            }),
        }
    }

    pub fn mode(&self) -> ShapeMode {
        match self {
            Shape::Center(_) => ShapeMode::Center,
            Shape::Ring(_) => ShapeMode::Ring,
            Shape::Nebula(_) => ShapeMode::Nebula,
            Shape::Star(_) => ShapeMode::Star,
            Shape::Polygon(_) => ShapeMode::Polygon,
        }
    }
}

impl ShapeField for Shape {
    fn brightness(&self, sample: &ShapeSample) -> f32 {
        match self {
            Shape::Center(shape) => shape.brightness(sample),
            Shape::Ring(shape) => shape.brightness(sample),
            Shape::Nebula(shape) => shape.brightness(sample),
            Shape::Star(shape) => shape.brightness(sample),
            Shape::Polygon(shape) => shape.brightness(sample),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_at(x: f32, y: f32) -> ShapeSample {
        let p = Vec2::new(x, y);
        ShapeSample::new(p, p, 0.0)
    }

    #[test]
    fn shape_follows_the_selected_mode() {
        for mode in ShapeMode::ALL {
            let params = ParameterSet {
                shape_mode: mode,
                ..ParameterSet::default()
            };
            assert_eq!(Shape::from_params(&params).mode(), mode);
        }
    }

    #[test]
    fn ring_peaks_on_its_radius() {
        let ring = RingBand {
            radius: 0.3,
            width: 0.05,
            opacity: 1.0,
        };
        assert!((ring.brightness(&sample_at(0.3, 0.0)) - 1.0).abs() < 1e-5);
        assert_eq!(ring.brightness(&sample_at(0.1, 0.0)), 0.0);
    }

    #[test]
    fn zero_width_ring_stays_thin() {
        let ring = RingBand {
            radius: 0.3,
            width: 0.0,
            opacity: 1.0,
        };
        assert_eq!(ring.brightness(&sample_at(0.0, 0.1)), 0.0);
    }

    #[test]
    fn polygon_fills_interior_and_fades_outside() {
        let square = Polygon {
            sides: 4.0,
            radius: 0.4,
            border: 0.02,
            opacity: 1.0,
            intensity: 0.0,
        };
        assert!(square.brightness(&sample_at(0.0, 0.0)) > 0.99);
        assert_eq!(square.brightness(&sample_at(0.45, 0.45)), 0.0);
    }

    #[test]
    fn center_glow_survives_zero_intensity_and_distance() {
        let glow = CenterGlow { intensity: 0.0 };
        let value = glow.brightness(&sample_at(0.0, 0.0));
        assert!(!value.is_nan());
    }

    #[test]
    fn star_points_follow_the_parameter() {
        let params = ParameterSet {
            shape_mode: ShapeMode::Star,
            points: 99,
            ..ParameterSet::default()
        };
        match Shape::from_params(&params) {
            Shape::Star(star) => assert_eq!(star.points, MAX_POINTS as f32),
            other => panic!("unexpected shape {other:?}"),
        }
    }
}
