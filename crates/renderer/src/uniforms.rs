use bytemuck::{Pod, Zeroable};
use glowshader::{ParameterSet, Rgb, ShapeMode};

/// Uniform block uploaded to a surface for one glow.
///
/// Laid out as std140 so a GPU backend can bind it directly; the software
/// surface decodes the same bytes back into a `ParameterSet` before shading.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlowUniforms {
    /// `pos_x, pos_y, scale, twist`
    pub u_transform: [f32; 4],
    /// `size_x, size_y, -, -`
    pub u_size: [f32; 4],
    /// `ring_radius, ring_width, ring_opacity, points`
    pub u_ring: [f32; 4],
    /// `r, g, b, intensity`
    pub u_color: [f32; 4],
    /// `gain, contrast, falloff, dist_str`
    pub u_tone: [f32; 4],
    /// `freq, seed, speed, time`
    pub u_motion: [f32; 4],
    pub u_shape: i32,
    pub u_pixel_count: u32,
    pub u_show_grid: u32,
    pub u_paused: u32,
}

unsafe impl Zeroable for GlowUniforms {}
unsafe impl Pod for GlowUniforms {}

impl GlowUniforms {
    pub fn from_params(params: &ParameterSet) -> Self {
        let color = params.color.to_array();
        Self {
            u_transform: [params.pos_x, params.pos_y, params.scale, params.twist],
            u_size: [params.size_x, params.size_y, 0.0, 0.0],
            u_ring: [
                params.ring_radius,
                params.ring_width,
                params.ring_opacity,
                params.points as f32,
            ],
            u_color: [color[0], color[1], color[2], params.intensity],
            u_tone: [params.gain, params.contrast, params.falloff, params.dist_str],
            u_motion: [params.freq, params.seed, params.speed, params.time],
            u_shape: shape_index(params.shape_mode),
            u_pixel_count: params.pixel_count,
            u_show_grid: params.show_grid as u32,
            u_paused: params.paused as u32,
        }
    }

    /// Reconstructs the parameter set encoded in this block.
    pub fn to_params(&self) -> ParameterSet {
        ParameterSet {
            pos_x: self.u_transform[0],
            pos_y: self.u_transform[1],
            scale: self.u_transform[2],
            twist: self.u_transform[3],
            size_x: self.u_size[0],
            size_y: self.u_size[1],
            shape_mode: shape_from_index(self.u_shape),
            ring_radius: self.u_ring[0],
            ring_width: self.u_ring[1],
            ring_opacity: self.u_ring[2],
            points: self.u_ring[3].max(0.0).round() as u32,
            color: Rgb::new(self.u_color[0], self.u_color[1], self.u_color[2]),
            intensity: self.u_color[3],
            gain: self.u_tone[0],
            contrast: self.u_tone[1],
            falloff: self.u_tone[2],
            dist_str: self.u_tone[3],
            freq: self.u_motion[0],
            seed: self.u_motion[1],
            speed: self.u_motion[2],
            time: self.u_motion[3],
            paused: self.u_paused != 0,
            pixel_count: self.u_pixel_count,
            show_grid: self.u_show_grid != 0,
        }
    }
}

fn shape_index(mode: ShapeMode) -> i32 {
    match mode {
        ShapeMode::Center => 0,
        ShapeMode::Ring => 1,
        ShapeMode::Nebula => 2,
        ShapeMode::Star => 3,
        ShapeMode::Polygon => 4,
    }
}

fn shape_from_index(index: i32) -> ShapeMode {
    match index {
        0 => ShapeMode::Center,
        1 => ShapeMode::Ring,
        2 => ShapeMode::Nebula,
        3 => ShapeMode::Star,
        _ => ShapeMode::Polygon,
    }
}
