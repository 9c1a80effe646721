//! Animation sequencing.
//!
//! A sequence is a list of independent `ParameterSet`s derived from one base by
//! sweeping a single field. Frames are plain clones, so later edits to the base
//! (or to one frame) never reach the others.

use std::f32::consts::TAU;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::params::ParameterSet;

pub const MIN_FRAMES: usize = 4;
pub const MAX_FRAMES: usize = 128;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SequenceError {
    #[error("frame count {0} outside {MIN_FRAMES}..={MAX_FRAMES}")]
    FrameCount(usize),
    #[error("sweep amount must be a positive finite number (got {0})")]
    Amount(f32),
    #[error("unknown animation mode '{0}'; expected seed or twist")]
    Mode(String),
}

/// Field swept across the frames of a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnimationMode {
    /// `seed_i = seed + i * amount`.
    SeedSweep,
    /// `twist_i = twist + i * TAU * amount / frame_count`.
    TwistSweep,
}

impl AnimationMode {
    pub fn parse(value: &str) -> Result<Self, SequenceError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "seed" | "seed-sweep" => Ok(AnimationMode::SeedSweep),
            "twist" | "twist-sweep" | "rotate" => Ok(AnimationMode::TwistSweep),
            _ => Err(SequenceError::Mode(value.to_string())),
        }
    }
}

impl fmt::Display for AnimationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnimationMode::SeedSweep => f.write_str("seed-sweep"),
            AnimationMode::TwistSweep => f.write_str("twist-sweep"),
        }
    }
}

/// Derives `frame_count` parameter sets from `base`.
pub fn generate(
    base: &ParameterSet,
    mode: AnimationMode,
    amount: f32,
    frame_count: usize,
) -> Result<Vec<ParameterSet>, SequenceError> {
    if !(MIN_FRAMES..=MAX_FRAMES).contains(&frame_count) {
        return Err(SequenceError::FrameCount(frame_count));
    }
    if !amount.is_finite() || amount <= 0.0 {
        return Err(SequenceError::Amount(amount));
    }

    let twist_step = TAU * amount / frame_count as f32;
    let frames = (0..frame_count)
        .map(|index| {
            let mut frame = base.clone();
            let step = index as f32;
            match mode {
                AnimationMode::SeedSweep => frame.seed = base.seed + step * amount,
                AnimationMode::TwistSweep => frame.twist = base.twist + step * twist_step,
            }
            frame
        })
        .collect();

    debug!(%mode, amount, frame_count, "generated animation sequence");
    Ok(frames)
}
