//! Stepwise volume ramps
//!
//! A fade moves volume by a fixed step on every timer tick:
//! - **Fade-in**: while below the ceiling, add one step; at or above it,
//!   snap to exactly 1.0 and finish.
//! - **Fade-out**: while above the floor, subtract one step; at or below it,
//!   snap to exactly 0.0 and finish.
//!
//! Volumes are quantized after every step so repeated 0.1 increments land on
//! 0.3, 0.9, ... instead of drifting to 0.30000001, and are always clamped
//! to [0.0, 1.0]. A step finer than the grid counts as one grid unit, so
//! every fade finishes.

use std::time::Duration;

use emotune_common::config::{FadeConfig, VOLUME_RESOLUTION};

pub use emotune_common::events::FadeDirection;

/// Ramp parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeParams {
    pub tick_interval: Duration,
    pub step: f32,
    pub floor: f32,
    pub ceiling: f32,
}

impl From<&FadeConfig> for FadeParams {
    fn from(config: &FadeConfig) -> Self {
        Self {
            tick_interval: config.tick_interval(),
            step: config.step,
            floor: config.floor,
            ceiling: config.ceiling,
        }
    }
}

impl Default for FadeParams {
    fn default() -> Self {
        Self::from(&FadeConfig::default())
    }
}

/// Outcome of one fade tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FadeStep {
    /// Apply this volume and keep the timer running
    Continue(f32),
    /// Apply this volume and stop the timer
    Finished(f32),
}

impl FadeStep {
    pub fn volume(self) -> f32 {
        match self {
            FadeStep::Continue(v) | FadeStep::Finished(v) => v,
        }
    }

    pub fn is_finished(self) -> bool {
        matches!(self, FadeStep::Finished(_))
    }
}

/// Compute the volume for the next tick of a fade
pub fn next_step(direction: FadeDirection, volume: f32, params: &FadeParams) -> FadeStep {
    let step = params.step.max(1.0 / VOLUME_RESOLUTION);
    match direction {
        FadeDirection::In => {
            if volume < params.ceiling {
                FadeStep::Continue(quantize(volume + step))
            } else {
                FadeStep::Finished(1.0)
            }
        }
        FadeDirection::Out => {
            if volume > params.floor {
                FadeStep::Continue(quantize(volume - step))
            } else {
                FadeStep::Finished(0.0)
            }
        }
    }
}

fn quantize(volume: f32) -> f32 {
    ((volume * VOLUME_RESOLUTION).round() / VOLUME_RESOLUTION).clamp(0.0, 1.0)
}
