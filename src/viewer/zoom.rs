//! Scale stepping over the bounded zoom range

use thiserror::Error;

use super::{DEFAULT_SCALE_DELTA, MAX_SCALE, MIN_SCALE};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ZoomError {
    #[error("tick count must be a positive integer")]
    InvalidTicks,
}

/// How the engine should derive scale on its next layout pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ScaleValue {
    Explicit(f32),
    /// Fit one whole page to the viewport.
    PageFit,
    /// Engine-chosen scale for the viewport.
    Auto,
}

/// Current scale pair mirrored from the engine.
#[derive(Clone, Copy, Debug)]
pub struct ScaleState {
    pub current_scale: f32,
    pub current_scale_value: ScaleValue,
}

impl Default for ScaleState {
    fn default() -> Self {
        Self {
            current_scale: 1.0,
            current_scale_value: ScaleValue::Auto,
        }
    }
}

impl ScaleState {
    /// Step the scale up by at most `ticks` multiplicative increments.
    /// Returns the new scale when it changed, `None` when already at the
    /// upper bound.
    pub fn zoom_in(&mut self, ticks: u32) -> Result<Option<f32>, ZoomError> {
        if ticks == 0 {
            return Err(ZoomError::InvalidTicks);
        }

        let mut scale = self.current_scale;
        let mut remaining = ticks;
        while remaining > 0 && scale < MAX_SCALE {
            scale = (scale * DEFAULT_SCALE_DELTA).min(MAX_SCALE);
            remaining -= 1;
        }

        Ok(self.commit_step(scale))
    }

    /// Step the scale down by at most `ticks` multiplicative decrements.
    /// Returns the new scale when it changed, `None` when already at the
    /// lower bound.
    pub fn zoom_out(&mut self, ticks: u32) -> Result<Option<f32>, ZoomError> {
        if ticks == 0 {
            return Err(ZoomError::InvalidTicks);
        }

        let mut scale = self.current_scale;
        let mut remaining = ticks;
        while remaining > 0 && scale > MIN_SCALE {
            scale = (scale / DEFAULT_SCALE_DELTA).max(MIN_SCALE);
            remaining -= 1;
        }

        Ok(self.commit_step(scale))
    }

    /// Commit a gesture-transient scale, clamping any overshoot into the
    /// allowed range. Non-finite input resets to 1.0.
    pub fn commit(&mut self, transient: f32) -> f32 {
        let clamped = if transient.is_finite() {
            transient.clamp(MIN_SCALE, MAX_SCALE)
        } else {
            1.0
        };
        self.current_scale = clamped;
        self.current_scale_value = ScaleValue::Explicit(clamped);
        clamped
    }

    fn commit_step(&mut self, scale: f32) -> Option<f32> {
        if (scale - self.current_scale).abs() <= f32::EPSILON {
            return None;
        }
        self.current_scale = scale;
        self.current_scale_value = ScaleValue::Explicit(scale);
        Some(scale)
    }
}
