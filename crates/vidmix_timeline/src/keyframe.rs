// SPDX-License-Identifier: MIT OR Apache-2.0
//! Keyframe definitions for property animation.

use serde::{Deserialize, Serialize};
use vidmix_core::PropValue;

/// Interpolation mode from a keyframe to the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Interpolation {
    /// Hold the value until the next keyframe
    Step,
    /// Linear interpolation
    #[default]
    Linear,
    /// Smooth ease-in/ease-out
    EaseInOut,
}

impl Interpolation {
    /// Map a linear parameter in `[0, 1]` through the easing curve.
    pub fn ease(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Step => 0.0,
            Self::Linear => t,
            Self::EaseInOut => t * t * (3.0 - 2.0 * t),
        }
    }
}

/// A keyframe on a property track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    /// Offset from the clip start, in 90 kHz PTS ticks
    pub offset_pts: i64,
    /// Value at this keyframe
    pub value: PropValue,
    /// Interpolation mode toward the next keyframe
    pub interpolation: Interpolation,
}

impl Keyframe {
    /// Create a keyframe with the default interpolation.
    pub fn new(offset_pts: i64, value: PropValue) -> Self {
        Self {
            offset_pts,
            value,
            interpolation: Interpolation::default(),
        }
    }

    /// Create a keyframe with an explicit interpolation mode.
    pub fn with_interpolation(
        offset_pts: i64,
        value: PropValue,
        interpolation: Interpolation,
    ) -> Self {
        Self {
            offset_pts,
            value,
            interpolation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_easing_endpoints() {
        for mode in [Interpolation::Linear, Interpolation::EaseInOut] {
            assert_eq!(mode.ease(0.0), 0.0);
            assert_eq!(mode.ease(1.0), 1.0);
        }
        assert_eq!(Interpolation::Step.ease(0.7), 0.0);
    }

    #[test]
    fn test_ease_in_out_midpoint() {
        assert!((Interpolation::EaseInOut.ease(0.5) - 0.5).abs() < 1e-9);
        // Slower than linear near the ends.
        assert!(Interpolation::EaseInOut.ease(0.1) < 0.1);
        assert!(Interpolation::EaseInOut.ease(0.9) > 0.9);
    }

    #[test]
    fn test_ease_clamps_out_of_range() {
        assert_eq!(Interpolation::Linear.ease(-2.0), 0.0);
        assert_eq!(Interpolation::Linear.ease(3.0), 1.0);
    }
}
