// SPDX-License-Identifier: MIT OR Apache-2.0
//! A keyframed track over one node property.

use crate::keyframe::{Interpolation, Keyframe};
use serde::{Deserialize, Serialize};
use vidmix_core::PropValue;

/// Keyframes over one property, sorted by offset.
///
/// Before the first keyframe the track holds (produces no value, the
/// property keeps whatever it had); after the last keyframe the final
/// value holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyTrack {
    /// Name of the property this track drives
    pub property: String,
    keyframes: Vec<Keyframe>,
}

impl PropertyTrack {
    /// Create an empty track for `property`.
    pub fn new(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            keyframes: Vec::new(),
        }
    }

    /// Insert a keyframe, keeping offset order.
    pub fn add_keyframe(&mut self, keyframe: Keyframe) {
        self.keyframes.push(keyframe);
        self.keyframes.sort_by_key(|k| k.offset_pts);
    }

    /// Remove all keyframes.
    pub fn clear(&mut self) {
        self.keyframes.clear();
    }

    /// Whether the track has any keyframes.
    pub fn has_keyframes(&self) -> bool {
        !self.keyframes.is_empty()
    }

    /// The keyframes in offset order.
    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    /// Offset of the last keyframe; the track's duration.
    pub fn end_offset(&self) -> i64 {
        self.keyframes.last().map_or(0, |k| k.offset_pts)
    }

    /// Sample the track at `local_pts` ticks from the clip start.
    ///
    /// Returns `None` before the first keyframe (hold current value)
    /// and on an empty track.
    pub fn evaluate(&self, local_pts: i64) -> Option<PropValue> {
        let first = self.keyframes.first()?;
        if local_pts < first.offset_pts {
            return None;
        }
        // Index of the last keyframe at or before local_pts.
        let at_or_before = self
            .keyframes
            .partition_point(|k| k.offset_pts <= local_pts);
        let prev = &self.keyframes[at_or_before - 1];
        let Some(next) = self.keyframes.get(at_or_before) else {
            // Past the end: final value holds.
            return Some(prev.value.clone());
        };

        let span = next.offset_pts - prev.offset_pts;
        if span <= 0 {
            return Some(prev.value.clone());
        }
        let t = (local_pts - prev.offset_pts) as f64 / span as f64;
        let eased = prev.interpolation.ease(t);
        if prev.interpolation == Interpolation::Step {
            return Some(prev.value.clone());
        }
        Some(prev.value.lerp(&next.value, eased))
    }
}
