// SPDX-License-Identifier: MIT OR Apache-2.0
//! An animation clip: a set of property tracks with transport state.
//!
//! The transport is a small state machine over Stopped, Playing and
//! Paused. Pausing remembers the local time; resuming shifts the start
//! anchor by the pause duration so playback continues exactly where it
//! left off. Stopping writes nothing further; the target node keeps
//! the last value that was applied.

use crate::track::PropertyTrack;
use vidmix_core::{NodeId, PropValue};

/// Transport state of a clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClipState {
    /// Not running; evaluation produces nothing
    #[default]
    Stopped,
    /// Running; local time advances with global PTS
    Playing,
    /// Frozen at the local time captured when paused
    Paused,
}

/// What happens when local time passes the clip duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopMode {
    /// Clamp to the end; final values hold
    #[default]
    None,
    /// Wrap around and play again
    Loop,
}

/// A set of property tracks animating one node.
#[derive(Debug)]
pub struct AnimationClip {
    /// The node whose properties this clip drives
    pub node: NodeId,
    /// Looping behavior
    pub loop_mode: LoopMode,
    /// Explicit duration in PTS ticks; when `None`, the longest track
    /// determines the duration
    pub duration: Option<i64>,
    tracks: Vec<PropertyTrack>,
    state: ClipState,
    start_pts: i64,
    pause_pts: i64,
    pause_local: i64,
}

impl AnimationClip {
    /// Create a stopped clip targeting `node`.
    pub fn new(node: NodeId) -> Self {
        Self {
            node,
            loop_mode: LoopMode::default(),
            duration: None,
            tracks: Vec::new(),
            state: ClipState::Stopped,
            start_pts: 0,
            pause_pts: 0,
            pause_local: 0,
        }
    }

    /// Get or create the track for `property`. An existing track is
    /// cleared, not duplicated.
    pub fn add_track(&mut self, property: &str) -> &mut PropertyTrack {
        if let Some(index) = self.tracks.iter().position(|t| t.property == property) {
            self.tracks[index].clear();
            return &mut self.tracks[index];
        }
        self.tracks.push(PropertyTrack::new(property));
        // just pushed, cannot be empty
        let last = self.tracks.len() - 1;
        &mut self.tracks[last]
    }

    /// The clip's tracks.
    pub fn tracks(&self) -> &[PropertyTrack] {
        &self.tracks
    }

    /// Current transport state.
    pub fn state(&self) -> ClipState {
        self.state
    }

    /// Effective duration: explicit if set, otherwise the end of the
    /// longest track.
    pub fn effective_duration(&self) -> i64 {
        if let Some(duration) = self.duration {
            if duration > 0 {
                return duration;
            }
        }
        self.tracks.iter().map(PropertyTrack::end_offset).max().unwrap_or(0)
    }

    /// Start playing, anchored at `start_pts`.
    pub fn play(&mut self, start_pts: i64) {
        self.start_pts = start_pts;
        self.state = ClipState::Playing;
        self.pause_pts = 0;
        self.pause_local = 0;
    }

    /// Freeze at the current position. No-op unless playing.
    pub fn pause(&mut self, current_pts: i64) {
        if self.state != ClipState::Playing {
            return;
        }
        self.pause_local = self.local_time(current_pts).unwrap_or(0);
        self.pause_pts = current_pts;
        self.state = ClipState::Paused;
    }

    /// Continue from the paused position. The pause duration shifts
    /// the start anchor so local time is preserved. No-op unless
    /// paused.
    pub fn resume(&mut self, current_pts: i64) {
        if self.state != ClipState::Paused {
            return;
        }
        self.start_pts += current_pts - self.pause_pts;
        self.state = ClipState::Playing;
    }

    /// Stop. The clip produces no further values.
    pub fn stop(&mut self) {
        self.state = ClipState::Stopped;
        self.pause_pts = 0;
        self.pause_local = 0;
    }

    /// Local time in PTS ticks for a global PTS, after the loop
    /// transform. `None` when stopped or not yet started.
    pub fn local_time(&self, global_pts: i64) -> Option<i64> {
        match self.state {
            ClipState::Stopped => None,
            ClipState::Paused => Some(self.pause_local),
            ClipState::Playing => {
                if global_pts < self.start_pts {
                    return None;
                }
                let local = global_pts - self.start_pts;
                let duration = self.effective_duration();
                if duration <= 0 {
                    return Some(local);
                }
                Some(match self.loop_mode {
                    LoopMode::None => local.min(duration),
                    LoopMode::Loop => local % duration,
                })
            }
        }
    }

    /// Sample every track at `global_pts`. Yields `(property, value)`
    /// pairs for tracks that produce a value.
    pub fn evaluate(&self, global_pts: i64) -> Vec<(&str, PropValue)> {
        let Some(local) = self.local_time(global_pts) else {
            return Vec::new();
        };
        self.tracks
            .iter()
            .filter_map(|track| {
                track
                    .evaluate(local)
                    .map(|value| (track.property.as_str(), value))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyframe::Keyframe;

    fn clip_with_ramp() -> AnimationClip {
        let mut clip = AnimationClip::new(NodeId::from_raw(0, 0));
        let track = clip.add_track("mix");
        track.add_keyframe(Keyframe::new(0, PropValue::Float(0.0)));
        track.add_keyframe(Keyframe::new(9000, PropValue::Float(1.0)));
        clip
    }

    #[test]
    fn test_stopped_clip_produces_nothing() {
        let clip = clip_with_ramp();
        assert_eq!(clip.state(), ClipState::Stopped);
        assert!(clip.evaluate(5000).is_empty());
    }

    #[test]
    fn test_playing_clip_tracks_global_time() {
        let mut clip = clip_with_ramp();
        clip.play(1000);
        assert_eq!(clip.local_time(1000), Some(0));
        assert_eq!(
            clip.evaluate(5500),
            vec![("mix", PropValue::Float(0.5))]
        );
    }

    #[test]
    fn test_before_start_produces_nothing() {
        let mut clip = clip_with_ramp();
        clip.play(10_000);
        assert_eq!(clip.local_time(9000), None);
        assert!(clip.evaluate(9000).is_empty());
    }

    #[test]
    fn test_pause_freezes_and_resume_preserves_progress() {
        let mut clip = clip_with_ramp();
        clip.play(0);
        clip.pause(4500); // halfway
        // Frozen while paused, however much global time passes.
        assert_eq!(clip.local_time(100_000), Some(4500));
        clip.resume(50_000);
        // Progress continues from the midpoint.
        assert_eq!(clip.local_time(50_000), Some(4500));
        assert_eq!(clip.local_time(54_500), Some(9000));
    }

    #[test]
    fn test_pause_resume_are_state_guarded() {
        let mut clip = clip_with_ramp();
        clip.pause(1000); // stopped: no-op
        assert_eq!(clip.state(), ClipState::Stopped);
        clip.play(0);
        clip.resume(1000); // playing: no-op
        assert_eq!(clip.state(), ClipState::Playing);
        assert_eq!(clip.local_time(1000), Some(1000));
    }

    #[test]
    fn test_clamp_at_end_without_loop() {
        let mut clip = clip_with_ramp();
        clip.play(0);
        assert_eq!(clip.local_time(20_000), Some(9000));
        assert_eq!(
            clip.evaluate(20_000),
            vec![("mix", PropValue::Float(1.0))]
        );
    }

    #[test]
    fn test_loop_wraps_local_time() {
        let mut clip = clip_with_ramp();
        clip.loop_mode = LoopMode::Loop;
        clip.play(0);
        assert_eq!(clip.local_time(9000), Some(0));
        assert_eq!(clip.local_time(13_500), Some(4500));
    }

    #[test]
    fn test_explicit_duration_overrides_track_end() {
        let mut clip = clip_with_ramp();
        clip.duration = Some(4500);
        clip.loop_mode = LoopMode::Loop;
        clip.play(0);
        assert_eq!(clip.local_time(4500), Some(0));
    }

    #[test]
    fn test_add_track_replaces_existing() {
        let mut clip = clip_with_ramp();
        let track = clip.add_track("mix");
        assert!(!track.has_keyframes(), "existing track is cleared");
        assert_eq!(clip.tracks().len(), 1);
    }
}
