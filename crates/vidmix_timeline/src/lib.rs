// SPDX-License-Identifier: MIT OR Apache-2.0
//! Timing and animation for the vidmix engine.
//!
//! - [`clock`]: monotonic wall clock and the 90 kHz presentation clock
//! - [`timeline`]: per-frame target PTS derivation with a drop-late drift policy
//! - [`scheduler`]: frame-rate aware scheduling of multiple outputs
//! - [`keyframe`], [`track`], [`clip`], [`anim`]: keyframed property animation
//!   that writes onto graph nodes and marks them dirty

pub mod anim;
pub mod clip;
pub mod clock;
pub mod error;
pub mod keyframe;
pub mod scheduler;
pub mod timeline;
pub mod track;

pub use anim::AnimationSystem;
pub use clip::{AnimationClip, ClipState, LoopMode};
pub use clock::{PtsClock, WallClock, TIMEBASE_HZ};
pub use error::AnimError;
pub use keyframe::{Interpolation, Keyframe};
pub use scheduler::{NextTick, OutputScheduler};
pub use timeline::{TickRecord, Timeline};
pub use track::PropertyTrack;
