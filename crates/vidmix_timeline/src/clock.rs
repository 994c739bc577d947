// SPDX-License-Identifier: MIT OR Apache-2.0
//! Wall clock and presentation clock.
//!
//! All presentation timestamps (PTS) use the standard 90 kHz video
//! timebase. Frame-period math works over [`Rational`] frame rates so
//! fractional rates like 30000/1001 stay exact.

use std::time::{Duration, Instant};
use vidmix_core::Rational;

/// Ticks per second of the presentation timebase.
pub const TIMEBASE_HZ: i64 = 90_000;

/// Monotonic elapsed-time source.
#[derive(Debug, Clone, Copy)]
pub struct WallClock {
    start: Instant,
}

impl WallClock {
    /// Start a clock at the current instant.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Restart from zero.
    pub fn reset(&mut self) {
        self.start = Instant::now();
    }

    /// Elapsed time since construction or the last reset.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Presentation clock counting 90 kHz ticks over a wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct PtsClock {
    wall: WallClock,
}

impl PtsClock {
    /// Start a clock at PTS 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restart from PTS 0.
    pub fn reset(&mut self) {
        self.wall.reset();
    }

    /// Current PTS from wall-clock elapsed time.
    pub fn current_pts(&self) -> i64 {
        pts_from_nanos(self.wall.elapsed().as_nanos() as i64)
    }

    /// Wall time to wait until `target_pts`, zero if already past.
    pub fn time_until(&self, target_pts: i64) -> Duration {
        let diff = target_pts - self.current_pts();
        if diff <= 0 {
            Duration::ZERO
        } else {
            Duration::from_nanos(nanos_from_pts(diff) as u64)
        }
    }
}

/// Convert elapsed nanoseconds to 90 kHz ticks. Widened intermediate,
/// so uptimes past `i64::MAX / TIMEBASE_HZ` nanoseconds (about a day)
/// stay exact.
pub fn pts_from_nanos(ns: i64) -> i64 {
    ((ns as i128 * TIMEBASE_HZ as i128) / 1_000_000_000) as i64
}

/// Convert 90 kHz ticks to nanoseconds, with the same widening.
pub fn nanos_from_pts(pts: i64) -> i64 {
    ((pts as i128 * 1_000_000_000) / TIMEBASE_HZ as i128) as i64
}

/// PTS ticks per frame at `rate` frames per second. Zero for a
/// degenerate rate.
pub fn ticks_per_frame(rate: Rational) -> i64 {
    if rate.num() <= 0 || rate.den() <= 0 {
        return 0;
    }
    (TIMEBASE_HZ * rate.den()) / rate.num()
}

/// Round a PTS to the nearest frame boundary of `rate`.
pub fn round_to_frame_boundary(pts: i64, rate: Rational) -> i64 {
    let period = ticks_per_frame(rate);
    if period == 0 {
        return pts;
    }
    let frame = (pts + period / 2) / period;
    frame * period
}
