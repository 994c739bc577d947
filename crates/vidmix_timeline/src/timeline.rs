// SPDX-License-Identifier: MIT OR Apache-2.0
//! Frame timeline with a drop-late drift policy.
//!
//! The timeline turns "now" into the next frame to render: a frame
//! number and the target PTS that frame should present at. When the
//! caller falls behind by more than one frame period, the missed
//! frames are dropped and the frame index skips forward. A tick never
//! does more than one frame's work and never blocks to catch up.
//!
//! Recent ticks are kept in a ring buffer so diagnostics and nodes can
//! look back at what was actually presented.

use crate::clock::ticks_per_frame;
use std::collections::VecDeque;
use vidmix_core::Rational;

/// Record of one produced tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickRecord {
    /// Frame index since the last rebase. Skips forward on drops.
    pub frame_number: u64,
    /// PTS the frame was scheduled to present at
    pub target_pts: i64,
    /// PTS at which the tick actually ran
    pub actual_pts: i64,
}

impl TickRecord {
    /// Lateness of the tick in PTS ticks.
    pub fn lateness(&self) -> i64 {
        self.actual_pts - self.target_pts
    }
}

/// Derives per-frame target timestamps for one frame rate.
#[derive(Debug)]
pub struct Timeline {
    rate: Rational,
    base_pts: i64,
    next_frame: u64,
    records: VecDeque<TickRecord>,
    capacity: usize,
}

/// Ring buffer depth for look-back queries.
const DEFAULT_HISTORY: usize = 128;

impl Timeline {
    /// Create a timeline at `rate`, based at PTS 0.
    pub fn new(rate: Rational) -> Self {
        Self {
            rate,
            base_pts: 0,
            next_frame: 0,
            records: VecDeque::with_capacity(DEFAULT_HISTORY),
            capacity: DEFAULT_HISTORY,
        }
    }

    /// Frame rate of this timeline.
    pub fn rate(&self) -> Rational {
        self.rate
    }

    /// Restart frame numbering from zero, anchored at `now_pts`.
    pub fn rebase(&mut self, now_pts: i64) {
        self.base_pts = now_pts;
        self.next_frame = 0;
        self.records.clear();
    }

    /// Target PTS of the frame the next [`advance`](Self::advance)
    /// will produce, assuming no drops.
    pub fn next_target_pts(&self) -> i64 {
        self.base_pts + self.next_frame as i64 * ticks_per_frame(self.rate)
    }

    /// Produce the tick for `now_pts`.
    ///
    /// If `now_pts` is more than one frame period past the pending
    /// target, the missed frames are dropped: the frame index skips
    /// forward so the returned target stays within one period of now.
    pub fn advance(&mut self, now_pts: i64) -> TickRecord {
        let period = ticks_per_frame(self.rate);
        let mut target = self.next_target_pts();
        if period > 0 && now_pts > target + period {
            let missed = ((now_pts - target) / period) as u64;
            tracing::warn!(
                missed,
                rate = %self.rate,
                "timeline fell behind, dropping frames"
            );
            self.next_frame += missed;
            target = self.next_target_pts();
        }
        self.note_tick(self.next_frame, target, now_pts)
    }

    /// Record a tick whose frame number and target were derived by an
    /// external cadence, keeping the look-back history consistent with
    /// [`advance`](Self::advance).
    pub fn note_tick(&mut self, frame_number: u64, target_pts: i64, actual_pts: i64) -> TickRecord {
        let record = TickRecord {
            frame_number,
            target_pts,
            actual_pts,
        };
        self.next_frame = frame_number + 1;
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
        record
    }

    /// Look back at a previously produced tick, if still in history.
    pub fn record(&self, frame_number: u64) -> Option<TickRecord> {
        self.records
            .iter()
            .rev()
            .find(|r| r.frame_number == frame_number)
            .copied()
    }

    /// The most recent tick.
    pub fn last_record(&self) -> Option<TickRecord> {
        self.records.back().copied()
    }
}
