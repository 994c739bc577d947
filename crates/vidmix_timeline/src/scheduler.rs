// SPDX-License-Identifier: MIT OR Apache-2.0
//! Frame-rate aware scheduling of output nodes.
//!
//! Each registered output runs at its own frame rate. The scheduler
//! keeps a min-heap ordered by each output's next due PTS and answers
//! "which output is due now, and if none, how long until the earliest".
//! Due checks use a small epsilon so a tick that fires marginally
//! early still counts as on time.
//!
//! Drift policy: an output more than epsilon overdue has its missed
//! frame dropped and its cadence advanced; the scheduler never renders
//! late frames to catch up. If real time overruns everything the
//! scheduler knows about, all outputs are rebased on the current PTS.

use crate::clock::{round_to_frame_boundary, ticks_per_frame, PtsClock};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Duration;
use vidmix_core::{NodeId, Rational};

/// Timing tolerance in 90 kHz ticks (about 2.2 ms).
const EPSILON: i64 = 200;

/// Scheduling state of one output.
#[derive(Debug, Clone, Copy)]
struct ScheduleInfo {
    output: NodeId,
    rate: Rational,
    /// PTS the cadence is anchored at
    base_pts: i64,
    /// PTS of the next due frame
    next_pts: i64,
    /// Frames produced since the last rebase
    frame_number: u64,
}

impl ScheduleInfo {
    /// Step to the next frame, returning the PTS the current frame
    /// presents at.
    fn advance(&mut self) -> i64 {
        let present = self.next_pts;
        self.frame_number += 1;
        self.next_pts = self.base_pts + self.frame_number as i64 * ticks_per_frame(self.rate);
        present
    }

    fn rebase(&mut self, pts: i64) {
        self.base_pts = pts;
        self.next_pts = pts;
        self.frame_number = 0;
    }
}

// Min-heap on next_pts via reversed comparison; ties broken by handle
// so the order is total.
impl PartialEq for ScheduleInfo {
    fn eq(&self, other: &Self) -> bool {
        self.next_pts == other.next_pts && self.output == other.output
    }
}
impl Eq for ScheduleInfo {}
impl PartialOrd for ScheduleInfo {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for ScheduleInfo {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .next_pts
            .cmp(&self.next_pts)
            .then_with(|| other.output.cmp(&self.output))
    }
}

/// Answer from [`OutputScheduler::next_ready_at`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextTick {
    /// An output is due now.
    Due {
        /// The output node to render
        output: NodeId,
        /// PTS the rendered frame presents at
        target_pts: i64,
        /// The output's frame index since its last rebase
        frame_number: u64,
    },
    /// Nothing due yet; the earliest output is this far away.
    Wait(Duration),
    /// No outputs registered.
    Idle,
}

/// Min-heap scheduler over all registered outputs.
#[derive(Debug, Default)]
pub struct OutputScheduler {
    master_clock: PtsClock,
    heap: BinaryHeap<ScheduleInfo>,
    /// Highest PTS the scheduler has planned for
    upper_boundary_pts: i64,
}

impl OutputScheduler {
    /// Create an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current PTS of the master clock.
    pub fn current_pts(&self) -> i64 {
        self.master_clock.current_pts()
    }

    /// Register an output at `rate`, aligned to its nearest frame
    /// boundary from the current master PTS.
    pub fn add_output(&mut self, output: NodeId, rate: Rational) {
        let base = round_to_frame_boundary(self.master_clock.current_pts(), rate);
        let mut info = ScheduleInfo {
            output,
            rate,
            base_pts: 0,
            next_pts: 0,
            frame_number: 0,
        };
        info.rebase(base);
        tracing::debug!(%output, %rate, base, "output scheduled");
        self.heap.push(info);
    }

    /// Unregister an output.
    pub fn remove_output(&mut self, output: NodeId) {
        self.heap.retain(|info| info.output != output);
    }

    /// Number of registered outputs.
    pub fn output_count(&self) -> usize {
        self.heap.len()
    }

    /// Restart the master clock and rebase every output at PTS 0.
    pub fn play(&mut self) {
        self.master_clock.reset();
        let mut infos: Vec<ScheduleInfo> = self.heap.drain().collect();
        for info in &mut infos {
            info.rebase(0);
        }
        self.heap.extend(infos);
        self.upper_boundary_pts = 0;
    }

    /// Poll using the master clock.
    pub fn next_ready(&mut self) -> NextTick {
        self.next_ready_at(self.master_clock.current_pts())
    }

    /// Poll at an explicit PTS: return the due output, or how long
    /// until the earliest one. Overdue outputs have their late frames
    /// dropped before the next due one is considered.
    pub fn next_ready_at(&mut self, current_pts: i64) -> NextTick {
        if self.heap.is_empty() {
            return NextTick::Idle;
        }

        // Real time has passed everything we planned for; a stall
        // longer than every cadence. Rebase rather than replaying the
        // gap frame by frame.
        if current_pts > self.upper_boundary_pts {
            let mut infos: Vec<ScheduleInfo> = self.heap.drain().collect();
            for info in &mut infos {
                info.rebase(current_pts);
            }
            self.heap.extend(infos);
            self.upper_boundary_pts = current_pts;
        }

        loop {
            let Some(mut info) = self.heap.pop() else {
                return NextTick::Idle;
            };
            let diff = info.next_pts - current_pts;

            if diff < -EPSILON {
                // Overdue: drop the missed frame and keep looking.
                tracing::warn!(
                    output = %info.output,
                    late_ticks = -diff,
                    "dropping overdue frame"
                );
                info.advance();
                self.upper_boundary_pts = self.upper_boundary_pts.max(info.next_pts);
                self.heap.push(info);
                continue;
            }

            if diff <= EPSILON {
                // Due now.
                let frame_number = info.frame_number;
                let target_pts = info.advance();
                self.upper_boundary_pts = self.upper_boundary_pts.max(info.next_pts);
                let output = info.output;
                self.heap.push(info);
                return NextTick::Due {
                    output,
                    target_pts,
                    frame_number,
                };
            }

            // Not due yet.
            self.heap.push(info);
            let ns = crate::clock::nanos_from_pts(diff);
            return NextTick::Wait(Duration::from_nanos(ns as u64));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(index: u32) -> NodeId {
        NodeId::from_raw(index, 0)
    }

    /// Scheduler with a known state: outputs rebased at PTS 0.
    fn scheduler_at_zero(outputs: &[(NodeId, Rational)]) -> OutputScheduler {
        let mut sched = OutputScheduler::new();
        for &(id, rate) in outputs {
            sched.add_output(id, rate);
        }
        sched.play();
        sched
    }

    #[test]
    fn test_empty_scheduler_is_idle() {
        let mut sched = OutputScheduler::new();
        assert_eq!(sched.next_ready_at(0), NextTick::Idle);
    }

    #[test]
    fn test_single_output_cadence() {
        let out = node(0);
        let mut sched = scheduler_at_zero(&[(out, Rational::new(30, 1))]);
        match sched.next_ready_at(0) {
            NextTick::Due {
                output,
                target_pts,
                frame_number,
            } => {
                assert_eq!(output, out);
                assert_eq!(target_pts, 0);
                assert_eq!(frame_number, 0);
            }
            other => panic!("expected due, got {other:?}"),
        }
        // Same instant again: next frame is 3000 ticks away.
        match sched.next_ready_at(0) {
            NextTick::Wait(wait) => {
                assert_eq!(wait, Duration::from_nanos(3000 * 1_000_000_000 / 90_000));
            }
            other => panic!("expected wait, got {other:?}"),
        }
        match sched.next_ready_at(3000) {
            NextTick::Due {
                target_pts,
                frame_number,
                ..
            } => {
                assert_eq!(target_pts, 3000);
                assert_eq!(frame_number, 1);
            }
            other => panic!("expected due, got {other:?}"),
        }
    }

    #[test]
    fn test_mixed_rates_interleave_by_due_time() {
        let fast = node(0); // 60 fps, period 1500
        let slow = node(1); // 30 fps, period 3000
        let mut sched = scheduler_at_zero(&[
            (fast, Rational::new(60, 1)),
            (slow, Rational::new(30, 1)),
        ]);
        // Both due at 0; drain them.
        let mut due_at_zero = Vec::new();
        while let NextTick::Due { output, .. } = sched.next_ready_at(0) {
            due_at_zero.push(output);
        }
        assert_eq!(due_at_zero.len(), 2);
        // At 1500 only the fast output is due.
        match sched.next_ready_at(1500) {
            NextTick::Due { output, .. } => assert_eq!(output, fast),
            other => panic!("expected fast output due, got {other:?}"),
        }
        assert!(matches!(sched.next_ready_at(1500), NextTick::Wait(_)));
    }

    #[test]
    fn test_small_earliness_within_epsilon_counts_as_due() {
        let out = node(0);
        let mut sched = scheduler_at_zero(&[(out, Rational::new(30, 1))]);
        let _ = sched.next_ready_at(0);
        // 100 ticks early is within tolerance.
        assert!(matches!(sched.next_ready_at(2900), NextTick::Due { .. }));
    }

    #[test]
    fn test_overdue_frames_are_dropped_not_replayed() {
        let out = node(0);
        let mut sched = scheduler_at_zero(&[(out, Rational::new(30, 1))]);
        let _ = sched.next_ready_at(0);
        // Arrive two and a bit periods late, but before the upper
        // boundary rebase would trigger from a registered slower
        // output; frame 1 and 2 must be dropped, frame 3 presents.
        sched.upper_boundary_pts = 100_000;
        match sched.next_ready_at(9100) {
            NextTick::Due {
                target_pts,
                frame_number,
                ..
            } => {
                assert_eq!(frame_number, 3);
                assert_eq!(target_pts, 9000);
            }
            other => panic!("expected due, got {other:?}"),
        }
    }

    #[test]
    fn test_long_stall_rebases_all_outputs() {
        let out = node(0);
        let mut sched = scheduler_at_zero(&[(out, Rational::new(30, 1))]);
        let _ = sched.next_ready_at(0);
        // Way past everything planned: cadence restarts at now.
        match sched.next_ready_at(1_000_000) {
            NextTick::Due {
                target_pts,
                frame_number,
                ..
            } => {
                assert_eq!(target_pts, 1_000_000);
                assert_eq!(frame_number, 0);
            }
            other => panic!("expected due, got {other:?}"),
        }
    }

    #[test]
    fn test_remove_output() {
        let a = node(0);
        let b = node(1);
        let mut sched = scheduler_at_zero(&[
            (a, Rational::new(30, 1)),
            (b, Rational::new(30, 1)),
        ]);
        sched.remove_output(a);
        assert_eq!(sched.output_count(), 1);
        match sched.next_ready_at(0) {
            NextTick::Due { output, .. } => assert_eq!(output, b),
            other => panic!("expected due, got {other:?}"),
        }
    }
}
