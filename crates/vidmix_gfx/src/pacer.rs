// SPDX-License-Identifier: MIT OR Apache-2.0
//! Frames-in-flight backpressure.
//!
//! Submission is asynchronous; the CPU only stalls when the number of
//! outstanding, unfenced frames would exceed the configured limit. At
//! that point [`FramePacer::begin_frame`] blocks until the oldest
//! outstanding frame's fence signals.

use crate::backend::{FenceHandle, GpuBackend, GpuError};
use parking_lot::Mutex;
use std::collections::VecDeque;

struct Outstanding {
    frame_number: u64,
    fence: FenceHandle,
}

/// Tracks submitted-but-unfenced frames against the frames-in-flight
/// limit.
pub struct FramePacer {
    frames_in_flight: usize,
    outstanding: Mutex<VecDeque<Outstanding>>,
}

impl FramePacer {
    /// Create a pacer for the given frames-in-flight count (clamped to 1).
    pub fn new(frames_in_flight: u32) -> Self {
        Self {
            frames_in_flight: frames_in_flight.max(1) as usize,
            outstanding: Mutex::new(VecDeque::new()),
        }
    }

    /// Gate the start of a new frame.
    ///
    /// Retires every already-signaled frame, then, if the in-flight
    /// limit is still reached, blocks on the oldest fence. Returns the
    /// oldest frame number still outstanding afterwards (callers use it
    /// to retire stale cache slots).
    pub fn begin_frame(&self, gpu: &dyn GpuBackend) -> Result<Option<u64>, GpuError> {
        loop {
            // Drop whatever already completed without blocking.
            let oldest = {
                let mut outstanding = self.outstanding.lock();
                while let Some(front) = outstanding.front() {
                    if gpu.fence_signaled(front.fence)? {
                        outstanding.pop_front();
                    } else {
                        break;
                    }
                }
                if outstanding.len() < self.frames_in_flight {
                    return Ok(outstanding.front().map(|o| o.frame_number));
                }
                // Limit reached; the oldest fence must signal first.
                match outstanding.front() {
                    Some(front) => front.fence,
                    None => return Ok(None),
                }
            };
            // Wait outside the lock so submitters are not blocked.
            gpu.wait_fence(oldest)?;
        }
    }

    /// Record a submitted frame and the fence guarding its completion.
    pub fn frame_submitted(&self, frame_number: u64, fence: FenceHandle) {
        self.outstanding.lock().push_back(Outstanding {
            frame_number,
            fence,
        });
    }

    /// Number of frames currently outstanding.
    pub fn outstanding_frames(&self) -> usize {
        self.outstanding.lock().len()
    }
}
