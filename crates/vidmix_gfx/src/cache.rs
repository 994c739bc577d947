// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-(node, frame) result memoization.
//!
//! A node consumed by several downstream nodes, or by several outputs
//! pulling the same frame number, is evaluated at most once per frame.
//! The first caller to claim a slot computes; racing callers block on a
//! condvar until the writer publishes a result or a failure.
//!
//! The cache also retains each node's most recent published result so
//! outputs skipped by dirty propagation can reuse it.

use crate::backend::TextureHandle;
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use vidmix_core::{NodeId, PixelFormat, Size2D};

/// Published output of one node for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameResult {
    /// Texture holding the node's output
    pub texture: TextureHandle,
    /// Dimensions of the output
    pub size: Size2D,
    /// Pixel format of the output
    pub format: PixelFormat,
}

/// Outcome of claiming a (node, frame) slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// This caller is the writer and must publish or fail the slot
    Compute,
    /// Another caller already published this frame's result
    Ready(FrameResult),
    /// Another caller evaluated successfully but produced no frame
    Empty,
    /// Another caller computed this frame and failed
    Failed,
}

enum SlotState {
    Computing,
    Ready(FrameResult),
    Empty,
    Failed,
}

#[derive(Default)]
struct CacheInner {
    slots: HashMap<(NodeId, u64), SlotState>,
    last: HashMap<NodeId, FrameResult>,
}

/// Memoization table shared by every evaluation of a frame.
#[derive(Default)]
pub struct FrameCache {
    inner: Mutex<CacheInner>,
    ready_cv: Condvar,
}

impl FrameCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the slot for `(node, frame_number)`.
    ///
    /// The first claimant gets [`Claim::Compute`] and owns the slot: it
    /// must call [`FrameCache::publish`] or [`FrameCache::fail`].
    /// Concurrent claimants block until the writer resolves the slot.
    pub fn claim(&self, node: NodeId, frame_number: u64) -> Claim {
        let key = (node, frame_number);
        let mut inner = self.inner.lock();
        loop {
            match inner.slots.get(&key) {
                None => {
                    inner.slots.insert(key, SlotState::Computing);
                    return Claim::Compute;
                }
                Some(SlotState::Ready(result)) => return Claim::Ready(*result),
                Some(SlotState::Empty) => return Claim::Empty,
                Some(SlotState::Failed) => return Claim::Failed,
                Some(SlotState::Computing) => {
                    self.ready_cv.wait(&mut inner);
                }
            }
        }
    }

    /// Publish the writer's result, waking any blocked claimants.
    pub fn publish(&self, node: NodeId, frame_number: u64, result: FrameResult) {
        let mut inner = self.inner.lock();
        inner
            .slots
            .insert((node, frame_number), SlotState::Ready(result));
        inner.last.insert(node, result);
        self.ready_cv.notify_all();
    }

    /// Resolve the writer's slot as successful but frameless, waking
    /// any blocked claimants. Sources that have no frame to offer yet
    /// (a stream between packets, say) land here rather than in
    /// [`FrameCache::fail`].
    pub fn publish_empty(&self, node: NodeId, frame_number: u64) {
        let mut inner = self.inner.lock();
        inner.slots.insert((node, frame_number), SlotState::Empty);
        self.ready_cv.notify_all();
    }

    /// Record the writer's failure, waking any blocked claimants.
    ///
    /// The node's last published result is intentionally kept.
    pub fn fail(&self, node: NodeId, frame_number: u64) {
        let mut inner = self.inner.lock();
        inner.slots.insert((node, frame_number), SlotState::Failed);
        self.ready_cv.notify_all();
    }

    /// Most recent result the node published on any frame.
    pub fn last_output(&self, node: NodeId) -> Option<FrameResult> {
        self.inner.lock().last.get(&node).copied()
    }

    /// Drop per-frame slots older than `oldest_live_frame`, keeping
    /// last-output entries. Called once the pacer retires a frame.
    pub fn retire_before(&self, oldest_live_frame: u64) {
        let mut inner = self.inner.lock();
        inner.slots.retain(|(_, frame), _| *frame >= oldest_live_frame);
    }

    /// Forget everything about a node (called on node removal).
    pub fn forget_node(&self, node: NodeId) {
        let mut inner = self.inner.lock();
        inner.slots.retain(|(owner, _), _| *owner != node);
        inner.last.remove(&node);
    }
}
