// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pooled scratch render targets.
//!
//! A node's intermediate output for frame N must not alias the buffer
//! frame N-1 may still be reading on the GPU. The pool therefore keys
//! entries by `(producing node, frame_number % frames_in_flight)`: two
//! consecutive frames land in different slots, and a slot is only
//! rewritten once its frame distance guarantees the prior use is fenced
//! (enforced by the caller via [`crate::FramePacer`]).

use crate::backend::{GpuBackend, GpuError, TextureDesc, TextureHandle};
use parking_lot::Mutex;
use std::collections::HashMap;
use vidmix_core::NodeId;

/// A texture checked out of the pool for the current frame.
#[derive(Debug, Clone, Copy)]
pub struct PooledTexture {
    /// Backend texture handle
    pub texture: TextureHandle,
    /// Frames-in-flight slot this texture belongs to
    pub slot: u32,
}

struct PoolEntry {
    desc: TextureDesc,
    texture: TextureHandle,
}

/// Pool of per-node scratch render targets, partitioned per
/// frames-in-flight slot.
pub struct TexturePool {
    frames_in_flight: u32,
    entries: Mutex<HashMap<(NodeId, u32), PoolEntry>>,
}

impl TexturePool {
    /// Create a pool for the given frames-in-flight count (clamped to 1).
    pub fn new(frames_in_flight: u32) -> Self {
        Self {
            frames_in_flight: frames_in_flight.max(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Frames-in-flight this pool partitions for.
    pub fn frames_in_flight(&self) -> u32 {
        self.frames_in_flight
    }

    /// Slot index used for a frame number.
    pub fn slot_for_frame(&self, frame_number: u64) -> u32 {
        (frame_number % u64::from(self.frames_in_flight)) as u32
    }

    /// Hand out the scratch target for `node` in the slot of
    /// `frame_number`, creating or recreating it when the description
    /// does not match the pooled entry.
    pub fn acquire(
        &self,
        gpu: &dyn GpuBackend,
        node: NodeId,
        frame_number: u64,
        desc: &TextureDesc,
    ) -> Result<PooledTexture, GpuError> {
        let slot = self.slot_for_frame(frame_number);
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get(&(node, slot)) {
            if entry.desc == *desc {
                return Ok(PooledTexture {
                    texture: entry.texture,
                    slot,
                });
            }
            tracing::debug!(%node, slot, "recreating pooled target, description changed");
            gpu.destroy_texture(entry.texture);
        }
        let texture = gpu.create_texture(desc)?;
        entries.insert(
            (node, slot),
            PoolEntry {
                desc: *desc,
                texture,
            },
        );
        Ok(PooledTexture { texture, slot })
    }

    /// Drop every pooled target owned by `node` (called on node removal).
    pub fn release_node(&self, gpu: &dyn GpuBackend, node: NodeId) {
        let mut entries = self.entries.lock();
        entries.retain(|(owner, _), entry| {
            if *owner == node {
                gpu.destroy_texture(entry.texture);
                false
            } else {
                true
            }
        });
    }
}
