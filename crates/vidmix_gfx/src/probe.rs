// SPDX-License-Identifier: MIT OR Apache-2.0
//! The per-frame render probe.
//!
//! One probe is created per (output, tick) and passed by reference down
//! the whole evaluation call chain. It carries the frame's identity
//! (frame number, presentation timestamps, output rate), the command
//! list being recorded, this frame's descriptor slice, and handles to
//! the shared pool and cache. It must not be retained past the frame.

use crate::backend::{CommandListHandle, GpuBackend, GpuError, TextureDesc};
use crate::cache::FrameCache;
use crate::descriptors::DescriptorSlice;
use crate::pool::{PooledTexture, TexturePool};
use vidmix_core::{NodeId, Rational, Size2D};

/// Forwarded render-pass description.
///
/// When an output wants its direct upstream to render straight into the
/// output surface instead of a pooled scratch target, it forwards the
/// target through the pull.
#[derive(Debug, Clone, Copy)]
pub struct RenderPassDesc {
    /// Texture to render into
    pub target: crate::backend::TextureHandle,
    /// Viewport size of the target
    pub size: Size2D,
}

/// Execution context threaded through one output's evaluation for one
/// tick.
pub struct RenderProbe<'f> {
    /// Monotonically increasing frame number, never reused
    pub frame_number: u64,
    /// Presentation timestamp this frame targets (90 kHz ticks)
    pub target_pts: i64,
    /// Wall-clock-derived PTS when the tick started
    pub current_pts: i64,
    /// Target frame rate of the output being pulled
    pub output_rate: Rational,
    /// Size of the output surface being rendered
    pub output_size: Size2D,
    /// Command list commands are recorded into
    pub commands: CommandListHandle,
    /// This frame slot's descriptor region
    pub descriptors: DescriptorSlice,
    pool: &'f TexturePool,
    cache: &'f FrameCache,
}

impl<'f> RenderProbe<'f> {
    /// Assemble a probe for one frame.
    pub fn new(
        frame_number: u64,
        target_pts: i64,
        current_pts: i64,
        output_rate: Rational,
        output_size: Size2D,
        commands: CommandListHandle,
        descriptors: DescriptorSlice,
        pool: &'f TexturePool,
        cache: &'f FrameCache,
    ) -> Self {
        Self {
            frame_number,
            target_pts,
            current_pts,
            output_rate,
            output_size,
            commands,
            descriptors,
            pool,
            cache,
        }
    }

    /// Scratch render target for `node` in this frame's pool slot.
    pub fn acquire_target(
        &self,
        gpu: &dyn GpuBackend,
        node: NodeId,
        desc: &TextureDesc,
    ) -> Result<PooledTexture, GpuError> {
        self.pool.acquire(gpu, node, self.frame_number, desc)
    }

    /// The memoization cache shared by every pull of this frame.
    pub fn cache(&self) -> &FrameCache {
        self.cache
    }
}
