// SPDX-License-Identifier: MIT OR Apache-2.0
//! GPU backend seam and frame-scoped resources for vidmix.
//!
//! The engine never talks to a GPU API directly. Everything it needs is
//! behind the [`GpuBackend`] trait: resource creation, command
//! recording, submission and fences. On top of that seam this crate
//! provides the per-frame machinery:
//! - [`RenderProbe`] - the execution context threaded through one
//!   output's evaluation for one tick
//! - [`TexturePool`] - scratch render targets partitioned per
//!   frames-in-flight slot
//! - [`DescriptorArena`] - GPU-visible binding table space, also
//!   partitioned per frame slot
//! - [`FrameCache`] - per-(node, frame) result memoization with
//!   first-writer-wins synchronization
//! - [`FramePacer`] - backpressure when too many frames are outstanding

pub mod backend;
pub mod cache;
pub mod descriptors;
pub mod pacer;
pub mod pool;
pub mod probe;

pub use backend::{
    CommandListHandle, FenceHandle, GpuBackend, GpuError, NullGpu, TextureDesc, TextureHandle,
};
pub use cache::{Claim, FrameCache, FrameResult};
pub use descriptors::{DescriptorArena, DescriptorRange, DescriptorSlice};
pub use pacer::FramePacer;
pub use pool::{PooledTexture, TexturePool};
pub use probe::{RenderPassDesc, RenderProbe};

/// Default number of frames whose GPU work may be outstanding at once.
pub const DEFAULT_FRAMES_IN_FLIGHT: u32 = 2;
