// SPDX-License-Identifier: MIT OR Apache-2.0
//! The GPU backend collaborator trait.
//!
//! vidmix records commands and submits them without waiting; completion
//! is observed through fences. Concrete backends (Vulkan, D3D12, a test
//! double) implement this trait. The engine checks every creation
//! result before use and degrades per-node on failure; only
//! [`GpuError::DeviceLost`] is fatal.

use parking_lot::{Condvar, Mutex};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use vidmix_core::{PixelFormat, Size2D};

/// Error from the GPU backend.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GpuError {
    /// A resource could not be created
    #[error("GPU resource creation failed: {0}")]
    ResourceCreationFailed(String),

    /// The device was lost; no further GPU work can proceed
    #[error("GPU device lost")]
    DeviceLost,
}

/// Opaque handle to a backend texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

/// Opaque handle to a command list being recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandListHandle(pub u64);

/// Opaque handle to a submission fence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FenceHandle(pub u64);

/// Description of a texture to create or reuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureDesc {
    /// Texture dimensions
    pub size: Size2D,
    /// Pixel format
    pub format: PixelFormat,
}

/// Device, command and fence primitives the engine consumes.
///
/// All methods may be called from any thread driving an output.
pub trait GpuBackend: Send + Sync {
    /// Create a texture usable as a render target.
    fn create_texture(&self, desc: &TextureDesc) -> Result<TextureHandle, GpuError>;

    /// Release a texture previously created by this backend.
    fn destroy_texture(&self, texture: TextureHandle);

    /// Open a command list for recording.
    fn begin_commands(&self) -> Result<CommandListHandle, GpuError>;

    /// Submit a recorded command list. Returns the fence that signals
    /// when the submitted work completes on the GPU.
    fn submit(&self, commands: CommandListHandle) -> Result<FenceHandle, GpuError>;

    /// Non-blocking fence query.
    fn fence_signaled(&self, fence: FenceHandle) -> Result<bool, GpuError>;

    /// Block until the fence signals.
    fn wait_fence(&self, fence: FenceHandle) -> Result<(), GpuError>;
}

/// In-process backend with no device behind it.
///
/// Used by the demo binary and by tests. In `auto_signal` mode every
/// fence is signaled at submission; in manual mode fences stay pending
/// until [`NullGpu::signal`] is called, which is how the pacing tests
/// exercise backpressure.
pub struct NullGpu {
    next_id: AtomicU64,
    auto_signal: bool,
    signaled: Mutex<HashSet<u64>>,
    fence_cv: Condvar,
}

impl NullGpu {
    /// Backend where every fence signals immediately.
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            auto_signal: true,
            signaled: Mutex::new(HashSet::new()),
            fence_cv: Condvar::new(),
        }
    }

    /// Backend whose fences only signal via [`NullGpu::signal`].
    pub fn with_manual_fences() -> Self {
        Self {
            auto_signal: false,
            ..Self::new()
        }
    }

    /// Signal a pending fence, waking any waiter.
    pub fn signal(&self, fence: FenceHandle) {
        let mut signaled = self.signaled.lock();
        signaled.insert(fence.0);
        self.fence_cv.notify_all();
    }

    fn issue(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for NullGpu {
    fn default() -> Self {
        Self::new()
    }
}

impl GpuBackend for NullGpu {
    fn create_texture(&self, desc: &TextureDesc) -> Result<TextureHandle, GpuError> {
        if desc.size.width == 0 || desc.size.height == 0 {
            return Err(GpuError::ResourceCreationFailed(format!(
                "zero-sized texture {}",
                desc.size
            )));
        }
        Ok(TextureHandle(self.issue()))
    }

    fn destroy_texture(&self, _texture: TextureHandle) {}

    fn begin_commands(&self) -> Result<CommandListHandle, GpuError> {
        Ok(CommandListHandle(self.issue()))
    }

    fn submit(&self, _commands: CommandListHandle) -> Result<FenceHandle, GpuError> {
        let fence = FenceHandle(self.issue());
        if self.auto_signal {
            self.signaled.lock().insert(fence.0);
        }
        Ok(fence)
    }

    fn fence_signaled(&self, fence: FenceHandle) -> Result<bool, GpuError> {
        Ok(self.signaled.lock().contains(&fence.0))
    }

    fn wait_fence(&self, fence: FenceHandle) -> Result<(), GpuError> {
        let mut signaled = self.signaled.lock();
        while !signaled.contains(&fence.0) {
            self.fence_cv.wait(&mut signaled);
        }
        Ok(())
    }
}
