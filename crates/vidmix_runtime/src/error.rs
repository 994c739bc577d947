// SPDX-License-Identifier: MIT OR Apache-2.0
//! Engine-level errors.

use thiserror::Error;
use vidmix_gfx::GpuError;
use vidmix_graph::GraphError;

/// Fatal engine failures. Per-node evaluation failures are not errors
/// at this level; they are logged and the node stays dirty for retry.
#[derive(Debug, Error)]
pub enum EngineError {
    /// GPU failure surfaced outside a node (submit, pacing). Device
    /// loss aborts the render loop.
    #[error(transparent)]
    Gpu(#[from] GpuError),
    /// Structural graph failure while setting up a tick.
    #[error(transparent)]
    Graph(#[from] GraphError),
}
