// SPDX-License-Identifier: MIT OR Apache-2.0
//! Animation system errors.

use thiserror::Error;
use vidmix_core::{ClipId, NodeId};

/// Errors raised by the animation system.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnimError {
    /// The node already has a live clip; remove it before binding another.
    #[error("node {0} is already bound to clip {1}")]
    ClipAlreadyBound(NodeId, ClipId),
    /// The clip handle does not resolve to a live clip.
    #[error("clip {0} not found")]
    ClipNotFound(ClipId),
}
