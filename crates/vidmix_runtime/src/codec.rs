// SPDX-License-Identifier: MIT OR Apache-2.0
//! Collaborator traits at the media boundary.
//!
//! Decoding and network transport are supplied by the embedder; the
//! runtime only defines the seams. Implementations are shared across
//! nodes, so the traits take `&self` and implementors handle their own
//! interior mutability.

use std::time::Duration;
use thiserror::Error;
use vidmix_gfx::{FrameResult, GpuBackend};

/// Errors from decode and transport collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The payload could not be decoded.
    #[error("decode failed: {0}")]
    DecodeFailed(String),
    /// The container or pixel layout is not supported.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
    /// The stream endpoint could not be reached.
    #[error("connect to {url} failed: {reason}")]
    ConnectFailed {
        /// Endpoint that was dialed
        url: String,
        /// Transport-level failure description
        reason: String,
    },
}

/// Decodes still images into GPU textures.
pub trait TextureLoader: Send + Sync {
    /// Decode the file at `path` and upload it.
    fn load_texture(&self, gpu: &dyn GpuBackend, path: &str) -> Result<FrameResult, CodecError>;
}

/// Live frames arriving from one connected stream.
pub trait StreamSource: Send {
    /// Whether a frame arrived since the last call.
    fn poll(&mut self) -> bool;

    /// The most recently received frame, if any arrived yet.
    fn latest(&mut self, gpu: &dyn GpuBackend) -> Result<Option<FrameResult>, CodecError>;
}

/// Dials network streams.
pub trait StreamConnector: Send + Sync {
    /// Connect to `url`, giving up after `timeout`.
    fn connect(
        &self,
        gpu: &dyn GpuBackend,
        url: &str,
        options: &serde_json::Value,
        timeout: Duration,
    ) -> Result<Box<dyn StreamSource>, CodecError>;
}
