// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pixel formats and 2D sizes shared across the engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pixel format of a texture or output surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 8-bit RGBA, unsigned normalized
    #[default]
    Rgba8Unorm,
    /// 8-bit BGRA, unsigned normalized
    Bgra8Unorm,
    /// 16-bit float RGBA
    Rgba16Float,
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Rgba8Unorm => "rgba8unorm",
            Self::Bgra8Unorm => "bgra8unorm",
            Self::Rgba16Float => "rgba16float",
        };
        f.write_str(name)
    }
}

/// Width and height of a surface in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Size2D {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Size2D {
    /// Create a size.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Size2D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
