// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shared leaf types for the vidmix compositor.
//!
//! This crate holds the vocabulary every other vidmix crate speaks:
//! - Generational handles issued by owning arenas
//! - Rational numbers for exact frame-rate and timebase math
//! - Property values and the per-node property set
//! - Pixel formats and 2D sizes

pub mod handle;
pub mod props;
pub mod rational;
pub mod surface;

pub use handle::{ClipId, NodeId};
pub use props::{PropValue, PropertySet};
pub use rational::Rational;
pub use surface::{PixelFormat, Size2D};
