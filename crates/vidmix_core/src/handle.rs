// SPDX-License-Identifier: MIT OR Apache-2.0
//! Generational handles issued by owning arenas.
//!
//! A handle pairs an arena slot index with a generation counter. When a
//! slot is freed and later reused, the generation bumps, so a handle to
//! the destroyed occupant never resolves to the new one.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a node, issued by the owning graph arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId {
    /// Arena slot index
    pub index: u32,
    /// Generation of the slot when this handle was issued
    pub generation: u32,
}

impl NodeId {
    /// Create a handle from raw parts. Arenas issue these; callers
    /// normally never construct one by hand.
    pub fn from_raw(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({}v{})", self.index, self.generation)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Unique identifier for an animation clip, issued by the animation system.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClipId {
    /// Arena slot index
    pub index: u32,
    /// Generation of the slot when this handle was issued
    pub generation: u32,
}

impl ClipId {
    /// Create a handle from raw parts.
    pub fn from_raw(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }
}

impl fmt::Debug for ClipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClipId({}v{})", self.index, self.generation)
    }
}

impl fmt::Display for ClipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}
