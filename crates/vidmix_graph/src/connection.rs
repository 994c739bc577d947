// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection (edge) definitions for the graph.

use vidmix_core::NodeId;

/// A directed edge: `(source node, source slot)` -> `(sink node, sink
/// slot)`.
///
/// Connections are value-comparable; equality is structural over both
/// endpoints and both indices. They are not independently owned - their
/// lifetime is bound to the graph's edge set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Connection {
    /// Producing node
    pub from: NodeId,
    /// Source slot index on the producing node
    pub from_index: u32,
    /// Consuming node
    pub to: NodeId,
    /// Sink slot index on the consuming node
    pub to_index: u32,
}

impl Connection {
    /// Create a connection value.
    pub fn new(from: NodeId, from_index: u32, to: NodeId, to_index: u32) -> Self {
        Self {
            from,
            from_index,
            to,
            to_index,
        }
    }

    /// Check if this connection references a node on either end.
    pub fn involves(&self, node: NodeId) -> bool {
        self.from == node || self.to == node
    }
}
