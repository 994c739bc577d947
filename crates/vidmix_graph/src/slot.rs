// SPDX-License-Identifier: MIT OR Apache-2.0
//! Input and output slots of a node.

use vidmix_core::NodeId;

/// An input slot. Holds at most one active connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sink {
    /// The connected producer as `(node, source index)`, if any
    pub upstream: Option<(NodeId, u32)>,
}

impl Sink {
    /// True when a connection feeds this sink.
    pub fn is_connected(&self) -> bool {
        self.upstream.is_some()
    }

    /// Clear the connection.
    pub fn reset(&mut self) {
        self.upstream = None;
    }
}

/// One consumer of a source as `(node, sink index)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceTarget {
    /// Consuming node
    pub node: NodeId,
    /// Sink index on the consuming node
    pub sink_index: u32,
}

/// An output slot. Fans out to arbitrarily many sinks.
///
/// Targets keep insertion order so downstream traversal is
/// deterministic for a fixed mutation sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Source {
    /// Connected consumers in connection order
    pub targets: Vec<SourceTarget>,
}

impl Source {
    /// Record a consumer; ignores exact duplicates.
    pub fn add_target(&mut self, target: SourceTarget) {
        if !self.targets.contains(&target) {
            self.targets.push(target);
        }
    }

    /// Remove a consumer.
    pub fn remove_target(&mut self, target: SourceTarget) {
        self.targets.retain(|t| *t != target);
    }
}
