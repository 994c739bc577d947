// SPDX-License-Identifier: MIT OR Apache-2.0
//! Structural graph errors.
//!
//! These are rejected synchronously at the mutating call and never
//! enter the graph; evaluation-time failures are a separate, non-fatal
//! channel (a node's `evaluate` returning `false`).

use vidmix_core::NodeId;

/// Error from a graph mutation or node construction.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GraphError {
    /// No factory is registered under the requested type name
    #[error("unknown node type: {0}")]
    UnknownNodeType(String),

    /// The requested connection would close a cycle
    #[error("connection {from} -> {to} would create a cycle")]
    CyclicConnection {
        /// Source endpoint of the rejected edge
        from: NodeId,
        /// Sink endpoint of the rejected edge
        to: NodeId,
    },

    /// The referenced node is not in the graph
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    /// A slot index is out of range for the node
    #[error("invalid slot {slot} on node {node}")]
    InvalidSlot {
        /// Node whose slot was addressed
        node: NodeId,
        /// Out-of-range slot index
        slot: u32,
    },

    /// A node factory rejected its descriptor
    #[error("invalid node descriptor: {0}")]
    InvalidDescriptor(String),
}
