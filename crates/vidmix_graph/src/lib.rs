// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node-graph topology for vidmix.
//!
//! The dataflow model this crate maintains:
//! - Nodes with typed input slots ([`Sink`], fan-in 1) and output slots
//!   ([`Source`], unbounded fan-out)
//! - Directed [`Connection`]s forming a DAG; cycles are rejected at
//!   insertion, never detected later
//! - A [`Graph`] arena that exclusively owns all nodes and issues
//!   generational handles
//! - A [`NodeRegistry`] binding type names to factory closures
//! - A [`DirtyTracker`] computing the minimal re-evaluation set per
//!   frame

pub mod connection;
pub mod dirty;
pub mod error;
pub mod graph;
pub mod node;
pub mod slot;

pub use connection::Connection;
pub use dirty::{DirtyTracker, FramePlan};
pub use error::GraphError;
pub use graph::{Graph, NodeEntry};
pub use node::{BuiltNode, EvalContext, NodeBehavior, NodeKind, NodeRegistry, NodeSpec, SlotArity};
pub use slot::{Sink, Source, SourceTarget};
