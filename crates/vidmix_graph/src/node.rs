// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node capabilities, behavior trait and the node registry.
//!
//! Nodes are polymorphic over a small closed capability set - input,
//! filter, output - distinguished by arity and evaluation semantics.
//! Concrete behaviors are constructed exclusively through the
//! [`NodeRegistry`], given a type name and an opaque per-type
//! descriptor (`serde_json::Value`).

use crate::error::GraphError;
use indexmap::IndexMap;
use vidmix_core::{NodeId, PropValue, PropertySet};
use vidmix_gfx::{FrameResult, GpuBackend, RenderPassDesc, RenderProbe};

/// Capability of a node, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Produces data from outside the graph (file, stream, generator)
    Input,
    /// Transforms one or more upstream results
    Filter,
    /// Terminal consumer presenting or transmitting frames
    Output,
}

/// Slot count of a node side, resolved at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotArity {
    /// Count fixed by the node type
    Fixed(u32),
    /// Count chosen from the descriptor at construction time
    Dynamic(u32),
}

impl SlotArity {
    /// The resolved slot count.
    pub fn count(&self) -> u32 {
        match self {
            SlotArity::Fixed(n) | SlotArity::Dynamic(n) => *n,
        }
    }
}

/// Everything the graph needs to install a freshly built node.
#[derive(Debug, Clone)]
pub struct NodeSpec {
    /// Capability of the node
    pub kind: NodeKind,
    /// Input slot arity
    pub sinks: SlotArity,
    /// Output slot arity
    pub sources: SlotArity,
    /// Initial property values
    pub props: PropertySet,
}

/// Per-evaluation view handed to a node behavior.
pub struct EvalContext<'a> {
    /// Identity of the node being evaluated
    pub node: NodeId,
    /// Diagnostic label of the node
    pub label: &'a str,
    /// Current property values
    pub props: &'a PropertySet,
    /// Upstream results per sink index; `None` for unconnected sinks
    pub inputs: &'a [Option<FrameResult>],
    /// GPU backend for resource creation and recording
    pub gpu: &'a dyn GpuBackend,
    /// Forwarded pass description, when the consumer supplies the target
    pub pass: Option<&'a RenderPassDesc>,
    /// Result the behavior produced for its source slot, if any
    pub output: Option<FrameResult>,
}

/// The graph's unit of work.
///
/// `evaluate` performs the node's work using inputs already resolved
/// through its sinks and records the result into `cx.output`. It
/// returns `false` on failure (GPU error, missing upstream data, decode
/// failure) without panicking; the engine logs the failure and leaves
/// the node dirty for retry.
pub trait NodeBehavior: Send {
    /// Evaluate the node for the probe's frame.
    fn evaluate(&mut self, cx: &mut EvalContext<'_>, probe: &mut RenderProbe<'_>) -> bool;

    /// Observe a property write. Most behaviors read properties from
    /// `cx.props` at evaluate time and need no reaction here.
    fn property_changed(&mut self, _name: &str, _value: &PropValue) {}

    /// Check for out-of-band changes (arriving network frames, decoder
    /// progress). Returning `true` marks the node dirty. Called once
    /// per tick, before dirty propagation.
    fn poll(&mut self) -> bool {
        false
    }
}

/// A node built by a registry factory, ready to install in the graph.
pub struct BuiltNode {
    /// Structural description of the node
    pub spec: NodeSpec,
    /// The node's behavior
    pub behavior: Box<dyn NodeBehavior>,
}

type NodeFactory =
    Box<dyn Fn(&dyn GpuBackend, &serde_json::Value) -> Result<BuiltNode, GraphError> + Send + Sync>;

/// Registry of node type factories.
///
/// Registration binds a name to a factory closure once at process
/// start; re-registering a name replaces the factory with a warning.
#[derive(Default)]
pub struct NodeRegistry {
    factories: IndexMap<String, NodeFactory>,
}

impl NodeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a type name to a factory closure.
    pub fn register<F>(&mut self, type_name: impl Into<String>, factory: F)
    where
        F: Fn(&dyn GpuBackend, &serde_json::Value) -> Result<BuiltNode, GraphError>
            + Send
            + Sync
            + 'static,
    {
        let type_name = type_name.into();
        if self
            .factories
            .insert(type_name.clone(), Box::new(factory))
            .is_some()
        {
            tracing::warn!(type_name, "node factory re-registered");
        }
    }

    /// Construct a node from a registered type.
    pub fn create(
        &self,
        type_name: &str,
        gpu: &dyn GpuBackend,
        descriptor: &serde_json::Value,
    ) -> Result<BuiltNode, GraphError> {
        let factory = self
            .factories
            .get(type_name)
            .ok_or_else(|| GraphError::UnknownNodeType(type_name.to_string()))?;
        factory(gpu, descriptor)
    }

    /// Registered type names in registration order.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}
