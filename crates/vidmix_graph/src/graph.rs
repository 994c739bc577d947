// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph arena: node ownership, connections, acyclicity.
//!
//! The graph exclusively owns every node; destruction only happens
//! through [`Graph::remove_node`]. Handles are generational, so a
//! handle to a removed node never resolves after its arena slot is
//! reused. The connection set, viewed over node handles, is always
//! acyclic: an edge that would close a cycle is rejected at insertion.

use crate::connection::Connection;
use crate::error::GraphError;
use crate::node::{BuiltNode, NodeBehavior, NodeKind};
use crate::slot::{Sink, Source, SourceTarget};
use indexmap::IndexSet;
use vidmix_core::{NodeId, PropValue, PropertySet};

/// A node installed in the graph.
pub struct NodeEntry {
    /// Handle of this node
    pub id: NodeId,
    /// Registered type name the node was created from
    pub type_name: String,
    /// Diagnostic label
    pub label: String,
    /// Capability of the node
    pub kind: NodeKind,
    /// Current property values
    pub props: PropertySet,
    /// Input slots
    pub sinks: Vec<Sink>,
    /// Output slots
    pub sources: Vec<Source>,
    /// The node's behavior
    pub behavior: Box<dyn NodeBehavior>,
}

struct ArenaSlot {
    generation: u32,
    entry: Option<NodeEntry>,
}

/// Owner of all nodes and the connection set.
#[derive(Default)]
pub struct Graph {
    slots: Vec<ArenaSlot>,
    free: Vec<u32>,
    connections: IndexSet<Connection>,
    outputs: Vec<NodeId>,
}

impl Graph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a built node, issuing its handle.
    pub fn add_node(&mut self, type_name: impl Into<String>, node: BuiltNode) -> NodeId {
        let type_name = type_name.into();
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(ArenaSlot {
                    generation: 0,
                    entry: None,
                });
                (self.slots.len() - 1) as u32
            }
        };
        let slot = &mut self.slots[index as usize];
        let id = NodeId::from_raw(index, slot.generation);
        let label = format!("{type_name}#{id}");
        tracing::debug!(%id, type_name, "adding node");
        slot.entry = Some(NodeEntry {
            id,
            type_name,
            label,
            kind: node.spec.kind,
            props: node.spec.props,
            sinks: vec![Sink::default(); node.spec.sinks.count() as usize],
            sources: vec![Source::default(); node.spec.sources.count() as usize],
            behavior: node.behavior,
        });
        if matches!(node.spec.kind, NodeKind::Output) {
            self.outputs.push(id);
        }
        id
    }

    /// Remove a node and every connection referencing it on either end.
    pub fn remove_node(&mut self, id: NodeId) -> Result<(), GraphError> {
        // Detach from upstream producers and downstream consumers
        // before dropping the entry, so no dangling slot state remains.
        let entry = self.entry(id)?;
        let upstream: Vec<(u32, NodeId, u32)> = entry
            .sinks
            .iter()
            .enumerate()
            .filter_map(|(i, sink)| sink.upstream.map(|(n, s)| (i as u32, n, s)))
            .collect();
        let downstream: Vec<(u32, SourceTarget)> = entry
            .sources
            .iter()
            .enumerate()
            .flat_map(|(i, source)| source.targets.iter().map(move |t| (i as u32, *t)))
            .collect();

        for (sink_index, from, from_index) in upstream {
            self.connections
                .shift_remove(&Connection::new(from, from_index, id, sink_index));
            if let Ok(producer) = self.entry_mut(from) {
                producer.sources[from_index as usize].remove_target(SourceTarget {
                    node: id,
                    sink_index,
                });
            }
        }
        for (source_index, target) in downstream {
            self.connections.shift_remove(&Connection::new(
                id,
                source_index,
                target.node,
                target.sink_index,
            ));
            if let Ok(consumer) = self.entry_mut(target.node) {
                consumer.sinks[target.sink_index as usize].reset();
            }
        }

        let slot = &mut self.slots[id.index as usize];
        tracing::debug!(%id, "removing node");
        slot.entry = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.outputs.retain(|o| *o != id);
        Ok(())
    }

    /// Connect `(from, from_index)` to `(to, to_index)`.
    ///
    /// Validates both endpoints and indices, rejects edges that would
    /// close a cycle, and replaces any edge already occupying the sink.
    pub fn connect(
        &mut self,
        from: NodeId,
        from_index: u32,
        to: NodeId,
        to_index: u32,
    ) -> Result<(), GraphError> {
        {
            let producer = self.entry(from)?;
            if from_index as usize >= producer.sources.len() {
                return Err(GraphError::InvalidSlot {
                    node: from,
                    slot: from_index,
                });
            }
            let consumer = self.entry(to)?;
            if to_index as usize >= consumer.sinks.len() {
                return Err(GraphError::InvalidSlot {
                    node: to,
                    slot: to_index,
                });
            }
        }

        // The new edge from -> to closes a cycle exactly when `from` is
        // already reachable from `to` along existing edges.
        if from == to || self.reaches(to, from) {
            return Err(GraphError::CyclicConnection { from, to });
        }

        // Fan-in is 1: displace whatever currently feeds the sink.
        if let Some((prev_node, prev_index)) = self.entry(to)?.sinks[to_index as usize].upstream {
            tracing::debug!(%to, to_index, "replacing existing connection on sink");
            self.disconnect(prev_node, prev_index, to, to_index)?;
        }

        let connection = Connection::new(from, from_index, to, to_index);
        if !self.connections.insert(connection) {
            tracing::warn!(?connection, "connection already exists");
            return Ok(());
        }
        self.entry_mut(to)?.sinks[to_index as usize].upstream = Some((from, from_index));
        self.entry_mut(from)?.sources[from_index as usize].add_target(SourceTarget {
            node: to,
            sink_index: to_index,
        });
        tracing::debug!(%from, from_index, %to, to_index, "connected");
        Ok(())
    }

    /// Remove a single connection.
    pub fn disconnect(
        &mut self,
        from: NodeId,
        from_index: u32,
        to: NodeId,
        to_index: u32,
    ) -> Result<(), GraphError> {
        let connection = Connection::new(from, from_index, to, to_index);
        if !self.connections.shift_remove(&connection) {
            tracing::warn!(?connection, "connection does not exist");
            return Ok(());
        }
        self.entry_mut(to)?.sinks[to_index as usize].reset();
        self.entry_mut(from)?.sources[from_index as usize].remove_target(SourceTarget {
            node: to,
            sink_index: to_index,
        });
        Ok(())
    }

    /// Write a property value. Returns `true` when the stored value
    /// changed; the caller is responsible for marking the node dirty.
    pub fn set_property(
        &mut self,
        id: NodeId,
        name: &str,
        value: PropValue,
    ) -> Result<bool, GraphError> {
        let entry = self.entry_mut(id)?;
        let changed = entry.props.set(name, value.clone());
        if changed {
            entry.behavior.property_changed(name, &value);
        }
        Ok(changed)
    }

    /// Set a node's diagnostic label.
    pub fn set_label(&mut self, id: NodeId, label: impl Into<String>) -> Result<(), GraphError> {
        self.entry_mut(id)?.label = label.into();
        Ok(())
    }

    /// Get a node by handle.
    pub fn node(&self, id: NodeId) -> Option<&NodeEntry> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entry.as_ref())
    }

    /// Get a mutable node by handle.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut NodeEntry> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entry.as_mut())
    }

    /// A node's property view.
    pub fn props(&self, id: NodeId) -> Option<&PropertySet> {
        self.node(id).map(|entry| &entry.props)
    }

    /// Iterate nodes in arena order.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeEntry> {
        self.slots.iter().filter_map(|slot| slot.entry.as_ref())
    }

    /// Output nodes in creation order.
    pub fn outputs(&self) -> &[NodeId] {
        &self.outputs
    }

    /// All connections in insertion order.
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.iter()
    }

    /// Poll every behavior for out-of-band changes, returning the
    /// nodes that reported one.
    pub fn poll_changed(&mut self) -> Vec<NodeId> {
        let mut changed = Vec::new();
        for slot in &mut self.slots {
            if let Some(entry) = slot.entry.as_mut() {
                if entry.behavior.poll() {
                    changed.push(entry.id);
                }
            }
        }
        changed
    }

    /// Number of live nodes.
    pub fn node_count(&self) -> usize {
        self.slots.iter().filter(|s| s.entry.is_some()).count()
    }

    /// Number of connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Forward reachability over the handle graph: can `to` be reached
    /// from `from` along existing connections?
    fn reaches(&self, from: NodeId, to: NodeId) -> bool {
        let mut stack = vec![from];
        let mut visited = IndexSet::new();
        while let Some(current) = stack.pop() {
            if current == to {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            if let Some(entry) = self.node(current) {
                for source in &entry.sources {
                    for target in &source.targets {
                        stack.push(target.node);
                    }
                }
            }
        }
        false
    }

    fn entry(&self, id: NodeId) -> Result<&NodeEntry, GraphError> {
        self.node(id).ok_or(GraphError::NodeNotFound(id))
    }

    fn entry_mut(&mut self, id: NodeId) -> Result<&mut NodeEntry, GraphError> {
        self.node_mut(id).ok_or(GraphError::NodeNotFound(id))
    }
}
