// SPDX-License-Identifier: MIT OR Apache-2.0
//! Dirty tracking and the pre-frame propagation pass.
//!
//! Structural or property changes mark nodes dirty. Before a frame is
//! rendered, [`DirtyTracker::propagate`] turns the accumulated dirty
//! set into a [`FramePlan`]: for each output, exactly which upstream
//! nodes must re-evaluate this frame. Nodes outside the plan reuse
//! their cached result from the previous frame.
//!
//! Both walks run in deterministic order (dirty set in marking order,
//! slots in ascending index order) so a fixed mutation sequence always
//! yields the same plan.

use crate::graph::Graph;
use indexmap::{IndexMap, IndexSet};
use vidmix_core::NodeId;

/// Per-frame evaluation plan produced by propagation.
#[derive(Debug, Default)]
pub struct FramePlan {
    /// For each output, the upstream nodes that must re-evaluate.
    /// An empty set means the output can reuse its cached frame.
    pub per_output: IndexMap<NodeId, IndexSet<NodeId>>,
    /// Affected nodes no requested output depends on; their work is
    /// skipped entirely this frame.
    pub skipped: Vec<NodeId>,
}

impl FramePlan {
    /// True when no output needs any re-evaluation.
    pub fn is_empty(&self) -> bool {
        self.per_output.values().all(|set| set.is_empty())
    }

    /// True when `node` must re-evaluate for `output`.
    pub fn requires(&self, output: NodeId, node: NodeId) -> bool {
        self.per_output
            .get(&output)
            .is_some_and(|set| set.contains(&node))
    }
}

/// Accumulates dirty nodes between frames.
#[derive(Debug, Default)]
pub struct DirtyTracker {
    dirty: IndexSet<NodeId>,
}

impl DirtyTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a node as needing re-evaluation.
    pub fn mark_dirty(&mut self, id: NodeId) {
        if self.dirty.insert(id) {
            tracing::trace!(%id, "node marked dirty");
        }
    }

    /// Clear a node's dirty state after a successful evaluation.
    pub fn mark_clean(&mut self, id: NodeId) {
        self.dirty.shift_remove(&id);
    }

    /// Whether a node is currently dirty.
    pub fn is_dirty(&self, id: NodeId) -> bool {
        self.dirty.contains(&id)
    }

    /// Number of dirty nodes.
    pub fn dirty_count(&self) -> usize {
        self.dirty.len()
    }

    /// Compute the evaluation plan for `outputs` from the current
    /// dirty set. Does not consume the set; nodes stay dirty until
    /// [`mark_clean`](Self::mark_clean) after they evaluate.
    pub fn propagate(&self, graph: &Graph, outputs: &[NodeId]) -> FramePlan {
        // Forward sweep: everything downstream of a dirty node is
        // affected, dirty or not, because its inputs will change.
        let mut affected: IndexSet<NodeId> = IndexSet::new();
        let mut frontier: Vec<NodeId> = self.dirty.iter().copied().collect();
        while let Some(current) = frontier.pop() {
            if !affected.insert(current) {
                continue;
            }
            if let Some(entry) = graph.node(current) {
                for source in &entry.sources {
                    for target in &source.targets {
                        frontier.push(target.node);
                    }
                }
            }
        }

        // Backward sweep per output: restrict the affected set to the
        // nodes this output actually depends on.
        let mut plan = FramePlan::default();
        for &output in outputs {
            let mut needed: IndexSet<NodeId> = IndexSet::new();
            let mut stack = vec![output];
            let mut visited: IndexSet<NodeId> = IndexSet::new();
            while let Some(current) = stack.pop() {
                if !visited.insert(current) {
                    continue;
                }
                if affected.contains(&current) {
                    needed.insert(current);
                }
                if let Some(entry) = graph.node(current) {
                    for sink in &entry.sinks {
                        if let Some((upstream, _)) = sink.upstream {
                            stack.push(upstream);
                        }
                    }
                }
            }
            plan.per_output.insert(output, needed);
        }

        plan.skipped = affected
            .iter()
            .copied()
            .filter(|node| !plan.per_output.values().any(|set| set.contains(node)))
            .collect();
        if !plan.is_empty() {
            tracing::debug!(
                affected = affected.len(),
                skipped = plan.skipped.len(),
                outputs = plan.per_output.len(),
                "propagated dirty set"
            );
        }
        plan
    }
}
