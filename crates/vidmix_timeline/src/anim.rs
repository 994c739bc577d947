// SPDX-License-Identifier: MIT OR Apache-2.0
//! The animation system: clip ownership and per-tick evaluation.
//!
//! Clips live in a generational arena and are bound to at most one
//! node each; a node holds at most one live clip. Each tick, every
//! running clip is sampled at the current PTS and its values are
//! written onto the target node's properties. Only writes that change
//! a value mark the node dirty, so a held keyframe does not force
//! re-renders.

use crate::clip::{AnimationClip, ClipState};
use crate::error::AnimError;
use indexmap::IndexMap;
use vidmix_core::{ClipId, NodeId};
use vidmix_graph::{DirtyTracker, Graph};

struct ClipSlot {
    generation: u32,
    clip: Option<AnimationClip>,
}

/// Owner of all animation clips.
#[derive(Default)]
pub struct AnimationSystem {
    slots: Vec<ClipSlot>,
    free: Vec<u32>,
    /// Enforces the one-live-clip-per-node rule.
    bound: IndexMap<NodeId, ClipId>,
}

impl AnimationSystem {
    /// Create an empty system.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a new clip to `node`. Fails if the node already has a live
    /// clip; remove that clip first.
    pub fn add_clip(&mut self, node: NodeId) -> Result<ClipId, AnimError> {
        if let Some(&existing) = self.bound.get(&node) {
            return Err(AnimError::ClipAlreadyBound(node, existing));
        }
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(ClipSlot {
                    generation: 0,
                    clip: None,
                });
                (self.slots.len() - 1) as u32
            }
        };
        let slot = &mut self.slots[index as usize];
        let id = ClipId::from_raw(index, slot.generation);
        slot.clip = Some(AnimationClip::new(node));
        self.bound.insert(node, id);
        tracing::debug!(clip = %id, %node, "clip bound");
        Ok(id)
    }

    /// Remove a clip, releasing its node for re-binding.
    pub fn remove_clip(&mut self, id: ClipId) -> Result<(), AnimError> {
        let slot = self
            .slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .ok_or(AnimError::ClipNotFound(id))?;
        let clip = slot.clip.take().ok_or(AnimError::ClipNotFound(id))?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.bound.shift_remove(&clip.node);
        Ok(())
    }

    /// Get a clip by handle.
    pub fn clip(&self, id: ClipId) -> Result<&AnimationClip, AnimError> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.clip.as_ref())
            .ok_or(AnimError::ClipNotFound(id))
    }

    /// Get a mutable clip by handle.
    pub fn clip_mut(&mut self, id: ClipId) -> Result<&mut AnimationClip, AnimError> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.clip.as_mut())
            .ok_or(AnimError::ClipNotFound(id))
    }

    /// The clip currently bound to `node`, if any.
    pub fn clip_for_node(&self, node: NodeId) -> Option<ClipId> {
        self.bound.get(&node).copied()
    }

    /// Number of live clips.
    pub fn clip_count(&self) -> usize {
        self.bound.len()
    }

    /// Sample every running clip at `pts` and write the values onto
    /// the graph. Writes that change a value mark the node dirty.
    /// Runs before dirty propagation each tick.
    pub fn evaluate_at_pts(&self, pts: i64, graph: &mut Graph, dirty: &mut DirtyTracker) {
        for slot in &self.slots {
            let Some(clip) = slot.clip.as_ref() else {
                continue;
            };
            if clip.state() == ClipState::Stopped {
                continue;
            }
            for (property, value) in clip.evaluate(pts) {
                match graph.set_property(clip.node, property, value) {
                    Ok(true) => dirty.mark_dirty(clip.node),
                    Ok(false) => {}
                    Err(err) => {
                        tracing::warn!(node = %clip.node, property, %err, "animated write failed");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyframe::Keyframe;
    use vidmix_core::{PropValue, PropertySet};
    use vidmix_gfx::RenderProbe;
    use vidmix_graph::{BuiltNode, EvalContext, NodeBehavior, NodeKind, NodeSpec, SlotArity};

    struct Inert;
    impl NodeBehavior for Inert {
        fn evaluate(&mut self, _cx: &mut EvalContext<'_>, _probe: &mut RenderProbe<'_>) -> bool {
            true
        }
    }

    fn graph_with_node() -> (Graph, NodeId) {
        let mut graph = Graph::new();
        let mut props = PropertySet::new();
        props.set("mix", PropValue::Float(0.0));
        let node = graph.add_node(
            "Blend",
            BuiltNode {
                spec: NodeSpec {
                    kind: NodeKind::Filter,
                    sinks: SlotArity::Fixed(2),
                    sources: SlotArity::Fixed(1),
                    props,
                },
                behavior: Box::new(Inert),
            },
        );
        (graph, node)
    }

    fn ramp_system(node: NodeId) -> (AnimationSystem, ClipId) {
        let mut system = AnimationSystem::new();
        let id = system.add_clip(node).unwrap();
        let clip = system.clip_mut(id).unwrap();
        let track = clip.add_track("mix");
        track.add_keyframe(Keyframe::new(0, PropValue::Float(0.0)));
        track.add_keyframe(Keyframe::new(9000, PropValue::Float(1.0)));
        (system, id)
    }

    #[test]
    fn test_double_bind_is_an_error() {
        let (_, node) = graph_with_node();
        let mut system = AnimationSystem::new();
        let first = system.add_clip(node).unwrap();
        assert_eq!(
            system.add_clip(node),
            Err(AnimError::ClipAlreadyBound(node, first))
        );
        // After removal the node can be bound again.
        system.remove_clip(first).unwrap();
        assert!(system.add_clip(node).is_ok());
    }

    #[test]
    fn test_stale_clip_handle_is_rejected() {
        let (_, node) = graph_with_node();
        let mut system = AnimationSystem::new();
        let id = system.add_clip(node).unwrap();
        system.remove_clip(id).unwrap();
        assert_eq!(system.clip(id).err(), Some(AnimError::ClipNotFound(id)));
        assert_eq!(
            system.remove_clip(id).err(),
            Some(AnimError::ClipNotFound(id))
        );
    }

    #[test]
    fn test_changed_write_marks_node_dirty() {
        let (mut graph, node) = graph_with_node();
        let (mut system, id) = ramp_system(node);
        system.clip_mut(id).unwrap().play(0);

        let mut dirty = DirtyTracker::new();
        system.evaluate_at_pts(4500, &mut graph, &mut dirty);
        assert!(dirty.is_dirty(node));
        assert_eq!(
            graph.props(node).unwrap().get("mix"),
            Some(&PropValue::Float(0.5))
        );
    }

    #[test]
    fn test_held_value_does_not_mark_dirty() {
        let (mut graph, node) = graph_with_node();
        let (mut system, id) = ramp_system(node);
        system.clip_mut(id).unwrap().play(0);

        let mut dirty = DirtyTracker::new();
        // Past the end: value clamps to 1.0 and stays there.
        system.evaluate_at_pts(20_000, &mut graph, &mut dirty);
        dirty.mark_clean(node);
        system.evaluate_at_pts(21_000, &mut graph, &mut dirty);
        assert!(!dirty.is_dirty(node), "unchanged write must not re-dirty");
    }

    #[test]
    fn test_stopped_clip_writes_nothing() {
        let (mut graph, node) = graph_with_node();
        let (mut system, id) = ramp_system(node);
        system.clip_mut(id).unwrap().play(0);

        let mut dirty = DirtyTracker::new();
        system.evaluate_at_pts(4500, &mut graph, &mut dirty);
        system.clip_mut(id).unwrap().stop();
        dirty.mark_clean(node);

        system.evaluate_at_pts(9000, &mut graph, &mut dirty);
        assert!(!dirty.is_dirty(node));
        // Last applied value survives the stop.
        assert_eq!(
            graph.props(node).unwrap().get("mix"),
            Some(&PropValue::Float(0.5))
        );
    }
}
