// SPDX-License-Identifier: MIT OR Apache-2.0
//! The synchronous pull evaluator.
//!
//! Rendering pulls from an output toward its producers: each node
//! resolves its connected sinks recursively, then evaluates itself
//! with those inputs. The frame cache enforces at-most-one evaluation
//! per (node, frame): the first pull through a shared node computes
//! it, later pulls in the same frame get the published result, and
//! racing pulls block until the first writer resolves the slot.
//!
//! Failure is local and non-panicking. A node that fails poisons its
//! (node, frame) slot; consumers short-circuit with a logged upstream
//! failure and stay dirty so the next tick retries them.

use indexmap::IndexSet;
use vidmix_core::NodeId;
use vidmix_gfx::{Claim, FrameResult, GpuBackend, RenderPassDesc, RenderProbe};
use vidmix_graph::{DirtyTracker, EvalContext, Graph, NodeEntry};

/// Entry points for pulling frames through the graph.
pub struct Evaluator;

impl Evaluator {
    /// Pull `node`'s frame for the probe's frame number.
    ///
    /// `needed` is the set of nodes whose state changed since they last
    /// produced; a node outside it repeats its previous frame instead
    /// of re-evaluating. Nodes that have never produced evaluate
    /// regardless, which covers terminals since they publish nothing.
    ///
    /// Returns `false` when the node or any of its producers failed;
    /// the failure has already been logged and cached.
    pub fn pull(
        graph: &mut Graph,
        dirty: &mut DirtyTracker,
        node: NodeId,
        gpu: &dyn GpuBackend,
        pass: Option<&RenderPassDesc>,
        needed: &IndexSet<NodeId>,
        probe: &mut RenderProbe<'_>,
    ) -> bool {
        let frame = probe.frame_number;
        match probe.cache().claim(node, frame) {
            Claim::Ready(_) | Claim::Empty => return true,
            Claim::Failed => return false,
            Claim::Compute => {}
        }

        // We own the slot now; every path below must publish or fail it.
        if !needed.contains(&node) {
            if let Some(last) = probe.cache().last_output(node) {
                probe.cache().publish(node, frame, last);
                return true;
            }
        }

        let upstreams: Vec<Option<(NodeId, u32)>> = match graph.node(node) {
            Some(entry) => entry.sinks.iter().map(|sink| sink.upstream).collect(),
            None => {
                tracing::warn!(%node, "pull of a removed node");
                probe.cache().fail(node, frame);
                return false;
            }
        };

        let mut inputs: Vec<Option<FrameResult>> = Vec::with_capacity(upstreams.len());
        for (sink_index, upstream) in upstreams.iter().enumerate() {
            let Some((producer, _)) = *upstream else {
                inputs.push(None);
                continue;
            };
            if !Self::pull(graph, dirty, producer, gpu, None, needed, probe) {
                tracing::warn!(
                    %node,
                    sink_index,
                    %producer,
                    "upstream evaluation failed"
                );
                probe.cache().fail(node, frame);
                return false;
            }
            match probe.cache().claim(producer, frame) {
                Claim::Ready(result) => inputs.push(Some(result)),
                Claim::Empty => inputs.push(None),
                _ => {
                    // A successful pull always resolves the slot.
                    tracing::warn!(%producer, "producer resolved without a result");
                    probe.cache().fail(node, frame);
                    return false;
                }
            }
        }

        let Some(entry) = graph.node_mut(node) else {
            probe.cache().fail(node, frame);
            return false;
        };
        let NodeEntry {
            id,
            ref label,
            ref props,
            ref mut behavior,
            ..
        } = *entry;
        let mut cx = EvalContext {
            node: id,
            label,
            props,
            inputs: &inputs,
            gpu,
            pass,
            output: None,
        };
        let ok = behavior.evaluate(&mut cx, probe);
        let output = cx.output.take();
        if !ok {
            tracing::warn!(%node, label = %cx.label, frame, "node evaluation failed");
        }

        if ok {
            match output {
                Some(result) => probe.cache().publish(node, frame, result),
                // Terminal nodes may legitimately produce nothing; the
                // slot still has to resolve so claimants wake up.
                None => probe.cache().publish_empty(node, frame),
            }
            dirty.mark_clean(node);
        } else {
            probe.cache().fail(node, frame);
        }
        ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use vidmix_core::{PixelFormat, PropertySet, Rational, Size2D};
    use vidmix_gfx::{
        CommandListHandle, DescriptorArena, FrameCache, NullGpu, TextureDesc, TexturePool,
    };
    use vidmix_graph::{BuiltNode, NodeBehavior, NodeKind, NodeSpec, SlotArity};

    struct CountingProducer {
        evaluations: Arc<AtomicUsize>,
    }
    impl NodeBehavior for CountingProducer {
        fn evaluate(&mut self, cx: &mut EvalContext<'_>, probe: &mut RenderProbe<'_>) -> bool {
            self.evaluations.fetch_add(1, Ordering::SeqCst);
            let desc = TextureDesc {
                size: probe.output_size,
                format: PixelFormat::Rgba8Unorm,
            };
            let Ok(target) = probe.acquire_target(cx.gpu, cx.node, &desc) else {
                return false;
            };
            cx.output = Some(FrameResult {
                texture: target.texture,
                size: desc.size,
                format: desc.format,
            });
            true
        }
    }

    struct Passthrough;
    impl NodeBehavior for Passthrough {
        fn evaluate(&mut self, cx: &mut EvalContext<'_>, _probe: &mut RenderProbe<'_>) -> bool {
            cx.output = cx.inputs.first().copied().flatten();
            cx.output.is_some()
        }
    }

    struct AlwaysFails;
    impl NodeBehavior for AlwaysFails {
        fn evaluate(&mut self, _cx: &mut EvalContext<'_>, _probe: &mut RenderProbe<'_>) -> bool {
            false
        }
    }

    // Succeeds without producing a frame, like a stream between packets.
    struct FramelessSource;
    impl NodeBehavior for FramelessSource {
        fn evaluate(&mut self, _cx: &mut EvalContext<'_>, _probe: &mut RenderProbe<'_>) -> bool {
            true
        }
    }

    // Terminal consumer: counts presentations, publishes nothing.
    struct Presenting {
        presented: Arc<AtomicUsize>,
    }
    impl NodeBehavior for Presenting {
        fn evaluate(&mut self, cx: &mut EvalContext<'_>, _probe: &mut RenderProbe<'_>) -> bool {
            if cx.inputs.first().copied().flatten().is_some() {
                self.presented.fetch_add(1, Ordering::SeqCst);
                true
            } else {
                false
            }
        }
    }

    fn all_of(ids: &[NodeId]) -> IndexSet<NodeId> {
        ids.iter().copied().collect()
    }

    fn built(kind: NodeKind, sinks: u32, sources: u32, behavior: Box<dyn NodeBehavior>) -> BuiltNode {
        BuiltNode {
            spec: NodeSpec {
                kind,
                sinks: SlotArity::Fixed(sinks),
                sources: SlotArity::Fixed(sources),
                props: PropertySet::new(),
            },
            behavior,
        }
    }

    struct Fixture {
        gpu: NullGpu,
        pool: TexturePool,
        cache: FrameCache,
        descriptors: DescriptorArena,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                gpu: NullGpu::new(),
                pool: TexturePool::new(2),
                cache: FrameCache::new(),
                descriptors: DescriptorArena::new(2, 64),
            }
        }

        fn probe(&self, frame: u64) -> RenderProbe<'_> {
            RenderProbe::new(
                frame,
                0,
                0,
                Rational::new(30, 1),
                Size2D::new(64, 64),
                CommandListHandle(0),
                self.descriptors.begin_frame(frame),
                &self.pool,
                &self.cache,
            )
        }
    }

    #[test]
    fn test_shared_producer_evaluates_once_per_frame() {
        let fx = Fixture::new();
        let evaluations = Arc::new(AtomicUsize::new(0));
        let mut graph = Graph::new();
        let producer = graph.add_node(
            "Counting",
            built(
                NodeKind::Input,
                0,
                1,
                Box::new(CountingProducer {
                    evaluations: Arc::clone(&evaluations),
                }),
            ),
        );
        let a = graph.add_node("Pass", built(NodeKind::Output, 1, 0, Box::new(Passthrough)));
        let b = graph.add_node("Pass", built(NodeKind::Output, 1, 0, Box::new(Passthrough)));
        graph.connect(producer, 0, a, 0).unwrap();
        graph.connect(producer, 0, b, 0).unwrap();

        let mut dirty = DirtyTracker::new();
        let needed = all_of(&[producer, a, b]);
        let mut probe = fx.probe(0);
        assert!(Evaluator::pull(&mut graph, &mut dirty, a, &fx.gpu, None, &needed, &mut probe));
        assert!(Evaluator::pull(&mut graph, &mut dirty, b, &fx.gpu, None, &needed, &mut probe));
        assert_eq!(evaluations.load(Ordering::SeqCst), 1);

        // A new frame evaluates again.
        let mut probe = fx.probe(1);
        assert!(Evaluator::pull(&mut graph, &mut dirty, a, &fx.gpu, None, &needed, &mut probe));
        assert_eq!(evaluations.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_upstream_failure_short_circuits_consumer() {
        let fx = Fixture::new();
        let mut graph = Graph::new();
        let bad = graph.add_node("Bad", built(NodeKind::Input, 0, 1, Box::new(AlwaysFails)));
        let out = graph.add_node("Pass", built(NodeKind::Output, 1, 0, Box::new(Passthrough)));
        graph.connect(bad, 0, out, 0).unwrap();

        let mut dirty = DirtyTracker::new();
        dirty.mark_dirty(bad);
        let needed = all_of(&[bad, out]);
        let mut probe = fx.probe(0);
        assert!(!Evaluator::pull(&mut graph, &mut dirty, out, &fx.gpu, None, &needed, &mut probe));
        // Failure is cached for the frame and the node stays dirty.
        assert_eq!(fx.cache.claim(bad, 0), Claim::Failed);
        assert_eq!(fx.cache.claim(out, 0), Claim::Failed);
        assert!(dirty.is_dirty(bad));
    }

    #[test]
    fn test_success_marks_node_clean() {
        let fx = Fixture::new();
        let evaluations = Arc::new(AtomicUsize::new(0));
        let mut graph = Graph::new();
        let producer = graph.add_node(
            "Counting",
            built(NodeKind::Input, 0, 1, Box::new(CountingProducer { evaluations })),
        );
        let mut dirty = DirtyTracker::new();
        dirty.mark_dirty(producer);
        let needed = all_of(&[producer]);
        let mut probe = fx.probe(0);
        assert!(Evaluator::pull(
            &mut graph,
            &mut dirty,
            producer,
            &fx.gpu,
            None,
            &needed,
            &mut probe
        ));
        assert!(!dirty.is_dirty(producer));
    }

    #[test]
    fn test_unconnected_sink_is_a_missing_input() {
        let fx = Fixture::new();
        let mut graph = Graph::new();
        // Passthrough with no upstream: evaluates with input None and
        // reports failure itself.
        let out = graph.add_node("Pass", built(NodeKind::Output, 1, 0, Box::new(Passthrough)));
        let mut dirty = DirtyTracker::new();
        let needed = all_of(&[out]);
        let mut probe = fx.probe(0);
        assert!(!Evaluator::pull(&mut graph, &mut dirty, out, &fx.gpu, None, &needed, &mut probe));
    }

    #[test]
    fn test_clean_producer_repeats_previous_frame() {
        let fx = Fixture::new();
        let evaluations = Arc::new(AtomicUsize::new(0));
        let presented = Arc::new(AtomicUsize::new(0));
        let mut graph = Graph::new();
        let producer = graph.add_node(
            "Counting",
            built(
                NodeKind::Input,
                0,
                1,
                Box::new(CountingProducer {
                    evaluations: Arc::clone(&evaluations),
                }),
            ),
        );
        let out = graph.add_node(
            "Present",
            built(
                NodeKind::Output,
                1,
                0,
                Box::new(Presenting {
                    presented: Arc::clone(&presented),
                }),
            ),
        );
        graph.connect(producer, 0, out, 0).unwrap();

        let mut dirty = DirtyTracker::new();
        // First frame: the producer changed, so it renders.
        let needed = all_of(&[producer, out]);
        let mut probe = fx.probe(0);
        assert!(Evaluator::pull(&mut graph, &mut dirty, out, &fx.gpu, None, &needed, &mut probe));

        // Second frame: nothing changed. The terminal still runs, fed
        // by the producer's retained frame instead of a fresh render.
        let needed = IndexSet::new();
        let mut probe = fx.probe(1);
        assert!(Evaluator::pull(&mut graph, &mut dirty, out, &fx.gpu, None, &needed, &mut probe));
        assert_eq!(evaluations.load(Ordering::SeqCst), 1);
        assert_eq!(presented.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_frameless_source_is_a_missing_input_not_a_failure() {
        let fx = Fixture::new();
        let mut graph = Graph::new();
        let src = graph.add_node("Idle", built(NodeKind::Input, 0, 1, Box::new(FramelessSource)));
        let out = graph.add_node("Pass", built(NodeKind::Output, 1, 0, Box::new(Passthrough)));
        graph.connect(src, 0, out, 0).unwrap();

        let mut dirty = DirtyTracker::new();
        let needed = all_of(&[src, out]);
        let mut probe = fx.probe(0);
        // The passthrough has nothing to forward and reports that
        // itself, but the source's slot resolves cleanly.
        assert!(!Evaluator::pull(&mut graph, &mut dirty, out, &fx.gpu, None, &needed, &mut probe));
        assert_eq!(fx.cache.claim(src, 0), Claim::Empty);
        assert_eq!(fx.cache.last_output(src), None);
    }
}
