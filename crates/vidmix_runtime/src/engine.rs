// SPDX-License-Identifier: MIT OR Apache-2.0
//! The timer-driven render loop.
//!
//! The engine owns the graph, the animation system, the scheduler and
//! all frame-scoped GPU machinery, and turns scheduler ticks into
//! rendered frames:
//!
//! 1. animation writes property overrides and marks changed nodes dirty
//! 2. behaviors are polled for out-of-band changes (stream frames)
//! 3. the dirty set is propagated into a per-output frame plan
//! 4. the pacer gates on frames-in-flight, retiring completed frames
//! 5. each due output pulls through the evaluator with a fresh probe;
//!    all pulls of one tick share a frame number and the frame cache
//! 6. recorded commands are submitted and the fence handed to the pacer
//!
//! Node failures are logged and retried next tick. Device loss aborts
//! the loop with an error.

use crate::error::EngineError;
use crate::eval::Evaluator;
use crate::shutdown::ShutdownContext;
use indexmap::{IndexMap, IndexSet};
use std::sync::Arc;
use std::time::Duration;
use vidmix_core::{NodeId, Rational, Size2D};
use vidmix_gfx::{
    DescriptorArena, FrameCache, FramePacer, GpuBackend, RenderProbe, TexturePool,
    DEFAULT_FRAMES_IN_FLIGHT,
};
use vidmix_graph::{Graph, GraphError, DirtyTracker};
use vidmix_timeline::{AnimationSystem, NextTick, OutputScheduler, TickRecord, Timeline};

/// Engine construction parameters.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Frames whose GPU work may be outstanding at once
    pub frames_in_flight: u32,
    /// Descriptor capacity per frame slot
    pub descriptor_capacity: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            frames_in_flight: DEFAULT_FRAMES_IN_FLIGHT,
            descriptor_capacity: 1024,
        }
    }
}

/// One output due for rendering this tick.
#[derive(Debug, Clone, Copy)]
pub struct DueOutput {
    /// The output node to pull
    pub output: NodeId,
    /// PTS the rendered frame presents at
    pub target_pts: i64,
    /// The output's own frame index on its cadence
    pub frame_number: u64,
}

struct OutputInfo {
    rate: Rational,
    size: Size2D,
    history: Timeline,
}

/// Owner of the whole evaluation state and the render loop.
pub struct Engine {
    gpu: Arc<dyn GpuBackend>,
    shutdown: Arc<ShutdownContext>,
    graph: Graph,
    dirty: DirtyTracker,
    animation: AnimationSystem,
    scheduler: OutputScheduler,
    pool: TexturePool,
    cache: FrameCache,
    pacer: FramePacer,
    descriptors: DescriptorArena,
    outputs: IndexMap<NodeId, OutputInfo>,
    /// Monotonically increasing, never reused.
    frame_number: u64,
}

impl Engine {
    /// Build an engine over `gpu`.
    pub fn new(gpu: Arc<dyn GpuBackend>, shutdown: Arc<ShutdownContext>, config: EngineConfig) -> Self {
        Self {
            gpu,
            shutdown,
            graph: Graph::new(),
            dirty: DirtyTracker::new(),
            animation: AnimationSystem::new(),
            scheduler: OutputScheduler::new(),
            pool: TexturePool::new(config.frames_in_flight),
            cache: FrameCache::new(),
            pacer: FramePacer::new(config.frames_in_flight),
            descriptors: DescriptorArena::new(config.frames_in_flight, config.descriptor_capacity),
            outputs: IndexMap::new(),
            frame_number: 0,
        }
    }

    /// The graph.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// The graph, for topology and property edits.
    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    /// The dirty tracker, for explicit invalidation.
    pub fn dirty_mut(&mut self) -> &mut DirtyTracker {
        &mut self.dirty
    }

    /// The animation system.
    pub fn animation_mut(&mut self) -> &mut AnimationSystem {
        &mut self.animation
    }

    /// The GPU backend the engine renders with.
    pub fn gpu(&self) -> &dyn GpuBackend {
        self.gpu.as_ref()
    }

    /// Put an output node on the render cadence.
    pub fn add_output(
        &mut self,
        output: NodeId,
        rate: Rational,
        size: Size2D,
    ) -> Result<(), EngineError> {
        if self.graph.node(output).is_none() {
            return Err(GraphError::NodeNotFound(output).into());
        }
        self.outputs.insert(
            output,
            OutputInfo {
                rate,
                size,
                history: Timeline::new(rate),
            },
        );
        self.scheduler.add_output(output, rate);
        self.dirty.mark_dirty(output);
        Ok(())
    }

    /// Take an output off the cadence.
    pub fn remove_output(&mut self, output: NodeId) {
        self.outputs.shift_remove(&output);
        self.scheduler.remove_output(output);
    }

    /// Rebase every output's cadence at PTS 0 and start counting.
    pub fn play(&mut self) {
        self.scheduler.play();
        for info in self.outputs.values_mut() {
            info.history.rebase(0);
        }
    }

    /// Look back at a recent tick of `output`, by its cadence frame
    /// index.
    pub fn tick_record(&self, output: NodeId, frame_number: u64) -> Option<TickRecord> {
        self.outputs.get(&output)?.history.record(frame_number)
    }

    /// The most recent tick of `output`.
    pub fn last_tick(&self, output: NodeId) -> Option<TickRecord> {
        self.outputs.get(&output)?.history.last_record()
    }

    /// Run until shutdown is requested. Waits between ticks on the
    /// shutdown condvar, so a request interrupts the sleep immediately.
    pub fn run(&mut self) -> Result<(), EngineError> {
        tracing::info!(outputs = self.outputs.len(), "render loop started");
        loop {
            if self.shutdown.is_requested() {
                break;
            }
            // Drain everything due at this instant into one tick so
            // shared upstream work is evaluated once.
            let mut due = Vec::new();
            let wait = loop {
                match self.scheduler.next_ready() {
                    NextTick::Due {
                        output,
                        target_pts,
                        frame_number,
                    } => due.push(DueOutput {
                        output,
                        target_pts,
                        frame_number,
                    }),
                    NextTick::Wait(wait) => break wait,
                    NextTick::Idle => break Duration::from_millis(50),
                }
            };
            if due.is_empty() {
                if self.shutdown.wait_timeout(wait.min(Duration::from_millis(250))) {
                    break;
                }
                continue;
            }
            let current_pts = self.scheduler.current_pts();
            self.render_tick(&due, current_pts)?;
        }
        tracing::info!("render loop stopped");
        Ok(())
    }

    /// Render one tick for the given due outputs.
    ///
    /// All pulls share one frame number and the frame cache, so a node
    /// feeding several due outputs evaluates once. Outputs whose whole
    /// upstream chain is clean reuse their cached frame and are
    /// skipped.
    pub fn render_tick(&mut self, due: &[DueOutput], current_pts: i64) -> Result<(), EngineError> {
        self.animation
            .evaluate_at_pts(current_pts, &mut self.graph, &mut self.dirty);
        for node in self.graph.poll_changed() {
            self.dirty.mark_dirty(node);
        }

        // Every due tick lands in its output's history, including ones
        // resolved from cache: the frame still presented, repeated.
        for d in due {
            if let Some(info) = self.outputs.get_mut(&d.output) {
                info.history.note_tick(d.frame_number, d.target_pts, current_pts);
            }
        }

        let requested: Vec<NodeId> = due.iter().map(|d| d.output).collect();
        let plan = self.dirty.propagate(&self.graph, &requested);

        let work: Vec<&DueOutput> = due
            .iter()
            .filter(|d| {
                let must_render = plan
                    .per_output
                    .get(&d.output)
                    .is_some_and(|set| !set.is_empty());
                // First frame of an output has nothing cached yet.
                must_render || self.cache.last_output(d.output).is_none()
            })
            .collect();
        if work.is_empty() {
            tracing::trace!(outputs = due.len(), "tick fully cached, skipping");
            return Ok(());
        }

        let frame_number = self.frame_number;
        self.frame_number += 1;

        if let Some(oldest_live) = self.pacer.begin_frame(self.gpu.as_ref())? {
            self.cache.retire_before(oldest_live);
        } else {
            self.cache.retire_before(frame_number);
        }

        let commands = self.gpu.begin_commands()?;
        let slice = self.descriptors.begin_frame(frame_number);

        let empty = IndexSet::new();
        for d in work {
            let Some(info) = self.outputs.get(&d.output) else {
                continue;
            };
            let needed = plan.per_output.get(&d.output).unwrap_or(&empty);
            let mut probe = RenderProbe::new(
                frame_number,
                d.target_pts,
                current_pts,
                info.rate,
                info.size,
                commands,
                slice,
                &self.pool,
                &self.cache,
            );
            if !Evaluator::pull(
                &mut self.graph,
                &mut self.dirty,
                d.output,
                self.gpu.as_ref(),
                None,
                needed,
                &mut probe,
            ) {
                tracing::warn!(output = %d.output, frame_number, "output failed this tick");
            }
        }

        let fence = self.gpu.submit(commands)?;
        self.pacer.frame_submitted(frame_number, fence);
        tracing::trace!(frame_number, outputs = requested.len(), "tick submitted");
        Ok(())
    }
}
