// SPDX-License-Identifier: MIT OR Apache-2.0
//! Built-in node types.
//!
//! Inputs produce frames (constant color, decoded image, live stream),
//! filters combine them, outputs hand the finished frame to a
//! presentation collaborator. Everything device- or transport-specific
//! lives behind the collaborator traits; the behaviors here only do
//! graph-side work.

use crate::codec::{StreamConnector, StreamSource, TextureLoader};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use vidmix_core::{PixelFormat, PropValue, PropertySet, Size2D};
use vidmix_gfx::{FrameResult, GpuBackend, RenderProbe, TextureDesc};
use vidmix_graph::{
    BuiltNode, EvalContext, GraphError, NodeBehavior, NodeKind, NodeRegistry, NodeSpec, SlotArity,
};

/// Presents finished frames on a window surface.
pub trait SurfacePresenter: Send + Sync {
    /// Present `frame` on the surface named `name`. Returns whether
    /// presentation succeeded.
    fn present(&self, gpu: &dyn GpuBackend, name: &str, frame: &FrameResult, pts: i64) -> bool;
}

/// Sends finished frames to a network peer.
pub trait FrameSender: Send + Sync {
    /// Send `frame` on the stream named `name`. Returns whether the
    /// frame was accepted for transmission.
    fn send(&self, name: &str, frame: &FrameResult, pts: i64) -> bool;
}

/// Shared collaborators captured by the built-in node factories.
#[derive(Clone)]
pub struct Collaborators {
    /// Still-image decoder
    pub loader: Arc<dyn TextureLoader>,
    /// Network stream dialer
    pub connector: Arc<dyn StreamConnector>,
    /// Window presentation
    pub presenter: Arc<dyn SurfacePresenter>,
    /// Network transmission
    pub sender: Arc<dyn FrameSender>,
}

/// Descriptor both output node types are created from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputDesc {
    /// Pixel format of the output surface
    #[serde(default)]
    pub pixel_format: PixelFormat,
    /// Size of the output surface
    pub size: Size2D,
    /// Surface or stream name, used for presentation and diagnostics
    pub name: String,
}

fn parse_desc<T: serde::de::DeserializeOwned>(
    descriptor: &serde_json::Value,
) -> Result<T, GraphError> {
    serde_json::from_value(descriptor.clone())
        .map_err(|err| GraphError::InvalidDescriptor(err.to_string()))
}

fn spec(kind: NodeKind, sinks: u32, sources: u32, props: PropertySet) -> NodeSpec {
    NodeSpec {
        kind,
        sinks: SlotArity::Fixed(sinks),
        sources: SlotArity::Fixed(sources),
        props,
    }
}

// ---------------------------------------------------------------------------
// Inputs

#[derive(Debug, Deserialize)]
struct SolidDesc {
    color: [f64; 4],
    #[serde(default)]
    size: Option<Size2D>,
}

/// Constant-color producer. The color is the animatable `color`
/// property; size defaults to the output being rendered.
struct SolidInput {
    size: Option<Size2D>,
}

impl NodeBehavior for SolidInput {
    fn evaluate(&mut self, cx: &mut EvalContext<'_>, probe: &mut RenderProbe<'_>) -> bool {
        let desc = TextureDesc {
            size: self.size.unwrap_or(probe.output_size),
            format: PixelFormat::Rgba8Unorm,
        };
        let target = match probe.acquire_target(cx.gpu, cx.node, &desc) {
            Ok(target) => target,
            Err(err) => {
                tracing::warn!(label = %cx.label, %err, "solid target acquisition failed");
                return false;
            }
        };
        // The clear itself is recorded into probe.commands by the
        // backend; the graph side only tracks the result.
        let color = cx.props.get("color").cloned();
        tracing::trace!(label = %cx.label, ?color, "solid clear recorded");
        cx.output = Some(FrameResult {
            texture: target.texture,
            size: desc.size,
            format: desc.format,
        });
        true
    }
}

#[derive(Debug, Deserialize)]
struct ImageDesc {
    path: String,
}

/// Decoded still image. The texture is loaded on first evaluation and
/// reused for every following frame.
struct ImageInput {
    path: String,
    loader: Arc<dyn TextureLoader>,
    loaded: Option<FrameResult>,
}

impl NodeBehavior for ImageInput {
    fn evaluate(&mut self, cx: &mut EvalContext<'_>, _probe: &mut RenderProbe<'_>) -> bool {
        if self.loaded.is_none() {
            match self.loader.load_texture(cx.gpu, &self.path) {
                Ok(frame) => {
                    tracing::info!(path = %self.path, ?frame.size, "image loaded");
                    self.loaded = Some(frame);
                }
                Err(err) => {
                    tracing::warn!(path = %self.path, %err, "image load failed");
                    return false;
                }
            }
        }
        cx.output = self.loaded;
        true
    }
}

#[derive(Debug, Deserialize)]
struct StreamDesc {
    url: String,
    #[serde(default)]
    options: serde_json::Value,
    #[serde(default = "default_timeout_ms")]
    timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    5000
}

/// Frames from a connected network stream. `poll` reports newly
/// arrived frames so the node is marked dirty between evaluations.
struct StreamInput {
    url: String,
    source: Box<dyn StreamSource>,
}

impl NodeBehavior for StreamInput {
    fn evaluate(&mut self, cx: &mut EvalContext<'_>, _probe: &mut RenderProbe<'_>) -> bool {
        match self.source.latest(cx.gpu) {
            Ok(Some(frame)) => {
                cx.output = Some(frame);
                true
            }
            Ok(None) => {
                tracing::debug!(url = %self.url, "no stream frame yet");
                false
            }
            Err(err) => {
                tracing::warn!(url = %self.url, %err, "stream read failed");
                false
            }
        }
    }

    fn poll(&mut self) -> bool {
        self.source.poll()
    }
}

// ---------------------------------------------------------------------------
// Filters

#[derive(Debug, Deserialize)]
struct BlendDesc {
    #[serde(default = "default_mix")]
    mix: f64,
}

fn default_mix() -> f64 {
    0.5
}

/// Two-input crossfade controlled by the animatable `mix` property.
struct BlendFilter;

impl NodeBehavior for BlendFilter {
    fn evaluate(&mut self, cx: &mut EvalContext<'_>, probe: &mut RenderProbe<'_>) -> bool {
        let (Some(a), Some(b)) = (
            cx.inputs.first().copied().flatten(),
            cx.inputs.get(1).copied().flatten(),
        ) else {
            tracing::warn!(label = %cx.label, "blend requires both inputs");
            return false;
        };
        let mix = cx.props.get_float("mix").unwrap_or(0.5).clamp(0.0, 1.0);

        // Render into the consumer's forwarded target when one was
        // supplied, otherwise into a pooled scratch texture.
        let (texture, size) = match cx.pass {
            Some(pass) => (pass.target, pass.size),
            None => {
                let desc = TextureDesc {
                    size: a.size,
                    format: a.format,
                };
                match probe.acquire_target(cx.gpu, cx.node, &desc) {
                    Ok(target) => (target.texture, desc.size),
                    Err(err) => {
                        tracing::warn!(label = %cx.label, %err, "blend target acquisition failed");
                        return false;
                    }
                }
            }
        };
        tracing::trace!(label = %cx.label, mix, ?a.texture, ?b.texture, "blend recorded");
        cx.output = Some(FrameResult {
            texture,
            size,
            format: a.format,
        });
        true
    }
}

// ---------------------------------------------------------------------------
// Outputs

/// Presents its input on a window surface.
struct WindowOutput {
    desc: OutputDesc,
    presenter: Arc<dyn SurfacePresenter>,
}

impl NodeBehavior for WindowOutput {
    fn evaluate(&mut self, cx: &mut EvalContext<'_>, probe: &mut RenderProbe<'_>) -> bool {
        let Some(frame) = cx.inputs.first().copied().flatten() else {
            tracing::warn!(label = %cx.label, "window output has no input");
            return false;
        };
        if !self
            .presenter
            .present(cx.gpu, &self.desc.name, &frame, probe.target_pts)
        {
            tracing::warn!(label = %cx.label, name = %self.desc.name, "present failed");
            return false;
        }
        cx.output = Some(frame);
        true
    }
}

/// Sends its input to a network peer.
struct StreamOutput {
    desc: OutputDesc,
    sender: Arc<dyn FrameSender>,
}

impl NodeBehavior for StreamOutput {
    fn evaluate(&mut self, cx: &mut EvalContext<'_>, probe: &mut RenderProbe<'_>) -> bool {
        let Some(frame) = cx.inputs.first().copied().flatten() else {
            tracing::warn!(label = %cx.label, "stream output has no input");
            return false;
        };
        if !self.sender.send(&self.desc.name, &frame, probe.target_pts) {
            tracing::warn!(label = %cx.label, name = %self.desc.name, "send failed");
            return false;
        }
        cx.output = Some(frame);
        true
    }
}

// ---------------------------------------------------------------------------
// Registration

/// Register every built-in node type.
pub fn register_builtins(registry: &mut NodeRegistry, collab: &Collaborators) {
    registry.register("SolidInput", |_gpu, descriptor| {
        let desc: SolidDesc = parse_desc(descriptor)?;
        let mut props = PropertySet::new();
        props.set("color", PropValue::Vec4(desc.color));
        Ok(BuiltNode {
            spec: spec(NodeKind::Input, 0, 1, props),
            behavior: Box::new(SolidInput { size: desc.size }),
        })
    });

    let loader = Arc::clone(&collab.loader);
    registry.register("ImageInput", move |_gpu, descriptor| {
        let desc: ImageDesc = parse_desc(descriptor)?;
        let mut props = PropertySet::new();
        props.set("path", PropValue::Text(desc.path.clone()));
        Ok(BuiltNode {
            spec: spec(NodeKind::Input, 0, 1, props),
            behavior: Box::new(ImageInput {
                path: desc.path,
                loader: Arc::clone(&loader),
                loaded: None,
            }),
        })
    });

    let connector = Arc::clone(&collab.connector);
    registry.register("StreamInput", move |gpu, descriptor| {
        let desc: StreamDesc = parse_desc(descriptor)?;
        let source = connector
            .connect(
                gpu,
                &desc.url,
                &desc.options,
                Duration::from_millis(desc.timeout_ms),
            )
            .map_err(|err| GraphError::InvalidDescriptor(err.to_string()))?;
        let mut props = PropertySet::new();
        props.set("url", PropValue::Text(desc.url.clone()));
        Ok(BuiltNode {
            spec: spec(NodeKind::Input, 0, 1, props),
            behavior: Box::new(StreamInput {
                url: desc.url,
                source,
            }),
        })
    });

    registry.register("BlendFilter", |_gpu, descriptor| {
        let desc: BlendDesc = parse_desc(descriptor)?;
        let mut props = PropertySet::new();
        props.set("mix", PropValue::Float(desc.mix));
        Ok(BuiltNode {
            spec: spec(NodeKind::Filter, 2, 1, props),
            behavior: Box::new(BlendFilter),
        })
    });

    let presenter = Arc::clone(&collab.presenter);
    registry.register("WindowOutput", move |_gpu, descriptor| {
        let desc: OutputDesc = parse_desc(descriptor)?;
        Ok(BuiltNode {
            spec: spec(NodeKind::Output, 1, 0, PropertySet::new()),
            behavior: Box::new(WindowOutput {
                desc,
                presenter: Arc::clone(&presenter),
            }),
        })
    });

    let sender = Arc::clone(&collab.sender);
    registry.register("StreamOutput", move |_gpu, descriptor| {
        let desc: OutputDesc = parse_desc(descriptor)?;
        Ok(BuiltNode {
            spec: spec(NodeKind::Output, 1, 0, PropertySet::new()),
            behavior: Box::new(StreamOutput {
                desc,
                sender: Arc::clone(&sender),
            }),
        })
    });
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use std::sync::atomic::Ordering;
    use vidmix_core::Rational;
    use vidmix_gfx::{CommandListHandle, DescriptorArena, FrameCache, NullGpu, TexturePool};
    use vidmix_graph::NodeRegistry;

    fn registry() -> NodeRegistry {
        let mut registry = NodeRegistry::new();
        let collab = collaborators(Arc::default(), Arc::default());
        register_builtins(&mut registry, &collab);
        registry
    }

    struct ProbeParts {
        pool: TexturePool,
        cache: FrameCache,
        descriptors: DescriptorArena,
    }

    impl ProbeParts {
        fn new() -> Self {
            Self {
                pool: TexturePool::new(2),
                cache: FrameCache::new(),
                descriptors: DescriptorArena::new(2, 64),
            }
        }

        fn probe(&self, frame: u64) -> RenderProbe<'_> {
            RenderProbe::new(
                frame,
                3000,
                3010,
                Rational::new(30, 1),
                Size2D::new(128, 128),
                CommandListHandle(0),
                self.descriptors.begin_frame(frame),
                &self.pool,
                &self.cache,
            )
        }
    }

    fn evaluate(
        node: &mut BuiltNode,
        gpu: &dyn GpuBackend,
        inputs: &[Option<FrameResult>],
        probe: &mut RenderProbe<'_>,
    ) -> (bool, Option<FrameResult>) {
        let mut cx = EvalContext {
            node: vidmix_core::NodeId::from_raw(0, 0),
            label: "test",
            props: &node.spec.props,
            inputs,
            gpu,
            pass: None,
            output: None,
        };
        let ok = node.behavior.evaluate(&mut cx, probe);
        (ok, cx.output)
    }

    #[test]
    fn test_solid_input_produces_a_frame() {
        let gpu = NullGpu::new();
        let parts = ProbeParts::new();
        let mut node = registry()
            .create(
                "SolidInput",
                &gpu,
                &serde_json::json!({ "color": [1.0, 0.0, 0.0, 1.0] }),
            )
            .unwrap();
        let mut probe = parts.probe(0);
        let (ok, output) = evaluate(&mut node, &gpu, &[], &mut probe);
        assert!(ok);
        // No explicit size: the solid matches the output surface.
        assert_eq!(output.unwrap().size, Size2D::new(128, 128));
    }

    #[test]
    fn test_solid_input_rejects_bad_descriptor() {
        let gpu = NullGpu::new();
        let err = registry()
            .create("SolidInput", &gpu, &serde_json::json!({ "colour": [1.0] }))
            .err();
        assert!(matches!(err, Some(GraphError::InvalidDescriptor(_))));
    }

    #[test]
    fn test_image_input_loads_once_and_reuses() {
        let gpu = NullGpu::new();
        let parts = ProbeParts::new();
        let mut node = registry()
            .create(
                "ImageInput",
                &gpu,
                &serde_json::json!({ "path": "/media/a.png" }),
            )
            .unwrap();
        let mut probe = parts.probe(0);
        let (_, first) = evaluate(&mut node, &gpu, &[], &mut probe);
        let mut probe = parts.probe(1);
        let (_, second) = evaluate(&mut node, &gpu, &[], &mut probe);
        assert_eq!(
            first.unwrap().texture,
            second.unwrap().texture,
            "texture is decoded once"
        );
    }

    #[test]
    fn test_stream_input_connect_failure_is_a_creation_error() {
        let gpu = NullGpu::new();
        let err = registry()
            .create(
                "StreamInput",
                &gpu,
                &serde_json::json!({ "url": "rtp://nowhere:5004" }),
            )
            .err();
        assert!(matches!(err, Some(GraphError::InvalidDescriptor(_))));
    }

    #[test]
    fn test_blend_requires_both_inputs() {
        let gpu = NullGpu::new();
        let parts = ProbeParts::new();
        let mut node = registry()
            .create("BlendFilter", &gpu, &serde_json::json!({}))
            .unwrap();
        let some = FrameResult {
            texture: gpu
                .create_texture(&TextureDesc {
                    size: Size2D::new(64, 64),
                    format: PixelFormat::Rgba8Unorm,
                })
                .unwrap(),
            size: Size2D::new(64, 64),
            format: PixelFormat::Rgba8Unorm,
        };
        let mut probe = parts.probe(0);
        let (ok, _) = evaluate(&mut node, &gpu, &[Some(some), None], &mut probe);
        assert!(!ok);
        let mut probe = parts.probe(0);
        let (ok, output) = evaluate(&mut node, &gpu, &[Some(some), Some(some)], &mut probe);
        assert!(ok);
        assert_eq!(output.unwrap().size, Size2D::new(64, 64));
    }

    #[test]
    fn test_window_output_presents_at_target_pts() {
        let gpu = NullGpu::new();
        let parts = ProbeParts::new();
        let presenter = Arc::new(CountingPresenter::default());
        let mut registry = NodeRegistry::new();
        register_builtins(
            &mut registry,
            &collaborators(Arc::clone(&presenter), Arc::default()),
        );
        let mut node = registry
            .create(
                "WindowOutput",
                &gpu,
                &serde_json::json!({
                    "size": { "width": 1920, "height": 1080 },
                    "name": "main"
                }),
            )
            .unwrap();
        let frame = FrameResult {
            texture: gpu
                .create_texture(&TextureDesc {
                    size: Size2D::new(64, 64),
                    format: PixelFormat::Rgba8Unorm,
                })
                .unwrap(),
            size: Size2D::new(64, 64),
            format: PixelFormat::Rgba8Unorm,
        };
        let mut probe = parts.probe(0);
        let (ok, _) = evaluate(&mut node, &gpu, &[Some(frame)], &mut probe);
        assert!(ok);
        assert_eq!(presenter.presents.load(Ordering::SeqCst), 1);
        // Presentation is stamped with the frame's target, not the
        // slightly later actual time.
        assert_eq!(*presenter.last_pts.lock(), Some(3000));
    }
}
