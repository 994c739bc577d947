// SPDX-License-Identifier: MIT OR Apache-2.0
//! vidmix demo binary.
//!
//! Builds a small compositing graph over the in-process GPU backend:
//! two solid-color inputs crossfaded by an animated blend, presented
//! on a window output and a stream output at 30 fps. Runs for a few
//! seconds, then shuts down cleanly. Real deployments replace the
//! logging collaborators with device- and transport-backed ones.

use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use vidmix_core::{PropValue, Rational, Size2D};
use vidmix_gfx::{FrameResult, GpuBackend, NullGpu};
use vidmix_graph::NodeRegistry;
use vidmix_runtime::codec::{CodecError, StreamConnector, StreamSource, TextureLoader};
use vidmix_runtime::nodes::{register_builtins, Collaborators, FrameSender, SurfacePresenter};
use vidmix_runtime::{Engine, EngineConfig, EngineError, ShutdownContext};
use vidmix_timeline::Keyframe;

/// Presenter that logs each presented frame.
struct LogPresenter;

impl SurfacePresenter for LogPresenter {
    fn present(&self, _gpu: &dyn GpuBackend, name: &str, frame: &FrameResult, pts: i64) -> bool {
        tracing::info!(name, pts, size = %frame.size, "present");
        true
    }
}

/// Sender that logs each transmitted frame.
struct LogSender;

impl FrameSender for LogSender {
    fn send(&self, name: &str, frame: &FrameResult, pts: i64) -> bool {
        tracing::info!(name, pts, size = %frame.size, "send");
        true
    }
}

/// Loader that fails every path; the demo graph uses solids only.
struct NoLoader;

impl TextureLoader for NoLoader {
    fn load_texture(&self, _gpu: &dyn GpuBackend, path: &str) -> Result<FrameResult, CodecError> {
        Err(CodecError::DecodeFailed(format!(
            "no decoder in the demo binary: {path}"
        )))
    }
}

/// Connector that refuses every URL; the demo graph has no streams.
struct NoConnector;

impl StreamConnector for NoConnector {
    fn connect(
        &self,
        _gpu: &dyn GpuBackend,
        url: &str,
        _options: &serde_json::Value,
        _timeout: Duration,
    ) -> Result<Box<dyn StreamSource>, CodecError> {
        Err(CodecError::ConnectFailed {
            url: url.to_string(),
            reason: "no transport in the demo binary".into(),
        })
    }
}

fn run() -> Result<(), EngineError> {
    let gpu: Arc<dyn GpuBackend> = Arc::new(NullGpu::new());
    let shutdown = Arc::new(ShutdownContext::new());

    let mut registry = NodeRegistry::new();
    register_builtins(
        &mut registry,
        &Collaborators {
            loader: Arc::new(NoLoader),
            connector: Arc::new(NoConnector),
            presenter: Arc::new(LogPresenter),
            sender: Arc::new(LogSender),
        },
    );

    let mut engine = Engine::new(Arc::clone(&gpu), Arc::clone(&shutdown), EngineConfig::default());

    let graph = engine.graph_mut();
    let red = graph.add_node(
        "SolidInput",
        registry.create(
            "SolidInput",
            gpu.as_ref(),
            &serde_json::json!({ "color": [1.0, 0.0, 0.0, 1.0] }),
        )?,
    );
    let blue = graph.add_node(
        "SolidInput",
        registry.create(
            "SolidInput",
            gpu.as_ref(),
            &serde_json::json!({ "color": [0.0, 0.0, 1.0, 1.0] }),
        )?,
    );
    let blend = graph.add_node(
        "BlendFilter",
        registry.create("BlendFilter", gpu.as_ref(), &serde_json::json!({ "mix": 0.0 }))?,
    );
    let window = graph.add_node(
        "WindowOutput",
        registry.create(
            "WindowOutput",
            gpu.as_ref(),
            &serde_json::json!({ "size": { "width": 1280, "height": 720 }, "name": "preview" }),
        )?,
    );
    let stream = graph.add_node(
        "StreamOutput",
        registry.create(
            "StreamOutput",
            gpu.as_ref(),
            &serde_json::json!({ "size": { "width": 1280, "height": 720 }, "name": "program" }),
        )?,
    );
    graph.connect(red, 0, blend, 0)?;
    graph.connect(blue, 0, blend, 1)?;
    graph.connect(blend, 0, window, 0)?;
    graph.connect(blend, 0, stream, 0)?;

    let size = Size2D::new(1280, 720);
    engine.add_output(window, Rational::new(30, 1), size)?;
    engine.add_output(stream, Rational::new(30, 1), size)?;

    // Crossfade red -> blue over two seconds, looping.
    if let Ok(clip_id) = engine.animation_mut().add_clip(blend) {
        if let Ok(clip) = engine.animation_mut().clip_mut(clip_id) {
            clip.loop_mode = vidmix_timeline::LoopMode::Loop;
            let track = clip.add_track("mix");
            track.add_keyframe(Keyframe::new(0, PropValue::Float(0.0)));
            track.add_keyframe(Keyframe::new(180_000, PropValue::Float(1.0)));
            clip.play(0);
        }
    }

    let stopper = Arc::clone(&shutdown);
    let timer = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_secs(5));
        stopper.request();
    });

    engine.play();
    let result = engine.run();
    let _ = timer.join();
    result
}

fn main() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,vidmix=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(err) = run() {
        tracing::error!(%err, "engine failed");
        std::process::exit(1);
    }
}
