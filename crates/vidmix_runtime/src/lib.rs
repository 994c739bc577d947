// SPDX-License-Identifier: MIT OR Apache-2.0
//! The vidmix runtime: evaluation engine and built-in nodes.
//!
//! - [`eval`]: the synchronous pull evaluator with per-frame memoization
//! - [`nodes`]: built-in input, filter and output node types
//! - [`codec`]: collaborator traits for decode and network transport
//! - [`engine`]: the timer-driven render loop
//! - [`shutdown`]: cooperative shutdown signalling

pub mod codec;
pub mod engine;
pub mod error;
pub mod eval;
pub mod nodes;
pub mod shutdown;

pub use codec::{CodecError, StreamConnector, StreamSource, TextureLoader};
pub use engine::{DueOutput, Engine, EngineConfig};
pub use error::EngineError;
pub use eval::Evaluator;
pub use nodes::{register_builtins, Collaborators, FrameSender, OutputDesc, SurfacePresenter};
pub use shutdown::ShutdownContext;
