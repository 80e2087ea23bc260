//! Switchyard is the control plane of a live-video compositing vertex.
//!
//! A vertex pulls its inputs and the broadcast's scene list from a configuration store, compiles
//! them into an `ffmpeg` filter graph, and then keeps the graph in step with the broadcast:
//!
//! - Scene switches are scheduled against the graph's presentation timeline
//! - Live parameter changes go over a rate-limited control channel
//! - Failed attempts are torn down and retried by a [`VertexHost`]
#![forbid(unsafe_code)]

/// Configuration documents and settings.
pub mod config;
/// Live control channel to the running graph.
pub mod control;
/// Media-processing engines.
pub mod engine;
/// Shared primitives and errors.
pub mod foundation;
/// Scene graph compiler.
pub mod graph;
/// Configuration store and transport collaborators.
pub mod store;
/// Timeline sampling and action scheduling.
pub mod timeline;
/// Vertex lifecycle.
pub mod vertex;

pub use crate::config::model::{Broadcast, Input, Region, Scene, SceneId, Socket, VertexDoc, VertexSpec};
pub use crate::config::settings::{CommandOrder, ControlSettings, EngineSettings, RetryPolicy, VertexSettings};
pub use crate::control::connection::{CommandSender, ControlConnection, TcpDialer, command_channel};
pub use crate::engine::ffmpeg::{FfmpegEngine, FfmpegFactory};
pub use crate::engine::{EngineEvent, GraphEngine};
pub use crate::foundation::core::{Canvas, Pts, Rect, StreamKind};
pub use crate::foundation::error::{VertexError, VertexResult};
pub use crate::graph::compiler::{CompileRequest, compile_graph};
pub use crate::graph::plan::GraphPlan;
pub use crate::store::memory::{MemoryStore, StoreSnapshot};
pub use crate::store::transport::LocalTransport;
pub use crate::store::{ConfigStore, Transport};
pub use crate::vertex::composite::{Collaborators, CompositeVertex, LiveControls};
pub use crate::vertex::host::VertexHost;
pub use crate::vertex::{LifecycleState, Vertex};
