//! Vertex lifecycle: the capability interface, the composite vertex, and the retrying host.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::foundation::error::VertexResult;

/// The composite (scene-switching) vertex.
pub mod composite;
/// Retry loop that drives a [`Vertex`] through its lifecycle.
pub mod host;

/// `uninitialized → pulling_config → compiling → running`, with `failed` re-entering
/// `pulling_config` through the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    PullingConfig,
    Compiling,
    Running,
    Failed,
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Uninitialized => "uninitialized",
            Self::PullingConfig => "pulling_config",
            Self::Compiling => "compiling",
            Self::Running => "running",
            Self::Failed => "failed",
        })
    }
}

/// Lifecycle hooks implemented by every vertex kind.
///
/// The host calls `pull_config`, `compile` and `run` in order, and `cleanup` after every
/// attempt whatever its outcome.
#[async_trait]
pub trait Vertex: Send {
    /// Name used in log records.
    fn display_name(&self) -> &str;

    fn state(&self) -> LifecycleState;

    /// Record a failed attempt.
    fn mark_failed(&mut self);

    /// Subscribe to configuration and publish this vertex's resolved sockets.
    async fn pull_config(&mut self) -> VertexResult<()>;

    /// Build the processing graph and start it.
    async fn compile(&mut self) -> VertexResult<()>;

    /// Serve until `shutdown` fires (`Ok`) or the attempt fails (`Err`).
    async fn run(&mut self, shutdown: CancellationToken) -> VertexResult<()>;

    /// Release everything acquired during the attempt.
    async fn cleanup(&mut self);
}
