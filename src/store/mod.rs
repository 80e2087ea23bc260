//! External collaborators: the configuration store and the transport.

use async_trait::async_trait;

use crate::config::model::{Broadcast, Scene, VertexSpec};
use crate::foundation::error::VertexResult;

/// In-process configuration store.
pub mod memory;
/// Snapshot feeds with scoped unsubscribe.
pub mod subscription;
/// Loopback URL and port allocation.
pub mod transport;

pub use subscription::{Publisher, Subscription, subscription};

/// Source of scene and broadcast configuration, and sink for the vertex's derived description.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Scene-list snapshots for a broadcast. The first snapshot is the current list.
    async fn watch_scenes(&self, broadcast_id: &str) -> VertexResult<Subscription<Vec<Scene>>>;

    /// Broadcast-state snapshots. The first snapshot is the current state.
    async fn watch_broadcast(&self, broadcast_id: &str) -> VertexResult<Subscription<Broadcast>>;

    /// Publish the vertex's resolved inputs and outputs.
    async fn update_vertex(&self, vertex_id: &str, spec: &VertexSpec) -> VertexResult<()>;
}

/// URL and port allocation for media streams and the control endpoint.
pub trait Transport: Send + Sync {
    fn input_url(&self) -> VertexResult<String>;

    fn output_url(&self) -> VertexResult<String>;

    /// A free TCP port.
    fn tcp_port(&self) -> VertexResult<u16>;
}
