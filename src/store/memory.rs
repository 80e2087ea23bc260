use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::config::model::{Broadcast, Scene, VertexDoc, VertexSpec, read_json};
use crate::foundation::error::{VertexError, VertexResult};
use crate::store::subscription::{Publisher, Subscription, subscription};
use crate::store::ConfigStore;

/// Everything a standalone vertex needs, in one JSON document.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StoreSnapshot {
    pub vertex: VertexDoc,
    pub broadcast: Broadcast,
    pub scenes: Vec<Scene>,
}

impl StoreSnapshot {
    pub fn from_reader<R: std::io::Read>(r: R) -> VertexResult<Self> {
        serde_json::from_reader(r)
            .map_err(|e| VertexError::serde(format!("parse snapshot JSON: {e}")))
    }

    pub fn from_path(path: impl AsRef<Path>) -> VertexResult<Self> {
        read_json(path.as_ref(), "snapshot")
    }
}

#[derive(Default)]
struct Inner {
    scenes: HashMap<String, Vec<Scene>>,
    broadcasts: HashMap<String, Broadcast>,
    scene_watchers: HashMap<String, Vec<Publisher<Vec<Scene>>>>,
    broadcast_watchers: HashMap<String, Vec<Publisher<Broadcast>>>,
    vertices: HashMap<String, VertexSpec>,
}

/// Configuration store held in process memory.
///
/// Every write is pushed to live watchers; watchers that unsubscribed are pruned on the next
/// write.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: &StoreSnapshot) -> Self {
        let store = Self::new();
        store.set_scenes(&snapshot.broadcast.id, snapshot.scenes.clone());
        store.set_broadcast(snapshot.broadcast.clone());
        store
    }

    fn lock(&self) -> VertexResult<std::sync::MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| VertexError::Other(anyhow::anyhow!("memory store lock poisoned")))
    }

    pub fn set_scenes(&self, broadcast_id: &str, scenes: Vec<Scene>) {
        let Ok(mut inner) = self.lock() else { return };
        if let Some(watchers) = inner.scene_watchers.get_mut(broadcast_id) {
            watchers.retain(|w| w.publish(scenes.clone()));
        }
        inner.scenes.insert(broadcast_id.to_string(), scenes);
    }

    pub fn set_broadcast(&self, broadcast: Broadcast) {
        let Ok(mut inner) = self.lock() else { return };
        if let Some(watchers) = inner.broadcast_watchers.get_mut(&broadcast.id) {
            watchers.retain(|w| w.publish(broadcast.clone()));
        }
        inner.broadcasts.insert(broadcast.id.clone(), broadcast);
    }

    /// Last spec published by `vertex_id`.
    pub fn vertex_spec(&self, vertex_id: &str) -> Option<VertexSpec> {
        self.lock().ok()?.vertices.get(vertex_id).cloned()
    }

    /// Live watchers (scene and broadcast) on `broadcast_id`.
    pub fn watcher_count(&self, broadcast_id: &str) -> usize {
        let Ok(inner) = self.lock() else { return 0 };
        let live = |n: Option<usize>| n.unwrap_or(0);
        live(
            inner
                .scene_watchers
                .get(broadcast_id)
                .map(|w| w.iter().filter(|p| !p.is_released()).count()),
        ) + live(
            inner
                .broadcast_watchers
                .get(broadcast_id)
                .map(|w| w.iter().filter(|p| !p.is_released()).count()),
        )
    }
}

#[async_trait]
impl ConfigStore for MemoryStore {
    async fn watch_scenes(&self, broadcast_id: &str) -> VertexResult<Subscription<Vec<Scene>>> {
        let (publisher, sub) = subscription();
        let mut inner = self.lock()?;
        if let Some(current) = inner.scenes.get(broadcast_id) {
            publisher.publish(current.clone());
        }
        inner
            .scene_watchers
            .entry(broadcast_id.to_string())
            .or_default()
            .push(publisher);
        Ok(sub)
    }

    async fn watch_broadcast(&self, broadcast_id: &str) -> VertexResult<Subscription<Broadcast>> {
        let (publisher, sub) = subscription();
        let mut inner = self.lock()?;
        if let Some(current) = inner.broadcasts.get(broadcast_id) {
            publisher.publish(current.clone());
        }
        inner
            .broadcast_watchers
            .entry(broadcast_id.to_string())
            .or_default()
            .push(publisher);
        Ok(sub)
    }

    async fn update_vertex(&self, vertex_id: &str, spec: &VertexSpec) -> VertexResult<()> {
        tracing::debug!(vertex = vertex_id, inputs = spec.inputs.len(), "vertex spec stored");
        self.lock()?
            .vertices
            .insert(vertex_id.to_string(), spec.clone());
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/store/memory.rs"]
mod tests;
