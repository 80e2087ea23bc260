use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::foundation::core::{Rect, StreamKind};
use crate::foundation::error::{VertexError, VertexResult};

/// Orderable scene identifier. Scenes are sorted ascending by this id.
#[derive(
    Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct SceneId(pub String);

impl SceneId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SceneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One media stream of an input.
///
/// `kind` stays a raw string at the boundary; it is checked when the graph is compiled so an
/// unknown type aborts compilation instead of being dropped during deserialization.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Socket {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Socket {
    pub fn new(kind: StreamKind, url: impl Into<String>) -> Self {
        Self {
            kind: kind.as_str().to_string(),
            url: Some(url.into()),
        }
    }

    pub fn stream_kind(&self) -> VertexResult<StreamKind> {
        StreamKind::parse(&self.kind)
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Input {
    pub name: String,
    #[serde(default)]
    pub sockets: Vec<Socket>,
}

impl Input {
    /// Derived socket name, `"<input>-<socketIndex>"`.
    pub fn socket_name(&self, socket_idx: usize) -> String {
        format!("{}-{}", self.name, socket_idx)
    }
}

/// Placement of one input inside a scene. The first region of a scene is its anchor.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    pub input_id: String,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn rect(&self) -> Rect {
        Rect {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Scene {
    pub id: SceneId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub regions: Vec<Region>,
}

/// Sort a scene snapshot ascending by id. The resulting order is the switch index space.
pub fn sort_scenes(mut scenes: Vec<Scene>) -> Vec<Scene> {
    scenes.sort_by(|a, b| a.id.cmp(&b.id));
    scenes
}

/// Externally owned broadcast state; the vertex only observes it.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Broadcast {
    pub id: String,
    #[serde(default)]
    pub active_scene_id: Option<SceneId>,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VertexParams {
    /// Added to the wall-clock offset when computing a switch target, in milliseconds.
    #[serde(default, alias = "cutOffset")]
    pub cut_offset_ms: i64,
    /// Parameters this crate does not interpret; passed back untouched when publishing.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// The vertex document as stored in the configuration store.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VertexDoc {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub broadcast_id: String,
    #[serde(default)]
    pub inputs: Vec<Input>,
    #[serde(default)]
    pub params: VertexParams,
}

impl VertexDoc {
    /// Name used in log records: the title if set, otherwise the id.
    pub fn display_name(&self) -> &str {
        match self.title.as_deref() {
            Some(t) if !t.is_empty() => t,
            _ => &self.id,
        }
    }

    pub fn from_reader<R: std::io::Read>(r: R) -> VertexResult<Self> {
        serde_json::from_reader(r)
            .map_err(|e| VertexError::serde(format!("parse vertex JSON: {e}")))
    }

    pub fn from_path(path: impl AsRef<Path>) -> VertexResult<Self> {
        read_json(path.as_ref(), "vertex")
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Output {
    pub name: String,
    pub sockets: Vec<Socket>,
}

/// Derived vertex description published back to the configuration store.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VertexSpec {
    pub inputs: Vec<Input>,
    pub outputs: Vec<Output>,
    pub params: VertexParams,
}

pub(crate) fn read_json<T: serde::de::DeserializeOwned>(
    path: &Path,
    what: &str,
) -> VertexResult<T> {
    let f = File::open(path).map_err(|e| {
        VertexError::serde(format!("open {what} JSON '{}': {e}", path.display()))
    })?;
    serde_json::from_reader(BufReader::new(f)).map_err(|e| {
        VertexError::serde(format!("parse {what} JSON '{}': {e}", path.display()))
    })
}

#[cfg(test)]
#[path = "../../tests/unit/config/model.rs"]
mod tests;
