use std::collections::{BTreeMap, BTreeSet};

use crate::config::model::SceneId;
use crate::foundation::core::StreamKind;
use crate::foundation::error::{VertexError, VertexResult};
use crate::graph::filters::Filter;

/// Processing-graph description produced by the scene graph compiler.
///
/// The plan is pure data: it names engine inputs, filter chains between labeled links, and
/// engine outputs. Handing it to a [`crate::engine::GraphEngine`] is a separate step.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphPlan {
    /// Engine inputs, in source-index order.
    pub inputs: Vec<InputDecl>,
    /// Filter chains in declaration order.
    pub chains: Vec<FilterChain>,
    /// Engine outputs.
    pub outputs: Vec<OutputDecl>,
    /// Switch index assigned to every scene (position in the sorted scene list).
    pub switch_index: BTreeMap<SceneId, usize>,
    /// Instance name of the scene selector, when the graph has one.
    pub selector: Option<String>,
}

impl GraphPlan {
    /// Render all chains as a single `-filter_complex` argument.
    pub fn filter_complex(&self) -> String {
        self.chains
            .iter()
            .map(FilterChain::render)
            .collect::<Vec<_>>()
            .join(";")
    }

    /// Node id of the selector filter, e.g. `streamselect@main_switcher`.
    pub fn selector_node(&self) -> Option<String> {
        let instance = self.selector.as_ref()?;
        self.chains
            .iter()
            .flat_map(|c| c.filters.iter())
            .find(|f| f.instance.as_ref() == Some(instance))
            .and_then(Filter::node_id)
    }

    /// Number of selector filters in the graph.
    pub fn selector_count(&self) -> usize {
        self.chains
            .iter()
            .flat_map(|c| c.filters.iter())
            .filter(|f| f.name == "streamselect")
            .count()
    }

    /// Node id of every addressable filter.
    pub fn node_ids(&self) -> BTreeSet<String> {
        self.chains
            .iter()
            .flat_map(|c| c.filters.iter())
            .filter_map(Filter::node_id)
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct InputDecl {
    /// Monotonic source index; links are addressed as `<index>:v` / `<index>:a`.
    pub source_index: usize,
    /// Derived socket name, `"<input>-<socketIndex>"`.
    pub socket: String,
    pub kind: StreamKind,
    pub url: String,
    pub format: String,
    pub options: Vec<String>,
}

impl InputDecl {
    pub fn stream_label(&self) -> String {
        let suffix = match self.kind {
            StreamKind::Video => 'v',
            StreamKind::Audio => 'a',
        };
        format!("{}:{}", self.source_index, suffix)
    }
}

/// `[in...] filter,filter,... [out...]`
#[derive(Clone, Debug, PartialEq)]
pub struct FilterChain {
    pub inputs: Vec<String>,
    pub filters: Vec<Filter>,
    pub outputs: Vec<String>,
}

impl FilterChain {
    pub fn new(
        inputs: impl IntoIterator<Item = impl Into<String>>,
        filters: Vec<Filter>,
        outputs: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            inputs: inputs.into_iter().map(Into::into).collect(),
            filters,
            outputs: outputs.into_iter().map(Into::into).collect(),
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for label in &self.inputs {
            out.push_str(&format!("[{label}]"));
        }
        let filters = self
            .filters
            .iter()
            .map(Filter::render)
            .collect::<Vec<_>>()
            .join(",");
        out.push_str(&filters);
        for label in &self.outputs {
            out.push_str(&format!("[{label}]"));
        }
        out
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct OutputDecl {
    /// Link label mapped into this output.
    pub label: String,
    pub url: String,
    pub format: String,
    /// Codec and muxer options, in order.
    pub options: Vec<String>,
}

/// Reject labels that would break filtergraph syntax.
pub fn validate_label(label: &str) -> VertexResult<()> {
    if label.is_empty() {
        return Err(VertexError::configuration("graph label must be non-empty"));
    }
    if label
        .chars()
        .any(|c| matches!(c, '[' | ']' | ';' | ',' | '\'') || c.is_whitespace())
    {
        return Err(VertexError::configuration(format!(
            "graph label '{label}' contains reserved characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/graph/plan.rs"]
mod tests;
