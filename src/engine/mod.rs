//! Media-processing engine seam.
//!
//! A compiled [`GraphPlan`] is declared on an engine piece by piece, then started. The engine
//! reports progress back over a channel; the vertex consumes those events on its own task.

use std::collections::BTreeSet;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::config::settings::EngineSettings;
use crate::foundation::error::{VertexError, VertexResult};
use crate::graph::plan::{FilterChain, GraphPlan, InputDecl, OutputDecl};
use crate::timeline::sampler::TimelineSample;

/// `ffmpeg` child-process engine.
pub mod ffmpeg;

/// Notification from a running engine.
#[derive(Clone, Debug, PartialEq)]
pub enum EngineEvent {
    /// The graph reported progress for the first time; its control endpoint is up.
    Started,
    /// A presentation timestamp reached the graph's output.
    Timeline(TimelineSample),
    /// The engine stopped. `success` is false for crashes and non-zero exits.
    Exited { success: bool, detail: String },
}

/// Processing engine contract. All declarations happen before [`GraphEngine::start`].
#[async_trait]
pub trait GraphEngine: Send {
    fn add_input(&mut self, input: &InputDecl) -> VertexResult<()>;

    fn add_output(&mut self, output: &OutputDecl) -> VertexResult<()>;

    /// Declare one chain; returns the engine node id of every named filter in it, in order.
    fn declare_chain(&mut self, chain: &FilterChain) -> VertexResult<Vec<String>>;

    /// Launch the graph. Events flow into `events` until the engine exits.
    async fn start(&mut self, events: mpsc::Sender<EngineEvent>) -> VertexResult<()>;

    /// Stop the graph and release its resources. Idempotent.
    async fn stop(&mut self) -> VertexResult<()>;
}

/// Builds a fresh engine for every initialization attempt.
pub trait EngineFactory: Send + Sync {
    fn create(&self, settings: &EngineSettings) -> Box<dyn GraphEngine>;
}

/// Declare everything in `plan` on `engine`.
///
/// Returns the engine node id of every named filter.
pub fn apply_plan(engine: &mut dyn GraphEngine, plan: &GraphPlan) -> VertexResult<BTreeSet<String>> {
    for input in &plan.inputs {
        engine.add_input(input)?;
    }
    let mut nodes = BTreeSet::new();
    for chain in &plan.chains {
        let ids = engine.declare_chain(chain)?;
        let named = chain.filters.iter().filter(|f| f.instance.is_some()).count();
        if ids.len() != named {
            return Err(VertexError::engine_startup(format!(
                "engine returned {} node ids for {named} named filters",
                ids.len()
            )));
        }
        nodes.extend(ids);
    }
    for output in &plan.outputs {
        engine.add_output(output)?;
    }
    Ok(nodes)
}

#[cfg(test)]
#[path = "../../tests/unit/engine/mod.rs"]
mod tests;
