//! Scene graph compilation.
//!
//! Turns the vertex inputs and the scene list into a [`plan::GraphPlan`]: per-scene composites
//! built from scale and overlay chains, a selector switching between them, a control endpoint,
//! and the mixed audio output.

/// Scene list to graph plan.
pub mod compiler;
/// Filter nodes and their filtergraph rendering.
pub mod filters;
/// Graph plan data model.
pub mod plan;
