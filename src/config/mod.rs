//! Configuration documents and process settings.

/// Vertex, scene and broadcast documents as stored in the configuration store.
pub mod model;
/// Tunables for the graph, control channel, engine and retry loop.
pub mod settings;
