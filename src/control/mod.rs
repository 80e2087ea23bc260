//! Live parameter commands for the running graph.
//!
//! Commands are enqueued without blocking and drained over a single `REQ` socket, rate limited to
//! what the graph's control endpoint can absorb.

/// Command and reply text encoding.
pub mod command;
/// Connection manager task and the enqueue handle.
pub mod connection;
/// Pending-command ordering.
pub mod queue;
/// ZMTP framing for the control socket.
pub mod zmtp;
