//! Presentation timeline: progress sampling and timed actions.

/// Engine progress parsing into timeline samples.
pub mod sampler;
/// Pending actions released against timeline samples.
pub mod scheduler;
