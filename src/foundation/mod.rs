//! Shared primitives: timestamps, geometry and the crate error type.

/// Timeline units, stream kinds and canvas geometry.
pub mod core;
/// Error type shared by every module.
pub mod error;
