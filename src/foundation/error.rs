/// Result alias used across the crate.
pub type VertexResult<T> = Result<T, VertexError>;

/// Error taxonomy for the composite vertex engine.
///
/// Configuration and engine-startup errors abort the current initialization attempt and are
/// handed to the host's retry loop. Transport and scheduling errors are recovered locally and
/// only logged.
#[derive(thiserror::Error, Debug)]
pub enum VertexError {
    /// Invalid or incomplete scene/input/broadcast configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Control socket connect, handshake, send or reply failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// A scene switch could not be scheduled.
    #[error("scheduling error: {0}")]
    Scheduling(String),

    /// The media-processing engine failed to start or stopped unexpectedly.
    #[error("engine startup error: {0}")]
    EngineStartup(String),

    /// Settings or configuration documents could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Anything else, with its source preserved.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl VertexError {
    /// Build a [`VertexError::Configuration`].
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Build a [`VertexError::Transport`].
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Build a [`VertexError::Scheduling`].
    pub fn scheduling(msg: impl Into<String>) -> Self {
        Self::Scheduling(msg.into())
    }

    /// Build a [`VertexError::EngineStartup`].
    pub fn engine_startup(msg: impl Into<String>) -> Self {
        Self::EngineStartup(msg.into())
    }

    /// Build a [`VertexError::Serde`].
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Whether this error should tear down the current initialization attempt.
    ///
    /// Transport and scheduling problems never restart the vertex: the control connection
    /// reconnects on its own and a failed switch only affects that one request.
    pub fn restarts_vertex(&self) -> bool {
        !matches!(self, Self::Transport(_) | Self::Scheduling(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
