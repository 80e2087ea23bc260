use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::config::settings::RetryPolicy;
use crate::foundation::error::VertexResult;
use crate::vertex::Vertex;

/// Drives a vertex through its lifecycle, retrying failed attempts with backoff.
#[derive(Clone, Debug, Default)]
pub struct VertexHost {
    policy: RetryPolicy,
}

impl VertexHost {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Run `vertex` until `shutdown` fires. Returns the last error once the retry policy is
    /// exhausted.
    pub async fn run(&self, vertex: &mut dyn Vertex, shutdown: CancellationToken) -> VertexResult<()> {
        let span = tracing::info_span!("vertex", name = %vertex.display_name());
        self.serve(vertex, shutdown).instrument(span).await
    }

    async fn serve(&self, vertex: &mut dyn Vertex, shutdown: CancellationToken) -> VertexResult<()> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let outcome = tokio::select! {
                outcome = Self::attempt(vertex, shutdown.clone()) => outcome,
                _ = shutdown.cancelled() => Ok(()),
            };
            if let Err(err) = &outcome {
                vertex.mark_failed();
                tracing::error!(attempt, state = %vertex.state(), error = %err, "vertex attempt failed");
            }
            vertex.cleanup().await;

            let err = match outcome {
                Ok(()) => {
                    tracing::info!("vertex stopped");
                    return Ok(());
                }
                Err(err) => err,
            };
            if self.policy.exhausted(attempt) {
                tracing::error!(attempt, "retry budget exhausted");
                return Err(err);
            }
            let delay = self.policy.backoff(attempt);
            tracing::info!(attempt, delay_ms = delay.as_millis() as u64, "retrying vertex");
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.cancelled() => return Ok(()),
            }
        }
    }

    async fn attempt(vertex: &mut dyn Vertex, shutdown: CancellationToken) -> VertexResult<()> {
        vertex.pull_config().await?;
        vertex.compile().await?;
        vertex.run(shutdown).await
    }
}

#[cfg(test)]
#[path = "../../tests/unit/vertex/host.rs"]
mod tests;
