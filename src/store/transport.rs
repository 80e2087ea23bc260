use std::net::TcpListener;

use crate::foundation::error::{VertexError, VertexResult};
use crate::store::Transport;

/// Allocates loopback TCP endpoints by asking the OS for free ports.
#[derive(Clone, Debug)]
pub struct LocalTransport {
    host: String,
}

impl Default for LocalTransport {
    fn default() -> Self {
        Self::new("127.0.0.1")
    }
}

impl LocalTransport {
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }

    fn url(&self) -> VertexResult<String> {
        Ok(format!("tcp://{}:{}", self.host, self.tcp_port()?))
    }
}

impl Transport for LocalTransport {
    fn input_url(&self) -> VertexResult<String> {
        Ok(format!("{}?listen=1", self.url()?))
    }

    fn output_url(&self) -> VertexResult<String> {
        Ok(format!("{}?listen=1", self.url()?))
    }

    fn tcp_port(&self) -> VertexResult<u16> {
        let listener = TcpListener::bind((self.host.as_str(), 0))
            .map_err(|e| VertexError::transport(format!("allocate port on {}: {e}", self.host)))?;
        let port = listener
            .local_addr()
            .map_err(|e| VertexError::transport(format!("read allocated port: {e}")))?
            .port();
        Ok(port)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/store/transport.rs"]
mod tests;
