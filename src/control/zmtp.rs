//! Minimal ZMTP 3.0 `REQ` peer (NULL security) for talking to the graph's control endpoint.
//!
//! Only what a single request/reply client needs is implemented: greeting, the `READY`
//! handshake, and framed multipart messages with the empty delimiter envelope a `REQ` socket
//! prepends.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::foundation::error::{VertexError, VertexResult};

pub(crate) const GREETING_LEN: usize = 64;
pub(crate) const FLAG_MORE: u8 = 0x01;
pub(crate) const FLAG_LONG: u8 = 0x02;
pub(crate) const FLAG_COMMAND: u8 = 0x04;

const MECHANISM: &[u8] = b"NULL";
const MAX_FRAME_LEN: u64 = 1 << 20;

/// Our greeting: signature, version 3.0, NULL mechanism, client role.
pub(crate) fn greeting() -> [u8; GREETING_LEN] {
    let mut g = [0u8; GREETING_LEN];
    g[0] = 0xFF;
    g[9] = 0x7F;
    g[10] = 3;
    g[11] = 0;
    g[12..12 + MECHANISM.len()].copy_from_slice(MECHANISM);
    g
}

fn check_greeting(peer: &[u8; GREETING_LEN]) -> VertexResult<()> {
    if peer[0] != 0xFF || peer[9] & 0x01 != 0x01 {
        return Err(VertexError::transport("control peer sent an invalid ZMTP signature"));
    }
    if peer[10] < 3 {
        return Err(VertexError::transport(format!(
            "control peer speaks ZMTP {}.{}; 3.x required",
            peer[10], peer[11]
        )));
    }
    let mechanism = &peer[12..32];
    if !mechanism.starts_with(MECHANISM) || mechanism[MECHANISM.len()..].iter().any(|&b| b != 0) {
        return Err(VertexError::transport("control peer requires an unsupported security mechanism"));
    }
    Ok(())
}

/// Body of the `READY` command announcing `socket_type`.
pub(crate) fn ready_command(socket_type: &str) -> Vec<u8> {
    let mut body = Vec::with_capacity(32);
    push_short_string(&mut body, "READY");
    push_short_string(&mut body, "Socket-Type");
    body.extend_from_slice(&(socket_type.len() as u32).to_be_bytes());
    body.extend_from_slice(socket_type.as_bytes());
    body
}

fn push_short_string(out: &mut Vec<u8>, s: &str) {
    out.push(s.len() as u8);
    out.extend_from_slice(s.as_bytes());
}

/// Encode one frame; bodies over 255 bytes use the 8-byte size form.
pub(crate) fn encode_frame(flags: u8, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len() + 9);
    if body.len() > u8::MAX as usize {
        out.push(flags | FLAG_LONG);
        out.extend_from_slice(&(body.len() as u64).to_be_bytes());
    } else {
        out.push(flags & !FLAG_LONG);
        out.push(body.len() as u8);
    }
    out.extend_from_slice(body);
    out
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Frame {
    pub flags: u8,
    pub body: Vec<u8>,
}

impl Frame {
    fn more(&self) -> bool {
        self.flags & FLAG_MORE != 0
    }

    fn is_command(&self) -> bool {
        self.flags & FLAG_COMMAND != 0
    }

    fn command_name(&self) -> Option<&[u8]> {
        let len = *self.body.first()? as usize;
        self.body.get(1..1 + len)
    }
}

fn io_error(context: &'static str) -> impl FnOnce(std::io::Error) -> VertexError {
    move |e| VertexError::transport(format!("{context}: {e}"))
}

/// Connected `REQ` peer over any byte stream.
#[derive(Debug)]
pub struct ReqLink<S> {
    stream: S,
}

impl<S> ReqLink<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Exchange greetings and `READY` commands with the peer.
    pub async fn handshake(mut stream: S) -> VertexResult<Self> {
        stream
            .write_all(&greeting())
            .await
            .map_err(io_error("write greeting"))?;
        let mut peer = [0u8; GREETING_LEN];
        stream
            .read_exact(&mut peer)
            .await
            .map_err(io_error("read greeting"))?;
        check_greeting(&peer)?;

        stream
            .write_all(&encode_frame(FLAG_COMMAND, &ready_command("REQ")))
            .await
            .map_err(io_error("write READY"))?;
        stream.flush().await.map_err(io_error("flush"))?;

        let mut link = Self { stream };
        let frame = link.read_frame().await?;
        match frame.command_name() {
            Some(b"READY") if frame.is_command() => Ok(link),
            Some(b"ERROR") if frame.is_command() => Err(VertexError::transport(format!(
                "control peer rejected handshake: {}",
                String::from_utf8_lossy(frame.body.get(7..).unwrap_or_default())
            ))),
            _ => Err(VertexError::transport("control peer did not send READY")),
        }
    }

    /// Send one request and wait for its reply body.
    pub async fn request(&mut self, body: &[u8]) -> VertexResult<Vec<u8>> {
        let mut out = encode_frame(FLAG_MORE, &[]);
        out.extend_from_slice(&encode_frame(0, body));
        self.stream
            .write_all(&out)
            .await
            .map_err(io_error("write request"))?;
        self.stream.flush().await.map_err(io_error("flush"))?;

        let mut parts = Vec::<Vec<u8>>::new();
        loop {
            let frame = self.read_frame().await?;
            if frame.is_command() {
                continue;
            }
            let more = frame.more();
            parts.push(frame.body);
            if !more {
                break;
            }
        }
        match parts.split_first() {
            Some((delimiter, rest)) if delimiter.is_empty() => Ok(rest.concat()),
            _ => Err(VertexError::transport("control reply is missing its envelope delimiter")),
        }
    }

    /// Resolves once the session can no longer carry a request.
    ///
    /// Only meaningful between requests. A `REP` peer sends nothing unsolicited, so whatever this
    /// read returns means the session is gone. Cancel safe.
    pub async fn closed(&mut self) -> VertexError {
        let mut byte = [0u8; 1];
        match self.stream.read(&mut byte).await {
            Ok(0) => VertexError::transport("control peer closed the session"),
            Ok(_) => VertexError::transport("control peer sent data outside a request"),
            Err(e) => VertexError::transport(format!("control session failed: {e}")),
        }
    }

    pub(crate) async fn read_frame(&mut self) -> VertexResult<Frame> {
        let flags = self
            .stream
            .read_u8()
            .await
            .map_err(io_error("read frame flags"))?;
        let len = if flags & FLAG_LONG != 0 {
            self.stream.read_u64().await.map_err(io_error("read frame size"))?
        } else {
            u64::from(self.stream.read_u8().await.map_err(io_error("read frame size"))?)
        };
        if len > MAX_FRAME_LEN {
            return Err(VertexError::transport(format!(
                "control frame of {len} bytes exceeds limit"
            )));
        }
        let mut body = vec![0u8; len as usize];
        self.stream
            .read_exact(&mut body)
            .await
            .map_err(io_error("read frame body"))?;
        Ok(Frame { flags, body })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/control/zmtp.rs"]
mod tests;
