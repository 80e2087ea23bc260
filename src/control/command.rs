use crate::foundation::error::{VertexError, VertexResult};

/// Parameter update addressed to one compiled graph node.
///
/// Encoded on the wire as `"<node> <command> <args...>"`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ControlCommand {
    pub target: String,
    pub command: String,
    pub args: Vec<String>,
}

impl ControlCommand {
    pub fn new(target: impl Into<String>, command: impl Into<String>, arg: impl ToString) -> Self {
        Self {
            target: target.into(),
            command: command.into(),
            args: vec![arg.to_string()],
        }
    }

    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl std::fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.target, self.command)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Reply sent back by the control endpoint: `"<code> <message>"`, where `0` means success and a
/// negative code is an errno-style failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ControlReply {
    pub code: i32,
    pub message: String,
}

impl ControlReply {
    pub fn parse(raw: &str) -> VertexResult<Self> {
        let raw = raw.trim_end_matches('\0').trim();
        let (code, message) = raw.split_once(' ').unwrap_or((raw, ""));
        let code = code.parse::<i32>().map_err(|_| {
            VertexError::transport(format!("malformed control reply '{raw}'"))
        })?;
        Ok(Self {
            code,
            message: message.trim().to_string(),
        })
    }

    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}

#[cfg(test)]
#[path = "../../tests/unit/control/command.rs"]
mod tests;
