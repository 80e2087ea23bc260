use std::time::Duration;

use crate::foundation::error::{VertexError, VertexResult};

/// Timeline ticks per millisecond (90 kHz presentation clock).
pub const TICKS_PER_MS: i64 = 90;

/// Presentation timestamp on the incoming video timeline, in 90 kHz ticks.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct Pts(pub i64);

impl Pts {
    pub fn from_millis(ms: i64) -> Self {
        Self(ms.saturating_mul(TICKS_PER_MS))
    }

    /// Microseconds as reported by ffmpeg's `out_time_us`.
    pub fn from_micros(us: i64) -> Self {
        // 90 ticks per 1000 us.
        Self(us.saturating_mul(9) / 100)
    }

    /// Wall-clock distance from `self` forward to `later`, floored to whole milliseconds.
    ///
    /// Returns zero when `later` is not ahead of `self`.
    pub fn until(self, later: Pts) -> Duration {
        let ticks = later.0.saturating_sub(self.0).max(0);
        Duration::from_millis((ticks / TICKS_PER_MS) as u64)
    }
}

impl std::fmt::Display for Pts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of media unit a socket or timeline notification refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Video,
    Audio,
}

impl StreamKind {
    pub fn parse(raw: &str) -> VertexResult<Self> {
        match raw {
            "video" => Ok(Self::Video),
            "audio" => Ok(Self::Audio),
            other => Err(VertexError::configuration(format!(
                "unknown input type '{other}'"
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Audio => "audio",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Default for Canvas {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

/// Pixel rectangle placed on the canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn validate(&self) -> VertexResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(VertexError::configuration(
                "region width/height must be > 0",
            ));
        }
        Ok(())
    }

    pub fn aspect(&self) -> f64 {
        f64::from(self.width) / f64::from(self.height)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
