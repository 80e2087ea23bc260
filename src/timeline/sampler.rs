use crate::foundation::core::{Pts, StreamKind};

/// One timestamp notification from the running graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimelineSample {
    pub pts: Pts,
    pub kind: StreamKind,
}

/// Parsed block of ffmpeg `-progress` output.
#[derive(Clone, Debug, PartialEq)]
pub enum ProgressEvent {
    /// A complete `progress=continue` block.
    Tick(Option<TimelineSample>),
    /// The final `progress=end` block.
    End,
}

/// Incremental parser for ffmpeg's `-progress` key/value stream.
///
/// ffmpeg emits blocks of `key=value` lines terminated by `progress=continue` (or
/// `progress=end` at shutdown). The block's `out_time_us` becomes a video timeline sample.
#[derive(Debug, Default)]
pub struct ProgressParser {
    out_time_us: Option<i64>,
}

impl ProgressParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line; returns an event when the line closes a block.
    pub fn push_line(&mut self, line: &str) -> Option<ProgressEvent> {
        let (key, value) = line.trim().split_once('=')?;
        match key.trim() {
            "out_time_us" | "out_time_ms" => {
                // Both keys carry microseconds; `out_time_ms` is a historical misnomer.
                self.out_time_us = value.trim().parse::<i64>().ok();
                None
            }
            "progress" => {
                let sample = self.out_time_us.take().map(|us| TimelineSample {
                    pts: Pts::from_micros(us),
                    kind: StreamKind::Video,
                });
                match value.trim() {
                    "end" => Some(ProgressEvent::End),
                    _ => Some(ProgressEvent::Tick(sample)),
                }
            }
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/sampler.rs"]
mod tests;
