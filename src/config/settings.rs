use std::path::Path;
use std::time::Duration;

use crate::config::model::read_json;
use crate::foundation::core::Canvas;
use crate::foundation::error::{VertexError, VertexResult};

/// Runtime settings for a composite vertex.
///
/// Every field has a default, so an empty JSON object is a valid settings file.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct VertexSettings {
    /// Output canvas; the anchor region of every scene is padded to this size.
    pub canvas: Canvas,
    /// Frame rate every video input and the final output are normalized to.
    pub framerate: u32,
    pub control: ControlSettings,
    pub engine: EngineSettings,
    pub retry: RetryPolicy,
}

impl Default for VertexSettings {
    fn default() -> Self {
        Self {
            canvas: Canvas::default(),
            framerate: 30,
            control: ControlSettings::default(),
            engine: EngineSettings::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl VertexSettings {
    pub fn from_reader<R: std::io::Read>(r: R) -> VertexResult<Self> {
        let settings: Self = serde_json::from_reader(r)
            .map_err(|e| VertexError::serde(format!("parse settings JSON: {e}")))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_path(path: impl AsRef<Path>) -> VertexResult<Self> {
        let settings: Self = read_json(path.as_ref(), "settings")?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> VertexResult<()> {
        if self.canvas.width == 0 || self.canvas.height == 0 {
            return Err(VertexError::configuration(
                "canvas width/height must be > 0",
            ));
        }
        if self.framerate == 0 {
            return Err(VertexError::configuration("framerate must be > 0"));
        }
        if self.control.command_interval_ms == 0 {
            return Err(VertexError::configuration(
                "control.command_interval_ms must be > 0",
            ));
        }
        if self.engine.stats_period_ms == 0 {
            return Err(VertexError::configuration(
                "engine.stats_period_ms must be > 0",
            ));
        }
        if self.retry.max_attempts == Some(0) {
            return Err(VertexError::configuration(
                "retry.max_attempts must be >= 1 when set",
            ));
        }
        Ok(())
    }
}

/// Order in which pending control commands leave the channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandOrder {
    /// Oldest command first.
    #[default]
    Fifo,
    /// Newest command first.
    Lifo,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ControlSettings {
    /// Host the control client connects to; the engine binds on all interfaces.
    pub host: String,
    /// Minimum spacing between two transmitted commands. The receiving endpoint drops
    /// messages that arrive faster than roughly one per second.
    pub command_interval_ms: u64,
    /// How long to wait for a reply before abandoning the socket.
    pub reply_timeout_ms: u64,
    /// Pause between failed connection attempts.
    pub reconnect_delay_ms: u64,
    pub order: CommandOrder,
}

impl Default for ControlSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            command_interval_ms: 1000,
            reply_timeout_ms: 5000,
            reconnect_delay_ms: 500,
            order: CommandOrder::Fifo,
        }
    }
}

impl ControlSettings {
    pub fn command_interval(&self) -> Duration {
        Duration::from_millis(self.command_interval_ms)
    }

    pub fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.reply_timeout_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

/// Fixed encoding parameters and process options for the media engine.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub ffmpeg_path: String,
    pub loglevel: String,
    pub input_format: String,
    pub input_options: Vec<String>,
    pub output_format: String,
    pub video_codec: String,
    pub audio_codec: String,
    pub video_bitrate_kbps: u32,
    pub preset: String,
    pub keyint: u32,
    pub pix_fmt: String,
    pub frame_drop_threshold: u32,
    /// Timestamp passthrough and buffering flags applied to every output.
    pub timestamp_flags: Vec<String>,
    /// Interval between `-progress` reports. Defaults to one frame at 30 fps.
    pub stats_period_ms: u64,
}

impl EngineSettings {
    /// `stats_period_ms` in the seconds notation `ffmpeg` expects.
    pub fn stats_period(&self) -> String {
        format!("{}.{:03}", self.stats_period_ms / 1000, self.stats_period_ms % 1000)
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            loglevel: "verbose".to_string(),
            input_format: "mpegts".to_string(),
            input_options: [
                "-analyzeduration",
                "10000000",
                "-noaccurate_seek",
                "-probesize",
                "60000000",
                "-thread_queue_size",
                "16384",
            ]
            .map(String::from)
            .to_vec(),
            output_format: "mpegts".to_string(),
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            video_bitrate_kbps: 4000,
            preset: "veryfast".to_string(),
            keyint: 60,
            pix_fmt: "yuv420p".to_string(),
            frame_drop_threshold: 60,
            timestamp_flags: [
                "-copyts",
                "-copytb",
                "1",
                "-vsync",
                "passthrough",
                "-fflags",
                "+nobuffer+igndts",
            ]
            .map(String::from)
            .to_vec(),
            stats_period_ms: 33,
        }
    }
}

/// Backoff between lifecycle retries.
///
/// The lifecycle itself never gives up on its own; `max_attempts: None` keeps retrying forever.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_backoff_ms: 500,
            max_backoff_ms: 30_000,
            max_attempts: None,
        }
    }
}

impl RetryPolicy {
    /// Delay before attempt `attempt + 1`, after `attempt` failures (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(20);
        let ms = self
            .initial_backoff_ms
            .saturating_mul(1u64 << shift)
            .min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }

    pub fn exhausted(&self, attempt: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempt >= max)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/config/settings.rs"]
mod tests;
