use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::settings::EngineSettings;
use crate::engine::{EngineEvent, EngineFactory, GraphEngine};
use crate::foundation::error::{VertexError, VertexResult};
use crate::graph::plan::{FilterChain, InputDecl, OutputDecl};
use crate::timeline::sampler::{ProgressEvent, ProgressParser};

/// Engine backed by a system `ffmpeg` process running one `-filter_complex` graph.
///
/// Timeline samples come from `-progress pipe:1`; stderr is forwarded to `tracing` at debug level.
pub struct FfmpegEngine {
    settings: EngineSettings,
    inputs: Vec<InputDecl>,
    chains: Vec<FilterChain>,
    outputs: Vec<OutputDecl>,
    kill: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl FfmpegEngine {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            inputs: Vec::new(),
            chains: Vec::new(),
            outputs: Vec::new(),
            kill: CancellationToken::new(),
            tasks: Vec::new(),
        }
    }

    /// Full `ffmpeg` argument list for everything declared so far.
    pub fn command_args(&self) -> Vec<String> {
        let stats_period = self.settings.stats_period();
        let mut args: Vec<String> = [
            "-hide_banner",
            "-nostdin",
            "-nostats",
            "-loglevel",
            &self.settings.loglevel,
            "-progress",
            "pipe:1",
            "-stats_period",
            &stats_period,
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        for input in &self.inputs {
            args.extend(input.options.iter().cloned());
            args.extend(["-f".to_string(), input.format.clone()]);
            args.extend(["-i".to_string(), input.url.clone()]);
        }

        let graph = self
            .chains
            .iter()
            .map(FilterChain::render)
            .collect::<Vec<_>>()
            .join(";");
        args.extend(["-filter_complex".to_string(), graph]);

        for output in &self.outputs {
            args.extend(["-map".to_string(), format!("[{}]", output.label)]);
            args.extend(output.options.iter().cloned());
            args.extend(["-f".to_string(), output.format.clone(), output.url.clone()]);
        }
        args
    }

    fn spawn_child(&self) -> VertexResult<Child> {
        let mut cmd = Command::new(&self.settings.ffmpeg_path);
        cmd.args(self.command_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        tracing::debug!(program = %self.settings.ffmpeg_path, args = ?self.command_args(), "spawning engine");
        cmd.spawn().map_err(|e| {
            VertexError::engine_startup(format!(
                "failed to spawn '{}' (is it installed and on PATH?): {e}",
                self.settings.ffmpeg_path
            ))
        })
    }
}

#[async_trait]
impl GraphEngine for FfmpegEngine {
    fn add_input(&mut self, input: &InputDecl) -> VertexResult<()> {
        if input.source_index != self.inputs.len() {
            return Err(VertexError::engine_startup(format!(
                "input '{}' declared out of order (index {}, expected {})",
                input.socket,
                input.source_index,
                self.inputs.len()
            )));
        }
        self.inputs.push(input.clone());
        Ok(())
    }

    fn add_output(&mut self, output: &OutputDecl) -> VertexResult<()> {
        self.outputs.push(output.clone());
        Ok(())
    }

    fn declare_chain(&mut self, chain: &FilterChain) -> VertexResult<Vec<String>> {
        if chain.filters.is_empty() {
            return Err(VertexError::engine_startup("filter chain has no filters"));
        }
        let ids = chain.filters.iter().filter_map(|f| f.node_id()).collect();
        self.chains.push(chain.clone());
        Ok(ids)
    }

    async fn start(&mut self, events: mpsc::Sender<EngineEvent>) -> VertexResult<()> {
        if !self.tasks.is_empty() {
            return Err(VertexError::engine_startup("engine already started"));
        }
        if self.chains.is_empty() || self.outputs.is_empty() {
            return Err(VertexError::engine_startup("nothing declared to run"));
        }
        let mut child = self.spawn_child()?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| VertexError::engine_startup("failed to open ffmpeg stdout (unexpected)"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| VertexError::engine_startup("failed to open ffmpeg stderr (unexpected)"))?;

        let progress_events = events.clone();
        let progress_kill = self.kill.clone();
        self.tasks.push(tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            let mut parser = ProgressParser::new();
            let mut started = false;
            while let Ok(Some(line)) = lines.next_line().await {
                let Some(ProgressEvent::Tick(sample)) = parser.push_line(&line) else {
                    continue;
                };
                if !started {
                    started = true;
                    if !forward(&progress_events, &progress_kill, EngineEvent::Started).await {
                        break;
                    }
                }
                if let Some(sample) = sample
                    && !forward(&progress_events, &progress_kill, EngineEvent::Timeline(sample)).await
                {
                    break;
                }
            }
        }));

        self.tasks.push(tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                tracing::debug!(target: "switchyard::ffmpeg", "{line}");
            }
        }));

        let kill = self.kill.clone();
        self.tasks.push(tokio::spawn(async move {
            let status = tokio::select! {
                status = child.wait() => status,
                _ = kill.cancelled() => {
                    if let Err(e) = child.kill().await {
                        tracing::warn!(error = %e, "failed to kill engine process");
                    }
                    child.wait().await
                }
            };
            let event = match status {
                Ok(status) => EngineEvent::Exited {
                    success: status.success(),
                    detail: format!("ffmpeg exited with {status}"),
                },
                Err(e) => EngineEvent::Exited {
                    success: false,
                    detail: format!("failed to wait for ffmpeg: {e}"),
                },
            };
            forward(&events, &kill, event).await;
        }));
        Ok(())
    }

    async fn stop(&mut self) -> VertexResult<()> {
        self.kill.cancel();
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "engine task ended abnormally");
            }
        }
        Ok(())
    }
}

/// Deliver `event` unless the engine is being stopped; false once nobody is listening.
async fn forward(events: &mpsc::Sender<EngineEvent>, kill: &CancellationToken, event: EngineEvent) -> bool {
    tokio::select! {
        res = events.send(event) => res.is_ok(),
        _ = kill.cancelled() => false,
    }
}

/// Creates [`FfmpegEngine`]s.
#[derive(Clone, Copy, Debug, Default)]
pub struct FfmpegFactory;

impl EngineFactory for FfmpegFactory {
    fn create(&self, settings: &EngineSettings) -> Box<dyn GraphEngine> {
        Box::new(FfmpegEngine::new(settings.clone()))
    }
}

/// Return `true` when the configured `ffmpeg` binary can be invoked.
pub fn is_ffmpeg_available(path: &str) -> bool {
    std::process::Command::new(path)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/engine/ffmpeg.rs"]
mod tests;
