use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::time::DelayQueue;
use tracing::Instrument;

use crate::config::model::{
    Broadcast, Output, Scene, SceneId, Socket, VertexDoc, VertexSpec, sort_scenes,
};
use crate::config::settings::VertexSettings;
use crate::control::command::ControlCommand;
use crate::control::connection::{
    CommandReceiver, CommandSender, ControlConnection, ControlDialer, command_channel,
};
use crate::engine::{EngineEvent, EngineFactory, GraphEngine, apply_plan};
use crate::foundation::core::{Pts, Rect, StreamKind};
use crate::foundation::error::{VertexError, VertexResult};
use crate::graph::compiler::{CompileRequest, compile_graph};
use crate::graph::plan::GraphPlan;
use crate::store::{ConfigStore, Subscription, Transport};
use crate::timeline::scheduler::ActionScheduler;
use crate::vertex::{LifecycleState, Vertex};

const ENGINE_EVENT_BUFFER: usize = 256;

/// External services a composite vertex talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn ConfigStore>,
    pub transport: Arc<dyn Transport>,
    pub engines: Arc<dyn EngineFactory>,
    pub control: Arc<dyn ControlDialer>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct SceneSwitch {
    scene: SceneId,
    index: usize,
}

/// Enqueues live parameter changes for a running graph.
///
/// Cheap to clone; commands go through the vertex's rate-limited control channel.
#[derive(Clone, Debug)]
pub struct LiveControls {
    commands: CommandSender,
    nodes: Arc<BTreeSet<String>>,
}

impl LiveControls {
    fn node(&self, id: String) -> VertexResult<String> {
        if self.nodes.contains(&id) {
            Ok(id)
        } else {
            Err(VertexError::configuration(format!("graph has no node '{id}'")))
        }
    }

    /// Set the gain of one audio socket (`1.0` is unity).
    pub fn set_volume(&self, socket: &str, gain: f64) -> VertexResult<()> {
        if !gain.is_finite() || gain < 0.0 {
            return Err(VertexError::configuration(format!(
                "volume for '{socket}' must be a finite non-negative gain, got {gain}"
            )));
        }
        let node = self.node(format!("volume@{socket}-volume"))?;
        self.commands.enqueue(ControlCommand::new(node, "volume", gain))
    }

    /// Move and resize an overlay region. The anchor region (index 0) is fixed.
    pub fn reposition_region(&self, scene: &SceneId, region: usize, rect: Rect) -> VertexResult<()> {
        if region == 0 {
            return Err(VertexError::configuration(format!(
                "region 0 of scene '{scene}' is the anchor and cannot be moved live"
            )));
        }
        rect.validate()?;
        let overlay = self.node(format!("overlay@{scene}_{region}"))?;
        let scale = self.node(format!("scale@{scene}_{region}"))?;
        self.commands
            .enqueue(ControlCommand::new(overlay.clone(), "x", rect.x))?;
        self.commands
            .enqueue(ControlCommand::new(overlay, "y", rect.y))?;
        self.commands
            .enqueue(ControlCommand::new(scale.clone(), "width", rect.width))?;
        self.commands
            .enqueue(ControlCommand::new(scale, "height", rect.height))
    }
}

/// State acquired during one initialization attempt. Dropped wholesale by `cleanup`.
#[derive(Default)]
struct Attempt {
    scene_feed: Option<Subscription<Vec<Scene>>>,
    broadcast_feed: Option<Subscription<Broadcast>>,
    scenes: Vec<Scene>,
    broadcast: Option<Broadcast>,
    spec: Option<VertexSpec>,
    video_output_url: String,
    audio_output_url: String,
    plan: Option<GraphPlan>,
    selector_node: Option<String>,
    nodes: Arc<BTreeSet<String>>,
    control_port: u16,
    engine: Option<Box<dyn GraphEngine>>,
    events: Option<mpsc::Receiver<EngineEvent>>,
    commands: Option<CommandSender>,
    pending_commands: Option<CommandReceiver>,
    scheduler: ActionScheduler<SceneSwitch>,
    control_shutdown: Option<CancellationToken>,
    control_task: Option<JoinHandle<()>>,
}

/// Vertex that composites its inputs into scenes and switches between them in sync with the
/// video timeline.
pub struct CompositeVertex {
    doc: VertexDoc,
    settings: VertexSettings,
    with: Collaborators,
    origin: Instant,
    state: LifecycleState,
    attempt: Attempt,
}

impl CompositeVertex {
    /// `origin` is the process start instant that switch targets are measured from.
    pub fn new(doc: VertexDoc, settings: VertexSettings, with: Collaborators, origin: Instant) -> Self {
        Self {
            doc,
            settings,
            with,
            origin,
            state: LifecycleState::Uninitialized,
            attempt: Attempt::default(),
        }
    }

    pub fn doc(&self) -> &VertexDoc {
        &self.doc
    }

    /// Graph compiled by the current attempt.
    pub fn plan(&self) -> Option<&GraphPlan> {
        self.attempt.plan.as_ref()
    }

    /// Scene list the current graph was compiled from, sorted by id.
    pub fn scenes(&self) -> &[Scene] {
        &self.attempt.scenes
    }

    pub fn control_port(&self) -> Option<u16> {
        self.attempt.plan.as_ref().map(|_| self.attempt.control_port)
    }

    /// Live parameter handle; available once the graph is compiled.
    pub fn live_controls(&self) -> Option<LiveControls> {
        Some(LiveControls {
            commands: self.attempt.commands.clone()?,
            nodes: self.attempt.nodes.clone(),
        })
    }

    pub fn set_volume(&self, socket: &str, gain: f64) -> VertexResult<()> {
        self.live_controls()
            .ok_or_else(not_compiled)?
            .set_volume(socket, gain)
    }

    pub fn reposition_region(&self, scene: &SceneId, region: usize, rect: Rect) -> VertexResult<()> {
        self.live_controls()
            .ok_or_else(not_compiled)?
            .reposition_region(scene, region, rect)
    }

    fn transition(&mut self, next: LifecycleState) {
        tracing::info!(from = %self.state, to = %next, "lifecycle transition");
        self.state = next;
    }

    /// Timeline position a switch requested now should land on.
    fn switch_target(&self) -> Pts {
        let elapsed = Instant::now().saturating_duration_since(self.origin);
        let elapsed_ms = i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX);
        let ms = elapsed_ms.saturating_add(self.doc.params.cut_offset_ms);
        Pts::from_millis(ms.max(0))
    }

    fn on_broadcast(&mut self, broadcast: Broadcast) -> VertexResult<()> {
        let changed = self.attempt.broadcast.as_ref().map(|b| &b.active_scene_id)
            != Some(&broadcast.active_scene_id);
        self.attempt.broadcast = Some(broadcast);
        if !changed {
            return Ok(());
        }
        self.queue_scene_change()
    }

    fn queue_scene_change(&mut self) -> VertexResult<()> {
        let active = self
            .attempt
            .broadcast
            .as_ref()
            .and_then(|b| b.active_scene_id.clone())
            .ok_or_else(|| VertexError::scheduling("broadcast has no active scene"))?;
        let plan = self
            .attempt
            .plan
            .as_ref()
            .ok_or_else(|| VertexError::scheduling("scene change arrived before the graph was compiled"))?;
        let index = *plan.switch_index.get(&active).ok_or_else(|| {
            VertexError::scheduling(format!("scene '{active}' is not part of the running graph"))
        })?;
        if plan.selector.is_none() {
            tracing::info!(scene = %active, "single-scene graph; switch request ignored");
            return Ok(());
        }
        let target = self.switch_target();
        tracing::info!(scene = %active, index, %target, "scheduling scene switch");
        self.attempt
            .scheduler
            .schedule(target, SceneSwitch { scene: active, index });
        Ok(())
    }

    fn fire(&mut self, switch: SceneSwitch) -> VertexResult<()> {
        let Some(node) = self.attempt.selector_node.clone() else {
            return Ok(());
        };
        tracing::info!(scene = %switch.scene, index = switch.index, "switching scene");
        self.attempt
            .commands
            .as_ref()
            .ok_or_else(not_compiled)?
            .enqueue(ControlCommand::new(node, "map", switch.index))
    }

    fn on_engine_event(
        &mut self,
        event: Option<EngineEvent>,
        delayed: &mut DelayQueue<SceneSwitch>,
        shutdown: &CancellationToken,
    ) -> VertexResult<()> {
        match event {
            Some(EngineEvent::Started) => {
                self.attach_control(shutdown);
                Ok(())
            }
            Some(EngineEvent::Timeline(sample)) => {
                let Some(firing) = self.attempt.scheduler.on_sample(sample) else {
                    return Ok(());
                };
                if firing.delay.is_zero() {
                    return self.fire(firing.action);
                }
                tracing::debug!(
                    target_pts = %firing.target,
                    delay_ms = firing.delay.as_millis() as u64,
                    "switch predicted before next sample; arming timer"
                );
                delayed.insert(firing.action, firing.delay);
                Ok(())
            }
            Some(EngineEvent::Exited { detail, .. }) => {
                Err(VertexError::engine_startup(format!("engine stopped: {detail}")))
            }
            None => Err(VertexError::engine_startup("engine event stream closed")),
        }
    }

    /// Spawn the control connection once the graph is live. Later calls are no-ops.
    fn attach_control(&mut self, shutdown: &CancellationToken) {
        let Some(pending) = self.attempt.pending_commands.take() else {
            return;
        };
        let connector = self
            .with
            .control
            .dial(&self.settings.control.host, self.attempt.control_port);
        tracing::info!(endpoint = %connector.endpoint(), "graph is live; attaching control channel");
        let connection = ControlConnection::new(connector, pending, self.settings.control.clone());
        let token = shutdown.child_token();
        self.attempt.control_shutdown = Some(token.clone());
        self.attempt.control_task = Some(tokio::spawn(connection.run(token).in_current_span()));
    }
}

fn not_compiled() -> VertexError {
    VertexError::configuration("graph is not compiled")
}

#[async_trait]
impl Vertex for CompositeVertex {
    fn display_name(&self) -> &str {
        self.doc.display_name()
    }

    fn state(&self) -> LifecycleState {
        self.state
    }

    fn mark_failed(&mut self) {
        self.transition(LifecycleState::Failed);
    }

    async fn pull_config(&mut self) -> VertexResult<()> {
        self.transition(LifecycleState::PullingConfig);
        let store = self.with.store.clone();
        let transport = self.with.transport.clone();
        let mut scene_feed = store.watch_scenes(&self.doc.broadcast_id).await?;
        let mut broadcast_feed = store.watch_broadcast(&self.doc.broadcast_id).await?;

        let mut inputs = self.doc.inputs.clone();
        for socket in inputs.iter_mut().flat_map(|i| i.sockets.iter_mut()) {
            socket.url = Some(transport.input_url()?);
        }
        let video_output_url = transport.output_url()?;
        let audio_output_url = transport.output_url()?;
        let spec = VertexSpec {
            inputs,
            outputs: vec![Output {
                name: "default".to_string(),
                sockets: vec![
                    Socket::new(StreamKind::Video, video_output_url.clone()),
                    Socket::new(StreamKind::Audio, audio_output_url.clone()),
                ],
            }],
            params: self.doc.params.clone(),
        };
        for input in &spec.inputs {
            for (idx, socket) in input.sockets.iter().enumerate() {
                tracing::info!(
                    socket = %input.socket_name(idx),
                    kind = %socket.kind,
                    url = socket.url.as_deref().unwrap_or_default(),
                    "input socket assigned"
                );
            }
        }
        tracing::info!(video = %video_output_url, audio = %audio_output_url, "output sockets assigned");
        store.update_vertex(&self.doc.id, &spec).await?;

        let scenes = scene_feed.next().await.ok_or_else(|| {
            VertexError::configuration("scene feed ended before delivering a snapshot")
        })?;
        let broadcast = broadcast_feed.next().await.ok_or_else(|| {
            VertexError::configuration("broadcast feed ended before delivering a snapshot")
        })?;
        let scenes = sort_scenes(scene_feed.latest().unwrap_or(scenes));
        let broadcast = broadcast_feed.latest().unwrap_or(broadcast);
        tracing::info!(
            scenes = scenes.len(),
            active = ?broadcast.active_scene_id,
            "configuration pulled"
        );

        self.attempt.scene_feed = Some(scene_feed);
        self.attempt.broadcast_feed = Some(broadcast_feed);
        self.attempt.scenes = scenes;
        self.attempt.broadcast = Some(broadcast);
        self.attempt.spec = Some(spec);
        self.attempt.video_output_url = video_output_url;
        self.attempt.audio_output_url = audio_output_url;
        Ok(())
    }

    async fn compile(&mut self) -> VertexResult<()> {
        self.transition(LifecycleState::Compiling);
        let control_port = self.with.transport.tcp_port()?;
        let plan = {
            let attempt = &self.attempt;
            let spec = attempt
                .spec
                .as_ref()
                .ok_or_else(|| VertexError::configuration("compile before configuration was pulled"))?;
            compile_graph(&CompileRequest {
                inputs: &spec.inputs,
                scenes: &attempt.scenes,
                active_scene: attempt.broadcast.as_ref().and_then(|b| b.active_scene_id.as_ref()),
                video_output_url: &attempt.video_output_url,
                audio_output_url: &attempt.audio_output_url,
                control_port,
                settings: &self.settings,
            })?
        };

        let engine = self
            .attempt
            .engine
            .insert(self.with.engines.create(&self.settings.engine));
        let nodes = apply_plan(&mut **engine, &plan)?;
        let (events_tx, events_rx) = mpsc::channel(ENGINE_EVENT_BUFFER);
        engine.start(events_tx).await?;

        let (commands, pending) = command_channel();
        tracing::info!(
            chains = plan.chains.len(),
            selector = ?plan.selector_node(),
            control_port,
            "graph started"
        );
        self.attempt.selector_node = plan.selector_node();
        self.attempt.nodes = Arc::new(nodes);
        self.attempt.plan = Some(plan);
        self.attempt.control_port = control_port;
        self.attempt.events = Some(events_rx);
        self.attempt.commands = Some(commands);
        self.attempt.pending_commands = Some(pending);
        self.transition(LifecycleState::Running);
        Ok(())
    }

    async fn run(&mut self, shutdown: CancellationToken) -> VertexResult<()> {
        let mut events = self
            .attempt
            .events
            .take()
            .ok_or_else(|| VertexError::engine_startup("run before the graph was started"))?;
        let mut broadcast_feed = self.attempt.broadcast_feed.take().ok_or_else(not_compiled)?;
        let mut scene_feed = self.attempt.scene_feed.take().ok_or_else(not_compiled)?;
        let mut delayed = DelayQueue::<SceneSwitch>::new();
        let mut broadcast_open = true;
        let mut scenes_open = true;

        loop {
            let step = tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("shutdown requested");
                    return Ok(());
                }
                event = events.recv() => self.on_engine_event(event, &mut delayed, &shutdown),
                snapshot = broadcast_feed.next(), if broadcast_open => match snapshot {
                    Some(broadcast) => self.on_broadcast(broadcast),
                    None => {
                        broadcast_open = false;
                        tracing::warn!("broadcast feed ended; scene switching disabled");
                        Ok(())
                    }
                },
                snapshot = scene_feed.next(), if scenes_open => {
                    match snapshot {
                        Some(scenes) => tracing::info!(
                            scenes = scenes.len(),
                            "scene list changed after compile; ignored until restart"
                        ),
                        None => scenes_open = false,
                    }
                    Ok(())
                }
                Some(expired) = std::future::poll_fn(|cx| delayed.poll_expired(cx)), if !delayed.is_empty() => {
                    self.fire(expired.into_inner())
                }
            };
            if let Err(err) = step {
                if err.restarts_vertex() {
                    return Err(err);
                }
                tracing::warn!(error = %err, "vertex operation failed");
            }
        }
    }

    async fn cleanup(&mut self) {
        let mut attempt = std::mem::take(&mut self.attempt);
        if let Some(token) = attempt.control_shutdown.take() {
            token.cancel();
        }
        if let Some(task) = attempt.control_task.take()
            && let Err(e) = task.await
        {
            tracing::warn!(error = %e, "control connection task ended abnormally");
        }
        if let Some(mut engine) = attempt.engine.take()
            && let Err(e) = engine.stop().await
        {
            tracing::warn!(error = %e, "engine did not stop cleanly");
        }
        tracing::debug!(pending_switches = attempt.scheduler.len(), "attempt state discarded");
        drop(attempt);
        if self.state != LifecycleState::Failed {
            self.transition(LifecycleState::Uninitialized);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/vertex/composite.rs"]
mod tests;
