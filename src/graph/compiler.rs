use std::collections::{BTreeMap, HashMap, HashSet};

use crate::config::model::{Input, Scene, SceneId};
use crate::config::settings::{EngineSettings, VertexSettings};
use crate::foundation::core::StreamKind;
use crate::foundation::error::{VertexError, VertexResult};
use crate::graph::filters::Filter;
use crate::graph::plan::{FilterChain, GraphPlan, InputDecl, OutputDecl, validate_label};

/// Instance name of the scene selector node.
pub const SELECTOR_INSTANCE: &str = "main_switcher";
/// Link label routed to the video output.
pub const VIDEO_OUTPUT_LABEL: &str = "videoOutput";
/// Link label routed to the audio output.
pub const AUDIO_OUTPUT_LABEL: &str = "audioOutput";

/// Everything the scene graph compiler reads. Nothing else influences the plan.
#[derive(Clone, Copy, Debug)]
pub struct CompileRequest<'a> {
    pub inputs: &'a [Input],
    /// Scenes sorted ascending by id.
    pub scenes: &'a [Scene],
    /// Active scene of the broadcast; selects the selector's initial index.
    pub active_scene: Option<&'a SceneId>,
    pub video_output_url: &'a str,
    pub audio_output_url: &'a str,
    /// Port the live control endpoint binds to.
    pub control_port: u16,
    pub settings: &'a VertexSettings,
}

/// Compile scene/region/input configuration into a processing-graph description.
///
/// The translation is pure: compiling the same request twice yields equal plans.
#[tracing::instrument(skip(req), fields(scenes = req.scenes.len(), inputs = req.inputs.len()))]
pub fn compile_graph(req: &CompileRequest<'_>) -> VertexResult<GraphPlan> {
    if req.scenes.is_empty() {
        return Err(VertexError::configuration("broadcast has no scenes"));
    }
    let known_inputs: HashSet<&str> = req.inputs.iter().map(|i| i.name.as_str()).collect();
    for scene in req.scenes {
        validate_label(scene.id.as_str())?;
        if scene.regions.is_empty() {
            return Err(VertexError::configuration(format!(
                "scene '{}' has no regions",
                scene.id
            )));
        }
        for region in &scene.regions {
            region.rect().validate()?;
            if !known_inputs.contains(region.input_id.as_str()) {
                return Err(VertexError::configuration(format!(
                    "scene '{}' references unknown input '{}'",
                    scene.id, region.input_id
                )));
            }
        }
    }

    let settings = req.settings;
    let mut chains = Vec::<FilterChain>::new();
    let mut decls = Vec::<InputDecl>::new();
    let mut adjusted_audio = Vec::<String>::new();
    let branches = region_branches(req.scenes);
    let mut video_fed = HashSet::<&str>::new();

    for input in req.inputs {
        validate_label(&input.name)?;
        for (socket_idx, socket) in input.sockets.iter().enumerate() {
            let kind = socket.stream_kind().map_err(|e| {
                VertexError::configuration(format!("input '{}': {e}", input.name))
            })?;
            let name = input.socket_name(socket_idx);
            let url = socket.url.clone().ok_or_else(|| {
                VertexError::configuration(format!("socket '{name}' has no URL assigned"))
            })?;
            let decl = InputDecl {
                source_index: decls.len(),
                socket: name.clone(),
                kind,
                url,
                format: settings.engine.input_format.clone(),
                options: settings.engine.input_options.clone(),
            };

            match kind {
                StreamKind::Video => {
                    if !video_fed.insert(input.name.as_str()) {
                        return Err(VertexError::configuration(format!(
                            "input '{}' has more than one video socket",
                            input.name
                        )));
                    }
                    match branches.get(input.name.as_str()) {
                        Some(labels) => chains.push(FilterChain::new(
                            [decl.stream_label()],
                            vec![Filter::framerate(settings.framerate), Filter::split(labels.len())],
                            labels.iter().cloned(),
                        )),
                        None => {
                            tracing::debug!(socket = %name, "video socket is not placed in any scene");
                        }
                    }
                }
                StreamKind::Audio => {
                    let adjusted = format!("{name}-adjusted");
                    chains.push(FilterChain::new(
                        [decl.stream_label()],
                        vec![
                            Filter::aresample(),
                            Filter::volume(1.0).named(format!("{name}-volume")),
                        ],
                        [adjusted.clone()],
                    ));
                    adjusted_audio.push(adjusted);
                }
            }
            decls.push(decl);
        }
    }

    for input_id in branches.keys() {
        if !video_fed.contains(input_id) {
            return Err(VertexError::configuration(format!(
                "input '{input_id}' is placed in a scene but has no video socket"
            )));
        }
    }

    let mut switch_index = BTreeMap::<SceneId, usize>::new();
    let mut finished = Vec::<String>::with_capacity(req.scenes.len());
    for (idx, scene) in req.scenes.iter().enumerate() {
        finished.push(compile_scene(scene, settings, &mut chains));
        switch_index.insert(scene.id.clone(), idx);
    }

    let bind_address = format!("tcp://*:{}", req.control_port);
    let selector = if finished.len() > 1 {
        let active = req
            .active_scene
            .ok_or_else(|| VertexError::configuration("broadcast has no active scene"))?;
        let map = *switch_index.get(active).ok_or_else(|| {
            VertexError::configuration(format!("active scene '{active}' is not a known scene"))
        })?;
        chains.push(FilterChain::new(
            finished.iter().cloned(),
            vec![
                Filter::streamselect(finished.len(), map).named(SELECTOR_INSTANCE),
                Filter::zmq(bind_address),
                Filter::framerate(settings.framerate),
            ],
            [VIDEO_OUTPUT_LABEL],
        ));
        Some(SELECTOR_INSTANCE.to_string())
    } else {
        chains.push(FilterChain::new(
            finished.iter().cloned(),
            vec![
                Filter::framerate(settings.framerate),
                Filter::zmq(bind_address),
            ],
            [VIDEO_OUTPUT_LABEL],
        ));
        None
    };

    if adjusted_audio.is_empty() {
        chains.push(FilterChain::new(
            Vec::<String>::new(),
            vec![Filter::anullsrc()],
            [AUDIO_OUTPUT_LABEL],
        ));
    } else {
        chains.push(FilterChain::new(
            adjusted_audio.iter().cloned(),
            vec![Filter::amix(adjusted_audio.len())],
            [AUDIO_OUTPUT_LABEL],
        ));
    }

    Ok(GraphPlan {
        inputs: decls,
        chains,
        outputs: vec![
            video_output(&settings.engine, req.video_output_url),
            audio_output(&settings.engine, req.audio_output_url),
        ],
        switch_index,
        selector,
    })
}

/// Branch labels (`"<scene>_<region>"`) for every input, across all scenes in order.
fn region_branches(scenes: &[Scene]) -> HashMap<&str, Vec<String>> {
    let mut out = HashMap::<&str, Vec<String>>::new();
    for scene in scenes {
        for (i, region) in scene.regions.iter().enumerate() {
            out.entry(region.input_id.as_str())
                .or_default()
                .push(format!("{}_{}", scene.id, i));
        }
    }
    out
}

/// Emit the anchor and overlay chains of one scene; returns the finished composite label.
fn compile_scene(scene: &Scene, settings: &VertexSettings, chains: &mut Vec<FilterChain>) -> String {
    let anchor = &scene.regions[0];
    let rect = anchor.rect();
    let mut current = format!("{}_0_padded", scene.id);
    chains.push(FilterChain::new(
        [format!("{}_0", scene.id)],
        vec![
            Filter::crop_to_aspect(rect.aspect()),
            Filter::scale(rect.width, rect.height),
            Filter::pad(settings.canvas, rect),
        ],
        [current.clone()],
    ));

    for (i, region) in scene.regions.iter().enumerate().skip(1) {
        let rect = region.rect();
        let branch = format!("{}_{}", scene.id, i);
        let scaled = format!("{branch}_scaled");
        let overlaid = format!("{branch}_overlay");
        chains.push(FilterChain::new(
            [branch.clone()],
            vec![
                Filter::crop_to_aspect(rect.aspect()),
                Filter::scale(rect.width, rect.height).named(branch.clone()),
            ],
            [scaled.clone()],
        ));
        chains.push(FilterChain::new(
            [current, scaled],
            vec![Filter::overlay(rect.x, rect.y).named(branch)],
            [overlaid.clone()],
        ));
        current = overlaid;
    }
    current
}

fn video_output(engine: &EngineSettings, url: &str) -> OutputDecl {
    let bitrate = format!("{}k", engine.video_bitrate_kbps);
    let mut options = vec![
        "-c:v".to_string(),
        engine.video_codec.clone(),
        "-pix_fmt".to_string(),
        engine.pix_fmt.clone(),
        "-preset".to_string(),
        engine.preset.clone(),
        "-x264opts".to_string(),
        format!("keyint={}", engine.keyint),
        "-b:v".to_string(),
        bitrate.clone(),
        "-maxrate".to_string(),
        bitrate,
        "-frame_drop_threshold".to_string(),
        engine.frame_drop_threshold.to_string(),
    ];
    options.extend(engine.timestamp_flags.iter().cloned());
    OutputDecl {
        label: VIDEO_OUTPUT_LABEL.to_string(),
        url: url.to_string(),
        format: engine.output_format.clone(),
        options,
    }
}

fn audio_output(engine: &EngineSettings, url: &str) -> OutputDecl {
    let mut options = vec!["-c:a".to_string(), engine.audio_codec.clone()];
    options.extend(engine.timestamp_flags.iter().cloned());
    OutputDecl {
        label: AUDIO_OUTPUT_LABEL.to_string(),
        url: url.to_string(),
        format: engine.output_format.clone(),
        options,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/graph/compiler.rs"]
mod tests;
