use super::*;
use crate::config::model::{Region, Socket};

fn input(name: &str, kinds: &[&str]) -> Input {
    Input {
        name: name.to_string(),
        sockets: kinds
            .iter()
            .enumerate()
            .map(|(i, k)| Socket {
                kind: k.to_string(),
                url: Some(format!("tcp://127.0.0.1:{}", 7000 + i)),
            })
            .collect(),
    }
}

fn region(input_id: &str, x: i32, y: i32, width: u32, height: u32) -> Region {
    Region {
        input_id: input_id.to_string(),
        x,
        y,
        width,
        height,
    }
}

fn scene(id: &str, regions: Vec<Region>) -> Scene {
    Scene {
        id: SceneId::new(id),
        title: None,
        regions,
    }
}

fn request<'a>(
    inputs: &'a [Input],
    scenes: &'a [Scene],
    active: Option<&'a SceneId>,
    settings: &'a VertexSettings,
) -> CompileRequest<'a> {
    CompileRequest {
        inputs,
        scenes,
        active_scene: active,
        video_output_url: "tcp://127.0.0.1:9000",
        audio_output_url: "tcp://127.0.0.1:9001",
        control_port: 5555,
        settings,
    }
}

#[test]
fn single_scene_single_region_has_no_selector() {
    let settings = VertexSettings::default();
    let inputs = [input("cam", &["video", "audio"])];
    let scenes = [scene("a", vec![region("cam", 0, 0, 1920, 1080)])];
    let plan = compile_graph(&request(&inputs, &scenes, None, &settings)).unwrap();

    assert_eq!(plan.selector, None);
    assert_eq!(plan.selector_count(), 0);
    assert_eq!(plan.selector_node(), None);

    let out = plan.chains.iter().find(|c| c.outputs == [VIDEO_OUTPUT_LABEL]).unwrap();
    assert_eq!(out.inputs, ["a_0_padded"]);
    assert_eq!(out.filters[0].name, "framerate");
    assert_eq!(out.filters[1].name, "zmq");
}

#[test]
fn multiple_scenes_get_exactly_one_selector() {
    let settings = VertexSettings::default();
    let inputs = [input("cam", &["video"]), input("slides", &["video"])];
    let scenes = [
        scene("a", vec![region("cam", 0, 0, 1920, 1080)]),
        scene(
            "b",
            vec![
                region("slides", 0, 0, 1920, 1080),
                region("cam", 1440, 810, 480, 270),
            ],
        ),
        scene("c", vec![region("slides", 0, 0, 1920, 1080)]),
    ];
    let active = SceneId::new("b");
    let plan = compile_graph(&request(&inputs, &scenes, Some(&active), &settings)).unwrap();

    assert_eq!(plan.selector_count(), 1);
    assert_eq!(plan.selector_node().as_deref(), Some("streamselect@main_switcher"));
    let select = plan.chains.iter().find(|c| c.outputs == [VIDEO_OUTPUT_LABEL]).unwrap();
    assert_eq!(select.inputs, ["a_0_padded", "b_1_overlay", "c_0_padded"]);
    assert_eq!(
        select.filters[0].render(),
        "streamselect@main_switcher=inputs=3:map=1"
    );
    assert_eq!(plan.switch_index[&SceneId::new("a")], 0);
    assert_eq!(plan.switch_index[&SceneId::new("c")], 2);
}

#[test]
fn video_sockets_split_into_one_branch_per_region() {
    let settings = VertexSettings::default();
    let inputs = [input("cam", &["video"]), input("slides", &["video"])];
    let scenes = [
        scene("a", vec![region("cam", 0, 0, 1920, 1080)]),
        scene(
            "b",
            vec![
                region("slides", 0, 0, 1920, 1080),
                region("cam", 1440, 810, 480, 270),
            ],
        ),
    ];
    let active = SceneId::new("a");
    let plan = compile_graph(&request(&inputs, &scenes, Some(&active), &settings)).unwrap();

    let cam = &plan.chains[0];
    assert_eq!(cam.inputs, ["0:v"]);
    assert_eq!(cam.render(), "[0:v]framerate=fps=30,split=outputs=2[a_0][b_1]");
    let slides = &plan.chains[1];
    assert_eq!(slides.inputs, ["1:v"]);
    assert_eq!(slides.outputs, ["b_0"]);
}

#[test]
fn anchor_is_cropped_scaled_and_padded_to_canvas() {
    let settings = VertexSettings::default();
    let inputs = [input("cam", &["video"])];
    let scenes = [scene("a", vec![region("cam", 100, 50, 800, 400)])];
    let plan = compile_graph(&request(&inputs, &scenes, None, &settings)).unwrap();

    let anchor = plan
        .chains
        .iter()
        .find(|c| c.outputs == ["a_0_padded"])
        .unwrap();
    assert_eq!(
        anchor.render(),
        "[a_0]crop=w='if(gt(a,2),2*ih,iw)':h='if(lt(a,2),0.5*iw,ih)',scale=w=800:h=400,\
         pad=width=1920:height=1080:x=100:y=50[a_0_padded]"
    );
}

#[test]
fn overlays_chain_left_to_right_in_declaration_order() {
    let settings = VertexSettings::default();
    let inputs = [input("a", &["video"]), input("b", &["video"]), input("c", &["video"])];
    let scenes = [scene(
        "s",
        vec![
            region("a", 0, 0, 1920, 1080),
            region("b", 10, 10, 320, 180),
            region("c", 400, 10, 320, 180),
        ],
    )];
    let plan = compile_graph(&request(&inputs, &scenes, None, &settings)).unwrap();

    let first = plan.chains.iter().find(|c| c.outputs == ["s_1_overlay"]).unwrap();
    assert_eq!(first.inputs, ["s_0_padded", "s_1_scaled"]);
    assert_eq!(first.filters[0].node_id().as_deref(), Some("overlay@s_1"));
    let second = plan.chains.iter().find(|c| c.outputs == ["s_2_overlay"]).unwrap();
    assert_eq!(second.inputs, ["s_1_overlay", "s_2_scaled"]);

    let nodes = plan.node_ids();
    assert!(nodes.contains("overlay@s_2"));
    assert!(nodes.contains("scale@s_2"));
}

#[test]
fn audio_sockets_get_gain_stages_and_one_mix() {
    let settings = VertexSettings::default();
    let inputs = [input("cam", &["video", "audio"]), input("mic", &["audio"])];
    let scenes = [scene("a", vec![region("cam", 0, 0, 1920, 1080)])];
    let plan = compile_graph(&request(&inputs, &scenes, None, &settings)).unwrap();

    let gain = plan.chains.iter().find(|c| c.outputs == ["cam-1-adjusted"]).unwrap();
    assert_eq!(gain.inputs, ["1:a"]);
    assert_eq!(gain.filters[1].node_id().as_deref(), Some("volume@cam-1-volume"));
    let mix = plan.chains.iter().find(|c| c.outputs == [AUDIO_OUTPUT_LABEL]).unwrap();
    assert_eq!(mix.inputs, ["cam-1-adjusted", "mic-0-adjusted"]);
    assert_eq!(mix.filters[0].render(), "amix=inputs=2");

    let sources: Vec<_> = plan.inputs.iter().map(|d| d.source_index).collect();
    assert_eq!(sources, [0, 1, 2]);
}

#[test]
fn no_audio_sockets_fall_back_to_silence() {
    let settings = VertexSettings::default();
    let inputs = [input("cam", &["video"])];
    let scenes = [scene("a", vec![region("cam", 0, 0, 1920, 1080)])];
    let plan = compile_graph(&request(&inputs, &scenes, None, &settings)).unwrap();
    let audio = plan.chains.iter().find(|c| c.outputs == [AUDIO_OUTPUT_LABEL]).unwrap();
    assert!(audio.inputs.is_empty());
    assert_eq!(audio.filters[0].name, "anullsrc");
}

#[test]
fn outputs_carry_fixed_encoding_parameters() {
    let settings = VertexSettings::default();
    let inputs = [input("cam", &["video"])];
    let scenes = [scene("a", vec![region("cam", 0, 0, 1920, 1080)])];
    let plan = compile_graph(&request(&inputs, &scenes, None, &settings)).unwrap();

    assert_eq!(plan.outputs.len(), 2);
    let video = &plan.outputs[0];
    assert_eq!(video.label, VIDEO_OUTPUT_LABEL);
    assert_eq!(video.url, "tcp://127.0.0.1:9000");
    assert!(video.options.windows(2).any(|w| w == ["-c:v", "libx264"]));
    assert!(video.options.windows(2).any(|w| w == ["-maxrate", "4000k"]));
    assert!(video.options.iter().any(|o| o == "-copyts"));
    let audio = &plan.outputs[1];
    assert!(audio.options.windows(2).any(|w| w == ["-c:a", "aac"]));
}

#[test]
fn unknown_socket_type_aborts_compilation() {
    let settings = VertexSettings::default();
    let inputs = [input("cam", &["video", "subtitle"])];
    let scenes = [scene("a", vec![region("cam", 0, 0, 1920, 1080)])];
    let err = compile_graph(&request(&inputs, &scenes, None, &settings)).unwrap_err();
    assert!(matches!(err, VertexError::Configuration(_)));
    assert!(err.to_string().contains("subtitle"));
}

#[test]
fn selector_needs_a_known_active_scene() {
    let settings = VertexSettings::default();
    let inputs = [input("cam", &["video"])];
    let scenes = [
        scene("a", vec![region("cam", 0, 0, 1920, 1080)]),
        scene("b", vec![region("cam", 0, 0, 960, 540)]),
    ];
    let err = compile_graph(&request(&inputs, &scenes, None, &settings)).unwrap_err();
    assert!(err.to_string().contains("no active scene"));

    let stray = SceneId::new("zzz");
    let err = compile_graph(&request(&inputs, &scenes, Some(&stray), &settings)).unwrap_err();
    assert!(matches!(err, VertexError::Configuration(_)));
}

#[test]
fn dangling_and_degenerate_regions_are_rejected() {
    let settings = VertexSettings::default();
    let inputs = [input("cam", &["video"])];

    let scenes = [scene("a", vec![region("ghost", 0, 0, 100, 100)])];
    assert!(compile_graph(&request(&inputs, &scenes, None, &settings)).is_err());

    let scenes = [scene("a", vec![region("cam", 0, 0, 0, 100)])];
    assert!(compile_graph(&request(&inputs, &scenes, None, &settings)).is_err());

    let scenes = [scene("a", vec![])];
    assert!(compile_graph(&request(&inputs, &scenes, None, &settings)).is_err());

    let audio_only = [input("cam", &["audio"])];
    let scenes = [scene("a", vec![region("cam", 0, 0, 100, 100)])];
    assert!(compile_graph(&request(&audio_only, &scenes, None, &settings)).is_err());
}

#[test]
fn compilation_is_a_pure_function_of_its_inputs() {
    let settings = VertexSettings::default();
    let inputs = [input("cam", &["video", "audio"]), input("slides", &["video"])];
    let scenes = [
        scene("a", vec![region("cam", 0, 0, 1920, 1080)]),
        scene(
            "b",
            vec![
                region("slides", 0, 0, 1920, 1080),
                region("cam", 1440, 810, 480, 270),
            ],
        ),
    ];
    let active = SceneId::new("a");
    let req = request(&inputs, &scenes, Some(&active), &settings);
    let first = compile_graph(&req).unwrap();
    let second = compile_graph(&req).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.filter_complex(), second.filter_complex());
}
