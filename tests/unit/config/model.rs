use super::*;

#[test]
fn vertex_doc_parses_camel_case_json() {
    let json = r#"{
        "id": "v1",
        "broadcastId": "b1",
        "inputs": [
            {"name": "cam", "sockets": [{"type": "video"}, {"type": "audio"}]}
        ],
        "params": {"cutOffsetMs": -250, "layout": "wide"}
    }"#;
    let doc = VertexDoc::from_reader(json.as_bytes()).unwrap();
    assert_eq!(doc.broadcast_id, "b1");
    assert_eq!(doc.inputs[0].sockets.len(), 2);
    assert_eq!(doc.inputs[0].sockets[1].kind, "audio");
    assert_eq!(doc.params.cut_offset_ms, -250);
    assert_eq!(doc.params.extra["layout"], "wide");
}

#[test]
fn cut_offset_accepts_the_short_key() {
    let params: VertexParams =
        serde_json::from_str(r#"{"cutOffset": 1500, "layout": "wide"}"#).unwrap();
    assert_eq!(params.cut_offset_ms, 1500);
    assert!(!params.extra.contains_key("cutOffset"));
    assert_eq!(params.extra["layout"], "wide");
    assert!(serde_json::to_string(&params).unwrap().contains(r#""cutOffsetMs":1500"#));
}

#[test]
fn unknown_socket_type_survives_parsing_but_not_classification() {
    let json = r#"{"name": "cam", "sockets": [{"type": "subtitle"}]}"#;
    let input: Input = serde_json::from_str(json).unwrap();
    assert!(matches!(
        input.sockets[0].stream_kind(),
        Err(VertexError::Configuration(_))
    ));
}

#[test]
fn display_name_prefers_title() {
    let mut doc = VertexDoc {
        id: "v1".into(),
        title: Some("Main Mix".into()),
        broadcast_id: "b".into(),
        inputs: vec![],
        params: VertexParams::default(),
    };
    assert_eq!(doc.display_name(), "Main Mix");
    doc.title = Some(String::new());
    assert_eq!(doc.display_name(), "v1");
    doc.title = None;
    assert_eq!(doc.display_name(), "v1");
}

#[test]
fn scenes_sort_ascending_by_id() {
    let scene = |id: &str| Scene {
        id: SceneId::new(id),
        title: None,
        regions: vec![],
    };
    let sorted = sort_scenes(vec![scene("c"), scene("a"), scene("b")]);
    let ids: Vec<_> = sorted.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, ["a", "b", "c"]);
}

#[test]
fn socket_names_follow_input_and_index() {
    let input = Input {
        name: "cam".into(),
        sockets: vec![],
    };
    assert_eq!(input.socket_name(0), "cam-0");
    assert_eq!(input.socket_name(3), "cam-3");
}

#[test]
fn from_path_reports_missing_files_as_serde_errors() {
    let err = VertexDoc::from_path("/definitely/not/here.json").unwrap_err();
    assert!(matches!(err, VertexError::Serde(_)));
}
