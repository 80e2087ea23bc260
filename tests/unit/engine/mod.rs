use super::*;

use std::collections::BTreeMap;

use crate::foundation::core::StreamKind;
use crate::graph::filters::Filter;

#[derive(Default)]
struct Recording {
    calls: Vec<String>,
    short_ids: bool,
}

#[async_trait]
impl GraphEngine for Recording {
    fn add_input(&mut self, input: &InputDecl) -> VertexResult<()> {
        self.calls.push(format!("input {}", input.socket));
        Ok(())
    }

    fn add_output(&mut self, output: &OutputDecl) -> VertexResult<()> {
        self.calls.push(format!("output {}", output.label));
        Ok(())
    }

    fn declare_chain(&mut self, chain: &FilterChain) -> VertexResult<Vec<String>> {
        self.calls.push(format!("chain {}", chain.render()));
        if self.short_ids {
            return Ok(Vec::new());
        }
        Ok(chain.filters.iter().filter_map(|f| f.node_id()).collect())
    }

    async fn start(&mut self, _events: mpsc::Sender<EngineEvent>) -> VertexResult<()> {
        Ok(())
    }

    async fn stop(&mut self) -> VertexResult<()> {
        Ok(())
    }
}

fn plan() -> GraphPlan {
    GraphPlan {
        inputs: vec![InputDecl {
            source_index: 0,
            socket: "cam-0".to_string(),
            kind: StreamKind::Video,
            url: "tcp://127.0.0.1:7000".to_string(),
            format: "mpegts".to_string(),
            options: vec![],
        }],
        chains: vec![
            FilterChain::new(["0:v"], vec![Filter::split(2)], ["a_0", "b_0"]),
            FilterChain::new(
                ["a_0", "b_0"],
                vec![
                    Filter::streamselect(2, 0).named("main_switcher"),
                    Filter::zmq("tcp://*:5555"),
                ],
                ["videoOutput"],
            ),
        ],
        outputs: vec![OutputDecl {
            label: "videoOutput".to_string(),
            url: "tcp://127.0.0.1:9000".to_string(),
            format: "mpegts".to_string(),
            options: vec![],
        }],
        switch_index: BTreeMap::new(),
        selector: Some("main_switcher".to_string()),
    }
}

#[test]
fn apply_plan_declares_inputs_chains_then_outputs() {
    let mut engine = Recording::default();
    let nodes = apply_plan(&mut engine, &plan()).unwrap();

    assert_eq!(engine.calls[0], "input cam-0");
    assert!(engine.calls[1].starts_with("chain [0:v]split"));
    assert!(engine.calls[2].starts_with("chain [a_0][b_0]streamselect@main_switcher"));
    assert_eq!(engine.calls[3], "output videoOutput");
    assert!(nodes.contains("streamselect@main_switcher"));
    assert_eq!(nodes.len(), 1);
}

#[test]
fn apply_plan_rejects_mismatched_node_ids() {
    let mut engine = Recording {
        short_ids: true,
        ..Recording::default()
    };
    assert!(matches!(
        apply_plan(&mut engine, &plan()),
        Err(VertexError::EngineStartup(_))
    ));
}
