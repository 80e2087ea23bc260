use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        VertexError::configuration("x")
            .to_string()
            .contains("configuration error:")
    );
    assert!(
        VertexError::transport("x")
            .to_string()
            .contains("transport error:")
    );
    assert!(
        VertexError::scheduling("x")
            .to_string()
            .contains("scheduling error:")
    );
    assert!(
        VertexError::engine_startup("x")
            .to_string()
            .contains("engine startup error:")
    );
    assert!(
        VertexError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = VertexError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}

#[test]
fn only_initialization_failures_restart_the_vertex() {
    assert!(VertexError::configuration("unknown socket type").restarts_vertex());
    assert!(VertexError::engine_startup("spawn failed").restarts_vertex());
    assert!(VertexError::Other(anyhow::anyhow!("x")).restarts_vertex());
    assert!(!VertexError::transport("disconnected").restarts_vertex());
    assert!(!VertexError::scheduling("no active scene").restarts_vertex());
}
