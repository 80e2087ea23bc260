use super::*;

use tokio::io::DuplexStream;

/// Server half of a REP socket: reads our greeting and READY, answers with its own.
async fn rep_handshake(peer: &mut DuplexStream) {
    let mut greeting_in = [0u8; GREETING_LEN];
    peer.read_exact(&mut greeting_in).await.unwrap();
    assert_eq!(greeting_in, greeting());

    let mut server_greeting = greeting();
    server_greeting[11] = 1;
    server_greeting[32] = 1;
    peer.write_all(&server_greeting).await.unwrap();

    let expected = encode_frame(FLAG_COMMAND, &ready_command("REQ"));
    let mut ready = vec![0u8; expected.len()];
    peer.read_exact(&mut ready).await.unwrap();
    assert_eq!(ready, expected);
    peer.write_all(&encode_frame(FLAG_COMMAND, &ready_command("REP")))
        .await
        .unwrap();
}

#[test]
fn greeting_layout() {
    let g = greeting();
    assert_eq!(g.len(), 64);
    assert_eq!(g[0], 0xFF);
    assert_eq!(g[9], 0x7F);
    assert_eq!(&g[10..12], &[3, 0]);
    assert_eq!(&g[12..16], b"NULL");
    assert!(g[16..].iter().all(|&b| b == 0));
}

#[test]
fn ready_command_carries_socket_type() {
    let body = ready_command("REQ");
    assert_eq!(body[0], 5);
    assert_eq!(&body[1..6], b"READY");
    assert_eq!(body[6], 11);
    assert_eq!(&body[7..18], b"Socket-Type");
    assert_eq!(&body[18..22], &[0, 0, 0, 3]);
    assert_eq!(&body[22..], b"REQ");
}

#[test]
fn frames_switch_to_long_size_past_255_bytes() {
    let short = encode_frame(FLAG_MORE, b"abc");
    assert_eq!(short, [FLAG_MORE, 3, b'a', b'b', b'c']);

    let body = vec![7u8; 300];
    let long = encode_frame(0, &body);
    assert_eq!(long[0], FLAG_LONG);
    assert_eq!(&long[1..9], &300u64.to_be_bytes());
    assert_eq!(long.len(), 9 + 300);
}

#[tokio::test]
async fn request_round_trips_through_rep_peer() {
    let (client, mut server) = tokio::io::duplex(4096);
    let peer = tokio::spawn(async move {
        rep_handshake(&mut server).await;

        let req = "streamselect@main_switcher map 1";
        let mut envelope = encode_frame(FLAG_MORE, &[]);
        envelope.extend_from_slice(&encode_frame(0, req.as_bytes()));
        let mut incoming = vec![0u8; envelope.len()];
        server.read_exact(&mut incoming).await.unwrap();
        assert_eq!(incoming, envelope);

        let mut reply = encode_frame(FLAG_MORE, &[]);
        reply.extend_from_slice(&encode_frame(0, b"0 Success"));
        server.write_all(&reply).await.unwrap();
    });

    let mut link = ReqLink::handshake(client).await.unwrap();
    let reply = link.request(b"streamselect@main_switcher map 1").await.unwrap();
    assert_eq!(reply, b"0 Success");
    peer.await.unwrap();
}

#[tokio::test]
async fn handshake_rejects_non_zmtp_peer() {
    let (client, mut server) = tokio::io::duplex(4096);
    tokio::spawn(async move {
        let mut sink = [0u8; GREETING_LEN];
        server.read_exact(&mut sink).await.unwrap();
        server.write_all(&[b'H'; GREETING_LEN]).await.unwrap();
    });
    let err = ReqLink::handshake(client).await.unwrap_err();
    assert!(matches!(err, VertexError::Transport(_)));
}

#[tokio::test]
async fn closed_peer_surfaces_transport_error() {
    let (client, mut server) = tokio::io::duplex(4096);
    tokio::spawn(async move {
        rep_handshake(&mut server).await;
        drop(server);
    });
    let mut link = ReqLink::handshake(client).await.unwrap();
    assert!(matches!(
        link.request(b"x y 1").await,
        Err(VertexError::Transport(_))
    ));
}

#[tokio::test]
async fn idle_link_reports_peer_hangup() {
    let (client, mut server) = tokio::io::duplex(4096);
    let peer = tokio::spawn(async move {
        rep_handshake(&mut server).await;
        server
    });
    let mut link = ReqLink::handshake(client).await.unwrap();
    drop(peer.await.unwrap());
    assert!(matches!(link.closed().await, VertexError::Transport(_)));
}

#[tokio::test]
async fn idle_link_treats_unsolicited_frames_as_broken() {
    let (client, mut server) = tokio::io::duplex(4096);
    let peer = tokio::spawn(async move {
        rep_handshake(&mut server).await;
        server
    });
    let mut link = ReqLink::handshake(client).await.unwrap();
    let mut server = peer.await.unwrap();
    server.write_all(&encode_frame(0, b"late")).await.unwrap();
    let err = link.closed().await;
    assert!(err.to_string().contains("outside a request"));
}

#[tokio::test]
async fn idle_watch_is_cancel_safe() {
    let (client, mut server) = tokio::io::duplex(4096);
    let peer = tokio::spawn(async move {
        rep_handshake(&mut server).await;
        let mut incoming = vec![0u8; 2 + 2 + 5];
        server.read_exact(&mut incoming).await.unwrap();
        let mut reply = encode_frame(FLAG_MORE, &[]);
        reply.extend_from_slice(&encode_frame(0, b"0 Success"));
        server.write_all(&reply).await.unwrap();
        server
    });
    let mut link = ReqLink::handshake(client).await.unwrap();
    let watched = tokio::time::timeout(std::time::Duration::from_millis(20), link.closed()).await;
    assert!(watched.is_err());
    assert_eq!(link.request(b"x y 1").await.unwrap(), b"0 Success");
    let _server = peer.await.unwrap();
}
