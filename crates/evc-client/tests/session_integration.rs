//! Integration tests: a full client session over real loopback UDP.
//!
//! A `tokio::net::UdpSocket` bound to 127.0.0.1 stands in for the event
//! server.  The client sends through `UdpTransport`, and the test decodes the
//! received datagrams with the public `evc_core` API.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use evc_client::application::session::{DatagramTransport, EventClient, SessionOptions};
use evc_client::infrastructure::transport::UdpTransport;
use evc_core::{
    protocol::messages::button_flags,
    ButtonPacket, ClientToken, FragmentHeader, Icon, IconType, PacketType,
};
use tokio::net::UdpSocket;
use tokio::time::timeout;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Binds a fake event server on an ephemeral loopback port.
async fn fake_server() -> (UdpSocket, SocketAddr) {
    let socket = UdpSocket::bind("127.0.0.1:0").await.expect("bind server");
    let addr = socket.local_addr().expect("local addr");
    (socket, addr)
}

/// Receives one datagram and returns its header and payload.
async fn recv_packet(server: &UdpSocket) -> (FragmentHeader, Vec<u8>) {
    let mut buf = [0u8; 2048];
    let (n, _) = timeout(RECV_TIMEOUT, server.recv_from(&mut buf))
        .await
        .expect("datagram must arrive in time")
        .expect("recv must succeed");
    assert_eq!(&buf[..4], b"XBMC");
    let (header, payload) = FragmentHeader::parse(&buf[..n]).expect("valid header");
    (header, payload.to_vec())
}

fn make_client(interval: Duration) -> EventClient {
    let transport: Arc<dyn DatagramTransport> = Arc::new(UdpTransport::new());
    EventClient::new(
        transport,
        SessionOptions {
            keepalive_interval: interval,
            ..SessionOptions::default()
        },
    )
}

#[tokio::test]
async fn test_session_sends_helo_then_bye_with_one_token() {
    // Arrange
    let (server, addr) = fake_server().await;
    let mut client = make_client(Duration::from_secs(20));

    // Act
    let token = client.start(addr, "TestClient", None).await.unwrap();
    client.stop().await.unwrap();

    // Assert
    let (helo, payload) = recv_packet(&server).await;
    assert_eq!(helo.packet_type, PacketType::Helo);
    assert_eq!(helo.token, token);
    assert!(helo.is_single());
    assert_eq!(&payload[..11], b"TestClient\0");

    let (bye, payload) = recv_packet(&server).await;
    assert_eq!(bye.packet_type, PacketType::Bye);
    assert_eq!(bye.token, token);
    assert!(payload.is_empty());
}

#[tokio::test]
async fn test_button_press_arrives_with_expected_flags() {
    let (server, addr) = fake_server().await;
    let mut client = make_client(Duration::from_secs(20));
    client.start(addr, "Remote", None).await.unwrap();

    client
        .send_button(ButtonPacket::code(0).with_repeat(false))
        .await
        .unwrap();
    client.stop().await.unwrap();

    let _helo = recv_packet(&server).await;
    let (header, payload) = recv_packet(&server).await;
    assert_eq!(header.packet_type, PacketType::Button);
    assert_eq!(
        u16::from_be_bytes([payload[2], payload[3]]),
        button_flags::DOWN | button_flags::NO_REPEAT
    );
}

#[tokio::test]
async fn test_fragmented_helo_icon_reassembles_on_server() {
    // Arrange
    let (server, addr) = fake_server().await;
    let icon_bytes: Vec<u8> = (0..3000u32).map(|i| (i % 251) as u8).collect();
    let mut client = make_client(Duration::from_secs(20));

    // Act
    client
        .start(
            addr,
            "Remote",
            Some(Icon::new(IconType::Png, icon_bytes.clone())),
        )
        .await
        .unwrap();
    client.stop().await.unwrap();

    // Assert: UDP on loopback does not reorder, but sort by sequence anyway.
    let (first, first_payload) = recv_packet(&server).await;
    let total = first.total_fragments as usize;
    assert!(total > 1);
    let mut fragments = vec![(first.sequence, first_payload)];
    for _ in 1..total {
        let (h, p) = recv_packet(&server).await;
        assert_eq!(h.packet_type, PacketType::Helo);
        assert_eq!(h.token, first.token);
        fragments.push((h.sequence, p));
    }
    fragments.sort_by_key(|(seq, _)| *seq);
    let joined: Vec<u8> = fragments.into_iter().flat_map(|(_, p)| p).collect();
    assert!(joined.ends_with(&icon_bytes));
    assert_eq!(joined[7], IconType::Png as u8);
}

#[tokio::test]
async fn test_keepalive_pings_reach_server() {
    let (server, addr) = fake_server().await;
    let mut client = make_client(Duration::from_millis(50));
    let token = client.start(addr, "Remote", None).await.unwrap();

    let _helo = recv_packet(&server).await;
    let (ping, payload) = recv_packet(&server).await;
    client.stop().await.unwrap();

    assert_eq!(ping.packet_type, PacketType::Ping);
    assert_eq!(ping.token, token);
    assert!(payload.is_empty());
}

#[tokio::test]
async fn test_new_session_draws_new_token() {
    let (server, addr) = fake_server().await;
    let mut client = make_client(Duration::from_secs(20));

    client.start(addr, "Remote", None).await.unwrap();
    client.stop().await.unwrap();
    client.start(addr, "Remote", None).await.unwrap();
    client.stop().await.unwrap();

    let mut tokens: Vec<ClientToken> = Vec::new();
    for _ in 0..4 {
        tokens.push(recv_packet(&server).await.0.token);
    }
    assert_eq!(tokens[0], tokens[1]);
    assert_eq!(tokens[2], tokens[3]);
    // Two random u32 draws collide with probability 2^-32.
    assert_ne!(tokens[0], tokens[2]);
}
