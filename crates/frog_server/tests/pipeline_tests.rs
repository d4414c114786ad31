//! End-to-end scenarios: a real server driven by the real client.

use frog_client::{ChannelSubscriber, ClientError, Connection, ConnectionConfig, ProtocolError};
use frog_map::TileStore;
use frog_server::{GameServer, PluginError, ServerConfig, ServerError, ServerHandle};
use frog_types::{
    JsonCodec, Message, MessageCodec, MessageKind, TileQuery, TileQueryResult, TileUpdate, TileUpdateResult,
    VersionHandshakeResult,
};
use socket2::{Domain, Protocol, Socket, Type};
use std::io::Write;
use std::net::{SocketAddr, TcpStream};
use std::thread;
use std::time::{Duration, Instant};

const WAIT: Duration = Duration::from_secs(5);

fn server_config() -> ServerConfig {
    ServerConfig {
        bind_address: SocketAddr::from(([127, 0, 0, 1], 0)),
        worker_threads: 2,
        tick_interval_ms: 0,
        read_poll_interval_ms: 20,
        ..Default::default()
    }
}

fn start_server(config: ServerConfig) -> ServerHandle {
    GameServer::new(config).unwrap().start().unwrap()
}

fn client_config() -> ConnectionConfig {
    ConnectionConfig {
        dial_retries: 2,
        retry_delay_ms: 20,
        handshake_timeout_ms: 2000,
        read_poll_interval_ms: 20,
        ..Default::default()
    }
}

fn connect(handle: &ServerHandle) -> Connection {
    let connection = Connection::new(client_config());
    connection.start("127.0.0.1", handle.local_addr().port()).unwrap();
    connection
}

fn wait_until(condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    false
}

#[test]
fn test_handshake_and_authentication() {
    let mut handle = start_server(server_config());
    let connection = connect(&handle);
    assert!(connection.is_connected());

    let (subscriber, packets) = ChannelSubscriber::new();
    connection.add_packet_subscriber(subscriber);
    connection.connect("frog", "lilypad").unwrap();

    let reply = packets.recv_timeout(WAIT).unwrap();
    assert_eq!(reply.kind(), MessageKind::ConnectResult);
    let token = connection.token().expect("token captured").to_string();
    assert!(uuid::Uuid::parse_str(&token).is_ok());

    // A second successful connect does not replace the first token.
    connection.connect("frog", "lilypad").unwrap();
    packets.recv_timeout(WAIT).unwrap();
    assert_eq!(connection.token(), Some(token.as_str()));

    assert!(handle.tick(Duration::from_millis(50)).is_some());
    assert_eq!(handle.stats().players(), 2);

    connection.disconnect();
    handle.shutdown();
}

#[test]
fn test_rejected_authentication_leaves_token_unset() {
    let handle = start_server(server_config());
    let connection = connect(&handle);
    let (subscriber, packets) = ChannelSubscriber::new();
    connection.add_packet_subscriber(subscriber);

    connection.connect("   ", "pw").unwrap();
    let reply: frog_types::ConnectResult = packets.recv_timeout(WAIT).unwrap().payload().unwrap();
    assert!(!reply.result);
    assert!(reply.reason.is_some());
    assert!(connection.token().is_none());

    handle.shutdown();
}

#[test]
fn test_version_mismatch_never_reaches_running() {
    let handle = start_server(server_config());
    let connection = Connection::new(ConnectionConfig {
        protocol_version: "v0.0.0.2".to_string(),
        ..client_config()
    });

    match connection.start("127.0.0.1", handle.local_addr().port()) {
        Err(ClientError::Protocol(ProtocolError::VersionMismatch { local, remote })) => {
            assert_eq!(local, "v0.0.0.2");
            assert_eq!(remote, frog_types::PROTOCOL_VERSION);
        }
        other => panic!("expected a version mismatch, got {other:?}"),
    }
    assert!(!connection.is_running());
    handle.shutdown();
}

#[test]
fn test_tile_requests_round_trip() {
    let mut handle = start_server(server_config());
    let connection = connect(&handle);
    let (subscriber, packets) = ChannelSubscriber::new();
    connection.add_packet_subscriber(subscriber);

    let update = TileUpdate {
        layer: 1,
        x: 40,
        y: 3,
        value: Some(12),
    };
    connection
        .send_message(&Message::with_payload(MessageKind::TileUpdate, &update).unwrap())
        .unwrap();
    let updated: TileUpdateResult = packets.recv_timeout(WAIT).unwrap().payload().unwrap();
    assert_eq!(updated, TileUpdateResult { result: true, previous: None });

    let query = TileQuery { layer: 1, x: 40, y: 3 };
    connection
        .send_message(&Message::with_payload(MessageKind::TileQuery, &query).unwrap())
        .unwrap();
    let queried: TileQueryResult = packets.recv_timeout(WAIT).unwrap().payload().unwrap();
    assert_eq!(queried, TileQueryResult { result: true, value: Some(12) });
    assert_eq!(handle.world().read().get_tile(1, 40, 3), Ok(Some(12)));

    let clear = TileUpdate { value: None, ..update };
    connection
        .send_message(&Message::with_payload(MessageKind::TileUpdate, &clear).unwrap())
        .unwrap();
    let cleared: TileUpdateResult = packets.recv_timeout(WAIT).unwrap().payload().unwrap();
    assert_eq!(cleared.previous, Some(12));

    handle.tick(Duration::from_millis(50));
    assert_eq!(handle.world().read().height(), 0);
    assert_eq!(handle.stats().tile_changes(), 2);

    handle.shutdown();
}

#[test]
fn test_update_far_outside_the_map_is_refused() {
    let handle = start_server(server_config());
    let connection = connect(&handle);
    let (subscriber, packets) = ChannelSubscriber::new();
    connection.add_packet_subscriber(subscriber);

    let far = TileUpdate {
        layer: 0,
        x: 0,
        y: u32::MAX,
        value: Some(1),
    };
    connection
        .send_message(&Message::with_payload(MessageKind::TileUpdate, &far).unwrap())
        .unwrap();
    let reply = packets.recv_timeout(WAIT).unwrap();
    assert_eq!(reply.kind(), MessageKind::TileUpdateResult);
    let payload: serde_json::Value = reply.payload().unwrap();
    assert_eq!(payload["result"], serde_json::json!(false));
    assert_eq!(handle.world().read().height(), 0);

    // The server keeps serving the same connection.
    let query = TileQuery { layer: 0, x: 0, y: 0 };
    connection
        .send_message(&Message::with_payload(MessageKind::TileQuery, &query).unwrap())
        .unwrap();
    let queried: TileQueryResult = packets.recv_timeout(WAIT).unwrap().payload().unwrap();
    assert_eq!(queried, TileQueryResult { result: true, value: None });

    handle.shutdown();
}

/// Writes tile queries without ever reading a reply, until the server cuts
/// the socket off or `lines` have been sent. The socket is handed back open.
fn flood_without_reading(address: SocketAddr, lines: usize) -> (TcpStream, usize) {
    let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP)).unwrap();
    socket.set_recv_buffer_size(4096).unwrap();
    socket.connect(&address.into()).unwrap();
    let mut stream: TcpStream = socket.into();

    let query = JsonCodec
        .encode(&Message::with_payload(MessageKind::TileQuery, &TileQuery { layer: 0, x: 1, y: 1 }).unwrap())
        .unwrap();
    let line = format!("{query}\n");

    let mut sent = 0;
    while sent < lines && stream.write_all(line.as_bytes()).is_ok() {
        sent += 1;
    }
    (stream, sent)
}

#[test]
fn test_client_that_never_reads_does_not_stall_others() {
    let handle = start_server(ServerConfig {
        worker_threads: 1,
        outbox_capacity: 8,
        write_timeout_ms: 500,
        ..server_config()
    });
    let polite = connect(&handle);
    let (subscriber, packets) = ChannelSubscriber::new();
    polite.add_packet_subscriber(subscriber);

    let address = handle.local_addr();
    let (flooder, sent) = thread::spawn(move || flood_without_reading(address, 200_000))
        .join()
        .unwrap();
    assert!(sent > 0);

    polite
        .send_message(&Message::with_payload(MessageKind::TileQuery, &TileQuery { layer: 0, x: 2, y: 2 }).unwrap())
        .unwrap();
    let reply = packets
        .recv_timeout(Duration::from_secs(30))
        .expect("reply while another client ignores its replies");
    assert_eq!(reply.kind(), MessageKind::TileQueryResult);
    assert!(handle.executed_requests() > 1);

    drop(flooder);
    polite.disconnect();
    handle.shutdown();
}

#[test]
fn test_invalid_arguments_produce_failure_reply() {
    let handle = start_server(server_config());
    let connection = connect(&handle);
    let (subscriber, packets) = ChannelSubscriber::new();
    connection.add_packet_subscriber(subscriber);

    connection
        .send_message(&Message::new(MessageKind::TileQuery, r#"{"layer":"top"}"#))
        .unwrap();
    let reply = packets.recv_timeout(WAIT).unwrap();
    assert_eq!(reply.kind(), MessageKind::TileQueryResult);
    let payload: serde_json::Value = reply.payload().unwrap();
    assert_eq!(payload["result"], serde_json::json!(false));

    handle.shutdown();
}

#[test]
fn test_unhandled_kind_still_answers() {
    let handle = start_server(ServerConfig {
        handlers: vec!["protocol_version".to_string()],
        ..server_config()
    });
    let connection = connect(&handle);
    let (subscriber, packets) = ChannelSubscriber::new();
    connection.add_packet_subscriber(subscriber);

    connection
        .send_message(&Message::new(MessageKind::TileQuery, r#"{"layer":0,"x":0,"y":0}"#))
        .unwrap();
    let reply: serde_json::Value = packets.recv_timeout(WAIT).unwrap().payload().unwrap();
    assert_eq!(reply["result"], serde_json::json!(false));

    handle.shutdown();
}

#[test]
fn test_tick_thread_drains_world_events() {
    let handle = start_server(ServerConfig {
        tick_interval_ms: 10,
        ..server_config()
    });
    let connection = connect(&handle);
    let (subscriber, packets) = ChannelSubscriber::new();
    connection.add_packet_subscriber(subscriber);

    connection.connect("toad", "pw").unwrap();
    packets.recv_timeout(WAIT).unwrap();

    let stats = handle.stats();
    assert!(wait_until(|| stats.players() == 1));
    handle.shutdown();
}

#[test]
fn test_connection_limit() {
    let handle = start_server(ServerConfig {
        max_connections: 1,
        ..server_config()
    });
    let first = connect(&handle);
    assert!(wait_until(|| handle.active_connections() == 1));

    let second = Connection::new(ConnectionConfig {
        dial_retries: 0,
        ..client_config()
    });
    assert!(second.start("127.0.0.1", handle.local_addr().port()).is_err());
    assert!(!second.is_running());
    assert!(first.is_connected());

    first.disconnect();
    assert!(wait_until(|| handle.active_connections() == 0));
    let third = connect(&handle);
    assert!(third.is_running());

    handle.shutdown();
}

#[test]
fn test_shutdown_closes_client_connections() {
    let handle = start_server(server_config());
    let connection = connect(&handle);
    assert!(wait_until(|| handle.active_connections() == 1));

    handle.shutdown();
    assert!(wait_until(|| !connection.is_running()));
}

#[test]
fn test_wait_returns_after_external_trigger() {
    let handle = start_server(server_config());
    let signal = handle.shutdown_signal();
    let waiter = thread::spawn(move || handle.wait());

    thread::sleep(Duration::from_millis(30));
    signal.trigger();
    waiter.join().unwrap();
}

#[test]
fn test_handshake_reply_payload() {
    // Raw socket check of the handshake reply produced by the pool.
    use std::io::{BufRead, BufReader};

    let handle = start_server(server_config());
    let mut stream = std::net::TcpStream::connect(handle.local_addr()).unwrap();
    stream.set_read_timeout(Some(WAIT)).unwrap();
    stream
        .write_all(b"{\"kind\":\"PROTOCOL_VERSION\",\"payload\":\"{\\\"version\\\":\\\"v0.0.0.1\\\"}\"}\n")
        .unwrap();

    let mut line = String::new();
    BufReader::new(stream).read_line(&mut line).unwrap();
    let reply = JsonCodec.decode(&line).unwrap();
    assert_eq!(reply.kind(), MessageKind::ProtocolVersionResult);
    let verdict: VersionHandshakeResult = reply.payload().unwrap();
    assert!(verdict.result);

    handle.shutdown();
}

#[test]
fn test_bad_handler_configuration_fails_fast() {
    let result = GameServer::new(ServerConfig {
        handlers: vec!["connect".to_string(), "weather".to_string()],
        ..server_config()
    });
    assert!(matches!(
        result,
        Err(ServerError::Plugin(PluginError::UnknownHandler(name))) if name == "weather"
    ));
}
