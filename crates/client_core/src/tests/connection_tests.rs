use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use super::*;
use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use shared::domain::{ActuatorCommand, Mode};
use tokio::{
    net::TcpListener,
    sync::{broadcast, mpsc::UnboundedReceiver},
    time::timeout,
};

#[derive(Clone)]
struct PushServer {
    frames: broadcast::Sender<String>,
    received: mpsc::UnboundedSender<String>,
    opened: mpsc::UnboundedSender<()>,
    connections: Arc<AtomicUsize>,
    close_immediately: bool,
}

struct PushHarness {
    server_url: String,
    frames: broadcast::Sender<String>,
    received: UnboundedReceiver<String>,
    opened: UnboundedReceiver<()>,
    connections: Arc<AtomicUsize>,
}

async fn ws_route(ws: WebSocketUpgrade, State(server): State<PushServer>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| push_connection(server, socket))
}

async fn push_connection(server: PushServer, socket: WebSocket) {
    server.connections.fetch_add(1, Ordering::SeqCst);
    let (mut sender, mut receiver) = socket.split();
    if server.close_immediately {
        let _ = sender.send(WsMessage::Close(None)).await;
        return;
    }

    let mut frames = server.frames.subscribe();
    let _ = server.opened.send(());
    let send_task = tokio::spawn(async move {
        while let Ok(text) = frames.recv().await {
            if sender.send(WsMessage::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = receiver.next().await {
        if let WsMessage::Text(text) = msg {
            let _ = server.received.send(text);
        }
    }
    send_task.abort();
}

async fn spawn_push_server(close_immediately: bool) -> anyhow::Result<PushHarness> {
    let (frames, _) = broadcast::channel(16);
    let (received_tx, received) = mpsc::unbounded_channel();
    let (opened_tx, opened) = mpsc::unbounded_channel();
    let connections = Arc::new(AtomicUsize::new(0));
    let server = PushServer {
        frames: frames.clone(),
        received: received_tx,
        opened: opened_tx,
        connections: Arc::clone(&connections),
        close_immediately,
    };

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = Router::new().route("/ws", get(ws_route)).with_state(server);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok(PushHarness {
        server_url: format!("http://{addr}"),
        frames,
        received,
        opened,
        connections,
    })
}

async fn recv_within<T>(rx: &mut UnboundedReceiver<T>) -> T {
    timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out")
        .expect("channel closed")
}

#[test]
fn websocket_url_follows_server_scheme() {
    assert_eq!(
        websocket_url("http://localhost:5000").expect("url"),
        "ws://localhost:5000/ws"
    );
    assert_eq!(
        websocket_url("https://greenhouse.example/dash/").expect("url"),
        "wss://greenhouse.example/dash/ws"
    );
    assert!(matches!(
        websocket_url("ftp://localhost"),
        Err(ConnectionError::UnsupportedScheme(_))
    ));
    assert!(matches!(
        websocket_url("localhost:5000"),
        Err(ConnectionError::UnsupportedScheme(_)) | Err(ConnectionError::InvalidUrl { .. })
    ));
}

#[tokio::test]
async fn handlers_run_in_registration_order_and_unknown_events_are_ignored() {
    let mut harness = spawn_push_server(false).await.expect("server");
    let manager = ConnectionManager::new(&harness.server_url).expect("manager");

    let (seen_tx, mut seen) = mpsc::unbounded_channel::<String>();
    let first = seen_tx.clone();
    manager.on(InboundKind::SensorDataUpdate, move |event| {
        if let InboundEvent::SensorDataUpdate(reading) = event {
            let _ = first.send(format!("first:{:?}", reading.temperature));
        }
    });
    let second = seen_tx.clone();
    manager.on(InboundKind::SensorDataUpdate, move |_| {
        let _ = second.send("second".to_string());
    });
    let pump = seen_tx;
    manager.on(InboundKind::PumpStatusUpdate, move |event| {
        if let InboundEvent::PumpStatusUpdate { status } = event {
            let _ = pump.send(format!("pump:{status}"));
        }
    });

    manager.connect().await.expect("connect");
    recv_within(&mut harness.opened).await;

    for frame in [
        r#"{"event":"weather_report","data":{"sky":"clear"}}"#,
        "not json at all",
        r#"{"event":"sensor_data_update","data":{"temperature":21.5}}"#,
        r#"{"event":"pump_status_update","data":{"status":"ON"}}"#,
    ] {
        harness.frames.send(frame.to_string()).expect("broadcast");
    }

    assert_eq!(recv_within(&mut seen).await, "first:Some(21.5)");
    assert_eq!(recv_within(&mut seen).await, "second");
    assert_eq!(recv_within(&mut seen).await, "pump:ON");
}

#[tokio::test]
async fn emit_reaches_server_as_named_frame() {
    let mut harness = spawn_push_server(false).await.expect("server");
    let manager = ConnectionManager::new(&harness.server_url).expect("manager");
    manager.connect().await.expect("connect");
    recv_within(&mut harness.opened).await;

    manager.emit(OutboundCommand::SetMode { mode: Mode::Manual });
    CommandSink::emit(
        &manager,
        OutboundCommand::SendCommand {
            command: ActuatorCommand::PumpOn,
        },
    );

    let first: serde_json::Value =
        serde_json::from_str(&recv_within(&mut harness.received).await).expect("json");
    assert_eq!(first["event"], "set_mode");
    assert_eq!(first["data"]["mode"], "MANUAL");

    let second: serde_json::Value =
        serde_json::from_str(&recv_within(&mut harness.received).await).expect("json");
    assert_eq!(second["event"], "send_command");
    assert_eq!(second["data"]["command"], "PUMP_ON");
}

#[tokio::test]
async fn connect_is_idempotent() {
    let mut harness = spawn_push_server(false).await.expect("server");
    let manager = ConnectionManager::new(&harness.server_url).expect("manager");

    manager.connect().await.expect("connect");
    manager.connect().await.expect("second connect");
    recv_within(&mut harness.opened).await;

    assert!(manager.is_connected());
    assert!(
        timeout(Duration::from_millis(200), harness.opened.recv())
            .await
            .is_err(),
        "second socket was opened"
    );
    assert_eq!(harness.connections.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn emit_while_disconnected_is_dropped() {
    let manager = ConnectionManager::new("http://127.0.0.1:9").expect("manager");

    manager.emit(OutboundCommand::SetMode { mode: Mode::Auto });

    assert!(!manager.is_connected());
}

#[tokio::test]
async fn connect_failure_leaves_manager_disconnected() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    let manager = ConnectionManager::new(&format!("http://{addr}")).expect("manager");

    assert!(manager.connect().await.is_err());
    assert!(!manager.is_connected());
}

/// Accepts TCP connections and never answers the websocket upgrade.
async fn spawn_silent_server() -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&accepted);
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            held.push(socket);
        }
    });
    (format!("http://{addr}"), accepted)
}

#[tokio::test]
async fn stalled_handshake_times_out_and_allows_retry() {
    let (server_url, accepted) = spawn_silent_server().await;
    let manager = ConnectionManager::new(&server_url)
        .expect("manager")
        .with_connect_timeout(Duration::from_millis(200));

    let err = manager.connect().await.expect_err("handshake never completes");
    assert!(err.to_string().contains("timed out"), "{err:#}");
    assert!(!manager.is_connected());

    // A stuck `Connecting` link would turn this into an immediate Ok.
    assert!(manager.connect().await.is_err());
    assert_eq!(accepted.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn dropped_connect_future_leaves_manager_reconnectable() {
    let (server_url, accepted) = spawn_silent_server().await;
    let manager = ConnectionManager::new(&server_url).expect("manager");

    let first = timeout(Duration::from_millis(200), manager.connect()).await;
    assert!(first.is_err(), "connect should still be pending");
    assert!(!manager.is_connected());

    let second = timeout(Duration::from_millis(200), manager.connect()).await;
    assert!(second.is_err(), "a fresh handshake should be in flight");
    assert_eq!(accepted.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn server_close_is_detected() {
    let harness = spawn_push_server(true).await.expect("server");
    let manager = ConnectionManager::new(&harness.server_url).expect("manager");
    manager.connect().await.expect("connect");

    timeout(Duration::from_secs(5), async {
        while manager.is_connected() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("disconnect not observed");

    manager.emit(OutboundCommand::SetMode { mode: Mode::Auto });
}

#[tokio::test]
async fn disconnect_then_reconnect_opens_a_new_socket() {
    let mut harness = spawn_push_server(false).await.expect("server");
    let manager = ConnectionManager::new(&harness.server_url).expect("manager");

    manager.connect().await.expect("connect");
    recv_within(&mut harness.opened).await;
    manager.disconnect();
    assert!(!manager.is_connected());

    manager.connect().await.expect("reconnect");
    recv_within(&mut harness.opened).await;
    assert!(manager.is_connected());
    assert_eq!(harness.connections.load(Ordering::SeqCst), 2);

    manager.emit(OutboundCommand::SendCommand {
        command: ActuatorCommand::LightOn,
    });
    let frame: serde_json::Value =
        serde_json::from_str(&recv_within(&mut harness.received).await).expect("json");
    assert_eq!(frame["data"]["command"], "LIGHT_ON");
}
