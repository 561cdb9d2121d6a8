//! End-to-end invocation cycles with scripted applications.

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use tether_core::channel::{EventReceiver, EventSender};
use tether_core::errors::AppError;
use tether_core::events::{FrameData, ProtocolEvent};
use tether_core::ids::ConnectionId;
use tether_core::types::{ConnectionRequest, ConnectionScope, InvocationKind};
use tether_core::WsApplication;
use tether_runtime::{CycleConfig, LifecycleState, WsCycle};
use tether_store::{ConnectionStore, MemoryStore};

fn request(kind: InvocationKind) -> ConnectionRequest {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    ConnectionRequest::new(kind, ConnectionId::from("conn-1"), ConnectionScope::new("/ws"))
}

/// Accepts the handshake, then parks on a second receive the way a
/// long-lived application loop would.
struct Acceptor {
    subprotocol: Option<String>,
}

#[async_trait]
impl WsApplication for Acceptor {
    async fn call(
        &self,
        _scope: ConnectionScope,
        mut events: EventReceiver,
        emitter: EventSender,
    ) -> Result<(), AppError> {
        match events.recv().await {
            Some(ProtocolEvent::Connect) => {}
            Some(other) => return Err(AppError::unexpected(&other)),
            None => return Err(AppError::closed(1006)),
        }
        emitter
            .send(ProtocolEvent::Accept {
                subprotocol: self.subprotocol.clone(),
                headers: Vec::new(),
            })
            .map_err(|_| AppError::closed(1006))?;

        // A persistent-protocol application would keep serving here; in
        // this adapter the next frame arrives as a fresh invocation.
        let _ = events.recv().await;
        Ok(())
    }
}

/// Rejects the handshake with a close.
struct Rejector;

#[async_trait]
impl WsApplication for Rejector {
    async fn call(
        &self,
        _scope: ConnectionScope,
        mut events: EventReceiver,
        emitter: EventSender,
    ) -> Result<(), AppError> {
        let _ = events.recv().await;
        emitter
            .send(ProtocolEvent::close(4403))
            .map_err(|_| AppError::closed(1006))?;
        Ok(())
    }
}

/// Records every inbound event, then completes.
struct Recorder {
    seen: Arc<Mutex<Vec<ProtocolEvent>>>,
}

#[async_trait]
impl WsApplication for Recorder {
    async fn call(
        &self,
        _scope: ConnectionScope,
        mut events: EventReceiver,
        _emitter: EventSender,
    ) -> Result<(), AppError> {
        if let Some(event) = events.recv().await {
            self.seen.lock().push(event);
        }
        Ok(())
    }
}

/// Echoes the received frame back `times` times, then completes.
struct Echo {
    times: usize,
}

#[async_trait]
impl WsApplication for Echo {
    async fn call(
        &self,
        _scope: ConnectionScope,
        mut events: EventReceiver,
        emitter: EventSender,
    ) -> Result<(), AppError> {
        let Some(ProtocolEvent::Receive { data }) = events.recv().await else {
            return Err(AppError::closed(1006));
        };
        for i in 0..self.times {
            let frame = match &data {
                FrameData::Text(text) => ProtocolEvent::send_text(format!("{i}:{text}")),
                FrameData::Binary(bytes) => ProtocolEvent::send_binary(bytes.clone()),
            };
            emitter.send(frame).map_err(|_| AppError::closed(1006))?;
        }
        Ok(())
    }
}

/// Closes mid-message instead of answering.
struct Slammer;

#[async_trait]
impl WsApplication for Slammer {
    async fn call(
        &self,
        _scope: ConnectionScope,
        mut events: EventReceiver,
        emitter: EventSender,
    ) -> Result<(), AppError> {
        let _ = events.recv().await;
        emitter
            .send(ProtocolEvent::close(1011))
            .map_err(|_| AppError::closed(1006))?;
        Ok(())
    }
}

/// Reports whatever it receives as unexpected.
struct Confused;

#[async_trait]
impl WsApplication for Confused {
    async fn call(
        &self,
        _scope: ConnectionScope,
        mut events: EventReceiver,
        _emitter: EventSender,
    ) -> Result<(), AppError> {
        match events.recv().await {
            Some(event) => Err(AppError::unexpected(&event)),
            None => Err(AppError::closed(1006)),
        }
    }
}

/// Fails with an opaque error.
struct Faulty;

#[async_trait]
impl WsApplication for Faulty {
    async fn call(
        &self,
        _scope: ConnectionScope,
        _events: EventReceiver,
        _emitter: EventSender,
    ) -> Result<(), AppError> {
        Err(AppError::from(anyhow::anyhow!("boom")))
    }
}

/// Consumes the injected event and then waits for a second one that will
/// never arrive within the invocation.
struct Greedy;

#[async_trait]
impl WsApplication for Greedy {
    async fn call(
        &self,
        _scope: ConnectionScope,
        mut events: EventReceiver,
        _emitter: EventSender,
    ) -> Result<(), AppError> {
        let _ = events.recv().await;
        let _ = events.recv().await;
        Ok(())
    }
}

/// Acknowledges a disconnect with a close frame.
struct Polite;

#[async_trait]
impl WsApplication for Polite {
    async fn call(
        &self,
        _scope: ConnectionScope,
        mut events: EventReceiver,
        emitter: EventSender,
    ) -> Result<(), AppError> {
        match events.recv().await {
            Some(ProtocolEvent::Disconnect { code }) => {
                emitter
                    .send(ProtocolEvent::close(code))
                    .map_err(|_| AppError::closed(1006))?;
                Ok(())
            }
            Some(other) => Err(AppError::unexpected(&other)),
            None => Err(AppError::closed(1006)),
        }
    }
}

/// Sends a data frame during the handshake, which no phase allows.
struct EagerSender;

#[async_trait]
impl WsApplication for EagerSender {
    async fn call(
        &self,
        _scope: ConnectionScope,
        mut events: EventReceiver,
        emitter: EventSender,
    ) -> Result<(), AppError> {
        let _ = events.recv().await;
        emitter
            .send(ProtocolEvent::send_text("too soon"))
            .map_err(|_| AppError::closed(1006))?;
        let _ = events.recv().await;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Connect
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn accepted_connect_is_200_and_stays_in_handshake() {
    let mut cycle = WsCycle::new(request(InvocationKind::Connect));
    let result = cycle.run(&Acceptor { subprotocol: None }, Bytes::new()).await;

    assert_eq!(result.status, 200);
    assert!(result.body.is_empty());
    assert_eq!(cycle.state(), LifecycleState::Handshake);
    assert!(!cycle.invocation_id().as_str().is_empty());
}

#[tokio::test]
async fn rejected_connect_is_403_and_closed() {
    let mut cycle = WsCycle::new(request(InvocationKind::Connect));
    let result = cycle.run(&Rejector, Bytes::new()).await;

    assert_eq!(result.status, 403);
    assert_eq!(cycle.state(), LifecycleState::Closed);
}

#[tokio::test]
async fn accepted_subprotocol_becomes_a_response_header() {
    let mut cycle = WsCycle::new(request(InvocationKind::Connect));
    let app = Acceptor {
        subprotocol: Some("chat.v2".to_owned()),
    };
    let result = cycle.run(&app, Bytes::new()).await;

    assert_eq!(result.status, 200);
    assert_eq!(
        result.headers,
        vec![("sec-websocket-protocol".to_owned(), "chat.v2".to_owned())]
    );
}

#[tokio::test]
async fn data_frame_during_handshake_is_a_protocol_violation() {
    let mut cycle = WsCycle::new(request(InvocationKind::Connect));
    let result = cycle.run(&EagerSender, Bytes::new()).await;

    assert_eq!(result.status, 500);
}

// ─────────────────────────────────────────────────────────────────────────────
// Message
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn first_event_is_receive_with_the_exact_body() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let app = Recorder { seen: seen.clone() };

    let mut cycle = WsCycle::new(request(InvocationKind::Message));
    let result = cycle.run(&app, Bytes::from_static(b"hello frame")).await;

    assert_eq!(result.status, 200);
    let seen = seen.lock();
    assert_eq!(seen.len(), 1);
    assert_matches!(&seen[0], ProtocolEvent::Receive { data } => {
        assert_eq!(data.as_bytes(), b"hello frame");
        assert!(data.is_text());
    });
}

#[tokio::test]
async fn non_utf8_body_arrives_as_a_binary_frame() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let app = Recorder { seen: seen.clone() };
    let body = Bytes::from_static(&[0xff, 0xfe, 0x00, 0x7f]);

    let mut cycle = WsCycle::new(request(InvocationKind::Message));
    let result = cycle.run(&app, body.clone()).await;

    assert_eq!(result.status, 200);
    let seen = seen.lock();
    assert_eq!(
        seen[0],
        ProtocolEvent::Receive {
            data: FrameData::Binary(body),
        }
    );
}

#[tokio::test]
async fn sends_are_captured_in_emission_order() {
    let mut cycle = WsCycle::new(request(InvocationKind::Message));
    let result = cycle.run(&Echo { times: 4 }, Bytes::from_static(b"ping")).await;

    assert_eq!(result.status, 200);
    assert_eq!(cycle.state(), LifecycleState::Response);
    let sent: Vec<_> = cycle.sent_events().to_vec();
    assert_eq!(
        sent,
        vec![
            ProtocolEvent::send_text("0:ping"),
            ProtocolEvent::send_text("1:ping"),
            ProtocolEvent::send_text("2:ping"),
            ProtocolEvent::send_text("3:ping"),
        ]
    );
}

#[tokio::test]
async fn message_body_is_empty_unless_echo_is_configured() {
    let mut cycle = WsCycle::new(request(InvocationKind::Message));
    let result = cycle.run(&Echo { times: 2 }, Bytes::from_static(b"x")).await;
    assert!(result.body.is_empty());
}

#[tokio::test]
async fn echo_frames_copies_captured_bytes_into_the_body() {
    let config = CycleConfig {
        echo_frames: true,
        ..CycleConfig::default()
    };
    let mut cycle = WsCycle::new(request(InvocationKind::Message)).with_config(config);
    let result = cycle.run(&Echo { times: 2 }, Bytes::from_static(b"hi")).await;

    assert_eq!(result.status, 200);
    assert_eq!(result.body, Bytes::from_static(b"0:hi1:hi"));
}

#[tokio::test]
async fn premature_close_is_403() {
    let mut cycle = WsCycle::new(request(InvocationKind::Message));
    let result = cycle.run(&Slammer, Bytes::from_static(b"data")).await;

    assert_eq!(result.status, 403);
    assert_eq!(cycle.state(), LifecycleState::Closed);
}

// ─────────────────────────────────────────────────────────────────────────────
// Failure mapping
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn unexpected_event_is_500_for_every_invocation_kind() {
    for kind in [
        InvocationKind::Connect,
        InvocationKind::Message,
        InvocationKind::Disconnect,
    ] {
        let mut cycle = WsCycle::new(request(kind));
        let result = cycle.run(&Confused, Bytes::new()).await;
        assert_eq!(result.status, 500, "kind {kind}");
    }
}

#[tokio::test]
async fn application_fault_is_500_with_an_empty_body() {
    let mut cycle = WsCycle::new(request(InvocationKind::Message));
    let result = cycle.run(&Faulty, Bytes::from_static(b"data")).await;

    assert_eq!(result.status, 500);
    // Failure details are logged, never serialized to the transport.
    assert!(result.body.is_empty());
}

#[tokio::test(start_paused = true)]
async fn deadline_cuts_off_a_second_receive() {
    let config = CycleConfig::with_deadline(Duration::from_secs(30));
    let mut cycle = WsCycle::new(request(InvocationKind::Message)).with_config(config);

    let result = cycle.run(&Greedy, Bytes::from_static(b"one frame")).await;
    assert_eq!(result.status, 500);
}

// ─────────────────────────────────────────────────────────────────────────────
// Disconnect
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn disconnect_is_200_and_closed() {
    let mut cycle = WsCycle::new(request(InvocationKind::Disconnect));
    let result = cycle.run(&Polite, Bytes::new()).await;

    assert_eq!(result.status, 200);
    assert_eq!(cycle.state(), LifecycleState::Closed);
}

// ─────────────────────────────────────────────────────────────────────────────
// Connection store
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn accept_records_the_connection_and_disconnect_forgets_it() {
    let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
    let id = ConnectionId::from("conn-1");

    // Invocation 1: handshake.
    let mut cycle =
        WsCycle::new(request(InvocationKind::Connect)).with_store(store.clone());
    let result = cycle.run(&Acceptor { subprotocol: None }, Bytes::new()).await;
    assert_eq!(result.status, 200);

    let record = store.get(&id).await.unwrap().expect("connection recorded");
    assert_eq!(record.scope.path, "/ws");
    assert_eq!(store.count().await.unwrap(), 1);

    // Invocation 2: data frame, connection stays tracked.
    let mut cycle =
        WsCycle::new(request(InvocationKind::Message)).with_store(store.clone());
    let result = cycle.run(&Echo { times: 1 }, Bytes::from_static(b"ping")).await;
    assert_eq!(result.status, 200);
    assert_eq!(store.count().await.unwrap(), 1);

    // Invocation 3: teardown.
    let mut cycle =
        WsCycle::new(request(InvocationKind::Disconnect)).with_store(store.clone());
    let result = cycle.run(&Polite, Bytes::new()).await;
    assert_eq!(result.status, 200);
    assert_eq!(store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn rejection_leaves_nothing_in_the_store() {
    let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
    let mut cycle =
        WsCycle::new(request(InvocationKind::Connect)).with_store(store.clone());
    let result = cycle.run(&Rejector, Bytes::new()).await;

    assert_eq!(result.status, 403);
    assert_eq!(store.count().await.unwrap(), 0);
}
