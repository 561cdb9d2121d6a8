//! Per-invocation lifecycle controller.
//!
//! One [`WsCycle`] adapts a single gateway invocation — connect, message,
//! or disconnect — to the persistent-connection protocol the application
//! expects. It synthesizes the one inbound event the invocation carries,
//! runs the application future cooperatively in the same task, captures
//! outbound events in emission order, and folds everything into a single
//! [`CycleResult`]. Failures become status codes; nothing propagates past
//! the controller boundary.

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, error, instrument, warn};

use tether_core::channel::{EventReceiver, channel};
use tether_core::errors::AppError;
use tether_core::events::{FrameData, ProtocolEvent};
use tether_core::ids::InvocationId;
use tether_core::types::{ConnectionRequest, CycleResult, InvocationKind};
use tether_core::WsApplication;
use tether_store::{ConnectionRecord, ConnectionStore};

use crate::config::CycleConfig;
use crate::state::LifecycleState;

/// Close code used for synthesized disconnect events (normal closure).
const DISCONNECT_CODE: u16 = 1000;

/// How one outbound event affects the wait loop.
enum Flow {
    /// Keep driving the application.
    Continue,
    /// The invocation result is settled; stop driving the application.
    Settled,
}

/// Drives one application invocation through the connection lifecycle.
///
/// A controller instance is built per invocation and discarded with it;
/// the only state that survives is the transport-owned connection
/// identifier and whatever the injected [`ConnectionStore`] persists.
pub struct WsCycle {
    request: ConnectionRequest,
    config: CycleConfig,
    store: Option<Arc<dyn ConnectionStore>>,
    invocation_id: InvocationId,
    state: LifecycleState,
    result: CycleResult,
    sent: Vec<ProtocolEvent>,
}

impl WsCycle {
    /// Create a controller for one gateway invocation.
    #[must_use]
    pub fn new(request: ConnectionRequest) -> Self {
        let state = match request.kind {
            InvocationKind::Connect => LifecycleState::Connecting,
            InvocationKind::Message => LifecycleState::Response,
            InvocationKind::Disconnect => LifecycleState::Disconnecting,
        };
        Self {
            request,
            config: CycleConfig::default(),
            store: None,
            invocation_id: InvocationId::generate(),
            state,
            result: CycleResult::ok(),
            sent: Vec::new(),
        }
    }

    /// Replace the default configuration.
    #[must_use]
    pub fn with_config(mut self, config: CycleConfig) -> Self {
        self.config = config;
        self
    }

    /// Inject the connection-tracking store.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn ConnectionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Identifier correlating this invocation's log spans.
    #[must_use]
    pub fn invocation_id(&self) -> &InvocationId {
        &self.invocation_id
    }

    /// Outbound events captured so far, in emission order.
    #[must_use]
    pub fn sent_events(&self) -> &[ProtocolEvent] {
        &self.sent
    }

    /// Run the application for this invocation and produce the result.
    ///
    /// The controller synthesizes exactly one inbound event matching the
    /// invocation kind and enqueues it before the application future is
    /// first polled, so an application that receives before sending is
    /// guaranteed to observe it first. The wait ends when the application
    /// completes or a terminal outbound event settles the result; an
    /// application that never does either is cut off by
    /// [`CycleConfig::deadline`] when one is set, and otherwise waits
    /// unboundedly — the host environment must enforce its own budget.
    #[instrument(skip_all, fields(
        invocation = %self.invocation_id,
        connection = %self.request.connection_id,
        kind = %self.request.kind,
    ))]
    pub async fn run<A>(&mut self, app: &A, initial_body: Bytes) -> CycleResult
    where
        A: WsApplication + ?Sized,
    {
        debug!(state = %self.state, "cycle starting");

        let (in_tx, in_rx) = channel();
        let (out_tx, mut out_rx) = channel();

        // Receiver stays live until run returns; the send cannot fail.
        let _ = in_tx.send(self.initial_event(initial_body));
        if self.request.kind == InvocationKind::Connect {
            self.advance(LifecycleState::Handshake);
        }

        // Hold a second inbound sender for the whole invocation: a receive
        // beyond the injected event must suspend, not observe a closed
        // channel. Each invocation is one discrete frame, not a session.
        let _inbound = in_tx;

        let mut app_fut = app.call(self.request.scope.clone(), in_rx, out_tx);

        let waited = match self.config.deadline {
            Some(deadline) => {
                tokio::time::timeout(deadline, self.drive(&mut app_fut, &mut out_rx)).await
            }
            None => {
                self.drive(&mut app_fut, &mut out_rx).await;
                Ok(())
            }
        };
        if waited.is_err() {
            warn!(deadline = ?self.config.deadline, "application did not settle within the host deadline");
            self.result = CycleResult::server_error();
        }

        if self.config.echo_frames && self.result.status == 200 {
            self.result.body = self.frame_body();
        }

        debug!(status = self.result.status, state = %self.state, "cycle finished");
        self.result.clone()
    }

    /// Drive the application until it completes or the result settles.
    async fn drive<F>(&mut self, app_fut: &mut F, out_rx: &mut EventReceiver)
    where
        F: Future<Output = Result<(), AppError>> + Unpin,
    {
        let mut outbound_open = true;
        loop {
            tokio::select! {
                biased;
                maybe = out_rx.recv(), if outbound_open => {
                    match maybe {
                        Some(event) => {
                            if matches!(self.handle_outbound(event).await, Flow::Settled) {
                                return;
                            }
                        }
                        None => outbound_open = false,
                    }
                }
                exit = &mut *app_fut => {
                    // Events emitted before completion are still queued;
                    // interpret them in order until the result settles.
                    while let Some(event) = out_rx.try_recv() {
                        if matches!(self.handle_outbound(event).await, Flow::Settled) {
                            break;
                        }
                    }
                    self.settle_exit(exit).await;
                    return;
                }
            }
        }
    }

    /// The single inbound event this invocation carries.
    fn initial_event(&self, initial_body: Bytes) -> ProtocolEvent {
        match self.request.kind {
            InvocationKind::Connect => ProtocolEvent::Connect,
            InvocationKind::Message => ProtocolEvent::Receive {
                data: FrameData::from_bytes(initial_body),
            },
            InvocationKind::Disconnect => ProtocolEvent::Disconnect {
                code: DISCONNECT_CODE,
            },
        }
    }

    /// Interpret one application-emitted event against the current state.
    async fn handle_outbound(&mut self, event: ProtocolEvent) -> Flow {
        debug!(event = event.event_type(), state = %self.state, "outbound event");
        self.sent.push(event.clone());

        match (self.state, event) {
            (LifecycleState::Handshake, ProtocolEvent::Accept { subprotocol, headers }) => {
                self.result = CycleResult::ok();
                if let Some(subprotocol) = subprotocol {
                    self.result
                        .headers
                        .push(("sec-websocket-protocol".to_owned(), subprotocol));
                }
                self.result.headers.extend(headers);
                self.record_connection().await;
                Flow::Settled
            }
            (LifecycleState::Handshake, ProtocolEvent::Close { code, .. }) => {
                debug!(code, "handshake rejected");
                self.result = CycleResult::forbidden();
                self.advance(LifecycleState::Closed);
                Flow::Settled
            }
            (LifecycleState::Response, ProtocolEvent::Send { .. }) => Flow::Continue,
            (LifecycleState::Response, ProtocolEvent::Close { code, .. }) => {
                warn!(code, "connection closed before the message turn finished");
                self.result = CycleResult::forbidden();
                self.advance(LifecycleState::Closed);
                self.forget_connection().await;
                Flow::Settled
            }
            (LifecycleState::Disconnecting, ProtocolEvent::Close { .. }) => {
                self.advance(LifecycleState::Closed);
                Flow::Continue
            }
            (state, event) => {
                warn!(event = event.event_type(), %state, "protocol violation");
                self.result = CycleResult::server_error();
                Flow::Settled
            }
        }
    }

    /// Map the application's exit onto the invocation result.
    async fn settle_exit(&mut self, exit: Result<(), AppError>) {
        match exit {
            Ok(()) => {
                debug!(status = self.result.status, "application completed");
                if self.request.kind == InvocationKind::Disconnect {
                    self.advance(LifecycleState::Closed);
                    self.forget_connection().await;
                }
            }
            Err(err) => {
                match &err {
                    AppError::Fault(cause) => error!(error = ?cause, "application fault"),
                    AppError::Closed { .. } | AppError::UnexpectedEvent { .. } => {
                        warn!(kind = err.kind(), "application signalled: {err}");
                    }
                }
                self.result = CycleResult::from_status(err.status());
                if matches!(err, AppError::Closed { .. }) {
                    self.advance(LifecycleState::Closed);
                    self.forget_connection().await;
                }
            }
        }
    }

    /// Advance the state machine; transitions never move backward.
    fn advance(&mut self, next: LifecycleState) {
        if self.state.can_advance_to(next) {
            debug!(from = %self.state, to = %next, "state transition");
            self.state = next;
        }
    }

    /// Concatenated payload bytes of all captured `send` frames.
    fn frame_body(&self) -> Bytes {
        let mut body = Vec::new();
        for event in &self.sent {
            if let ProtocolEvent::Send { data } = event {
                body.extend_from_slice(data.as_bytes());
            }
        }
        Bytes::from(body)
    }

    /// Record the accepted connection in the injected store.
    async fn record_connection(&self) {
        let Some(store) = &self.store else { return };
        let record = ConnectionRecord::new(self.request.scope.clone());
        if let Err(err) = store.put(&self.request.connection_id, record).await {
            warn!(error = %err, "failed to record connection");
        }
    }

    /// Drop the connection from the injected store.
    async fn forget_connection(&self) {
        let Some(store) = &self.store else { return };
        match store.remove(&self.request.connection_id).await {
            Ok(existed) => debug!(existed, "connection forgotten"),
            Err(err) => warn!(error = %err, "failed to forget connection"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
