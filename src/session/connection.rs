//! Connection actor.
//!
//! Each session runs one actor task that owns the transport, the reconnect
//! counter and the pending-request token. The [`Session`](super::Session)
//! handle talks to it over a command channel; the actor reports back over
//! the event channel and publishes its state on a watch channel.
//!
//! # Event Loop
//!
//! The actor is a loop over phases. Every suspension point (handshake,
//! open channel, reconnect delay) is `select!`-ed against the command
//! channel, so close, reconnect and detach take effect immediately.
//!
//! # Pending Request
//!
//! At most one request is pending. A newer request supersedes the pending
//! one; replies are matched by `request_id`, or by selector when the server
//! does not echo ids.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep, timeout};
use tracing::{debug, info, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::{ConfigId, RequestSeq};
use crate::protocol::{ClientMessage, ServerMessage, decode_server, encode_client};
use crate::transport::{Connector, FrameSink, Transport};

use super::event::SessionEvent;
use super::options::ConnectionOptions;
use super::state::ConnectionState;

// ============================================================================
// Types
// ============================================================================

/// Snapshot of the connection state and reconnect counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    /// Current state.
    pub state: ConnectionState,
    /// Reconnect attempt counter.
    pub attempt: u32,
}

impl Status {
    pub(crate) const INITIAL: Self = Self {
        state: ConnectionState::Connecting,
        attempt: 0,
    };
}

/// Commands from the session handle.
pub(crate) enum Command {
    /// Send a request; it becomes the pending one.
    Send {
        seq: RequestSeq,
        message: ClientMessage,
    },
    /// A request was refused while not open; start connecting if idle.
    Kick,
    /// Manual reconnect.
    Reconnect,
    /// Close the channel.
    Close,
    /// Stop the actor.
    Shutdown,
}

enum Phase {
    Connecting,
    Open(Transport),
    Reconnecting,
    Idle,
    Stopped,
}

/// The single outstanding request.
struct Pending {
    seq: RequestSeq,
    /// Evaluated selector; `None` for `analyze_page`.
    selector: Option<String>,
}

impl Pending {
    fn of(seq: RequestSeq, message: &ClientMessage) -> Self {
        let selector = match message {
            ClientMessage::TestSelector { selector, .. } => Some(selector.clone()),
            ClientMessage::AnalyzePage { .. } => None,
        };
        Self { seq, selector }
    }
}

// ============================================================================
// ConnectionActor
// ============================================================================

/// State machine for one session's connection.
pub(crate) struct ConnectionActor {
    config_id: ConfigId,
    options: ConnectionOptions,
    connector: Arc<dyn Connector>,
    commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::UnboundedSender<SessionEvent>,
    status: watch::Sender<Status>,
    detached: Arc<AtomicBool>,
    attempt: u32,
    pending: Option<Pending>,
    last_completed: Option<RequestSeq>,
}

impl ConnectionActor {
    pub(crate) fn new(
        config_id: ConfigId,
        options: ConnectionOptions,
        connector: Arc<dyn Connector>,
        commands: mpsc::UnboundedReceiver<Command>,
        events: mpsc::UnboundedSender<SessionEvent>,
        status: watch::Sender<Status>,
        detached: Arc<AtomicBool>,
    ) -> Self {
        Self {
            config_id,
            options,
            connector,
            commands,
            events,
            status,
            detached,
            attempt: 0,
            pending: None,
            last_completed: None,
        }
    }

    /// Runs until detached.
    pub(crate) async fn run(mut self) {
        let mut phase = Phase::Connecting;

        loop {
            phase = match phase {
                Phase::Connecting => self.connecting().await,
                Phase::Open(transport) => self.open(transport).await,
                Phase::Reconnecting => self.reconnecting().await,
                Phase::Idle => self.idle().await,
                Phase::Stopped => break,
            };
        }

        debug!(config_id = %self.config_id, "Connection actor terminated");
    }
}

// ============================================================================
// ConnectionActor - Phases
// ============================================================================

impl ConnectionActor {
    async fn connecting(&mut self) -> Phase {
        self.set_state(ConnectionState::Connecting);

        let connector = Arc::clone(&self.connector);
        let endpoint = self.options.endpoint.clone();
        let config_id = self.config_id.clone();
        let limit = self.options.handshake_timeout;
        let handshake = timeout(limit, async move {
            connector.connect(&endpoint, &config_id).await
        });
        tokio::pin!(handshake);

        loop {
            tokio::select! {
                outcome = &mut handshake => {
                    let error = match outcome {
                        Ok(Ok(transport)) => {
                            self.attempt = 0;
                            self.set_state(ConnectionState::Open);
                            info!(config_id = %self.config_id, "Selector channel open");
                            return Phase::Open(transport);
                        }
                        Ok(Err(e)) => e,
                        Err(_) => Error::connection_timeout(limit.as_millis() as u64),
                    };
                    warn!(
                        config_id = %self.config_id,
                        attempt = self.attempt,
                        error = %error,
                        "Handshake failed"
                    );
                    return Phase::Reconnecting;
                }

                command = self.commands.recv() => {
                    if let Some(phase) = self.interrupt(command) {
                        return phase;
                    }
                }
            }
        }
    }

    async fn open(&mut self, transport: Transport) -> Phase {
        let Transport {
            mut sink,
            mut stream,
        } = transport;

        loop {
            tokio::select! {
                frame = stream.next() => {
                    match frame {
                        Some(Ok(text)) => self.receive(&text),
                        Some(Err(e)) => {
                            warn!(config_id = %self.config_id, error = %e, "Transport lost");
                            return self.lost();
                        }
                        None => {
                            warn!(config_id = %self.config_id, "Channel closed by server");
                            return self.lost();
                        }
                    }
                }

                command = self.commands.recv() => {
                    match command {
                        Some(Command::Send { seq, message }) => {
                            if let Err(e) = self.send(&mut sink, seq, message).await {
                                warn!(config_id = %self.config_id, error = %e, "Send failed");
                                return self.lost();
                            }
                        }
                        Some(Command::Kick) => {}
                        Some(Command::Reconnect) => {
                            let _ = sink.close().await;
                            self.attempt = 0;
                            self.drop_pending();
                            return Phase::Connecting;
                        }
                        Some(Command::Close) => {
                            let _ = sink.close().await;
                            return self.closed();
                        }
                        Some(Command::Shutdown) | None => {
                            let _ = sink.close().await;
                            return Phase::Stopped;
                        }
                    }
                }
            }
        }
    }

    async fn reconnecting(&mut self) -> Phase {
        let retry = self.attempt < self.options.max_attempts;
        if retry {
            self.attempt += 1;
        }
        self.set_state(ConnectionState::Reconnecting);

        if !retry {
            self.set_state(ConnectionState::Failed);
            info!(config_id = %self.config_id, attempts = self.attempt, "Gave up reconnecting");
            self.emit(SessionEvent::GaveUp {
                attempts: self.attempt,
            });
            return Phase::Idle;
        }

        debug!(
            config_id = %self.config_id,
            attempt = self.attempt,
            delay_ms = self.options.reconnect_interval.as_millis() as u64,
            "Reconnect scheduled"
        );

        let delay = sleep(self.options.reconnect_interval);
        tokio::pin!(delay);

        loop {
            tokio::select! {
                () = &mut delay => return Phase::Connecting,

                command = self.commands.recv() => {
                    if let Some(phase) = self.interrupt(command) {
                        return phase;
                    }
                }
            }
        }
    }

    /// Waits in CLOSED or FAILED for a command that leaves it.
    async fn idle(&mut self) -> Phase {
        loop {
            let command = self.commands.recv().await;

            if matches!(command, Some(Command::Kick))
                && self.current_state() == ConnectionState::Closed
            {
                debug!(config_id = %self.config_id, "Re-attaching closed channel");
                self.attempt = 0;
                return Phase::Connecting;
            }

            if let Some(phase) = self.interrupt(command) {
                return phase;
            }
        }
    }
}

// ============================================================================
// ConnectionActor - Commands
// ============================================================================

impl ConnectionActor {
    /// Handles a command outside the OPEN phase.
    ///
    /// Returns the next phase if the command leaves the current one.
    fn interrupt(&mut self, command: Option<Command>) -> Option<Phase> {
        match command {
            Some(Command::Send { seq, .. }) => {
                debug!(config_id = %self.config_id, %seq, "Request refused while not open");
                self.emit(SessionEvent::RequestDropped { seq });
                None
            }
            Some(Command::Kick) => None,
            Some(Command::Reconnect) => {
                info!(config_id = %self.config_id, "Manual reconnect");
                self.attempt = 0;
                Some(Phase::Connecting)
            }
            Some(Command::Close) => Some(self.closed()),
            Some(Command::Shutdown) | None => Some(Phase::Stopped),
        }
    }

    async fn send(&mut self, sink: &mut FrameSink, seq: RequestSeq, message: ClientMessage) -> Result<()> {
        let text = match encode_client(&message) {
            Ok(text) => text,
            Err(e) => {
                self.emit(SessionEvent::ProtocolError {
                    message: e.to_string(),
                });
                self.emit(SessionEvent::RequestDropped { seq });
                return Ok(());
            }
        };

        if let Some(previous) = self.pending.replace(Pending::of(seq, &message)) {
            debug!(config_id = %self.config_id, superseded = %previous.seq, by = %seq, "Request superseded");
        }

        trace!(config_id = %self.config_id, %seq, action = message.action(), "Frame sent");
        sink.send(text).await
    }

    fn closed(&mut self) -> Phase {
        self.attempt = 0;
        self.drop_pending();
        self.set_state(ConnectionState::Closed);
        info!(config_id = %self.config_id, "Selector channel closed");
        Phase::Idle
    }

    fn lost(&mut self) -> Phase {
        self.drop_pending();
        Phase::Reconnecting
    }

    fn drop_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            self.emit(SessionEvent::RequestDropped { seq: pending.seq });
        }
    }
}

// ============================================================================
// ConnectionActor - Incoming Messages
// ============================================================================

impl ConnectionActor {
    fn receive(&mut self, text: &str) {
        trace!(config_id = %self.config_id, bytes = text.len(), "Frame received");

        let message = match decode_server(text) {
            Ok(message) => message,
            Err(e) => {
                warn!(config_id = %self.config_id, error = %e, "Unreadable frame");
                self.emit(SessionEvent::ProtocolError {
                    message: e.to_string(),
                });
                return;
            }
        };

        match message {
            ServerMessage::SelectorResults {
                selector,
                matches,
                count,
                request_id,
            } => match self.complete(request_id, Some(&selector)) {
                Some(seq) => self.emit(SessionEvent::Results {
                    seq,
                    selector,
                    matches,
                    count,
                }),
                None => debug!(config_id = %self.config_id, %selector, "Discarded stale results"),
            },

            ServerMessage::Error {
                message,
                request_id,
            } => match self.complete(request_id, None) {
                Some(seq) => self.emit(SessionEvent::EvaluationError { seq, message }),
                None => debug!(config_id = %self.config_id, %message, "Discarded stale error"),
            },

            ServerMessage::PageAnalysis {
                url,
                pattern_analysis,
                request_id,
            } => match self.analysis_target(request_id) {
                Some(seq) => self.emit(SessionEvent::PageAnalysis {
                    seq,
                    url,
                    analysis: pattern_analysis,
                }),
                None => debug!(config_id = %self.config_id, "Discarded stale analysis"),
            },
        }
    }

    /// Completes the pending request if a result or error answers it.
    ///
    /// Without an echoed id, results must carry the pending selector; an
    /// error always answers the pending request.
    fn complete(&mut self, request_id: Option<RequestSeq>, selector: Option<&str>) -> Option<RequestSeq> {
        let pending = self.pending.as_ref()?;

        let answers = match (request_id, selector) {
            (Some(id), _) => id == pending.seq,
            (None, Some(selector)) => pending.selector.as_deref() == Some(selector),
            (None, None) => true,
        };
        if !answers {
            return None;
        }

        let seq = pending.seq;
        self.pending = None;
        self.last_completed = Some(seq);
        Some(seq)
    }

    /// Resolves which request a `page_analysis` belongs to.
    ///
    /// Analysis answering a pending `analyze_page` completes it. Analysis
    /// following `selector_results` belongs to the last completed request
    /// and is dropped once a newer request is pending.
    fn analysis_target(&mut self, request_id: Option<RequestSeq>) -> Option<RequestSeq> {
        let pending = self
            .pending
            .as_ref()
            .map(|pending| (pending.seq, pending.selector.is_none()));

        match (pending, request_id) {
            (Some((seq, analyze)), Some(id)) if seq == id => {
                if analyze {
                    self.pending = None;
                    self.last_completed = Some(seq);
                }
                Some(seq)
            }
            (Some((seq, true)), None) => {
                self.pending = None;
                self.last_completed = Some(seq);
                Some(seq)
            }
            (None, Some(id)) if self.last_completed == Some(id) => Some(id),
            (None, None) => self.last_completed,
            _ => None,
        }
    }
}

// ============================================================================
// ConnectionActor - Reporting
// ============================================================================

impl ConnectionActor {
    fn current_state(&self) -> ConnectionState {
        self.status.borrow().state
    }

    fn set_state(&mut self, state: ConnectionState) {
        self.status.send_replace(Status {
            state,
            attempt: self.attempt,
        });
        debug!(config_id = %self.config_id, %state, attempt = self.attempt, "Connection state changed");
        self.emit(SessionEvent::StateChanged {
            state,
            attempt: self.attempt,
        });
    }

    fn emit(&self, event: SessionEvent) {
        if self.detached.load(Ordering::SeqCst) {
            return;
        }
        let _ = self.events.send(event);
    }
}
