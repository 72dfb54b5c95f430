//! Session handle.
//!
//! A [`Session`] is the client side of one selector channel. Attaching
//! spawns the connection actor; the returned [`SessionEvents`] receives
//! everything the actor reports. Dropping the session detaches it.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::identifiers::{ConfigId, RequestSeq};
use crate::protocol::ClientMessage;
use crate::transport::Connector;

use super::connection::{Command, ConnectionActor, Status};
use super::event::SessionEvent;
use super::options::ConnectionOptions;
use super::state::ConnectionState;

// ============================================================================
// Session
// ============================================================================

/// Client handle for one crawl configuration's selector channel.
///
/// # Example
///
/// ```ignore
/// let config_id = ConfigId::new("42")?;
/// let (session, mut events) =
///     Session::attach(config_id, ConnectionOptions::new(), Arc::new(WsConnector::new()))?;
///
/// session.wait_for_state(ConnectionState::is_open).await?;
/// let seq = session.submit("a.next-page", "https://example.com")?;
///
/// while let Some(event) = events.recv().await {
///     if let SessionEvent::Results { seq: done, count, .. } = event
///         && done == seq
///     {
///         println!("{count} matches");
///         break;
///     }
/// }
/// ```
pub struct Session {
    config_id: ConfigId,
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<Status>,
    detached: Arc<AtomicBool>,
    next_seq: Mutex<RequestSeq>,
}

impl Session {
    /// Attaches to the channel for `config_id` and starts connecting.
    ///
    /// Must be called within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the options are invalid.
    pub fn attach(
        config_id: ConfigId,
        options: ConnectionOptions,
        connector: Arc<dyn Connector>,
    ) -> Result<(Self, SessionEvents)> {
        options.validate()?;

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(Status::INITIAL);
        let detached = Arc::new(AtomicBool::new(false));

        info!(config_id = %config_id, endpoint = %options.endpoint, "Session attached");

        let actor = ConnectionActor::new(
            config_id.clone(),
            options,
            connector,
            command_rx,
            event_tx,
            status_tx,
            Arc::clone(&detached),
        );
        tokio::spawn(actor.run());

        let session = Self {
            config_id,
            commands: command_tx,
            status: status_rx,
            detached: Arc::clone(&detached),
            next_seq: Mutex::new(RequestSeq::FIRST),
        };
        let events = SessionEvents {
            events: event_rx,
            detached,
        };

        Ok((session, events))
    }
}

// ============================================================================
// Session - Accessors
// ============================================================================

impl Session {
    /// Returns the configuration id.
    #[inline]
    #[must_use]
    pub fn config_id(&self) -> &ConfigId {
        &self.config_id
    }

    /// Returns the current connection state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.status.borrow().state
    }

    /// Returns the reconnect attempt counter.
    #[inline]
    #[must_use]
    pub fn attempt(&self) -> u32 {
        self.status.borrow().attempt
    }

    /// Returns `true` once the session has been detached.
    #[inline]
    #[must_use]
    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::SeqCst)
    }

    /// Waits until the state satisfies `predicate` and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionDetached`] if the actor stops first.
    pub async fn wait_for_state<F>(&self, mut predicate: F) -> Result<ConnectionState>
    where
        F: FnMut(ConnectionState) -> bool,
    {
        let mut status = self.status.clone();
        let state = status
            .wait_for(|status| predicate(status.state))
            .await
            .map_err(|_| Error::SessionDetached)?
            .state;
        Ok(state)
    }

    /// Waits until the channel is open.
    ///
    /// # Errors
    ///
    /// - [`Error::ReconnectExhausted`] if the session reaches FAILED
    /// - [`Error::NotConnected`] if the channel is closed
    /// - [`Error::SessionDetached`] if the actor stops first
    pub async fn wait_open(&self) -> Result<()> {
        match self.wait_for_state(ConnectionState::is_settled).await? {
            ConnectionState::Open => Ok(()),
            ConnectionState::Failed => Err(Error::reconnect_exhausted(self.attempt())),
            state => Err(Error::not_connected(state)),
        }
    }
}

// ============================================================================
// Session - Requests
// ============================================================================

impl Session {
    /// Submits a selector for evaluation against the document at `url`.
    ///
    /// The request supersedes any pending one.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if the channel is not open; the request is
    ///   dropped and the reconnect path is triggered where possible
    /// - [`Error::SessionDetached`] if the session was detached
    pub fn submit(&self, selector: impl Into<String>, url: impl Into<String>) -> Result<RequestSeq> {
        let selector = selector.into();
        let url = url.into();
        self.dispatch(|seq| ClientMessage::test_selector(selector, url, Some(seq)))
    }

    /// Requests a document-wide pattern analysis of `url`.
    ///
    /// Same contract as [`Session::submit`].
    ///
    /// # Errors
    ///
    /// See [`Session::submit`].
    pub fn analyze(&self, url: impl Into<String>) -> Result<RequestSeq> {
        let url = url.into();
        self.dispatch(|seq| ClientMessage::analyze_page(url, Some(seq)))
    }

    fn dispatch(&self, build: impl FnOnce(RequestSeq) -> ClientMessage) -> Result<RequestSeq> {
        if self.is_detached() {
            return Err(Error::SessionDetached);
        }

        let state = self.state();
        if !state.is_open() {
            debug!(config_id = %self.config_id, %state, "Request dropped while not open");
            self.command(Command::Kick)?;
            return Err(Error::not_connected(state));
        }

        let seq = {
            let mut next = self.next_seq.lock();
            let seq = *next;
            *next = seq.next();
            seq
        };
        self.command(Command::Send {
            seq,
            message: build(seq),
        })?;
        Ok(seq)
    }
}

// ============================================================================
// Session - Lifecycle
// ============================================================================

impl Session {
    /// Closes any live transport, resets the counter and reconnects.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionDetached`] if the session was detached.
    pub fn reconnect(&self) -> Result<()> {
        self.command(Command::Reconnect)
    }

    /// Closes the channel.
    ///
    /// The session stays attached; a later submit re-opens it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionDetached`] if the session was detached.
    pub fn close(&self) -> Result<()> {
        self.command(Command::Close)
    }

    /// Detaches the session.
    ///
    /// Cancels any reconnect delay, closes the transport and stops event
    /// delivery. Called automatically on drop.
    pub fn detach(&self) {
        if self.detached.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.commands.send(Command::Shutdown);
        debug!(config_id = %self.config_id, "Session detached");
    }

    fn command(&self, command: Command) -> Result<()> {
        if self.is_detached() {
            return Err(Error::SessionDetached);
        }
        self.commands
            .send(command)
            .map_err(|_| Error::SessionDetached)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.detach();
    }
}

// ============================================================================
// SessionEvents
// ============================================================================

/// Receiver for a session's events.
///
/// Yields nothing once the session is detached.
pub struct SessionEvents {
    events: mpsc::UnboundedReceiver<SessionEvent>,
    detached: Arc<AtomicBool>,
}

impl SessionEvents {
    /// Receives the next event.
    ///
    /// Returns `None` once the session is detached or the actor stopped.
    pub async fn recv(&mut self) -> Option<SessionEvent> {
        if self.detached.load(Ordering::SeqCst) {
            return None;
        }
        let event = self.events.recv().await?;
        (!self.detached.load(Ordering::SeqCst)).then_some(event)
    }

    /// Returns the next event if one is queued.
    pub fn try_recv(&mut self) -> Option<SessionEvent> {
        if self.detached.load(Ordering::SeqCst) {
            return None;
        }
        self.events.try_recv().ok()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::AtomicU32;
    use std::time::Duration;

    use async_trait::async_trait;
    use futures_util::{SinkExt, StreamExt};
    use tokio::time::{sleep, timeout};
    use tokio_test::{assert_err, assert_ok};

    use crate::document::{DocumentAccessor, MemoryDocuments};
    use crate::protocol::{PatternAnalysis, ServerMessage, decode_client, encode_server};
    use crate::service::SelectorService;
    use crate::transport::{EvaluationServer, LoopbackConnector, Transport, WsConnector, duplex};

    const WAIT: Duration = Duration::from_secs(5);

    // ------------------------------------------------------------------------
    // Scripted connector
    // ------------------------------------------------------------------------

    /// Fails a scripted number of handshakes, then hands the server half of
    /// each new channel to the test.
    struct ScriptedConnector {
        failures: AtomicU32,
        calls: AtomicU32,
        peers: mpsc::UnboundedSender<Transport>,
    }

    impl ScriptedConnector {
        fn new(failures: u32) -> (Arc<Self>, mpsc::UnboundedReceiver<Transport>) {
            let (peers, peer_rx) = mpsc::unbounded_channel();
            let connector = Arc::new(Self {
                failures: AtomicU32::new(failures),
                calls: AtomicU32::new(0),
                peers,
            });
            (connector, peer_rx)
        }

        fn fail_next(&self, count: u32) {
            self.failures.store(count, Ordering::SeqCst);
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Connector for ScriptedConnector {
        async fn connect(&self, _endpoint: &str, _config_id: &ConfigId) -> Result<Transport> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(Error::connection("connection refused"));
            }

            let (client, server) = duplex();
            let _ = self.peers.send(server);
            Ok(client)
        }
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    fn id(value: &str) -> ConfigId {
        ConfigId::new(value).expect("valid id")
    }

    fn fast_options(max_attempts: u32) -> ConnectionOptions {
        ConnectionOptions::new()
            .with_max_attempts(max_attempts)
            .with_reconnect_interval(Duration::from_millis(5))
            .with_handshake_timeout(Duration::from_secs(1))
    }

    async fn next_event(events: &mut SessionEvents) -> SessionEvent {
        timeout(WAIT, events.recv())
            .await
            .expect("event in time")
            .expect("session attached")
    }

    /// Collects state changes up to and including `target`.
    async fn states_until(
        events: &mut SessionEvents,
        target: ConnectionState,
    ) -> Vec<(ConnectionState, u32)> {
        let mut states = Vec::new();
        loop {
            if let SessionEvent::StateChanged { state, attempt } = next_event(events).await {
                states.push((state, attempt));
                if state == target {
                    return states;
                }
            }
        }
    }

    /// Skips state changes and returns the next other event.
    async fn next_non_state(events: &mut SessionEvents) -> SessionEvent {
        loop {
            let event = next_event(events).await;
            if !matches!(event, SessionEvent::StateChanged { .. }) {
                return event;
            }
        }
    }

    async fn wait_open(session: &Session) {
        timeout(WAIT, session.wait_open())
            .await
            .expect("settled in time")
            .expect("open");
    }

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    async fn read_request(server: &mut Transport) -> ClientMessage {
        let frame = timeout(WAIT, server.stream.next())
            .await
            .expect("frame in time")
            .expect("channel open")
            .expect("frame ok");
        decode_client(&frame).expect("valid request")
    }

    async fn reply(server: &mut Transport, message: ServerMessage) {
        let text = encode_server(&message).expect("encode");
        server.sink.send(text).await.expect("send reply");
    }

    fn shop_service() -> Arc<SelectorService> {
        let documents = Arc::new(MemoryDocuments::new());
        documents.insert(
            "https://shop.example.com",
            r#"<nav id="pager">
                <a class="next-page" href="/2">2</a>
                <a class="next-page" href="/3">3</a>
                <a class="next-page" href="/4">4</a>
                <a class="next-page" href="/5">5</a>
                <a class="next-page" href="/6">6</a>
                <a class="home" href="/">home</a>
            </nav>"#,
        );
        let accessor: Arc<dyn DocumentAccessor> = documents;
        Arc::new(SelectorService::new(accessor))
    }

    // ------------------------------------------------------------------------
    // State machine
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_attach_opens() {
        let (connector, _peers) = ScriptedConnector::new(0);
        let (session, mut events) =
            Session::attach(id("1"), fast_options(5), connector).expect("attach");

        let states = states_until(&mut events, ConnectionState::Open).await;
        assert_eq!(
            states,
            [(ConnectionState::Connecting, 0), (ConnectionState::Open, 0)]
        );
        assert_eq!(session.config_id().as_str(), "1");
    }

    #[tokio::test]
    async fn test_reconnect_then_success() {
        let (connector, mut peers) = ScriptedConnector::new(0);
        let (session, mut events) =
            Session::attach(id("1"), fast_options(5), connector.clone()).expect("attach");
        states_until(&mut events, ConnectionState::Open).await;

        let server = peers.recv().await.expect("server half");
        connector.fail_next(1);
        drop(server);

        let states = states_until(&mut events, ConnectionState::Open).await;
        assert_eq!(
            states,
            [
                (ConnectionState::Reconnecting, 1),
                (ConnectionState::Connecting, 1),
                (ConnectionState::Reconnecting, 2),
                (ConnectionState::Connecting, 2),
                (ConnectionState::Open, 0),
            ]
        );
        assert_eq!(session.attempt(), 0);
        assert_eq!(connector.calls(), 3);
    }

    #[tokio::test]
    async fn test_reconnect_bound() {
        let (connector, _peers) = ScriptedConnector::new(u32::MAX);
        let (session, mut events) =
            Session::attach(id("1"), fast_options(3), connector.clone()).expect("attach");

        let states = states_until(&mut events, ConnectionState::Failed).await;
        assert_eq!(
            states,
            [
                (ConnectionState::Connecting, 0),
                (ConnectionState::Reconnecting, 1),
                (ConnectionState::Connecting, 1),
                (ConnectionState::Reconnecting, 2),
                (ConnectionState::Connecting, 2),
                (ConnectionState::Reconnecting, 3),
                (ConnectionState::Connecting, 3),
                (ConnectionState::Reconnecting, 3),
                (ConnectionState::Failed, 3),
            ]
        );
        assert_eq!(next_event(&mut events).await, SessionEvent::GaveUp { attempts: 3 });

        // One initial handshake plus three reconnect attempts, and no more.
        assert_eq!(connector.calls(), 4);
        sleep(Duration::from_millis(50)).await;
        assert_eq!(connector.calls(), 4);

        let err = assert_err!(session.submit("a", "u"));
        assert!(matches!(
            err,
            Error::NotConnected {
                state: ConnectionState::Failed
            }
        ));
        sleep(Duration::from_millis(20)).await;
        assert_eq!(connector.calls(), 4);
    }

    #[tokio::test]
    async fn test_wait_open_reports_exhaustion() {
        let (connector, _peers) = ScriptedConnector::new(u32::MAX);
        let (session, _events) =
            Session::attach(id("1"), fast_options(2), connector).expect("attach");

        let err = timeout(WAIT, session.wait_open())
            .await
            .expect("settled in time")
            .expect_err("exhausted");
        assert!(matches!(err, Error::ReconnectExhausted { attempts: 2 }));
        assert!(!err.is_recoverable());
    }

    #[tokio::test]
    async fn test_manual_reconnect_from_failed() {
        let (connector, _peers) = ScriptedConnector::new(u32::MAX);
        let (session, mut events) =
            Session::attach(id("1"), fast_options(1), connector.clone()).expect("attach");
        states_until(&mut events, ConnectionState::Failed).await;

        connector.fail_next(0);
        assert_ok!(session.reconnect());

        let states = states_until(&mut events, ConnectionState::Open).await;
        assert_eq!(
            states,
            [(ConnectionState::Connecting, 0), (ConnectionState::Open, 0)]
        );
    }

    #[tokio::test]
    async fn test_manual_reconnect_from_open() {
        let (connector, mut peers) = ScriptedConnector::new(0);
        let (session, mut events) =
            Session::attach(id("1"), fast_options(5), connector.clone()).expect("attach");
        states_until(&mut events, ConnectionState::Open).await;
        let mut server = peers.recv().await.expect("server half");

        let seq = session.submit("a", "u").expect("submit");
        read_request(&mut server).await;
        assert_ok!(session.reconnect());

        let end = timeout(WAIT, server.stream.next()).await.expect("closed in time");
        assert!(end.is_none());

        assert_eq!(next_event(&mut events).await, SessionEvent::RequestDropped { seq });
        assert_eq!(
            next_event(&mut events).await,
            SessionEvent::StateChanged {
                state: ConnectionState::Connecting,
                attempt: 0
            }
        );
        assert_eq!(
            next_event(&mut events).await,
            SessionEvent::StateChanged {
                state: ConnectionState::Open,
                attempt: 0
            }
        );
        assert_eq!(connector.calls(), 2);
        assert!(peers.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_manual_reconnect_cancels_delay() {
        let (connector, _peers) = ScriptedConnector::new(u32::MAX);
        let options = fast_options(5).with_reconnect_interval(Duration::from_secs(60));
        let (session, mut events) =
            Session::attach(id("1"), options, connector.clone()).expect("attach");

        let states = states_until(&mut events, ConnectionState::Reconnecting).await;
        assert_eq!(
            states,
            [(ConnectionState::Connecting, 0), (ConnectionState::Reconnecting, 1)]
        );
        assert_eq!(session.attempt(), 1);

        connector.fail_next(0);
        assert_ok!(session.reconnect());

        let states = states_until(&mut events, ConnectionState::Open).await;
        assert_eq!(
            states,
            [(ConnectionState::Connecting, 0), (ConnectionState::Open, 0)]
        );
        assert_eq!(session.attempt(), 0);
        assert_eq!(connector.calls(), 2);
    }

    #[tokio::test]
    async fn test_zero_budget_fails_on_first_loss() {
        let (connector, _peers) = ScriptedConnector::new(1);
        let (_session, mut events) =
            Session::attach(id("1"), fast_options(0), connector).expect("attach");

        let states = states_until(&mut events, ConnectionState::Failed).await;
        assert_eq!(
            states,
            [
                (ConnectionState::Connecting, 0),
                (ConnectionState::Reconnecting, 0),
                (ConnectionState::Failed, 0),
            ]
        );
    }

    #[tokio::test]
    async fn test_submit_while_reconnecting_is_dropped() {
        let (connector, _peers) = ScriptedConnector::new(u32::MAX);
        let options = fast_options(5).with_reconnect_interval(Duration::from_secs(60));
        let (session, _events) = Session::attach(id("1"), options, connector).expect("attach");

        timeout(WAIT, session.wait_for_state(|s| s == ConnectionState::Reconnecting))
            .await
            .expect("reconnecting in time")
            .expect("attached");

        let err = assert_err!(session.submit("a", "u"));
        assert!(matches!(
            err,
            Error::NotConnected {
                state: ConnectionState::Reconnecting
            }
        ));
        assert!(err.is_recoverable());
    }

    #[tokio::test]
    async fn test_submit_on_closed_reattaches() {
        let (connector, _peers) = ScriptedConnector::new(0);
        let (session, mut events) =
            Session::attach(id("1"), fast_options(5), connector.clone()).expect("attach");
        states_until(&mut events, ConnectionState::Open).await;

        assert_ok!(session.close());
        states_until(&mut events, ConnectionState::Closed).await;
        assert_eq!(session.attempt(), 0);

        let err = assert_err!(session.submit("a", "u"));
        assert!(matches!(
            err,
            Error::NotConnected {
                state: ConnectionState::Closed
            }
        ));

        let states = states_until(&mut events, ConnectionState::Open).await;
        assert_eq!(
            states,
            [(ConnectionState::Connecting, 0), (ConnectionState::Open, 0)]
        );
        assert_eq!(connector.calls(), 2);
    }

    // ------------------------------------------------------------------------
    // Requests
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_supersession_by_request_id() {
        let (connector, mut peers) = ScriptedConnector::new(0);
        let (session, mut events) =
            Session::attach(id("1"), fast_options(5), connector).expect("attach");
        wait_open(&session).await;
        let mut server = peers.recv().await.expect("server half");

        let first = session.submit("a.first", "u").expect("submit");
        let second = session.submit("a.second", "u").expect("submit");
        assert_eq!(first, RequestSeq::FIRST);
        assert_eq!(second, first.next());
        assert_eq!(read_request(&mut server).await.request_id(), Some(first));
        assert_eq!(read_request(&mut server).await.request_id(), Some(second));

        reply(&mut server, ServerMessage::selector_results("a.first", vec![], Some(first))).await;
        reply(&mut server, ServerMessage::selector_results("a.second", vec![], Some(second))).await;
        reply(
            &mut server,
            ServerMessage::page_analysis(None, PatternAnalysis::default(), Some(first)),
        )
        .await;
        reply(
            &mut server,
            ServerMessage::page_analysis(None, PatternAnalysis::default(), Some(second)),
        )
        .await;

        let mut completions = Vec::new();
        loop {
            match next_non_state(&mut events).await {
                event if event.is_completion() => completions.push(event),
                SessionEvent::PageAnalysis { seq, .. } => {
                    assert_eq!(seq, second);
                    break;
                }
                other => panic!("unexpected event {other:?}"),
            }
        }
        assert_eq!(completions.len(), 1);
        assert_eq!(completions[0].seq(), Some(second));
    }

    #[tokio::test]
    async fn test_supersession_without_request_id() {
        let (connector, mut peers) = ScriptedConnector::new(0);
        let (session, mut events) =
            Session::attach(id("1"), fast_options(5), connector).expect("attach");
        wait_open(&session).await;
        let mut server = peers.recv().await.expect("server half");

        session.submit("a.first", "u").expect("submit");
        let second = session.submit("a.second", "u").expect("submit");
        read_request(&mut server).await;
        read_request(&mut server).await;

        reply(&mut server, ServerMessage::selector_results("a.first", vec![], None)).await;
        reply(&mut server, ServerMessage::selector_results("a.second", vec![], None)).await;
        reply(
            &mut server,
            ServerMessage::page_analysis(None, PatternAnalysis::default(), None),
        )
        .await;

        match next_non_state(&mut events).await {
            SessionEvent::Results { seq, selector, .. } => {
                assert_eq!(seq, second);
                assert_eq!(selector, "a.second");
            }
            other => panic!("expected results, got {other:?}"),
        }
        match next_non_state(&mut events).await {
            SessionEvent::PageAnalysis { seq, .. } => assert_eq!(seq, second),
            other => panic!("expected analysis, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_protocol_error_keeps_state_and_pending() {
        let (connector, mut peers) = ScriptedConnector::new(0);
        let (session, mut events) =
            Session::attach(id("1"), fast_options(5), connector).expect("attach");
        wait_open(&session).await;
        let mut server = peers.recv().await.expect("server half");

        let seq = session.submit("a", "u").expect("submit");
        read_request(&mut server).await;

        server.sink.send("not json".to_string()).await.expect("send");
        assert!(matches!(
            next_non_state(&mut events).await,
            SessionEvent::ProtocolError { .. }
        ));
        assert_eq!(session.state(), ConnectionState::Open);

        reply(&mut server, ServerMessage::selector_results("a", vec![], Some(seq))).await;
        match next_non_state(&mut events).await {
            SessionEvent::Results { seq: done, count, .. } => {
                assert_eq!(done, seq);
                assert_eq!(count, 0);
            }
            other => panic!("expected results, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_transport_loss_drops_pending() {
        let (connector, mut peers) = ScriptedConnector::new(0);
        let (session, mut events) =
            Session::attach(id("1"), fast_options(5), connector).expect("attach");
        wait_open(&session).await;
        let mut server = peers.recv().await.expect("server half");

        let seq = session.submit("a", "u").expect("submit");
        read_request(&mut server).await;
        drop(server);

        assert_eq!(
            next_non_state(&mut events).await,
            SessionEvent::RequestDropped { seq }
        );
        assert_eq!(
            next_event(&mut events).await,
            SessionEvent::StateChanged {
                state: ConnectionState::Reconnecting,
                attempt: 1
            }
        );
    }

    #[tokio::test]
    async fn test_invalid_selector_keeps_connection_open() {
        let connector = Arc::new(LoopbackConnector::new(shop_service()));
        let (session, mut events) =
            Session::attach(id("1"), fast_options(5), connector).expect("attach");
        wait_open(&session).await;

        let bad = session
            .submit("a[", "https://shop.example.com")
            .expect("submit");
        match next_non_state(&mut events).await {
            SessionEvent::EvaluationError { seq, message } => {
                assert_eq!(seq, bad);
                assert!(message.starts_with("Error testing selector: "));
            }
            other => panic!("expected evaluation error, got {other:?}"),
        }
        assert_eq!(session.state(), ConnectionState::Open);

        let good = session
            .submit("a.next-page", "https://shop.example.com")
            .expect("submit");
        match next_non_state(&mut events).await {
            SessionEvent::Results { seq, count, .. } => {
                assert_eq!(seq, good);
                assert_eq!(count, 5);
            }
            other => panic!("expected results, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_analyze_over_loopback() {
        let connector = Arc::new(LoopbackConnector::new(shop_service()));
        let (session, mut events) =
            Session::attach(id("1"), fast_options(5), connector).expect("attach");
        wait_open(&session).await;

        let seq = session.analyze("https://shop.example.com").expect("analyze");
        match next_non_state(&mut events).await {
            SessionEvent::PageAnalysis {
                seq: done,
                url,
                analysis,
            } => {
                assert_eq!(done, seq);
                assert_eq!(url.as_deref(), Some("https://shop.example.com"));
                assert_eq!(analysis.recommendations.len(), 1);
                assert_eq!(analysis.similar_element_count, 5);
            }
            other => panic!("expected analysis, got {other:?}"),
        }
    }

    // ------------------------------------------------------------------------
    // Detach
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_detach_stops_events_and_reconnects() {
        let (connector, _peers) = ScriptedConnector::new(u32::MAX);
        let options = fast_options(1_000).with_reconnect_interval(Duration::from_millis(10));
        let (session, mut events) =
            Session::attach(id("1"), options, connector.clone()).expect("attach");

        timeout(WAIT, session.wait_for_state(|s| s == ConnectionState::Reconnecting))
            .await
            .expect("reconnecting in time")
            .expect("attached");

        session.detach();
        assert!(session.is_detached());
        assert!(events.recv().await.is_none());
        assert!(matches!(session.submit("a", "u"), Err(Error::SessionDetached)));

        sleep(Duration::from_millis(30)).await;
        let calls = connector.calls();
        sleep(Duration::from_millis(100)).await;
        assert_eq!(connector.calls(), calls);
    }

    #[tokio::test]
    async fn test_drop_detaches() {
        let (connector, mut peers) = ScriptedConnector::new(0);
        let (session, _events) =
            Session::attach(id("1"), fast_options(5), connector).expect("attach");
        wait_open(&session).await;
        let mut server = peers.recv().await.expect("server half");

        drop(session);
        let end = timeout(WAIT, server.stream.next()).await.expect("closed in time");
        assert!(end.is_none());
    }

    // ------------------------------------------------------------------------
    // End to end
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_end_to_end_over_websocket() {
        init_tracing();

        let server = EvaluationServer::start(shop_service())
            .await
            .expect("server start");
        let options = fast_options(5).with_endpoint(server.ws_url());
        let (session, mut events) =
            Session::attach(id("42"), options, Arc::new(WsConnector::new())).expect("attach");
        wait_open(&session).await;

        let seq = session
            .submit("a[href='/2']", "https://shop.example.com")
            .expect("submit");

        match next_non_state(&mut events).await {
            SessionEvent::Results {
                seq: done,
                matches,
                count,
                ..
            } => {
                assert_eq!(done, seq);
                assert_eq!(count, 1);
                assert_eq!(matches[0].text, "2");
            }
            other => panic!("expected results, got {other:?}"),
        }
        match next_non_state(&mut events).await {
            SessionEvent::PageAnalysis { seq: done, analysis, .. } => {
                assert_eq!(done, seq);
                assert_eq!(analysis.similar_element_count, 4);
                assert!((analysis.recommendations[0].confidence - 5.0 / 6.0).abs() < 1e-9);
            }
            other => panic!("expected analysis, got {other:?}"),
        }

        session.detach();
        server.shutdown();
    }
}
