//! Frame transports and connectors.
//!
//! A [`Transport`] is one duplex channel of text frames. The session actor
//! only sees this pair, so the same state machine runs over a real
//! WebSocket ([`WsConnector`]) and over in-memory channels.

// ============================================================================
// Imports
// ============================================================================

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::{Sink, SinkExt, Stream, StreamExt, future};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, trace};
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::ConfigId;

// ============================================================================
// Types
// ============================================================================

/// Outgoing half of a transport.
pub type FrameSink = Pin<Box<dyn Sink<String, Error = Error> + Send>>;

/// Incoming half of a transport.
///
/// The stream ends when the peer closes the channel.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

// ============================================================================
// Transport
// ============================================================================

/// One duplex channel of text frames.
pub struct Transport {
    /// Frames sent to the peer.
    pub sink: FrameSink,
    /// Frames received from the peer.
    pub stream: FrameStream,
}

impl Transport {
    /// Creates a transport from its halves.
    #[inline]
    #[must_use]
    pub fn new(sink: FrameSink, stream: FrameStream) -> Self {
        Self { sink, stream }
    }

    /// Wraps a WebSocket, keeping text frames only.
    ///
    /// Binary, ping and pong frames are dropped; tungstenite answers pings
    /// on its own.
    #[must_use]
    pub fn from_websocket<S>(socket: WebSocketStream<S>) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (write, read) = socket.split();

        let sink = write
            .sink_map_err(Error::from)
            .with(|text: String| future::ready(Ok::<_, Error>(Message::Text(text.into()))));

        let stream = read.filter_map(|frame| {
            future::ready(match frame {
                Ok(Message::Text(text)) => Some(Ok(text.as_str().to_owned())),
                Ok(Message::Close(_)) => {
                    trace!("Close frame received");
                    None
                }
                Ok(_) => None,
                Err(e) => Some(Err(Error::from(e))),
            })
        });

        Self::new(Box::pin(sink), Box::pin(stream))
    }
}

// ============================================================================
// Connector
// ============================================================================

/// Opens transports for selector channels.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Opens the channel for `config_id` at `endpoint`.
    ///
    /// # Errors
    ///
    /// Any error is treated as a failed handshake by the session.
    async fn connect(&self, endpoint: &str, config_id: &ConfigId) -> Result<Transport>;
}

// ============================================================================
// WsConnector
// ============================================================================

/// WebSocket connector.
///
/// Connects to `<endpoint>/ws/crawling/selector/<config_id>/`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

impl WsConnector {
    /// Creates a WebSocket connector.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, endpoint: &str, config_id: &ConfigId) -> Result<Transport> {
        let url = channel_url(endpoint, config_id)?;
        debug!(url = %url, "Opening selector channel");

        let (socket, response) = tokio_tungstenite::connect_async(url.as_str()).await?;
        debug!(status = %response.status(), "WebSocket handshake complete");

        Ok(Transport::from_websocket(socket))
    }
}

/// Builds the channel url for `config_id`.
///
/// # Errors
///
/// Returns [`Error::Config`] unless `endpoint` is an absolute `ws`/`wss` url.
pub fn channel_url(endpoint: &str, config_id: &ConfigId) -> Result<Url> {
    let base = parse_endpoint(endpoint)?;
    base.join(&config_id.channel_path())
        .map_err(|e| Error::config(format!("Invalid channel url: {e}")))
}

/// Parses and checks a WebSocket endpoint.
///
/// # Errors
///
/// Returns [`Error::Config`] unless `endpoint` is an absolute `ws`/`wss` url.
pub fn parse_endpoint(endpoint: &str) -> Result<Url> {
    let url = Url::parse(endpoint)
        .map_err(|e| Error::config(format!("Invalid endpoint {endpoint:?}: {e}")))?;

    match url.scheme() {
        "ws" | "wss" if url.has_host() => Ok(url),
        scheme => Err(Error::config(format!(
            "Endpoint must be a ws:// or wss:// url, got {scheme}://"
        ))),
    }
}

// ============================================================================
// Tests
// ============================================================================
