//! In-memory transports.
//!
//! [`duplex`] pairs two transports over unbounded channels. Dropping one
//! side's sink ends the other side's stream, like a closed socket.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{sink, stream};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::identifiers::ConfigId;
use crate::service::SelectorService;

use super::connector::{Connector, FrameSink, FrameStream, Transport};

// ============================================================================
// Duplex
// ============================================================================

/// Creates a connected pair of in-memory transports.
#[must_use]
pub fn duplex() -> (Transport, Transport) {
    let (left_tx, left_rx) = mpsc::unbounded_channel();
    let (right_tx, right_rx) = mpsc::unbounded_channel();

    (
        Transport::new(frame_sink(left_tx), frame_stream(right_rx)),
        Transport::new(frame_sink(right_tx), frame_stream(left_rx)),
    )
}

fn frame_sink(tx: mpsc::UnboundedSender<String>) -> FrameSink {
    Box::pin(sink::unfold(tx, |tx, frame: String| async move {
        tx.send(frame).map_err(|_| Error::ConnectionClosed)?;
        Ok::<_, Error>(tx)
    }))
}

fn frame_stream(rx: mpsc::UnboundedReceiver<String>) -> FrameStream {
    Box::pin(stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|frame| (Ok(frame), rx))
    }))
}

// ============================================================================
// LoopbackConnector
// ============================================================================

/// Connector running the evaluation service in-process.
///
/// Each connect spawns a service loop on the other end of a [`duplex`]
/// pair. Requires a tokio runtime.
#[derive(Clone)]
pub struct LoopbackConnector {
    service: Arc<SelectorService>,
}

impl LoopbackConnector {
    /// Creates a loopback connector for `service`.
    #[inline]
    #[must_use]
    pub fn new(service: Arc<SelectorService>) -> Self {
        Self { service }
    }

    /// Returns the served evaluation service.
    #[inline]
    #[must_use]
    pub fn service(&self) -> &Arc<SelectorService> {
        &self.service
    }
}

#[async_trait]
impl Connector for LoopbackConnector {
    async fn connect(&self, endpoint: &str, config_id: &ConfigId) -> Result<Transport> {
        let (client, server) = duplex();
        let service = Arc::clone(&self.service);
        let channel = config_id.clone();

        tokio::spawn(async move {
            if let Err(e) = service.serve(&channel, server).await {
                warn!(config_id = %channel, error = %e, "Loopback channel failed");
            }
        });

        debug!(endpoint, config_id = %config_id, "Loopback channel opened");
        Ok(client)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use futures_util::{SinkExt, StreamExt};

    #[tokio::test]
    async fn test_duplex_delivers_both_ways() {
        let (mut left, mut right) = duplex();

        left.sink.send("ping".into()).await.expect("send");
        let frame = right.stream.next().await.expect("frame").expect("ok");
        assert_eq!(frame, "ping");

        right.sink.send("pong".into()).await.expect("send");
        let frame = left.stream.next().await.expect("frame").expect("ok");
        assert_eq!(frame, "pong");
    }

    #[tokio::test]
    async fn test_dropping_sink_ends_peer_stream() {
        let (left, mut right) = duplex();
        drop(left);
        assert!(right.stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_send_after_peer_dropped_fails() {
        let (mut left, right) = duplex();
        drop(right);
        let err = left.sink.send("late".into()).await.expect_err("should fail");
        assert!(matches!(err, Error::ConnectionClosed));
    }
}
