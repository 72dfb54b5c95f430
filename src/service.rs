//! Server-side evaluation service.
//!
//! One [`SelectorService`] answers every selector channel. Each channel is
//! served by [`SelectorService::serve`], which handles its frames strictly in
//! order, so the engine never runs twice at once for the same channel.
//!
//! # Replies
//!
//! | Request | Replies |
//! |---------|---------|
//! | `test_selector` | `selector_results`, then `page_analysis` |
//! | `analyze_page` | `page_analysis` |
//! | anything invalid | `error` |
//!
//! Every reply echoes the request's `request_id` when one was given.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tracing::{debug, info, trace, warn};

use crate::document::{DocumentAccessor, ElementPick};
use crate::engine::SelectorEngine;
use crate::error::{Error, Result};
use crate::identifiers::{ConfigId, RequestSeq};
use crate::protocol::{ClientMessage, MatchedElement, ServerMessage, decode_client, encode_server};
use crate::transport::Transport;

// ============================================================================
// SelectorService
// ============================================================================

/// Evaluates selector requests against documents from an accessor.
pub struct SelectorService {
    accessor: Arc<dyn DocumentAccessor>,
    engine: SelectorEngine,
}

impl SelectorService {
    /// Creates a service with the default engine.
    #[must_use]
    pub fn new(accessor: Arc<dyn DocumentAccessor>) -> Self {
        Self::with_engine(accessor, SelectorEngine::default())
    }

    /// Creates a service with a configured engine.
    #[must_use]
    pub fn with_engine(accessor: Arc<dyn DocumentAccessor>, engine: SelectorEngine) -> Self {
        Self { accessor, engine }
    }

    /// Returns the evaluation engine.
    #[inline]
    #[must_use]
    pub fn engine(&self) -> &SelectorEngine {
        &self.engine
    }

    /// Returns the document accessor.
    #[inline]
    #[must_use]
    pub fn accessor(&self) -> &Arc<dyn DocumentAccessor> {
        &self.accessor
    }
}

// ============================================================================
// Request Handling
// ============================================================================

impl SelectorService {
    /// Handles one raw text frame and returns the replies in send order.
    pub async fn handle_frame(&self, text: &str) -> Vec<ServerMessage> {
        match decode_client(text) {
            Ok(message) => self.handle(message).await,
            Err(e) => {
                warn!(error = %e, "Rejected client frame");
                vec![ServerMessage::error(rejection_message(&e), request_id_hint(text))]
            }
        }
    }

    /// Handles one decoded request.
    pub async fn handle(&self, message: ClientMessage) -> Vec<ServerMessage> {
        match message {
            ClientMessage::TestSelector {
                selector,
                url,
                request_id,
            } => self.test_selector(selector, url, request_id).await,
            ClientMessage::AnalyzePage { url, request_id } => {
                vec![self.analyze_page(url, request_id).await]
            }
        }
    }

    async fn test_selector(
        &self,
        selector: String,
        url: String,
        request_id: Option<RequestSeq>,
    ) -> Vec<ServerMessage> {
        let evaluated = match self.accessor.get_document(&url).await {
            Ok(document) => self.engine.evaluate(&selector, &document),
            Err(e) => Err(e),
        };

        match evaluated {
            Ok(evaluation) => {
                debug!(selector = %selector, url = %url, count = evaluation.count, "Selector tested");
                vec![
                    ServerMessage::selector_results(
                        evaluation.selector,
                        evaluation.matches,
                        request_id,
                    ),
                    ServerMessage::page_analysis(
                        Some(url),
                        evaluation.pattern_analysis,
                        request_id,
                    ),
                ]
            }
            Err(e) => {
                debug!(selector = %selector, url = %url, error = %e, "Selector test failed");
                vec![ServerMessage::error(
                    format!("Error testing selector: {e}"),
                    request_id,
                )]
            }
        }
    }

    async fn analyze_page(&self, url: String, request_id: Option<RequestSeq>) -> ServerMessage {
        match self.accessor.get_document(&url).await {
            Ok(document) => {
                let analysis = self.engine.analyze_document(&document);
                ServerMessage::page_analysis(Some(url), analysis, request_id)
            }
            Err(e) => ServerMessage::error(format!("Error analyzing page: {e}"), request_id),
        }
    }

    /// Describes an element picked in a rendered document.
    ///
    /// # Errors
    ///
    /// - [`Error::DocumentNotFound`] if the document is not loaded
    /// - [`Error::ElementNotFound`] if the path does not resolve
    pub async fn describe_pick(&self, pick: &ElementPick) -> Result<MatchedElement> {
        let document = self.accessor.get_document(&pick.url).await?;
        self.engine.describe_pick(&document, pick)
    }
}

/// Maps a decoding failure to the message reported to the client.
fn rejection_message(error: &Error) -> String {
    match error {
        Error::Json(_) => "Invalid JSON data".to_owned(),
        Error::UnknownAction { .. } => "Unknown action".to_owned(),
        Error::Protocol { message } => message.clone(),
        other => other.to_string(),
    }
}

/// Recovers `request_id` from a frame that failed to decode.
fn request_id_hint(text: &str) -> Option<RequestSeq> {
    serde_json::from_str::<Value>(text)
        .ok()?
        .get("request_id")?
        .as_u64()
        .map(RequestSeq::new)
}

// ============================================================================
// Channel Loop
// ============================================================================

impl SelectorService {
    /// Serves one selector channel until the peer closes it.
    ///
    /// # Errors
    ///
    /// Returns the transport error that ended the channel, if any.
    pub async fn serve(&self, config_id: &ConfigId, transport: Transport) -> Result<()> {
        let Transport {
            mut sink,
            mut stream,
        } = transport;

        info!(config_id = %config_id, "Selector channel open");

        while let Some(frame) = stream.next().await {
            let text = match frame {
                Ok(text) => text,
                Err(e) => {
                    warn!(config_id = %config_id, error = %e, "Selector channel failed");
                    return Err(e);
                }
            };
            trace!(config_id = %config_id, bytes = text.len(), "Frame received");

            for reply in self.handle_frame(&text).await {
                let encoded = encode_server(&reply)?;
                trace!(config_id = %config_id, kind = reply.message_type(), "Frame sent");
                sink.send(encoded).await?;
            }
        }

        let _ = sink.close().await;
        info!(config_id = %config_id, "Selector channel closed");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
