//! WebSocket evaluation server.
//!
//! Accepts selector channels on a single port and runs the evaluation
//! service for each one.
//!
//! # Connection Flow
//!
//! 1. Bind to `ip:port` (port 0 picks a random port)
//! 2. Client connects to `/ws/crawling/selector/<config_id>/`
//! 3. Paths outside the route are refused during the handshake with 404
//! 4. The channel is served until the client disconnects
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │            EvaluationServer              │
//! │              (single port)               │
//! │  ┌────────────────────────────────────┐  │
//! │  │ /ws/crawling/selector/7/  → serve  │  │
//! │  │ /ws/crawling/selector/42/ → serve  │  │
//! │  └────────────────────────────────────┘  │
//! └──────────────────────────────────────────┘
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::identifiers::ConfigId;
use crate::service::SelectorService;

use super::connector::Transport;

// ============================================================================
// Constants
// ============================================================================

/// Default bind address (localhost).
const DEFAULT_BIND_IP: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

/// Accept poll interval; bounds how long shutdown takes to be noticed.
const ACCEPT_POLL: Duration = Duration::from_millis(100);

// ============================================================================
// EvaluationServer
// ============================================================================

/// WebSocket server hosting selector channels.
///
/// # Example
///
/// ```ignore
/// let server = EvaluationServer::start(service).await?;
/// let options = ConnectionOptions::new().with_endpoint(server.ws_url());
/// ```
pub struct EvaluationServer {
    /// Bound port.
    port: u16,

    /// Bound address.
    ip: IpAddr,

    /// Service answering every channel.
    service: Arc<SelectorService>,

    /// Open channels per configuration id.
    channels: RwLock<FxHashMap<ConfigId, usize>>,

    /// Shutdown flag.
    shutdown: AtomicBool,
}

// ============================================================================
// EvaluationServer - Constructor
// ============================================================================

impl EvaluationServer {
    /// Starts a server on `localhost:0`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if binding fails.
    pub async fn start(service: Arc<SelectorService>) -> Result<Arc<Self>> {
        Self::bind(DEFAULT_BIND_IP, 0, service).await
    }

    /// Starts a server on a specific address and port.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if binding fails.
    pub async fn bind(ip: IpAddr, port: u16, service: Arc<SelectorService>) -> Result<Arc<Self>> {
        let listener = TcpListener::bind(SocketAddr::new(ip, port)).await?;
        let actual_port = listener.local_addr()?.port();

        let server = Arc::new(Self {
            port: actual_port,
            ip,
            service,
            channels: RwLock::new(FxHashMap::default()),
            shutdown: AtomicBool::new(false),
        });

        let accepting = Arc::clone(&server);
        tokio::spawn(async move {
            accepting.accept_loop(listener).await;
        });

        info!(port = actual_port, "Evaluation server started");

        Ok(server)
    }
}

// ============================================================================
// EvaluationServer - Public API
// ============================================================================

impl EvaluationServer {
    /// Returns the bound port.
    #[inline]
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns the bound socket address.
    #[inline]
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.port)
    }

    /// Returns the endpoint url for connection options.
    ///
    /// Format: `ws://{ip}:{port}`
    #[must_use]
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.local_addr())
    }

    /// Returns the number of open channels.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.channels.read().values().sum()
    }

    /// Returns `true` if a channel for `config_id` is open.
    #[must_use]
    pub fn has_channel(&self, config_id: &ConfigId) -> bool {
        self.channels.read().contains_key(config_id)
    }

    /// Stops accepting channels.
    ///
    /// Open channels run until their clients disconnect.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        info!(port = self.port, "Evaluation server shutting down");
    }
}

// ============================================================================
// EvaluationServer - Accept Loop
// ============================================================================

impl EvaluationServer {
    async fn accept_loop(self: Arc<Self>, listener: TcpListener) {
        debug!("Accept loop started");

        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                break;
            }

            match timeout(ACCEPT_POLL, listener.accept()).await {
                Ok(Ok((stream, addr))) => {
                    let server = Arc::clone(&self);
                    tokio::spawn(async move {
                        if let Err(e) = server.handle_connection(stream, addr).await {
                            warn!(error = %e, ?addr, "Channel handling failed");
                        }
                    });
                }
                Ok(Err(e)) => {
                    error!(error = %e, "Accept failed");
                }
                Err(_) => continue,
            }
        }

        debug!("Accept loop terminated");
    }

    async fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) -> Result<()> {
        debug!(?addr, "New TCP connection");

        let mut routed: Option<ConfigId> = None;
        let socket = tokio_tungstenite::accept_hdr_async(
            stream,
            |request: &Request, response: Response| -> std::result::Result<Response, ErrorResponse> {
                let path = request.uri().path();
                match ConfigId::from_channel_path(path) {
                    Some(config_id) => {
                        routed = Some(config_id);
                        Ok(response)
                    }
                    None => Err(not_found(path)),
                }
            },
        )
        .await
        .map_err(|e| Error::connection(format!("WebSocket upgrade failed: {e}")))?;

        let config_id = routed.ok_or_else(|| Error::protocol("Channel path missing"))?;
        info!(config_id = %config_id, ?addr, "Selector channel accepted");

        self.register(&config_id);
        let served = self
            .service
            .serve(&config_id, Transport::from_websocket(socket))
            .await;
        self.unregister(&config_id);

        served
    }

    fn register(&self, config_id: &ConfigId) {
        *self.channels.write().entry(config_id.clone()).or_insert(0) += 1;
    }

    fn unregister(&self, config_id: &ConfigId) {
        let mut channels = self.channels.write();
        if let Some(count) = channels.get_mut(config_id) {
            *count -= 1;
            if *count == 0 {
                channels.remove(config_id);
            }
        }
    }
}

fn not_found(path: &str) -> ErrorResponse {
    debug!(path, "Rejected channel path");
    let mut response = ErrorResponse::new(Some(format!("No selector channel at {path}")));
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
}

// ============================================================================
// Tests
// ============================================================================
