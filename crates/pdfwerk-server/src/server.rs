// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Compression HTTP server.
//
// Listens on a raw Tokio TCP socket and serves one request per connection.
// The compression pipeline is synchronous and CPU bound, so each upload is
// handed to `spawn_blocking`; the accept loop keeps running meanwhile.
//
// # Routes
//
//   - POST /api/compress   multipart upload, answers with the compressed PDF
//   - GET  /api/health     liveness probe

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use serde_json::json;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use pdfwerk_core::error::{PdfwerkError, Result};
use pdfwerk_core::human_errors::{Severity, humanize_error};
use pdfwerk_core::{AppConfig, bytes_to_mb};

use crate::api::{CompressForm, run_compression};
use crate::http::{self, HttpRequest, HttpResponse};
use crate::multipart::Multipart;

const COMPRESS_PATH: &str = "/api/compress";
const HEALTH_PATH: &str = "/api/health";

/// Lifecycle state of the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerStatus {
    Stopped,
    Starting,
    Running,
}

/// State shared across all connection-handling tasks.
struct SharedState {
    config: Arc<AppConfig>,
    active_connections: Arc<AtomicU32>,
}

/// HTTP front end for the compression pipeline.
pub struct CompressServer {
    config: Arc<AppConfig>,
    status: ServerStatus,
    /// Address actually bound; differs from the configured one when port 0
    /// was requested.
    local_addr: Option<SocketAddr>,
    shutdown_signal: Arc<Notify>,
    task_handle: Option<JoinHandle<()>>,
    active_connections: Arc<AtomicU32>,
}

impl CompressServer {
    /// Create a server in `Stopped` state. Call [`start`](Self::start) to
    /// begin accepting connections.
    pub fn new(config: AppConfig) -> Self {
        Self {
            config: Arc::new(config),
            status: ServerStatus::Stopped,
            local_addr: None,
            shutdown_signal: Arc::new(Notify::new()),
            task_handle: None,
            active_connections: Arc::new(AtomicU32::new(0)),
        }
    }

    /// The bound port while running, otherwise the configured one.
    pub fn port(&self) -> u16 {
        self.local_addr
            .map(|addr| addr.port())
            .unwrap_or(self.config.server.port)
    }

    pub fn status(&self) -> ServerStatus {
        self.status
    }

    pub fn active_connections(&self) -> u32 {
        self.active_connections.load(Ordering::Relaxed)
    }

    /// Bind the listener and spawn the accept loop.
    ///
    /// # Errors
    ///
    /// Fails when the bind address is invalid or already in use.
    pub async fn start(&mut self) -> Result<SocketAddr> {
        if let (ServerStatus::Running, Some(addr)) = (self.status, self.local_addr) {
            debug!(%addr, "server already running");
            return Ok(addr);
        }
        self.status = ServerStatus::Starting;

        let bind = format!(
            "{}:{}",
            self.config.server.bind_address, self.config.server.port
        );
        let listener = match TcpListener::bind(&bind).await {
            Ok(listener) => listener,
            Err(e) => {
                self.status = ServerStatus::Stopped;
                return Err(PdfwerkError::Server(format!("bind {bind}: {e}")));
            }
        };
        let addr = listener
            .local_addr()
            .map_err(|e| PdfwerkError::Server(format!("local address: {e}")))?;

        info!(
            %addr,
            max_upload_mb = bytes_to_mb(self.config.server.max_upload_bytes as u64),
            "pdfwerk server listening"
        );

        let shared = Arc::new(SharedState {
            config: Arc::clone(&self.config),
            active_connections: Arc::clone(&self.active_connections),
        });
        let shutdown = Arc::clone(&self.shutdown_signal);
        let handle = tokio::spawn(async move {
            Self::accept_loop(listener, shutdown, shared).await;
        });

        self.task_handle = Some(handle);
        self.local_addr = Some(addr);
        self.status = ServerStatus::Running;
        Ok(addr)
    }

    /// Stop accepting connections and wait for the accept loop to exit.
    /// Requests already being handled run to completion.
    pub async fn stop(&mut self) -> Result<()> {
        if self.status != ServerStatus::Running {
            return Ok(());
        }
        info!(port = self.port(), "stopping pdfwerk server");
        self.shutdown_signal.notify_one();

        if let Some(handle) = self.task_handle.take() {
            handle
                .await
                .map_err(|e| PdfwerkError::Server(format!("task join: {e}")))?;
        }
        self.status = ServerStatus::Stopped;
        self.local_addr = None;
        info!("pdfwerk server stopped");
        Ok(())
    }

    async fn accept_loop(listener: TcpListener, shutdown: Arc<Notify>, shared: Arc<SharedState>) {
        loop {
            tokio::select! {
                _ = shutdown.notified() => {
                    debug!("accept loop received shutdown signal");
                    break;
                }

                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, peer_addr)) => {
                            debug!(peer = %peer_addr, "incoming connection");
                            let state = Arc::clone(&shared);
                            tokio::spawn(async move {
                                state.active_connections.fetch_add(1, Ordering::Relaxed);
                                if let Err(e) = Self::handle_connection(stream, peer_addr, &state).await {
                                    warn!(peer = %peer_addr, error = %e, "connection handler error");
                                }
                                state.active_connections.fetch_sub(1, Ordering::Relaxed);
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "failed to accept connection");
                        }
                    }
                }
            }
        }
    }

    /// Read one request, dispatch it and write the response.
    async fn handle_connection(
        mut stream: TcpStream,
        peer_addr: SocketAddr,
        state: &SharedState,
    ) -> Result<()> {
        let limit = state.config.server.max_upload_bytes;
        let response = match http::read_request(&mut stream, limit).await {
            Ok(request) => {
                info!(peer = %peer_addr, method = %request.method, path = %request.path, "request");
                route(request, Arc::clone(&state.config)).await
            }
            Err(PdfwerkError::Io(e)) => {
                debug!(peer = %peer_addr, error = %e, "client went away");
                return Ok(());
            }
            Err(e) => error_response(&e),
        };

        info!(peer = %peer_addr, status = response.status, bytes = response.body.len(), "response");
        http::send_response(&mut stream, &response).await
    }
}

/// Dispatch a request to its handler.
async fn route(request: HttpRequest, config: Arc<AppConfig>) -> HttpResponse {
    match (request.method.as_str(), request.path.as_str()) {
        ("POST", COMPRESS_PATH) => compress(request, config).await,
        ("GET", HEALTH_PATH) => HttpResponse::json(200, &json!({ "status": "ok" })),
        (_, COMPRESS_PATH) => {
            HttpResponse::error(405, "method not allowed").with_header("Allow", "POST")
        }
        (_, HEALTH_PATH) => {
            HttpResponse::error(405, "method not allowed").with_header("Allow", "GET")
        }
        _ => HttpResponse::error(404, "not found"),
    }
}

async fn compress(request: HttpRequest, config: Arc<AppConfig>) -> HttpResponse {
    let request_id = Uuid::new_v4();
    let content_type = request.header("content-type").map(str::to_string);
    let form = Multipart::from_request(content_type.as_deref(), request.body)
        .await
        .and_then(|form| CompressForm::from_multipart(form, &config.compression));
    let form = match form {
        Ok(form) => form,
        Err(e) => return error_response(&e),
    };
    debug!(%request_id, request = ?form.request, "compression requested");

    let job = tokio::task::spawn_blocking(move || run_compression(form, &config, request_id));
    match job.await {
        Ok(Ok(compressed)) => compressed.into_response(),
        Ok(Err(e)) => error_response(&e),
        Err(e) => error_response(&PdfwerkError::Server(format!("compression task failed: {e}"))),
    }
}

/// JSON error body with the status from `humanize_error`.
fn error_response(err: &PdfwerkError) -> HttpResponse {
    let human = humanize_error(err);
    match human.severity {
        Severity::ClientError => warn!(error = %err, status = human.status, "request rejected"),
        Severity::Permanent | Severity::Transient => {
            error!(error = %err, status = human.status, "request failed")
        }
    }
    HttpResponse::error(human.status, &human.to_line())
}
