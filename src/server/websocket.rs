//! WebSocket delivery surface

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::Message;
use tracing::{debug, error, info, instrument, warn};

use super::session::{Route, Session, SessionContext};
use crate::common::channels::{create_outbound_channel_with_size, ChannelListener};
use crate::common::errors::{Result, TrackerError};
use crate::config::types::ServerConfig;

/// Accepts WebSocket clients and wires each one into the registry
pub struct WebSocketServer {
    context: SessionContext,
    config: ServerConfig,
}

impl WebSocketServer {
    pub fn new(context: SessionContext, config: ServerConfig) -> Self {
        Self { context, config }
    }

    /// Bind the configured address
    pub async fn bind(&self) -> Result<TcpListener> {
        TcpListener::bind(&self.config.bind_address)
            .await
            .map_err(|e| {
                TrackerError::Configuration(format!(
                    "cannot bind {}: {}",
                    self.config.bind_address, e
                ))
            })
    }

    /// Accept connections until `shutdown` flips to `true` or its sender is dropped
    pub async fn run(
        self: Arc<Self>,
        listener: TcpListener,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        match listener.local_addr() {
            Ok(addr) => info!("WebSocket server listening on ws://{}", addr),
            Err(e) => warn!("WebSocket server listening (address unknown: {})", e),
        }

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            let server = self.clone();
                            tokio::spawn(async move {
                                if let Err(e) = server.handle_connection(stream, peer).await {
                                    warn!(%peer, "Connection ended with error: {}", e);
                                }
                            });
                        }
                        Err(e) => error!("Failed to accept connection: {}", e),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("WebSocket server shutting down");
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    #[instrument(skip(self, stream))]
    async fn handle_connection(&self, stream: TcpStream, peer: SocketAddr) -> Result<()> {
        let mut path = String::new();
        let ws_stream = accept_hdr_async(stream, |request: &Request, response: Response| {
            path = request.uri().path().to_string();
            Ok::<Response, ErrorResponse>(response)
        })
        .await?;

        let (mut write, mut read) = ws_stream.split();
        let (tx, mut rx) = create_outbound_channel_with_size(self.config.outbound_buffer);
        let session = Session::open(
            Arc::new(ChannelListener::new(tx)),
            Route::from_path(&path),
            self.context.clone(),
        );

        // Drains the outbound queue; ends when every sender is gone
        let writer = tokio::spawn(async move {
            while let Some(text) = rx.recv().await {
                if let Err(e) = write.send(Message::Text(text)).await {
                    debug!("Write failed: {}", e);
                    return;
                }
            }
            let _ = write.close().await;
        });

        let mut result = Ok(());
        while let Some(msg) = read.next().await {
            match msg {
                Ok(Message::Text(text)) => session.handle_text(&text).await,
                Ok(Message::Binary(_)) => {
                    debug!(listener = %session.id(), "Ignoring binary frame");
                }
                Ok(Message::Close(frame)) => {
                    debug!(listener = %session.id(), "Close received: {:?}", frame);
                    break;
                }
                // Ping/pong are answered by tungstenite
                Ok(_) => {}
                Err(e) => {
                    result = Err(e.into());
                    break;
                }
            }
        }

        session.close();
        writer.abort();
        result
    }
}
