//! WebSocket gateway translating socket frames to engine requests

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{accept_async, tungstenite::protocol::Message};
use tracing::{debug, error, info, instrument, warn};

use crate::common::errors::{EngineError, Result};
use crate::engine::messages::InboundMessage;
use crate::engine::service::ScoreEngine;

/// Accepts websocket connections and wires each one to the engine
pub struct ScoreGateway {
    listener: TcpListener,
    engine: ScoreEngine,
}

impl ScoreGateway {
    /// Bind the listening socket
    pub async fn bind(addr: &str, engine: ScoreEngine) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| EngineError::Configuration(format!("cannot bind {}: {}", addr, e)))?;
        Ok(Self { listener, engine })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| EngineError::Internal(e.to_string()))
    }

    /// Accept connections until the task is dropped
    pub async fn run(self) -> Result<()> {
        info!("Score gateway listening on {}", self.local_addr()?);

        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!("Failed to accept connection: {}", e);
                    continue;
                }
            };

            let engine = self.engine.clone();
            tokio::spawn(async move {
                if let Err(e) = serve_connection(engine, stream, peer).await {
                    debug!("Connection {} ended with error: {}", peer, e);
                }
            });
        }
    }
}

#[instrument(skip(engine, stream))]
async fn serve_connection(engine: ScoreEngine, stream: TcpStream, peer: SocketAddr) -> Result<()> {
    let ws_stream = accept_async(stream).await?;
    let (mut write, mut read) = ws_stream.split();
    let (connection, mut outbound) = engine.connect().await;
    info!("{} connected from {}", connection, peer);

    let writer = tokio::spawn(async move {
        while let Some(message) = outbound.recv().await {
            let text = match message.to_json() {
                Ok(text) => text,
                Err(e) => {
                    error!("Failed to encode {}: {}", message.event_name(), e);
                    continue;
                }
            };
            if write.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
        let _ = write.close().await;
    });

    while let Some(frame) = read.next().await {
        match frame {
            Ok(Message::Text(text)) => match InboundMessage::parse(&text) {
                Ok(request) => engine.handle(connection, request).await,
                Err(e) => {
                    warn!("Undecodable frame from {}: {}", connection, e);
                    engine.send_error(connection, e.to_string(), None).await;
                }
            },
            Ok(Message::Close(frame)) => {
                debug!("{} closed: {:?}", connection, frame);
                break;
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                // Pong replies are queued by tungstenite
            }
            Ok(_) => {}
            Err(e) => {
                warn!("WebSocket error on {}: {}", connection, e);
                break;
            }
        }
    }

    engine.disconnect(connection).await;
    writer.abort();
    Ok(())
}
