use crate::TransportError;
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tungstenite::protocol::Message as WsMessage;

/// Inbound text frames, in arrival order. The channel ends when the
/// connection closes; a trailing `Err` reports an abnormal close.
pub type Inbound = mpsc::UnboundedReceiver<Result<String, TransportError>>;

enum Outbound {
    Text(String),
    Close,
}

/// Handle to an open WebSocket connection.
///
/// All writes go through a single writer task, so frames queued from
/// different callers are sent whole and in queue order.
#[derive(Debug, Clone)]
pub struct WebSocketConnection {
    url: String,
    tx: mpsc::UnboundedSender<Outbound>,
}

impl WebSocketConnection {
    fn spawn<S>(url: String, stream: tokio_tungstenite::WebSocketStream<S>) -> (Self, Inbound)
    where
        S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Send + Unpin + 'static,
    {
        let (tx, mut rx_internal) = mpsc::unbounded_channel::<Outbound>();
        let (tx_internal, rx) = mpsc::unbounded_channel();
        let (mut sink, mut source) = stream.split();

        // Spawn task to handle outgoing frames
        let writer_url = url.clone();
        tokio::spawn(async move {
            while let Some(frame) = rx_internal.recv().await {
                match frame {
                    Outbound::Text(text) => {
                        if let Err(e) = sink.send(WsMessage::text(text)).await {
                            warn!("Failed to send WebSocket frame to {}: {}", writer_url, e);
                            break;
                        }
                    }
                    Outbound::Close => {
                        if let Err(e) = sink.close().await {
                            debug!("WebSocket close for {} failed: {}", writer_url, e);
                        }
                        break;
                    }
                }
            }
        });

        // Spawn task to handle incoming frames
        let reader_url = url.clone();
        tokio::spawn(async move {
            while let Some(result) = source.next().await {
                let item = match result {
                    Ok(WsMessage::Text(text)) => Ok(text.as_str().to_string()),
                    Ok(WsMessage::Binary(data)) => String::from_utf8(data.to_vec())
                        .map_err(|_| TransportError::Protocol("binary frame is not UTF-8".to_string())),
                    Ok(WsMessage::Close(frame)) => {
                        info!("WebSocket {} closed by peer: {:?}", reader_url, frame);
                        break;
                    }
                    Ok(_) => continue,
                    Err(e) => {
                        let _ = tx_internal.send(Err(TransportError::Protocol(e.to_string())));
                        break;
                    }
                };
                if tx_internal.send(item).is_err() {
                    break;
                }
            }
            debug!("WebSocket reader for {} finished", reader_url);
        });

        (WebSocketConnection { url, tx }, rx)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Queue one text frame.
    pub fn send_text(&self, text: impl Into<String>) -> Result<(), TransportError> {
        self.tx
            .send(Outbound::Text(text.into()))
            .map_err(|_| TransportError::ConnectionClosed)
    }

    /// Send a close frame after every frame already queued.
    pub fn close(&self) {
        let _ = self.tx.send(Outbound::Close);
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Default bound on the TCP connect plus the opening handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// WebSocket client transport. `ws://` and `wss://` (rustls) URLs.
#[derive(Debug, Clone)]
pub struct WebSocketClient {
    url: String,
    connect_timeout: Duration,
}

impl WebSocketClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Connect and complete the opening handshake. A peer that does not
    /// finish the handshake within the connect timeout is a
    /// [`TransportError::Timeout`].
    pub async fn connect(&self) -> Result<(WebSocketConnection, Inbound), TransportError> {
        let handshake = tokio_tungstenite::connect_async(self.url.as_str());
        let (stream, _) = tokio::time::timeout(self.connect_timeout, handshake)
            .await
            .map_err(|_| {
                TransportError::Timeout(format!(
                    "{}: no handshake within {:?}",
                    self.url, self.connect_timeout
                ))
            })?
            .map_err(|e| TransportError::Connect(format!("{}: {}", self.url, e)))?;
        info!("WebSocket connected to {}", self.url);

        Ok(WebSocketConnection::spawn(self.url.clone(), stream))
    }
}
