//! WebSocket transport for the multiplexer.
//!
//! Provides [`ConnectedSocket`], a pair of channels bridged to one WebSocket
//! by a background task. This layer only moves text: framing, heart-beats and
//! reconnects stay in the Sans-IO [`Multiplexer`](crate::Multiplexer).

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

/// Capacity of the channels in each direction.
const CHANNEL_CAPACITY: usize = 64;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// WebSocket handshake failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Socket task is gone.
    #[error("socket closed")]
    Closed,
}

/// Something that happened on the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    /// A text message, handed to `Multiplexer::receive` as is.
    Text(String),
    /// The socket closed or failed. No further events follow.
    Closed(String),
}

/// Handle to an open WebSocket.
///
/// Dropping the handle does not close the socket; call [`stop`](Self::stop).
#[derive(Debug)]
pub struct ConnectedSocket {
    /// Text to write to the socket.
    pub to_server: mpsc::Sender<String>,
    /// Events read from the socket.
    pub from_server: mpsc::Receiver<SocketEvent>,
    abort_handle: tokio::task::AbortHandle,
}

impl ConnectedSocket {
    /// Queue `text` for writing.
    ///
    /// # Errors
    ///
    /// - `TransportError::Closed` if the socket task has exited
    pub async fn send(&self, text: String) -> Result<(), TransportError> {
        self.to_server.send(text).await.map_err(|_| TransportError::Closed)
    }

    /// Next event, or `None` once the socket task has exited.
    pub async fn recv(&mut self) -> Option<SocketEvent> {
        self.from_server.recv().await
    }

    /// Stop the socket task.
    pub fn stop(&self) {
        self.abort_handle.abort();
    }
}

/// Open a WebSocket to `url` (`ws://` or `wss://`).
///
/// # Errors
///
/// - `TransportError::Connection` if the handshake fails
pub async fn connect(url: &str) -> Result<ConnectedSocket, TransportError> {
    let (stream, _) = tokio_tungstenite::connect_async(url)
        .await
        .map_err(|e| TransportError::Connection(e.to_string()))?;
    tracing::info!(url, "websocket open");

    let (to_server_tx, to_server_rx) = mpsc::channel::<String>(CHANNEL_CAPACITY);
    let (from_server_tx, from_server_rx) = mpsc::channel::<SocketEvent>(CHANNEL_CAPACITY);

    let handle = tokio::spawn(run_socket(stream, to_server_rx, from_server_tx));

    Ok(ConnectedSocket {
        to_server: to_server_tx,
        from_server: from_server_rx,
        abort_handle: handle.abort_handle(),
    })
}

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Bridge the socket and the channels until either side closes.
async fn run_socket(
    stream: WsStream,
    mut to_server: mpsc::Receiver<String>,
    from_server: mpsc::Sender<SocketEvent>,
) {
    let (mut write, mut read) = stream.split();

    let reason = loop {
        tokio::select! {
            outgoing = to_server.recv() => {
                let Some(text) = outgoing else {
                    let _ = write.send(Message::Close(None)).await;
                    break "closed locally".to_string();
                };
                if let Err(e) = write.send(Message::Text(text.into())).await {
                    break format!("write failed: {e}");
                }
            },
            incoming = read.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        let event = SocketEvent::Text(text.as_str().to_owned());
                        if from_server.send(event).await.is_err() {
                            break "receiver dropped".to_string();
                        }
                    },
                    Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                        Ok(text) => {
                            if from_server.send(SocketEvent::Text(text)).await.is_err() {
                                break "receiver dropped".to_string();
                            }
                        },
                        Err(_) => {
                            tracing::warn!(len = bytes.len(), "dropping non-UTF-8 binary message");
                        },
                    },
                    Some(Ok(Message::Close(frame))) => {
                        break frame.map_or_else(
                            || "closed by server".to_string(),
                            |f| f.reason.to_string(),
                        );
                    },
                    Some(Ok(_)) => {},
                    Some(Err(e)) => break format!("read failed: {e}"),
                    None => break "stream ended".to_string(),
                }
            },
        }
    };

    tracing::info!(%reason, "websocket closed");
    let _ = from_server.send(SocketEvent::Closed(reason)).await;
}
