use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::error::TransportError;

/// An established connection to the broker.
#[async_trait]
pub trait Socket: Send {
    async fn send_binary(&mut self, payload: Vec<u8>) -> Result<(), TransportError>;

    fn is_closed(&self) -> bool;

    /// Must succeed on a socket that is already closed.
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Dials sockets. Holds whatever process-wide session the transport needs and
/// gives it up on [`Connector::release`].
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Box<dyn Socket>, TransportError>;

    async fn release(&self);
}

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

pub struct WsSocket {
    sink: WsSink,
    closed: Arc<AtomicBool>,
    reader: JoinHandle<()>,
}

impl WsSocket {
    fn new(stream: WebSocketStream<MaybeTlsStream<TcpStream>>) -> Self {
        let (sink, mut read) = stream.split();
        let closed = Arc::new(AtomicBool::new(false));

        // The broker does not talk back; drain frames so close frames and
        // read errors flip the flag the watchdog polls.
        let reader_closed = closed.clone();
        let reader = tokio::spawn(async move {
            while let Some(msg) = read.next().await {
                match msg {
                    Ok(Message::Close(frame)) => {
                        tracing::debug!("broker sent close frame: {frame:?}");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::debug!("gateway socket read error: {e}");
                        break;
                    }
                }
            }
            reader_closed.store(true, Ordering::Release);
        });

        Self {
            sink,
            closed,
            reader,
        }
    }
}

#[async_trait]
impl Socket for WsSocket {
    async fn send_binary(&mut self, payload: Vec<u8>) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        if let Err(e) = self.sink.send(Message::Binary(payload.into())).await {
            self.closed.store(true, Ordering::Release);
            return Err(e.into());
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        let was_closed = self.closed.swap(true, Ordering::AcqRel);
        self.reader.abort();
        match self.sink.close().await {
            Ok(()) => Ok(()),
            Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => Ok(()),
            Err(_) if was_closed => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for WsSocket {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

#[derive(Default)]
pub struct WsConnector {
    released: AtomicBool,
}

impl WsConnector {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Socket>, TransportError> {
        if self.released.load(Ordering::Acquire) {
            return Err(TransportError::Released);
        }
        let (stream, _response) = connect_async(url).await?;
        Ok(Box::new(WsSocket::new(stream)))
    }

    async fn release(&self) {
        self.released.store(true, Ordering::Release);
    }
}
