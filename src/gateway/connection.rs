use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::error::{GatewayError, TransportError};
use super::transport::{Connector, Socket, WsConnector};
use super::watchdog;
use crate::config::GatewayConfig;

/// Upper bound on one frame write (and on closing a stale socket). The slot
/// lock is held for the duration, so a stalled peer must not hold it forever.
const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
    pub staged_countdown: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(3),
            staged_countdown: false,
        }
    }
}

impl RetryPolicy {
    /// Sleep out the inter-attempt delay. Returns `false` if cancelled first.
    async fn wait(&self, cancel: &CancellationToken) -> bool {
        if !self.staged_countdown || self.delay < Duration::from_secs(1) {
            return tokio::select! {
                _ = cancel.cancelled() => false,
                _ = tokio::time::sleep(self.delay) => true,
            };
        }

        let step = Duration::from_secs(1);
        let mut remaining = self.delay;
        while !remaining.is_zero() {
            tracing::info!("retrying gateway connection in {}s", remaining.as_secs_f32().ceil());
            let nap = remaining.min(step);
            tokio::select! {
                _ = cancel.cancelled() => return false,
                _ = tokio::time::sleep(nap) => {}
            }
            remaining -= nap;
        }
        true
    }
}

/// Returned by [`GatewayConnection::write`] so callers know which socket
/// generation the failure belongs to.
pub(super) struct WriteFailure {
    pub generation: u64,
    pub error: TransportError,
}

struct Slot {
    socket: Option<Box<dyn Socket>>,
    /// Bumped on every successful connect.
    generation: u64,
    watchdog: Option<JoinHandle<()>>,
}

struct Inner {
    url: String,
    connector: Arc<dyn Connector>,
    policy: RetryPolicy,
    watchdog_interval: Duration,
    slot: Mutex<Slot>,
    reconnect_lock: Mutex<()>,
    retry_count: AtomicU32,
    cancel: CancellationToken,
}

/// Supervised connection to the broker. Cheap to clone; every clone drives
/// the same socket.
#[derive(Clone)]
pub struct GatewayConnection {
    inner: Arc<Inner>,
}

impl GatewayConnection {
    pub fn new(
        url: impl Into<String>,
        connector: Arc<dyn Connector>,
        policy: RetryPolicy,
        watchdog_interval: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                url: url.into(),
                connector,
                policy,
                watchdog_interval,
                slot: Mutex::new(Slot {
                    socket: None,
                    generation: 0,
                    watchdog: None,
                }),
                reconnect_lock: Mutex::new(()),
                retry_count: AtomicU32::new(0),
                cancel: CancellationToken::new(),
            }),
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        let policy = RetryPolicy {
            attempts: config.connect_attempts.max(1),
            delay: config.retry_delay(),
            staged_countdown: config.staged_countdown,
        };
        Self::new(
            config.url.clone(),
            Arc::new(WsConnector::new()),
            policy,
            config.watchdog_interval(),
        )
    }

    /// Build a connection from config and dial it.
    pub async fn open(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let conn = Self::from_config(config);
        conn.connect().await?;
        Ok(conn)
    }

    pub fn url(&self) -> &str {
        &self.inner.url
    }

    /// Failed attempts in the current (or last) connect cycle.
    pub fn retry_count(&self) -> u32 {
        self.inner.retry_count.load(Ordering::Relaxed)
    }

    pub async fn generation(&self) -> u64 {
        self.inner.slot.lock().await.generation
    }

    pub async fn is_connected(&self) -> bool {
        self.health().await.1
    }

    pub(super) async fn health(&self) -> (u64, bool) {
        let slot = self.inner.slot.lock().await;
        let alive = slot.socket.as_ref().is_some_and(|s| !s.is_closed());
        (slot.generation, alive)
    }

    pub(super) fn watchdog_interval(&self) -> Duration {
        self.inner.watchdog_interval
    }

    pub(super) fn retry_delay(&self) -> Duration {
        self.inner.policy.delay
    }

    pub(super) fn cancel_token(&self) -> CancellationToken {
        self.inner.cancel.clone()
    }

    /// Dial the broker, retrying transient failures up to the policy's bound.
    pub async fn connect(&self) -> Result<(), GatewayError> {
        let _guard = self.inner.reconnect_lock.lock().await;
        self.dial().await
    }

    /// Reconnect after a failure seen on socket `seen`. If another task has
    /// already replaced that socket this returns without dialing.
    pub(crate) async fn reconnect_from(&self, seen: u64) -> Result<(), GatewayError> {
        let _guard = self.inner.reconnect_lock.lock().await;
        let current = self.inner.slot.lock().await.generation;
        if current != seen {
            tracing::debug!("gateway already reconnected (generation {current}), skipping");
            return Ok(());
        }
        self.dial().await
    }

    async fn dial(&self) -> Result<(), GatewayError> {
        let inner = &self.inner;
        if inner.cancel.is_cancelled() {
            return Err(GatewayError::ShuttingDown);
        }

        // The slot never holds a dead socket while we retry.
        let stale = inner.slot.lock().await.socket.take();
        if let Some(mut socket) = stale {
            match tokio::time::timeout(WRITE_TIMEOUT, socket.close()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::debug!("error closing stale gateway socket: {e}"),
                Err(_) => tracing::debug!("timed out closing stale gateway socket"),
            }
        }

        let attempts = inner.policy.attempts;
        for attempt in 1..=attempts {
            tracing::info!("connecting to gateway at {} (attempt {attempt}/{attempts})", inner.url);
            match inner.connector.connect(&inner.url).await {
                Ok(socket) => {
                    let generation = self.install(socket).await;
                    inner.retry_count.store(0, Ordering::Relaxed);
                    tracing::info!("gateway connected (generation {generation})");
                    return Ok(());
                }
                Err(e) if !e.is_transient() => {
                    tracing::error!("gateway connect failed permanently: {e}");
                    return Err(GatewayError::Transport(e));
                }
                Err(e) => {
                    inner.retry_count.store(attempt, Ordering::Relaxed);
                    tracing::warn!("gateway connect attempt {attempt}/{attempts} failed: {e}");
                    if attempt < attempts && !inner.policy.wait(&inner.cancel).await {
                        return Err(GatewayError::ShuttingDown);
                    }
                }
            }
        }

        tracing::error!("could not connect to gateway at {} after {attempts} attempt(s)", inner.url);
        Err(GatewayError::ConnectionUnavailable { attempts })
    }

    async fn install(&self, socket: Box<dyn Socket>) -> u64 {
        let mut slot = self.inner.slot.lock().await;
        slot.generation += 1;
        slot.socket = Some(socket);
        // A previous watchdog sees the new generation and exits on its own.
        slot.watchdog = Some(watchdog::spawn(self.clone(), slot.generation));
        slot.generation
    }

    pub(super) async fn write(&self, payload: Vec<u8>) -> Result<(), WriteFailure> {
        let mut slot = self.inner.slot.lock().await;
        let generation = slot.generation;
        match slot.socket.as_mut() {
            Some(socket) => {
                match tokio::time::timeout(WRITE_TIMEOUT, socket.send_binary(payload)).await {
                    Ok(result) => result.map_err(|error| WriteFailure { generation, error }),
                    Err(_) => Err(WriteFailure {
                        generation,
                        error: TransportError::TimedOut,
                    }),
                }
            }
            None => Err(WriteFailure {
                generation,
                error: TransportError::Closed,
            }),
        }
    }

    /// Stop the watchdog, close the socket, then release the transport.
    /// Safe to call more than once.
    pub async fn shutdown(&self) {
        let inner = &self.inner;
        inner.cancel.cancel();

        let _guard = inner.reconnect_lock.lock().await;
        let (socket, watchdog) = {
            let mut slot = inner.slot.lock().await;
            (slot.socket.take(), slot.watchdog.take())
        };

        if let Some(handle) = watchdog {
            handle.abort();
        }
        if let Some(mut socket) = socket {
            match tokio::time::timeout(WRITE_TIMEOUT, socket.close()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!("failed to close gateway socket cleanly: {e}"),
                Err(_) => tracing::warn!("timed out closing gateway socket"),
            }
        }
        inner.connector.release().await;
        tracing::info!("gateway connection to {} shut down", inner.url);
    }
}
