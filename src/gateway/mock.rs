//! Scripted transport for supervisor, sender and watchdog tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::error::TransportError;
use super::transport::{Connector, Socket};

#[derive(Debug, Clone, Copy)]
pub enum Outcome {
    Refuse,
    /// Accept, then fail the first `failing_writes` writes on the new socket.
    Accept { failing_writes: u32 },
    /// Accept, then hang forever on every write and on close.
    Stall,
}

#[derive(Default)]
pub struct SocketProbe {
    closed: AtomicBool,
    stalled: AtomicBool,
    failing_writes: AtomicU32,
    close_calls: AtomicU32,
    frames: Mutex<Vec<Vec<u8>>>,
}

impl SocketProbe {
    pub fn drop_connection(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.frames.lock().unwrap().clone()
    }

    pub fn close_calls(&self) -> u32 {
        self.close_calls.load(Ordering::SeqCst)
    }
}

struct MockSocket {
    probe: Arc<SocketProbe>,
}

#[async_trait]
impl Socket for MockSocket {
    async fn send_binary(&mut self, payload: Vec<u8>) -> Result<(), TransportError> {
        if self.probe.stalled.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.probe.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        let failing = self.probe.failing_writes.load(Ordering::SeqCst);
        if failing > 0 {
            self.probe.failing_writes.store(failing - 1, Ordering::SeqCst);
            self.probe.closed.store(true, Ordering::SeqCst);
            return Err(TransportError::Closed);
        }
        self.probe.frames.lock().unwrap().push(payload);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.probe.closed.load(Ordering::SeqCst)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.probe.close_calls.fetch_add(1, Ordering::SeqCst);
        if self.probe.stalled.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        self.probe.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Plays back `script` one outcome per dial; once exhausted every dial is
/// accepted with healthy writes.
#[derive(Default)]
pub struct MockConnector {
    script: Mutex<VecDeque<Outcome>>,
    attempts: AtomicU32,
    probes: Mutex<Vec<Arc<SocketProbe>>>,
    released: AtomicBool,
}

impl MockConnector {
    pub fn scripted(outcomes: impl IntoIterator<Item = Outcome>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(outcomes.into_iter().collect()),
            ..Default::default()
        })
    }

    pub fn healthy() -> Arc<Self> {
        Self::scripted([])
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Probe for the `n`th socket that was handed out (0-based).
    pub fn socket(&self, n: usize) -> Arc<SocketProbe> {
        self.probes.lock().unwrap()[n].clone()
    }

    pub fn sockets_opened(&self) -> usize {
        self.probes.lock().unwrap().len()
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, _url: &str) -> Result<Box<dyn Socket>, TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.released.load(Ordering::SeqCst) {
            return Err(TransportError::Released);
        }
        let outcome = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Outcome::Accept { failing_writes: 0 });
        let (failing_writes, stalled) = match outcome {
            Outcome::Refuse => return Err(TransportError::Closed),
            Outcome::Accept { failing_writes } => (failing_writes, false),
            Outcome::Stall => (0, true),
        };
        let probe = Arc::new(SocketProbe {
            failing_writes: AtomicU32::new(failing_writes),
            stalled: AtomicBool::new(stalled),
            ..Default::default()
        });
        self.probes.lock().unwrap().push(probe.clone());
        Ok(Box::new(MockSocket { probe }))
    }

    async fn release(&self) {
        self.released.store(true, Ordering::SeqCst);
    }
}
