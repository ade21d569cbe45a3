// Unix signal handling for graceful shutdown
// Delivers the first SIGTERM or SIGINT to the shutdown coordinator

use async_trait::async_trait;
use futures::StreamExt;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook_tokio::{Handle, Signals};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::shutdown::{ShutdownCoordinator, ShutdownTrigger};

/// Shutdown-class notification delivered to the process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// SIGINT (Ctrl+C)
    Interrupt,
    /// SIGTERM
    Terminate,
}

impl ShutdownSignal {
    /// Map a raw signal number to a shutdown signal
    pub fn from_raw(signal: i32) -> Option<Self> {
        match signal {
            SIGINT => Some(Self::Interrupt),
            SIGTERM => Some(Self::Terminate),
            _ => None,
        }
    }
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownSignal::Interrupt => write!(f, "SIGINT"),
            ShutdownSignal::Terminate => write!(f, "SIGTERM"),
        }
    }
}

/// Source of shutdown notifications
///
/// `recv` resolves with the next notification, or `None` once the source can
/// no longer deliver any.
#[async_trait]
pub trait ShutdownSignalSource: Send + 'static {
    async fn recv(&mut self) -> Option<ShutdownSignal>;
}

/// Operating system signals (SIGTERM and SIGINT)
///
/// Registration happens in `new`, so a signal that arrives before the
/// listener first polls is kept pending and delivered on the next `recv`.
pub struct OsSignalSource {
    signals: Signals,
    handle: Handle,
}

impl OsSignalSource {
    pub fn new() -> std::io::Result<Self> {
        let signals = Signals::new([SIGTERM, SIGINT])?;
        let handle = signals.handle();
        Ok(Self { signals, handle })
    }
}

#[async_trait]
impl ShutdownSignalSource for OsSignalSource {
    async fn recv(&mut self) -> Option<ShutdownSignal> {
        while let Some(raw) = self.signals.next().await {
            match ShutdownSignal::from_raw(raw) {
                Some(signal) => return Some(signal),
                None => debug!("Received unexpected signal: {}", raw),
            }
        }
        None
    }
}

impl Drop for OsSignalSource {
    fn drop(&mut self) {
        self.handle.close();
    }
}

/// In-process signal source backed by a single-slot channel
pub struct ChannelSignalSource {
    rx: mpsc::Receiver<ShutdownSignal>,
}

/// Sending half of a [`ChannelSignalSource`]
#[derive(Clone)]
pub struct SignalSender {
    tx: mpsc::Sender<ShutdownSignal>,
}

/// Create a connected sender/source pair with room for one pending signal
pub fn signal_channel() -> (SignalSender, ChannelSignalSource) {
    let (tx, rx) = mpsc::channel(1);
    (SignalSender { tx }, ChannelSignalSource { rx })
}

impl SignalSender {
    /// Deliver a signal without waiting
    ///
    /// Returns `false` when the slot is already occupied or the listener is gone;
    /// the pending signal is enough to trigger shutdown either way.
    pub fn deliver(&self, signal: ShutdownSignal) -> bool {
        self.tx.try_send(signal).is_ok()
    }
}

#[async_trait]
impl ShutdownSignalSource for ChannelSignalSource {
    async fn recv(&mut self) -> Option<ShutdownSignal> {
        self.rx.recv().await
    }
}

/// Wait for the first shutdown signal and fire the registered cancellation
///
/// Handles exactly one signal; the source is dropped when this returns.
pub async fn listen<S: ShutdownSignalSource>(
    mut source: S,
    coordinator: Arc<ShutdownCoordinator>,
) -> Option<ShutdownSignal> {
    let signal = match source.recv().await {
        Some(signal) => signal,
        None => {
            debug!("Signal source closed before delivering a shutdown signal");
            return None;
        }
    };

    info!(signal = %signal, "Received {} - graceful shutdown initiated", signal);
    if !coordinator.fire(ShutdownTrigger::Signal(signal)) {
        debug!(signal = %signal, "Root scope was already cancelled");
    }
    Some(signal)
}
