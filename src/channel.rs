//! Signals from background tasks back to the stream client

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::pr::PrReceipt;
use crate::sse::SseItem;

/// Something that happened off the client's task
///
/// Stream signals carry the id of the connection that produced them and PR
/// outcomes carry the session epoch, so anything from a superseded run can be
/// recognized and dropped.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    /// Backend accepted the stream
    Opened { run: Uuid },
    /// One decoder item
    Frame { run: Uuid, item: SseItem },
    /// Connection failed or broke
    Failed { run: Uuid, reason: String },
    /// Body ended
    Closed { run: Uuid },
    /// Countdown ticker fired
    Tick { run: Uuid },
    /// PR submission finished
    PrOutcome {
        epoch: Uuid,
        outcome: Result<PrReceipt, String>,
    },
}

impl Signal {
    /// Connection id for stream signals
    pub fn run(&self) -> Option<Uuid> {
        match self {
            Signal::Opened { run }
            | Signal::Frame { run, .. }
            | Signal::Failed { run, .. }
            | Signal::Closed { run }
            | Signal::Tick { run } => Some(*run),
            Signal::PrOutcome { .. } => None,
        }
    }
}

/// Sending half handed to background tasks
#[derive(Debug, Clone)]
pub struct SignalSender {
    tx: mpsc::UnboundedSender<Signal>,
}

impl SignalSender {
    /// Send a signal; fails only once the client is gone
    pub fn send(&self, signal: Signal) -> Result<(), ChannelError> {
        self.tx.send(signal).map_err(|_| ChannelError::Closed)
    }
}

/// Receiving half owned by the client
#[derive(Debug)]
pub struct SignalReceiver {
    rx: mpsc::UnboundedReceiver<Signal>,
}

impl SignalReceiver {
    /// Wait for the next signal
    pub async fn recv(&mut self) -> Option<Signal> {
        self.rx.recv().await
    }
}

/// Create a connected sender/receiver pair
pub fn signal_channel() -> (SignalSender, SignalReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (SignalSender { tx }, SignalReceiver { rx })
}

/// Channel errors
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel is closed")]
    Closed,
}

impl From<ChannelError> for crate::error::RelayError {
    fn from(e: ChannelError) -> Self {
        crate::error::RelayError::Channel(e.to_string())
    }
}
