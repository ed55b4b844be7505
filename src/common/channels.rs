//! Bounded outbound queues backing each connection's listener

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::errors::{Result, TrackerError};
use super::traits::{Listener, ListenerId};

/// Default per-connection buffer size
pub const DEFAULT_OUTBOUND_BUFFER: usize = 256;

/// Create an outbound queue with the default buffer size
pub fn create_outbound_channel() -> (mpsc::Sender<String>, mpsc::Receiver<String>) {
    mpsc::channel(DEFAULT_OUTBOUND_BUFFER)
}

/// Create an outbound queue with a custom buffer size
pub fn create_outbound_channel_with_size(
    size: usize,
) -> (mpsc::Sender<String>, mpsc::Receiver<String>) {
    mpsc::channel(size.max(1))
}

/// Listener that queues messages for a connection writer task
///
/// A full queue counts as a failed delivery: a consumer that cannot keep
/// up is dropped rather than stalling the broadcaster.
#[derive(Debug, Clone)]
pub struct ChannelListener {
    id: ListenerId,
    sender: mpsc::Sender<String>,
}

impl ChannelListener {
    pub fn new(sender: mpsc::Sender<String>) -> Self {
        Self {
            id: ListenerId::next(),
            sender,
        }
    }
}

impl Listener for ChannelListener {
    fn id(&self) -> ListenerId {
        self.id
    }

    fn send(&self, message: &str) -> Result<()> {
        self.sender
            .try_send(message.to_string())
            .map_err(|e| match e {
                TrySendError::Full(_) => {
                    TrackerError::ChannelSend(format!("{} outbound queue full", self.id))
                }
                TrySendError::Closed(_) => {
                    TrackerError::ChannelSend(format!("{} connection closed", self.id))
                }
            })
    }
}
