//! In-process message channel between two parties.
//!
//! Messages travel as JSON lines so the wire shape matches what a socket
//! transport would carry. Only [`PartyMessage`] values are ever sent.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use naxos_crypto::{NaxosError, PartyMessage, Result};

/// One endpoint of a bidirectional channel.
#[derive(Debug)]
pub struct ChannelTransport {
    tx: Sender<String>,
    rx: Receiver<String>,
    timeout: Duration,
}

impl ChannelTransport {
    /// Create two connected endpoints.
    pub fn pair(timeout: Duration) -> (Self, Self) {
        let (a_tx, b_rx) = mpsc::channel();
        let (b_tx, a_rx) = mpsc::channel();
        (
            Self {
                tx: a_tx,
                rx: a_rx,
                timeout,
            },
            Self {
                tx: b_tx,
                rx: b_rx,
                timeout,
            },
        )
    }

    pub fn send(&self, message: &PartyMessage) -> Result<()> {
        let line = message.to_json()?;
        self.tx
            .send(line)
            .map_err(|_| NaxosError::Transport("peer endpoint closed".into()))
    }

    pub fn recv(&self) -> Result<PartyMessage> {
        let line = self.rx.recv_timeout(self.timeout).map_err(|e| match e {
            RecvTimeoutError::Timeout => NaxosError::Transport(format!(
                "no message from peer within {}ms",
                self.timeout.as_millis()
            )),
            RecvTimeoutError::Disconnected => {
                NaxosError::Transport("peer endpoint closed".into())
            }
        })?;
        PartyMessage::from_json(&line)
    }
}
