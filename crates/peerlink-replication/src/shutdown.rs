//! Cancellation signalling for subscription tasks
//!
//! One governing signal controls a whole subscription; child signals act as
//! cancellation handles for individual service watches.

use tokio::sync::watch;

/// Clonable cancellation signal.
///
/// A subscriber that attaches after the signal has fired still observes the
/// shutdown immediately.
#[derive(Clone)]
pub struct ShutdownSignal {
    sender: watch::Sender<bool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self { sender }
    }

    /// Trigger shutdown. Idempotent.
    pub fn shutdown(&self) {
        let _ = self.sender.send(true);
    }

    /// Check whether shutdown has been triggered.
    pub fn is_shutdown(&self) -> bool {
        *self.sender.borrow()
    }

    /// Wait until shutdown is triggered.
    pub async fn cancelled(&self) {
        let mut receiver = self.sender.subscribe();
        let _ = receiver.wait_for(|fired| *fired).await;
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}
