//! Process-wide signals.
//!
//! Components never call into the presentation or session layers directly;
//! they publish a [`Signal`] and whoever cares subscribes. Each client owns
//! its own bus, so two clients in one process (or two tests) stay isolated.

use tokio::sync::broadcast;
use tracing::debug;

const SIGNAL_BUS_CAPACITY: usize = 256;

/// Severity of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyLevel {
    Success,
    Info,
    Error,
}

/// A message meant for the user (toast, status line, stderr).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotifyLevel,
    pub message: String,
}

impl Notification {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotifyLevel::Success,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NotifyLevel::Info,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotifyLevel::Error,
            message: message.into(),
        }
    }
}

/// Events published by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// A refresh failed for good; credentials are gone and the user must
    /// sign in again.
    ReauthenticateRequired,
    /// The cache mirror wrote to storage; readers may re-render.
    StorageChanged,
    /// A login succeeded and credentials were stored.
    LoggedIn,
    /// Something the user should see.
    Notify(Notification),
}

/// Broadcast channel for [`Signal`]s.
///
/// Cloning yields another handle to the same channel.
#[derive(Debug, Clone)]
pub struct SignalBus {
    sender: broadcast::Sender<Signal>,
}

impl SignalBus {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(SIGNAL_BUS_CAPACITY);
        Self { sender }
    }

    /// Publish to every current subscriber. Having none is fine.
    pub fn publish(&self, signal: Signal) {
        debug!(?signal, receivers = self.sender.receiver_count(), "publishing signal");
        let _ = self.sender.send(signal);
    }

    /// Shorthand for `publish(Signal::Notify(..))`.
    pub fn notify(&self, notification: Notification) {
        self.publish(Signal::Notify(notification));
    }

    /// Receive every signal published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Signal> {
        self.sender.subscribe()
    }
}

impl Default for SignalBus {
    fn default() -> Self {
        Self::new()
    }
}
