//! Command implementations.
//!
//! Results go to stdout; notifications and logs go to stderr so output can be
//! piped.

pub mod cache;
pub mod cart;
pub mod resource;
pub mod session;

use chinchin_client::{ChinChinClient, NotifyLevel, Signal};
use thiserror::Error;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;

/// Errors raised by the CLI itself, before the client is involved.
#[derive(Debug, Error)]
pub enum CliError {
    /// A create/update payload was not a JSON object.
    #[error("Invalid JSON payload: {0}")]
    InvalidPayload(String),

    /// No password on the command line, in the environment or on stdin.
    #[error("Password required (use --password, CHINCHIN_PASSWORD or stdin)")]
    PasswordRequired,

    #[error("Failed to read stdin: {0}")]
    Stdin(#[from] std::io::Error),
}

/// Prints notifications and handles session expiry while a command runs.
pub struct Notifier {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl Notifier {
    pub fn spawn(client: &ChinChinClient) -> Self {
        let mut signals = client.signals().subscribe();
        let client = client.clone();
        let (shutdown, mut stop) = oneshot::channel();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    received = signals.recv() => match received {
                        Ok(signal) => handle(&client, signal),
                        Err(broadcast::error::RecvError::Lagged(missed)) => {
                            tracing::debug!(missed, "notifications dropped");
                        }
                        Err(broadcast::error::RecvError::Closed) => return,
                    },
                    _ = &mut stop => break,
                }
            }
            while let Ok(signal) = signals.try_recv() {
                handle(&client, signal);
            }
        });

        Self { shutdown, task }
    }

    /// Flush pending notifications and stop.
    pub async fn finish(self) {
        let _ = self.shutdown.send(());
        if let Err(e) = self.task.await {
            tracing::debug!(error = %e, "notifier task ended abnormally");
        }
    }
}

#[allow(clippy::print_stderr)]
fn handle(client: &ChinChinClient, signal: Signal) {
    match signal {
        Signal::Notify(notification) => {
            let tag = match notification.level {
                NotifyLevel::Success => "ok",
                NotifyLevel::Info => "info",
                NotifyLevel::Error => "error",
            };
            eprintln!("[{tag}] {}", notification.message);
        }
        Signal::ReauthenticateRequired => {
            if let Err(e) = client.session().handle_reauthentication() {
                tracing::warn!(error = %e, "failed to end expired session");
            }
        }
        Signal::StorageChanged | Signal::LoggedIn => {}
    }
}

/// Print a value as pretty JSON.
#[allow(clippy::print_stdout)]
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print one line of output.
#[allow(clippy::print_stdout)]
pub fn print_line(line: &str) {
    println!("{line}");
}

/// Parse a create/update payload; only JSON objects are accepted.
pub fn parse_payload(raw: &str) -> Result<serde_json::Value, CliError> {
    match serde_json::from_str(raw) {
        Ok(value @ serde_json::Value::Object(_)) => Ok(value),
        Ok(_) => Err(CliError::InvalidPayload("expected a JSON object".to_string())),
        Err(e) => Err(CliError::InvalidPayload(e.to_string())),
    }
}
