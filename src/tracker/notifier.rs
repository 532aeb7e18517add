use std::io;
use std::process::{Command as StdCommand, Stdio};

use chrono::{DateTime, Utc};
use thiserror::Error;

const NOTIFY_PROGRAM: &str = "notify-send";
const NOTIFY_TIMEOUT_MS: u32 = 3000;

/// One-shot "overhead now" edge detector.
///
/// Fires when the predicted rise moves past the predicted set (the engine has
/// rolled over to the next pass while the current one is still under way) and
/// re-arms once rise precedes set again.
#[derive(Debug, Default)]
pub struct PassNotifier {
    notified: bool,
}

impl PassNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn is_notified(&self) -> bool {
        self.notified
    }

    /// Feed one tick's rise/set pair. Returns true when a notification is due.
    pub fn observe(&mut self, rise: DateTime<Utc>, set: DateTime<Utc>) -> bool {
        if rise > set && !self.notified {
            log::debug!("pass started, notifying");
            self.notified = true;
            return true;
        }
        if rise < set && self.notified {
            log::debug!("pass over, notifier re-armed");
            self.notified = false;
        }
        false
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("could not launch notify-send: {0}")]
    Spawn(#[from] io::Error),
    #[error("notify-send exited with status {0}")]
    Failed(i32),
}

pub trait Notify: Send + Sync {
    fn notify(&self, summary: &str) -> Result<(), NotifyError>;
}

/// Desktop notification through the freedesktop `notify-send` helper.
pub struct DesktopNotifier {
    app_name: String,
}

impl DesktopNotifier {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
        }
    }
}

impl Notify for DesktopNotifier {
    fn notify(&self, summary: &str) -> Result<(), NotifyError> {
        let status = StdCommand::new(NOTIFY_PROGRAM)
            .arg(format!("--app-name={}", self.app_name))
            .arg(format!("--expire-time={}", NOTIFY_TIMEOUT_MS))
            .arg(summary)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()?;

        if !status.success() {
            return Err(NotifyError::Failed(status.code().unwrap_or(-1)));
        }
        Ok(())
    }
}

pub struct ConsoleNotifier;

impl Notify for ConsoleNotifier {
    fn notify(&self, summary: &str) -> Result<(), NotifyError> {
        println!("\n{summary}");
        Ok(())
    }
}

/// Best effort delivery; falls back to the console.
pub fn deliver(notifier: &dyn Notify, summary: &str) {
    if let Err(e) = notifier.notify(summary) {
        log::warn!("Notification failed: {}", e);
        println!("\n{summary}");
    }
}
