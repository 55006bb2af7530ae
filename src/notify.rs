use crate::types::Notification;

/// Receives engine events for the host to display. Fire-and-forget.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Writes every notification to the log as a JSON line.
#[derive(Debug, Default)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn notify(&self, notification: Notification) {
        match serde_json::to_string(&notification) {
            Ok(line) => log::info!(target: "macroarc::events", "{line}"),
            Err(err) => log::warn!("failed to encode notification {notification:?}: {err}"),
        }
    }
}
