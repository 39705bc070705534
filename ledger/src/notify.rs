//! User-visible notices
//!
//! Services and the sync engine publish notices here instead of talking to a
//! UI. Every notice is also logged.

use crate::config::NOTICE_CHANNEL_CAPACITY;
use crate::error::{AppError, Severity};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct Notice {
    pub id: Uuid,
    pub level: NoticeLevel,
    pub message: String,
    pub at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notice>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(NOTICE_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }

    pub fn info(&self, message: impl Into<String>) {
        self.publish(NoticeLevel::Info, message.into());
    }

    pub fn success(&self, message: impl Into<String>) {
        self.publish(NoticeLevel::Success, message.into());
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.publish(NoticeLevel::Warning, message.into());
    }

    pub fn error(&self, message: impl Into<String>) {
        self.publish(NoticeLevel::Error, message.into());
    }

    /// Surface an error at the level its severity calls for
    pub fn report(&self, err: &AppError) {
        let level = match err.severity() {
            Severity::Info => NoticeLevel::Info,
            Severity::Warning => NoticeLevel::Warning,
            Severity::Error => NoticeLevel::Error,
        };
        self.publish(level, err.to_string());
    }

    fn publish(&self, level: NoticeLevel, message: String) {
        match level {
            NoticeLevel::Info | NoticeLevel::Success => tracing::info!("{}", message),
            NoticeLevel::Warning => tracing::warn!("{}", message),
            NoticeLevel::Error => tracing::error!("{}", message),
        }

        let notice = Notice {
            id: Uuid::new_v4(),
            level,
            message,
            at: Utc::now(),
        };

        // Nobody listening is fine
        let _ = self.tx.send(notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_uses_error_severity() {
        let notifier = Notifier::new();
        let mut rx = notifier.subscribe();

        notifier.report(&AppError::EmptyRoster);
        notifier.report(&AppError::Offline);

        let first = rx.try_recv().unwrap();
        assert_eq!(first.level, NoticeLevel::Info);
        assert_eq!(first.message, "No workers found. Please add workers in Settings.");
        assert_eq!(rx.try_recv().unwrap().level, NoticeLevel::Warning);
    }
}
