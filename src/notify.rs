use std::sync::Mutex;

use serde_json::Value;

use crate::errors::{MarketError, Result};
use crate::types::AccountId;

/// external notification delivery, fire-and-forget from the core's view
///
/// Delivery failures are logged as events by the caller and never roll back
/// the state change that triggered the notification.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, recipient_id: &AccountId, event_type: &str, payload: &Value) -> Result<()>;
}

/// sink that drops everything
#[derive(Debug, Default)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn notify(&self, _recipient_id: &AccountId, _event_type: &str, _payload: &Value) -> Result<()> {
        Ok(())
    }
}

/// a delivered notification captured by [`RecordingSink`]
#[derive(Debug, Clone)]
pub struct SentNotification {
    pub recipient_id: AccountId,
    pub event_type: String,
    pub payload: Value,
}

/// sink that records deliveries for inspection in tests
#[derive(Debug, Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<SentNotification>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, recipient_id: &AccountId, event_type: &str, payload: &Value) -> Result<()> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(SentNotification {
                recipient_id: recipient_id.clone(),
                event_type: event_type.to_string(),
                payload: payload.clone(),
            });
        }
        Ok(())
    }
}

/// sink that always fails, for exercising failure isolation
#[derive(Debug, Default)]
pub struct FailingSink;

impl NotificationSink for FailingSink {
    fn notify(&self, recipient_id: &AccountId, event_type: &str, _payload: &Value) -> Result<()> {
        Err(MarketError::validation(format!(
            "delivery to {} failed for {}",
            recipient_id, event_type
        )))
    }
}
