use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::{Notification, NotificationSink, NotifyError};
use crate::error::FreightError;
use crate::store::FreightStore;

/// Persists notifications into the per-user inbox
pub struct InboxSink {
    store: Arc<dyn FreightStore>,
}

impl InboxSink {
    pub fn new(store: Arc<dyn FreightStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl NotificationSink for InboxSink {
    fn name(&self) -> &'static str {
        "inbox"
    }

    async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.store
            .insert_notification(notification)
            .await
            .map_err(|e| match e {
                FreightError::Storage(msg) => NotifyError::Unavailable(msg),
                other => NotifyError::Delivery(other.to_string()),
            })
    }
}

/// Writes notifications to the log only
#[derive(Debug, Default)]
pub struct TracingSink;

#[async_trait]
impl NotificationSink for TracingSink {
    fn name(&self) -> &'static str {
        "tracing"
    }

    async fn deliver(&self, n: &Notification) -> Result<(), NotifyError> {
        info!(
            user_id = %n.user_id,
            kind = %n.kind,
            title = %n.title,
            "notification"
        );
        Ok(())
    }
}
