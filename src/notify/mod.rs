//! Notifications
//!
//! Lifecycle operations emit notifications *after* their state change is
//! committed. Delivery is best-effort: [`Notifier::dispatch`] never returns an
//! error, a failing [`NotificationSink`] is logged and forgotten.

mod inbox;
mod message;
pub mod mock;
mod sink;

pub use inbox::NotificationInbox;
pub use message::Message;
pub use sink::{InboxSink, TracingSink};

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::core_types::{NotificationId, UserId};
use crate::environment::Clock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i16)]
pub enum NotificationKind {
    /// To the merchant who posted a request
    RequestSubmitted = 1,
    /// To every carrier with an active truck
    NewRequestAvailable = 2,
    /// To the merchant, when a carrier bids
    OfferReceived = 3,
    /// To the winning carrier
    OfferAccepted = 4,
    /// To the merchant, on completion
    ShipmentDelivered = 5,
    /// To the merchant, when the carrier cancels a shipment
    ShipmentCancelled = 6,
}

impl NotificationKind {
    pub const ALL: [NotificationKind; 6] = [
        NotificationKind::RequestSubmitted,
        NotificationKind::NewRequestAvailable,
        NotificationKind::OfferReceived,
        NotificationKind::OfferAccepted,
        NotificationKind::ShipmentDelivered,
        NotificationKind::ShipmentCancelled,
    ];

    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.id() == id)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::RequestSubmitted => "REQUEST_SUBMITTED",
            NotificationKind::NewRequestAvailable => "NEW_REQUEST_AVAILABLE",
            NotificationKind::OfferReceived => "OFFER_RECEIVED",
            NotificationKind::OfferAccepted => "OFFER_ACCEPTED",
            NotificationKind::ShipmentDelivered => "SHIPMENT_DELIVERED",
            NotificationKind::ShipmentCancelled => "SHIPMENT_CANCELLED",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-user inbox entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    /// Deep-link payload, e.g. `{"requestId": ...}`
    pub data: serde_json::Value,
    pub seen_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    #[inline]
    pub fn is_seen(&self) -> bool {
        self.seen_at.is_some()
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("Notification sink unavailable: {0}")]
    Unavailable(String),

    #[error("Notification delivery failed: {0}")]
    Delivery(String),
}

/// Where notifications go (inbox table, push gateway, log...)
#[async_trait]
pub trait NotificationSink: Send + Sync {
    fn name(&self) -> &'static str;

    async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Best-effort fan-out front of a [`NotificationSink`]
#[derive(Clone)]
pub struct Notifier {
    sink: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
}

impl Notifier {
    pub fn new(sink: Arc<dyn NotificationSink>, clock: Arc<dyn Clock>) -> Self {
        Self { sink, clock }
    }

    /// Deliver to one user. Never fails.
    pub async fn dispatch(&self, user_id: UserId, message: &Message) {
        let notification = message.to_notification(user_id, self.clock.now());
        if let Err(e) = self.sink.deliver(&notification).await {
            warn!(
                sink = self.sink.name(),
                kind = %notification.kind,
                user_id = %user_id,
                error = %e,
                "notification dropped"
            );
        }
    }

    /// Deliver the same message to many users concurrently
    pub async fn broadcast(&self, users: &[UserId], message: &Message) {
        futures::future::join_all(users.iter().map(|u| self.dispatch(*u, message))).await;
    }
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("sink", &self.sink.name())
            .finish()
    }
}
