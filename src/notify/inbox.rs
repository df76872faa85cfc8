use std::sync::Arc;

use crate::context::FreightContext;
use crate::core_types::{NotificationId, Page, PageRequest, UserId};
use crate::error::{FreightError, FreightResult};

use super::Notification;

/// Read side of the per-user notification inbox
#[derive(Clone)]
pub struct NotificationInbox {
    ctx: Arc<FreightContext>,
}

impl NotificationInbox {
    pub fn new(ctx: Arc<FreightContext>) -> Self {
        Self { ctx }
    }

    pub async fn list(&self, user_id: UserId, page: PageRequest) -> FreightResult<Page<Notification>> {
        self.ctx.store.list_notifications(user_id, page).await
    }

    pub async fn unseen_count(&self, user_id: UserId) -> FreightResult<u64> {
        self.ctx.store.unseen_count(user_id).await
    }

    /// Idempotent; `NotFound` if the notification is not the caller's
    pub async fn mark_seen(&self, user_id: UserId, id: NotificationId) -> FreightResult<()> {
        if self.ctx.store.mark_seen(user_id, id, self.ctx.clock.now()).await? {
            Ok(())
        } else {
            Err(FreightError::not_found("notification"))
        }
    }

    /// Returns how many were newly marked
    pub async fn mark_all_seen(&self, user_id: UserId) -> FreightResult<u64> {
        self.ctx
            .store
            .mark_all_seen(user_id, self.ctx.clock.now())
            .await
    }
}
