//! Shared dependencies of every freight service.

use std::sync::Arc;

use chrono::Duration;

use crate::environment::{Clock, Entropy, OsEntropy, SystemClock};
use crate::fleet::FleetService;
use crate::notify::{InboxSink, NotificationInbox, NotificationSink, Notifier};
use crate::offer::OfferEngine;
use crate::profile::{ProfileResolver, ProfileService};
use crate::request::RequestService;
use crate::shipment::ShipmentLifecycle;
use crate::store::{FreightStore, MemoryStore};

/// Lifecycle tunables
#[derive(Debug, Clone)]
pub struct LifecyclePolicy {
    pub invitation_ttl: Duration,
    /// Default offer lifetime when the carrier gives none
    pub offer_ttl: Duration,
    /// Random candidates tried before the wide fallback number
    pub request_number_attempts: u32,
    /// Prefix for QR tracking links
    pub tracking_base_url: String,
}

impl Default for LifecyclePolicy {
    fn default() -> Self {
        Self {
            invitation_ttl: Duration::hours(24),
            offer_ttl: Duration::days(7),
            request_number_attempts: 10,
            tracking_base_url: "https://track.hm-freight.local/shipments".to_string(),
        }
    }
}

pub struct FreightContext {
    pub store: Arc<dyn FreightStore>,
    pub notifier: Notifier,
    pub clock: Arc<dyn Clock>,
    pub entropy: Arc<dyn Entropy>,
    pub policy: LifecyclePolicy,
}

impl FreightContext {
    pub fn new(
        store: Arc<dyn FreightStore>,
        sink: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
        entropy: Arc<dyn Entropy>,
        policy: LifecyclePolicy,
    ) -> Self {
        Self {
            store,
            notifier: Notifier::new(sink, clock.clone()),
            clock,
            entropy,
            policy,
        }
    }

    /// Production wiring: system clock, OS entropy, inbox notifications
    pub fn production(store: Arc<dyn FreightStore>, policy: LifecyclePolicy) -> Self {
        let sink = Arc::new(InboxSink::new(store.clone()));
        Self::new(store, sink, Arc::new(SystemClock), Arc::new(OsEntropy), policy)
    }

    /// Memory store with injected clock, entropy and sink
    pub fn in_memory(
        sink: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
        entropy: Arc<dyn Entropy>,
    ) -> Self {
        Self::new(
            Arc::new(MemoryStore::new()),
            sink,
            clock,
            entropy,
            LifecyclePolicy::default(),
        )
    }
}

/// One handle per component, all over the same context
#[derive(Clone)]
pub struct FreightServices {
    pub ctx: Arc<FreightContext>,
    pub resolver: ProfileResolver,
    pub profiles: ProfileService,
    pub fleet: FleetService,
    pub requests: RequestService,
    pub offers: OfferEngine,
    pub shipments: ShipmentLifecycle,
    pub inbox: NotificationInbox,
}

impl FreightServices {
    pub fn new(ctx: Arc<FreightContext>) -> Self {
        Self {
            resolver: ProfileResolver::new(ctx.clone()),
            profiles: ProfileService::new(ctx.clone()),
            fleet: FleetService::new(ctx.clone()),
            requests: RequestService::new(ctx.clone()),
            offers: OfferEngine::new(ctx.clone()),
            shipments: ShipmentLifecycle::new(ctx.clone()),
            inbox: NotificationInbox::new(ctx.clone()),
            ctx,
        }
    }
}
