//! Per-connection subscriptions (§4.8): a bounded outbound channel plus the
//! filter it was registered with.

use crate::types::{HubEvent, SubscriptionFilter};
use tokio::sync::mpsc;
use uuid::Uuid;

/// A live subscription's sender half, held by the hub.
pub struct Subscriber {
    pub id: String,
    pub filter: SubscriptionFilter,
    pub tx: mpsc::Sender<HubEvent>,
}

/// What a caller gets back from `subscribe`: a receiver and the ID needed
/// to unsubscribe later.
pub struct Subscription {
    pub id: String,
    pub rx: mpsc::Receiver<HubEvent>,
}

impl Subscriber {
    #[must_use]
    pub fn new(filter: SubscriptionFilter, capacity: usize) -> (Self, Subscription) {
        let id = Uuid::new_v4().to_string();
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Subscriber {
                id: id.clone(),
                filter,
                tx,
            },
            Subscription { id, rx },
        )
    }
}
