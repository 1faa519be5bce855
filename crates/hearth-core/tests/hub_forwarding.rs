//! Integration tests for the event forwarding hub, covering invariants 6
//! and 7 and scenarios S4 and S5.

use hearth_core::config::HubConfig;
use hearth_core::types::{EntityRemovedEvent, HubEvent, HubEventType, StateChangedEvent, SubscriptionFilter, UnifiedId};
use hearth_core::EventHub;
use std::time::Duration;
use tokio::sync::watch;

fn state_changed(entity: &str, old: hearth_core::types::EntityState, new: hearth_core::types::EntityState) -> HubEvent {
    HubEvent::StateChanged(StateChangedEvent {
        entity_id: UnifiedId::new("homeassistant", entity).unwrap(),
        old_state: old,
        new_state: new,
        attributes: Default::default(),
        timestamp: chrono::Utc::now(),
    })
}

/// Invariant 6: a subscriber whose filter doesn't match an event receives
/// nothing, even though another subscriber on the same hub does.
#[tokio::test]
async fn unmatched_subscriber_receives_nothing() {
    let hub = EventHub::new(HubConfig {
        batch_window: Duration::from_millis(10),
        ..HubConfig::default()
    });

    let mut matching_filter = SubscriptionFilter::default();
    matching_filter.event_types.insert(HubEventType::EntityRemoved);
    let mut matching = hub.subscribe(matching_filter);

    let mut non_matching_filter = SubscriptionFilter::default();
    non_matching_filter.event_types.insert(HubEventType::StateChanged);
    let mut non_matching = hub.subscribe(non_matching_filter);

    let (tx, rx) = watch::channel(false);
    let hub_clone = hub.clone();
    let handle = tokio::spawn(async move { hub_clone.run(rx).await });

    hub.ingest(HubEvent::EntityRemoved(EntityRemovedEvent {
        entity_id: UnifiedId::new("homeassistant", "light.kitchen").unwrap(),
        timestamp: chrono::Utc::now(),
    }));

    let received = tokio::time::timeout(Duration::from_secs(1), matching.rx.recv())
        .await
        .expect("matching subscriber should receive the event")
        .expect("channel open");
    assert_eq!(received.event_type(), HubEventType::EntityRemoved);

    let unmatched = tokio::time::timeout(Duration::from_millis(150), non_matching.rx.recv()).await;
    assert!(unmatched.is_err(), "non-matching subscriber must receive nothing");

    tx.send(true).unwrap();
    let _ = handle.await;
}

/// Invariant 7: under sustained over-rate ingress, eventsDropped grows while
/// the ingress queue stays bounded (here, no `run` task is draining it).
#[tokio::test]
async fn bounded_ingress_drops_oldest_under_sustained_overload() {
    let hub = EventHub::new(HubConfig {
        ingress_capacity: 4,
        ..HubConfig::default()
    });

    for i in 0..20 {
        hub.ingest(state_changed(&format!("light.{i}"), hearth_core::types::EntityState::Off, hearth_core::types::EntityState::On));
    }

    let snapshot = hub.metrics_snapshot();
    assert_eq!(snapshot.events_ingested, 20);
    assert!(snapshot.events_dropped > 0, "sustained overload must drop events rather than grow unbounded");
}

/// S4 — three updates to distinct entities within one batch window yield
/// exactly one `batches_processed` increment, and the subscriber sees all
/// three coalesced events from that flush.
#[tokio::test]
async fn batched_updates_flush_together_within_one_window() {
    let hub = EventHub::new(HubConfig {
        batch_window: Duration::from_millis(100),
        batch_events: true,
        ..HubConfig::default()
    });

    let mut subscription = hub.subscribe(SubscriptionFilter::default());
    let (tx, rx) = watch::channel(false);
    let hub_clone = hub.clone();
    let handle = tokio::spawn(async move { hub_clone.run(rx).await });

    hub.ingest(state_changed("light.kitchen", hearth_core::types::EntityState::Off, hearth_core::types::EntityState::On));
    hub.ingest(state_changed("light.hallway", hearth_core::types::EntityState::Off, hearth_core::types::EntityState::On));
    hub.ingest(state_changed("light.bedroom", hearth_core::types::EntityState::Off, hearth_core::types::EntityState::On));

    let mut received = Vec::new();
    for _ in 0..3 {
        let event = tokio::time::timeout(Duration::from_secs(1), subscription.rx.recv())
            .await
            .expect("subscriber should receive the batched events")
            .expect("channel open");
        received.push(event);
    }
    assert_eq!(received.len(), 3);

    let snapshot = hub.metrics_snapshot();
    assert_eq!(snapshot.batches_processed, 1);
    assert_eq!(snapshot.events_batched, 3);

    tx.send(true).unwrap();
    let _ = handle.await;
}

/// S5 — a slow subscriber's drops don't affect a healthy subscriber's
/// delivery; its forwarding errors accumulate while the other subscriber's
/// `eventsForwarded` keeps climbing.
#[tokio::test]
async fn slow_subscriber_does_not_block_healthy_subscriber() {
    let hub = EventHub::new(HubConfig {
        batch_window: Duration::from_millis(10),
        subscriber_capacity: 1,
        ..HubConfig::default()
    });

    // Subscriber A: never drained, so its channel fills immediately.
    let slow = hub.subscribe(SubscriptionFilter::default());
    // Subscriber B: drained continuously in a background task.
    let mut healthy = hub.subscribe(SubscriptionFilter::default());

    let (tx, rx) = watch::channel(false);
    let hub_clone = hub.clone();
    let handle = tokio::spawn(async move { hub_clone.run(rx).await });

    let drain_handle = tokio::spawn(async move {
        let mut count = 0usize;
        while tokio::time::timeout(Duration::from_millis(500), healthy.rx.recv())
            .await
            .ok()
            .flatten()
            .is_some()
        {
            count += 1;
            if count >= 5 {
                break;
            }
        }
        count
    });

    for i in 0..5 {
        hub.ingest(state_changed(
            &format!("light.{i}"),
            hearth_core::types::EntityState::Off,
            hearth_core::types::EntityState::On,
        ));
        tokio::time::sleep(Duration::from_millis(15)).await;
    }

    let healthy_received = drain_handle.await.unwrap();
    assert!(healthy_received >= 4, "healthy subscriber should receive most events despite A stalling");

    let snapshot = hub.metrics_snapshot();
    assert!(snapshot.forwarding_errors > 0, "slow subscriber should accumulate forwarding errors");
    assert!(snapshot.events_forwarded > 0);

    drop(slow);
    tx.send(true).unwrap();
    let _ = handle.await;
}
