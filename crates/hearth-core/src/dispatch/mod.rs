//! The action dispatcher (§4.7): validates a request, resolves the owning
//! adapter, dispatches upstream on a task decoupled from the caller's own
//! cancellation but awaited so failures surface synchronously, predicts the
//! post-action state only once dispatch succeeds, and returns immediately —
//! verification continues afterward in a genuinely detached task.

mod prediction;

use crate::adapter::AdapterRegistry;
use crate::error::{HearthError, Result};
use crate::registry::EntityRegistry;
use crate::types::{ActionRequest, ActionResult, HubEvent, ServiceCalledEvent, StateChangedEvent};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

pub use prediction::predict;

/// Delay before the dispatcher re-reads upstream state to verify its
/// prediction (§4.7 step 8).
const VERIFICATION_DELAY: Duration = Duration::from_millis(200);

/// Sink for events the dispatcher raises (`service_called`, and corrective
/// `state_changed` events). Matches the hub's ingress shape without this
/// module depending on the hub crate-internally.
pub type EventSink = Arc<dyn Fn(HubEvent) + Send + Sync>;

/// Dispatches unified actions against the owning adapter.
pub struct ActionDispatcher {
    adapters: Arc<AdapterRegistry>,
    entities: Arc<EntityRegistry>,
    dispatch_deadline: Duration,
    verification_deadline: Duration,
    event_sink: Option<EventSink>,
}

impl ActionDispatcher {
    #[must_use]
    pub fn new(
        adapters: Arc<AdapterRegistry>,
        entities: Arc<EntityRegistry>,
        dispatch_deadline: Duration,
        verification_deadline: Duration,
    ) -> Self {
        Self {
            adapters,
            entities,
            dispatch_deadline,
            verification_deadline,
            event_sink: None,
        }
    }

    #[must_use]
    pub fn with_event_sink(mut self, sink: EventSink) -> Self {
        self.event_sink = Some(sink);
        self
    }

    /// Validate, dispatch and (on success) predict the post-action state for
    /// `request`, per the §4.7 flow: 4) dispatch upstream, 5) on failure
    /// return the typed error synchronously without touching the registry,
    /// 6) on success predict deterministically, 7) return immediately.
    /// Verification (step 8) continues afterward in a detached task.
    pub async fn dispatch(self: &Arc<Self>, request: ActionRequest) -> Result<ActionResult> {
        let entity = self
            .entities
            .get(&request.entity_id)
            .ok_or_else(|| HearthError::EntityNotFound(request.entity_id.as_str().to_string()))?;

        if !entity.allowed_actions().contains(&request.action.as_str()) {
            return Err(HearthError::InvalidAction {
                entity_id: request.entity_id.as_str().to_string(),
                message: format!("action '{}' is not valid for this entity", request.action),
            });
        }

        let source = request.entity_id.source().to_string();
        let candidates = self.adapters.by_source(&source);
        let adapter = candidates
            .into_iter()
            .find(|a| a.is_connected())
            .ok_or_else(|| HearthError::NotConnected { source: source.clone() })?;

        // Run the upstream call on its own task, with its own deadline, so a
        // caller dropping this future can't abort a command already in
        // flight — but join it here so a failure is reported to the caller
        // synchronously instead of only being logged.
        let dispatch_adapter = Arc::clone(&adapter);
        let dispatch_request = request.clone();
        let dispatch_deadline = self.dispatch_deadline;
        let outcome = tokio::spawn(async move { dispatch_adapter.execute_action(dispatch_deadline, &dispatch_request).await })
            .await
            .map_err(|err| HearthError::InternalError(format!("dispatch task did not complete: {err}")))?;

        self.adapters.record_action(adapter.id(), outcome.is_ok());

        if let Err(err) = outcome {
            warn!(adapter_id = %adapter.id(), entity_id = %request.entity_id, error = %err, "action dispatch failed");
            self.emit(HubEvent::ServiceCalled(ServiceCalledEvent {
                entity_id: request.entity_id.clone(),
                action: request.action.clone(),
                success: false,
                timestamp: Utc::now(),
            }));
            return Err(err);
        }

        let predicted = predict(entity.state(), &request.action, &request.parameters);
        if let Some(old_state) = self.apply_predicted_state(&request, &predicted) {
            if old_state != predicted.state {
                self.emit(HubEvent::StateChanged(StateChangedEvent {
                    entity_id: request.entity_id.clone(),
                    old_state,
                    new_state: predicted.state,
                    attributes: predicted.attributes.clone(),
                    timestamp: Utc::now(),
                }));
            }
        }
        self.emit(HubEvent::ServiceCalled(ServiceCalledEvent {
            entity_id: request.entity_id.clone(),
            action: request.action.clone(),
            success: true,
            timestamp: Utc::now(),
        }));

        let result = ActionResult {
            success: true,
            new_state: predicted.state,
            attributes: predicted.attributes.clone(),
        };

        let this = Arc::clone(self);
        tokio::spawn(async move {
            sleep(VERIFICATION_DELAY).await;
            this.verify(&adapter, &request, predicted).await;
        });

        Ok(result)
    }

    async fn verify(
        &self,
        adapter: &Arc<dyn crate::adapter::Adapter>,
        request: &ActionRequest,
        predicted: prediction::Prediction,
    ) {
        let actual = match adapter
            .query_entity_state(self.verification_deadline, request.entity_id.strip_source())
            .await
        {
            Ok(state) => state,
            Err(err) => {
                warn!(entity_id = %request.entity_id, error = %err, "post-action verification failed");
                return;
            }
        };

        if actual == predicted.state {
            return;
        }

        info!(entity_id = %request.entity_id, predicted = ?predicted.state, actual = ?actual, "prediction mismatch, correcting");

        if let Some(mut entity) = self.entities.get(&request.entity_id) {
            entity.base_mut().state = actual;
            entity.base_mut().last_updated = Utc::now();
            self.entities.upsert(entity);
        }

        self.emit(HubEvent::StateChanged(StateChangedEvent {
            entity_id: request.entity_id.clone(),
            old_state: predicted.state,
            new_state: actual,
            attributes: predicted.attributes.clone(),
            timestamp: Utc::now(),
        }));
    }

    /// Apply the predicted post-action state to the registry, returning the
    /// entity's state immediately beforehand so the caller can decide
    /// whether a `state_changed` event is warranted (§4.7 step 7, S1).
    fn apply_predicted_state(&self, request: &ActionRequest, predicted: &prediction::Prediction) -> Option<crate::types::EntityState> {
        let mut entity = self.entities.get(&request.entity_id)?;
        let old_state = entity.state();
        entity.base_mut().state = predicted.state;
        for (key, value) in &predicted.attributes {
            entity.base_mut().attributes.insert(key.clone(), value.clone());
        }
        entity.base_mut().last_updated = Utc::now();
        apply_typed_attributes(&mut entity, &predicted.attributes);
        self.entities.upsert(entity);
        Some(old_state)
    }

    fn emit(&self, event: HubEvent) {
        if let Some(sink) = &self.event_sink {
            sink(event);
        }
    }
}

/// Mirror a predicted attribute delta into the variant's typed field, in
/// addition to the untyped `attributes` bag (§4.7 step 6).
fn apply_typed_attributes(entity: &mut crate::types::Entity, attributes: &std::collections::HashMap<String, serde_json::Value>) {
    match entity {
        crate::types::Entity::Light(light) => {
            if let Some(v) = attributes.get("brightness").and_then(serde_json::Value::as_f64) {
                light.brightness = Some(v as f32);
            }
        }
        crate::types::Entity::Cover(cover) => {
            if let Some(v) = attributes.get("position").and_then(serde_json::Value::as_f64) {
                cover.position = Some(v as f32);
            }
        }
        crate::types::Entity::Fan(fan) => {
            if let Some(v) = attributes.get("speed").and_then(serde_json::Value::as_f64) {
                fan.speed = Some(v as f32);
            }
        }
        crate::types::Entity::MediaPlayer(player) => {
            if let Some(v) = attributes.get("volume").and_then(serde_json::Value::as_f64) {
                player.volume = Some(v as f32);
            }
        }
        _ => {}
    }
}
