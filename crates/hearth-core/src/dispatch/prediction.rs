//! Deterministic post-action state prediction (§4.7 step 6). Pure function
//! of the current state, the requested action and its parameters; no I/O.

use crate::types::EntityState;
use std::collections::HashMap;

/// The predicted post-action state and any attribute deltas implied by it.
#[derive(Debug, Clone)]
pub struct Prediction {
    pub state: EntityState,
    pub attributes: HashMap<String, serde_json::Value>,
}

/// Predict the resulting state for `action` given the entity's
/// `current_state` and request `parameters`. Actions with no state-changing
/// effect (e.g. `set_volume`) leave the state untouched and report the
/// parameter as an attribute delta instead.
#[must_use]
pub fn predict(current_state: EntityState, action: &str, parameters: &HashMap<String, serde_json::Value>) -> Prediction {
    match action {
        "turn_on" => Prediction {
            state: EntityState::On,
            attributes: parameters.clone(),
        },
        "turn_off" => Prediction {
            state: EntityState::Off,
            attributes: HashMap::new(),
        },
        "toggle" => Prediction {
            state: current_state.complement().unwrap_or(current_state),
            attributes: HashMap::new(),
        },
        "lock" => Prediction {
            state: EntityState::Locked,
            attributes: HashMap::new(),
        },
        "unlock" => Prediction {
            state: EntityState::Unlocked,
            attributes: HashMap::new(),
        },
        "open" => Prediction {
            state: EntityState::Open,
            attributes: HashMap::new(),
        },
        "close" => Prediction {
            state: EntityState::Closed,
            attributes: HashMap::new(),
        },
        _ => Prediction {
            state: current_state,
            attributes: parameters.clone(),
        },
    }
}
