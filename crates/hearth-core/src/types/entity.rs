//! The typed entity model (§4.1): a tagged variant over the ten supported
//! domains plus a generic fallback. The variant tag is the authoritative
//! discriminator for dispatch — never the runtime class of an attribute.

use super::metadata::SourceMetadata;
use super::primitives::UnifiedId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// The domains an entity can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Light,
    Switch,
    Sensor,
    BinarySensor,
    Climate,
    Cover,
    Camera,
    Lock,
    Fan,
    MediaPlayer,
    Generic,
}

/// The closed state enum (§3). Any upstream state that cannot be mapped
/// yields `Unknown` with the raw value preserved in `attributes["raw_state"]`
/// (§4.1, §9 open question on round-trip fidelity).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityState {
    On,
    Off,
    Open,
    Closed,
    Locked,
    Unlocked,
    Active,
    Idle,
    Unavailable,
    Unknown,
}

impl EntityState {
    /// The complement of an on/off-shaped state, used by `toggle` prediction
    /// (§4.7 step 6). Returns `None` for states with no natural complement.
    #[must_use]
    pub fn complement(self) -> Option<Self> {
        match self {
            EntityState::On => Some(EntityState::Off),
            EntityState::Off => Some(EntityState::On),
            EntityState::Open => Some(EntityState::Closed),
            EntityState::Closed => Some(EntityState::Open),
            EntityState::Locked => Some(EntityState::Unlocked),
            EntityState::Unlocked => Some(EntityState::Locked),
            _ => None,
        }
    }
}

/// Capabilities an entity may advertise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Dimmable,
    Colorable,
    Temperature,
    Humidity,
    Position,
    Volume,
    Brightness,
    Motion,
    Recording,
    Streaming,
    Notification,
    Battery,
    Connectivity,
}

/// Fields shared by every entity variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityBase {
    pub id: UnifiedId,
    pub entity_type: EntityType,
    pub friendly_name: Option<String>,
    pub state: EntityState,
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,
    pub last_updated: DateTime<Utc>,
    pub available: bool,
    #[serde(default)]
    pub capabilities: HashSet<Capability>,
    pub room_id: Option<UnifiedId>,
    pub area_id: Option<UnifiedId>,
    pub device_id: Option<String>,
    pub metadata: SourceMetadata,
}

/// Typed extension fields for a light.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LightEntity {
    pub base: EntityBase,
    /// Brightness in `[0, 1]`.
    pub brightness: Option<f32>,
    /// Color temperature in mireds, when the fixture is colorable.
    pub color_temp: Option<u32>,
}

/// Typed extension fields for a switch. No extra fields beyond the base
/// record — switches are pure on/off.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchEntity {
    pub base: EntityBase,
}

/// Typed extension fields for a numeric sensor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorEntity {
    pub base: EntityBase,
    pub value: Option<f64>,
    pub unit: Option<String>,
    pub device_class: Option<String>,
}

/// Typed extension fields for a binary sensor (motion, door, etc.).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinarySensorEntity {
    pub base: EntityBase,
    pub device_class: Option<String>,
}

/// Typed extension fields for an HVAC/climate entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClimateEntity {
    pub base: EntityBase,
    pub target_temperature: Option<f64>,
    pub current_temperature: Option<f64>,
    pub hvac_mode: Option<String>,
}

/// Typed extension fields for a cover (blinds, garage door).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverEntity {
    pub base: EntityBase,
    /// Position in `[0, 1]`, where 0 is fully closed.
    pub position: Option<f32>,
}

/// Typed extension fields for a camera.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraEntity {
    pub base: EntityBase,
    pub is_recording: bool,
    pub is_streaming: bool,
}

/// Typed extension fields for a lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockEntity {
    pub base: EntityBase,
}

/// Typed extension fields for a fan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FanEntity {
    pub base: EntityBase,
    /// Speed in `[0, 1]`.
    pub speed: Option<f32>,
}

/// Typed extension fields for a media player.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaPlayerEntity {
    pub base: EntityBase,
    /// Volume in `[0, 1]`.
    pub volume: Option<f32>,
    pub media_title: Option<String>,
}

/// The tagged entity variant. Dispatch on the tag; never on the runtime type
/// of an attribute (§9).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "entity_type", rename_all = "snake_case")]
pub enum Entity {
    Light(LightEntity),
    Switch(SwitchEntity),
    Sensor(SensorEntity),
    BinarySensor(BinarySensorEntity),
    Climate(ClimateEntity),
    Cover(CoverEntity),
    Camera(CameraEntity),
    Lock(LockEntity),
    Fan(FanEntity),
    MediaPlayer(MediaPlayerEntity),
    Generic(EntityBase),
}

impl Entity {
    /// Shared base record, regardless of variant.
    #[must_use]
    pub fn base(&self) -> &EntityBase {
        match self {
            Entity::Light(e) => &e.base,
            Entity::Switch(e) => &e.base,
            Entity::Sensor(e) => &e.base,
            Entity::BinarySensor(e) => &e.base,
            Entity::Climate(e) => &e.base,
            Entity::Cover(e) => &e.base,
            Entity::Camera(e) => &e.base,
            Entity::Lock(e) => &e.base,
            Entity::Fan(e) => &e.base,
            Entity::MediaPlayer(e) => &e.base,
            Entity::Generic(base) => base,
        }
    }

    /// Mutable access to the shared base record.
    pub fn base_mut(&mut self) -> &mut EntityBase {
        match self {
            Entity::Light(e) => &mut e.base,
            Entity::Switch(e) => &mut e.base,
            Entity::Sensor(e) => &mut e.base,
            Entity::BinarySensor(e) => &mut e.base,
            Entity::Climate(e) => &mut e.base,
            Entity::Cover(e) => &mut e.base,
            Entity::Camera(e) => &mut e.base,
            Entity::Lock(e) => &mut e.base,
            Entity::Fan(e) => &mut e.base,
            Entity::MediaPlayer(e) => &mut e.base,
            Entity::Generic(base) => base,
        }
    }

    /// The variant's discriminator tag.
    #[must_use]
    pub fn entity_type(&self) -> EntityType {
        self.base().entity_type
    }

    /// Convenience accessor for the unified ID.
    #[must_use]
    pub fn id(&self) -> &UnifiedId {
        &self.base().id
    }

    /// Convenience accessor for the current state.
    #[must_use]
    pub fn state(&self) -> EntityState {
        self.base().state
    }

    /// The unified action names this variant accepts, used by the dispatcher
    /// (§4.7) to validate `action` before attempting to map it upstream.
    #[must_use]
    pub fn allowed_actions(&self) -> &'static [&'static str] {
        match self.entity_type() {
            EntityType::Light => &["turn_on", "turn_off", "toggle"],
            EntityType::Switch => &["turn_on", "turn_off", "toggle"],
            EntityType::Sensor | EntityType::BinarySensor | EntityType::Camera => &[],
            EntityType::Climate => &["set_temperature", "set_hvac_mode"],
            EntityType::Cover => &["open", "close", "set_position"],
            EntityType::Lock => &["lock", "unlock"],
            EntityType::Fan => &["turn_on", "turn_off", "set_speed"],
            EntityType::MediaPlayer => &["turn_on", "turn_off", "set_volume"],
            EntityType::Generic => &["turn_on", "turn_off", "toggle"],
        }
    }
}
