//! In-memory entity/room/area registries (§4.3). Reads are concurrent;
//! writes serialize behind a single lock per registry that is never held
//! across an adapter I/O call.

pub mod areas;
pub mod entities;
pub mod rooms;

pub use areas::AreaRegistry;
pub use entities::EntityRegistry;
pub use rooms::RoomRegistry;
