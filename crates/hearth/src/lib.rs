//! Hearth — the home-automation federation engine.
//!
//! This crate re-exports [`hearth_core`] as the single dependency an
//! embedding application (an HTTP/WebSocket facade, a CLI, a test harness)
//! needs to pull in. It adds nothing of its own: all types, traits and
//! engine components live in `hearth-core` so that internal crates can
//! depend on it directly without pulling in this bundling layer.

pub use hearth_core::*;
