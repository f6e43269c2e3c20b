//! Cadence Core
//!
//! Contains the fundamental simulation building blocks:
//! - Entity/component store with deferred destruction
//! - Synchronous event bus with deferred one-shot events
//! - Ordered system scheduler
//! - Simulation time

pub mod ecs;
pub mod time;

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
