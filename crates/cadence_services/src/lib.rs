//! Cadence Services Layer
//!
//! Platform abstraction for settings, snapshot storage, telemetry push and
//! raw input. Nothing in here knows about gameplay types; callers pick the
//! serialized payloads.

pub mod input;
pub mod save;
pub mod settings;
pub mod telemetry;

pub use save::{BackgroundSaver, JsonFileStore, MemoryStore, SaveError, SnapshotStore};
pub use settings::{Settings, SettingsError};
pub use telemetry::{TelemetryClient, TelemetryError};
