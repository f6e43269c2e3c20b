//! Cadence encounter core: a rhythm-action boss fight simulated on top of
//! `cadence_core`'s world, event bus and scheduler.
//!
//! Per-tick system order is fixed: notes, input, interaction, scoring,
//! boss AI, then the optional persistence and telemetry systems. Hosts
//! drive everything through [`Encounter`].

pub mod boss_ai;
pub mod chart;
pub mod components;
pub mod config;
pub mod encounter;
pub mod error;
pub mod events;
pub mod interaction;
pub mod judge;
pub mod mood;
pub mod notes;
pub mod persistence;
pub mod render_feed;
pub mod telemetry;

pub use chart::{Chart, ChartLibrary, ChartNote, Lyric};
pub use config::EncounterConfig;
pub use encounter::{BeatNotification, Encounter};
pub use error::{GameError, Result};
pub use events::{EventKey, GameBus, GameEvent};
pub use persistence::{SharedSink, Snapshot, SnapshotSink};
pub use render_feed::{Hud, RenderFeed, RenderItem};
pub use telemetry::TelemetrySink;
