//! Gameplay components
//!
//! IDs are stable and unique within the encounter world.

use crate::chart::Chart;
use cadence_core::define_component;
use cadence_services::input::{AbilityKind, PointerDown};
use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn vec(self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

impl From<Vec2> for Position {
    fn from(v: Vec2) -> Self {
        Self { x: v.x, y: v.y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Velocity {
    pub vx: f32,
    pub vy: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Health {
    pub current: f32,
    pub max: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    Circle,
    Diamond,
    Rectangle,
    GenerativeBoss,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Renderable {
    pub shape: Shape,
    pub width: f32,
    pub height: f32,
    /// 0xRRGGBBAA
    pub color: u32,
}

/// Marks the player entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlayerTag;

/// Marks boss entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BossTag;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BossVariant {
    Conductor,
    Virtuoso,
    Minion,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ai {
    pub speed: f32,
    pub attack_range: f32,
    pub attack_cooldown: f64,
    pub aggro_range: f32,
    pub variant: BossVariant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BossState {
    Idle,
    Chasing,
    Attacking,
    Performing,
}

impl fmt::Display for BossState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BossState::Idle => "IDLE",
            BossState::Chasing => "CHASING",
            BossState::Attacking => "ATTACKING",
            BossState::Performing => "PERFORMING",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateMachine {
    pub state: BossState,
    pub time_in_state: f64,
    pub phrase_timer: f64,
    pub phrase_attack_counter: u32,
    /// Set once the performing cast for the current PERFORMING stint fired.
    pub performed: bool,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self {
            state: BossState::Idle,
            time_in_state: 0.0,
            phrase_timer: 0.0,
            phrase_attack_counter: 0,
            performed: false,
        }
    }
}

impl StateMachine {
    pub fn enter(&mut self, state: BossState) {
        self.state = state;
        self.time_in_state = 0.0;
        self.performed = false;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub position: Position,
    pub spawn_time: f64,
    pub duration: f64,
    pub color: u32,
    pub hit: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerResources {
    pub health: f32,
    pub max_health: f32,
    pub dash_charges: u32,
    pub max_dash_charges: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BossResources {
    pub health: f32,
    pub max_health: f32,
    pub is_aggressive: bool,
}

/// Seven-axis derived difficulty score. Every axis stays in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MoodVector {
    pub intensity: f32,
    pub precision: f32,
    pub aggression: f32,
    pub flow: f32,
    pub chaos: f32,
    pub recovery: f32,
    pub transcendence: f32,
}

impl MoodVector {
    pub fn clamped(self) -> Self {
        Self {
            intensity: self.intensity.clamp(0.0, 1.0),
            precision: self.precision.clamp(0.0, 1.0),
            aggression: self.aggression.clamp(0.0, 1.0),
            flow: self.flow.clamp(0.0, 1.0),
            chaos: self.chaos.clamp(0.0, 1.0),
            recovery: self.recovery.clamp(0.0, 1.0),
            transcendence: self.transcendence.clamp(0.0, 1.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GameSpeed {
    pub multiplier: f32,
}

impl Default for GameSpeed {
    fn default() -> Self {
        Self { multiplier: 1.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScoreCounters {
    pub combo: u32,
    pub max_combo: u32,
    pub hits: u32,
    pub misses: u32,
    pub dash_attempts: u32,
    pub dash_successes: u32,
    pub dash_failures: u32,
}

/// Running ability bonuses added on top of the derived mood axes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MoodModifiers {
    pub precision_bonus: f32,
    pub aggression_bonus: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatTracker {
    pub last_beat_time: f64,
    pub bpm: f64,
    pub beats_seen: u64,
    pub has_beat: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputQueue {
    pub pending: Vec<PointerDown>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Session {
    pub running: bool,
    pub paused: bool,
    pub victory: bool,
}

/// Spawn cursor into the loaded chart.
#[derive(Debug, Clone, Default)]
pub struct ChartCursor {
    pub chart: Option<Rc<Chart>>,
    pub next: usize,
    /// Chart clock: game-speed-scaled seconds since the chart was loaded.
    pub elapsed: f64,
    pub beats_seen: u64,
    pub completed: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AbilityCooldowns {
    pub last_used: HashMap<AbilityKind, f64>,
}

impl AbilityCooldowns {
    /// Host seconds until `kind` can be used again; 0 when ready.
    pub fn remaining(&self, kind: AbilityKind, cooldown: f64, at: f64) -> f64 {
        self.last_used
            .get(&kind)
            .map_or(0.0, |&last| (cooldown - (at - last)).max(0.0))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DashRecharge {
    pub timer: f64,
}

define_component!(Position, 1, "Position");
define_component!(Velocity, 2, "Velocity");
define_component!(Health, 3, "Health");
define_component!(Renderable, 4, "Renderable");
define_component!(PlayerTag, 5, "PlayerTag");
define_component!(BossTag, 6, "BossTag");
define_component!(Ai, 7, "AI");
define_component!(StateMachine, 8, "StateMachine");
define_component!(Note, 9, "Note");
define_component!(PlayerResources, 10, "PlayerResources");
define_component!(BossResources, 11, "BossResources");
define_component!(MoodVector, 12, "MoodVector");
define_component!(GameSpeed, 13, "GameSpeed");
define_component!(ScoreCounters, 14, "ScoreCounters");
define_component!(MoodModifiers, 15, "MoodModifiers");
define_component!(BeatTracker, 16, "BeatTracker");
define_component!(InputQueue, 17, "InputQueue");
define_component!(Session, 18, "Session");
define_component!(ChartCursor, 19, "ChartCursor");
define_component!(AbilityCooldowns, 20, "AbilityCooldowns");
define_component!(DashRecharge, 21, "DashRecharge");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mood_clamps_every_axis() {
        let mood = MoodVector {
            intensity: 1.5,
            precision: -0.2,
            aggression: 0.5,
            flow: 2.0,
            chaos: 1.0,
            recovery: -1.0,
            transcendence: 7.0,
        }
        .clamped();
        assert_eq!(mood.intensity, 1.0);
        assert_eq!(mood.precision, 0.0);
        assert_eq!(mood.aggression, 0.5);
        assert_eq!(mood.flow, 1.0);
        assert_eq!(mood.recovery, 0.0);
        assert_eq!(mood.transcendence, 1.0);
    }

    #[test]
    fn entering_a_state_resets_dwell() {
        let mut sm = StateMachine {
            time_in_state: 3.0,
            performed: true,
            ..StateMachine::default()
        };
        sm.enter(BossState::Chasing);
        assert_eq!(sm.state, BossState::Chasing);
        assert_eq!(sm.time_in_state, 0.0);
        assert!(!sm.performed);
    }

    #[test]
    fn cooldown_counts_down_from_last_use() {
        let mut cooldowns = AbilityCooldowns::default();
        assert_eq!(cooldowns.remaining(AbilityKind::Rewind, 15.0, 3.0), 0.0);
        cooldowns.last_used.insert(AbilityKind::Rewind, 10.0);
        assert_eq!(cooldowns.remaining(AbilityKind::Rewind, 15.0, 10.0), 15.0);
        assert_eq!(cooldowns.remaining(AbilityKind::Rewind, 15.0, 20.0), 5.0);
        assert_eq!(cooldowns.remaining(AbilityKind::Rewind, 15.0, 40.0), 0.0);
    }
}
