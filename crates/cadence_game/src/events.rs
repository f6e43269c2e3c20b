//! Gameplay events carried on the encounter bus

use crate::components::{BossState, MoodVector, PlayerResources, Position};
use crate::judge::Verdict;
use cadence_core::ecs::{BusEvent, Entity};
use cadence_services::input::AbilityKind;

pub type GameBus = cadence_core::ecs::EventBus<GameEvent>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashFailure {
    NoCharges,
    OffRhythm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BossCast {
    Attack,
    Special,
    Ultimate,
}

impl BossCast {
    pub fn ability_id(self) -> &'static str {
        match self {
            BossCast::Attack => "boss_attack",
            BossCast::Special => "boss_special_attack",
            BossCast::Ultimate => "boss_ultimate_attack",
        }
    }
}

/// Field restored when an ability runs out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reversion {
    GameSpeed(f32),
    PrecisionBonus(f32),
    AggressionBonus(f32),
    Recovery(f32),
    Transcendence(f32),
}

impl Reversion {
    /// Deferred-task key; one pending reversion per target field.
    pub fn task_key(&self) -> &'static str {
        match self {
            Reversion::GameSpeed(_) => "game.speed",
            Reversion::PrecisionBonus(_) => "mood.precision_bonus",
            Reversion::AggressionBonus(_) => "mood.aggression_bonus",
            Reversion::Recovery(_) => "mood.recovery",
            Reversion::Transcendence(_) => "mood.transcendence",
        }
    }

    pub fn value(&self) -> f32 {
        match *self {
            Reversion::GameSpeed(v)
            | Reversion::PrecisionBonus(v)
            | Reversion::AggressionBonus(v)
            | Reversion::Recovery(v)
            | Reversion::Transcendence(v) => v,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    // host / clock
    EncounterStarted,
    GamePaused { paused: bool },
    Beat { time: f64, bpm: f64 },
    ChartLoaded { id: String, notes: usize },
    ChartCompleted,
    EncounterEnded { victory: bool },
    /// Shown after a victory; `next` is the chart a continue would load.
    ContinuePrompt { next: Option<String> },

    // judge + notes + interaction
    RhythmVerdict(Verdict),
    TileSpawned { note: Entity, position: Position, color: u32 },
    NoteExpired { note: Entity },
    NoteHit { note: Entity },
    NoteMissed { note: Option<Entity> },
    DashSucceeded { target: Position, charges: u32 },
    DashFailed { reason: DashFailure },
    PlayerStateUpdated(PlayerResources),

    // scoring / mood
    MoodUpdated { mood: MoodVector, combo: u32 },
    TempoScaled { intensity: f32, combo: u32, multiplier: f32 },
    BossAggressive { boss: Entity, intensity: f32 },
    BossHealthUpdated { boss: Entity, health: f32, max: f32 },

    // abilities
    /// `now` is simulation time; reversions are scheduled from it.
    AbilityUsed { kind: AbilityKind, now: f64 },
    AbilityRejected { kind: AbilityKind, remaining: f64 },
    GameSpeedChanged { multiplier: f32 },
    FastForwardActivated { aggression: f32 },
    RewindActivated { health: f32, dash_charges: u32 },
    UltimateActivated,
    UltimateDeactivated,
    AbilityRevert { kind: AbilityKind, reversion: Reversion },
    AbilityExpired { kind: AbilityKind },

    // boss
    BossStateChanged { boss: Entity, from: BossState, to: BossState },
    BossAbilityCast { boss: Entity, cast: BossCast },
    BossDefeated { boss: Entity },
}

/// Subscription key, one per [`GameEvent`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKey {
    EncounterStarted,
    GamePaused,
    Beat,
    ChartLoaded,
    ChartCompleted,
    EncounterEnded,
    ContinuePrompt,
    RhythmVerdict,
    TileSpawned,
    NoteExpired,
    NoteHit,
    NoteMissed,
    DashSucceeded,
    DashFailed,
    PlayerStateUpdated,
    MoodUpdated,
    TempoScaled,
    BossAggressive,
    BossHealthUpdated,
    AbilityUsed,
    AbilityRejected,
    GameSpeedChanged,
    FastForwardActivated,
    RewindActivated,
    UltimateActivated,
    UltimateDeactivated,
    AbilityRevert,
    AbilityExpired,
    BossStateChanged,
    BossAbilityCast,
    BossDefeated,
}

impl BusEvent for GameEvent {
    type Key = EventKey;

    fn key(&self) -> EventKey {
        match self {
            GameEvent::EncounterStarted => EventKey::EncounterStarted,
            GameEvent::GamePaused { .. } => EventKey::GamePaused,
            GameEvent::Beat { .. } => EventKey::Beat,
            GameEvent::ChartLoaded { .. } => EventKey::ChartLoaded,
            GameEvent::ChartCompleted => EventKey::ChartCompleted,
            GameEvent::EncounterEnded { .. } => EventKey::EncounterEnded,
            GameEvent::ContinuePrompt { .. } => EventKey::ContinuePrompt,
            GameEvent::RhythmVerdict(_) => EventKey::RhythmVerdict,
            GameEvent::TileSpawned { .. } => EventKey::TileSpawned,
            GameEvent::NoteExpired { .. } => EventKey::NoteExpired,
            GameEvent::NoteHit { .. } => EventKey::NoteHit,
            GameEvent::NoteMissed { .. } => EventKey::NoteMissed,
            GameEvent::DashSucceeded { .. } => EventKey::DashSucceeded,
            GameEvent::DashFailed { .. } => EventKey::DashFailed,
            GameEvent::PlayerStateUpdated(_) => EventKey::PlayerStateUpdated,
            GameEvent::MoodUpdated { .. } => EventKey::MoodUpdated,
            GameEvent::TempoScaled { .. } => EventKey::TempoScaled,
            GameEvent::BossAggressive { .. } => EventKey::BossAggressive,
            GameEvent::BossHealthUpdated { .. } => EventKey::BossHealthUpdated,
            GameEvent::AbilityUsed { .. } => EventKey::AbilityUsed,
            GameEvent::AbilityRejected { .. } => EventKey::AbilityRejected,
            GameEvent::GameSpeedChanged { .. } => EventKey::GameSpeedChanged,
            GameEvent::FastForwardActivated { .. } => EventKey::FastForwardActivated,
            GameEvent::RewindActivated { .. } => EventKey::RewindActivated,
            GameEvent::UltimateActivated => EventKey::UltimateActivated,
            GameEvent::UltimateDeactivated => EventKey::UltimateDeactivated,
            GameEvent::AbilityRevert { .. } => EventKey::AbilityRevert,
            GameEvent::AbilityExpired { .. } => EventKey::AbilityExpired,
            GameEvent::BossStateChanged { .. } => EventKey::BossStateChanged,
            GameEvent::BossAbilityCast { .. } => EventKey::BossAbilityCast,
            GameEvent::BossDefeated { .. } => EventKey::BossDefeated,
        }
    }

    fn name(&self) -> &'static str {
        match self.key() {
            EventKey::EncounterStarted => "encounter_started",
            EventKey::GamePaused => "game_paused",
            EventKey::Beat => "beat",
            EventKey::ChartLoaded => "chart_loaded",
            EventKey::ChartCompleted => "chart_completed",
            EventKey::EncounterEnded => "encounter_ended",
            EventKey::ContinuePrompt => "show_continue_prompt",
            EventKey::RhythmVerdict => "rhythm_verdict",
            EventKey::TileSpawned => "floor_tile_spawned",
            EventKey::NoteExpired => "note_expired",
            EventKey::NoteHit => "player_hit_note",
            EventKey::NoteMissed => "player_miss_note",
            EventKey::DashSucceeded => "player_dash_success",
            EventKey::DashFailed => "player_dash_fail",
            EventKey::PlayerStateUpdated => "player_state_updated",
            EventKey::MoodUpdated => "qualia_updated",
            EventKey::TempoScaled => "music_tempo_update",
            EventKey::BossAggressive => "boss_escalate_aggression",
            EventKey::BossHealthUpdated => "boss_health_updated",
            EventKey::AbilityUsed => "player_ability",
            EventKey::AbilityRejected => "ability_rejected",
            EventKey::GameSpeedChanged => "game_speed_changed",
            EventKey::FastForwardActivated => "fast_forward_activated",
            EventKey::RewindActivated => "player_rewind_activated",
            EventKey::UltimateActivated => "ultimate_activated",
            EventKey::UltimateDeactivated => "ultimate_deactivated",
            EventKey::AbilityRevert => "ability_revert",
            EventKey::AbilityExpired => "ability_expired",
            EventKey::BossStateChanged => "boss_state_changed",
            EventKey::BossAbilityCast => "ability_casted",
            EventKey::BossDefeated => "boss_defeated",
        }
    }
}
