//! Encounter tuning
//!
//! Every gameplay constant lives here with the value the game ships with.
//! Files only need to name the fields they change.

use crate::components::{BossVariant, Position};
use cadence_services::input::AbilityKind;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EncounterConfig {
    pub judge: JudgeConfig,
    pub player: PlayerConfig,
    pub notes: NoteConfig,
    pub mood: MoodConfig,
    pub abilities: AbilityConfig,
    pub boss: BossConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JudgeConfig {
    pub tolerance_ms: f64,
    /// Tempo assumed before the first beat arrives.
    pub default_bpm: f64,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            tolerance_ms: 100.0,
            default_bpm: 120.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub max_health: f32,
    pub max_dash_charges: u32,
    pub start_position: Position,
    pub pickup_radius: f32,
    /// Seconds per regenerated dash charge; `None` disables regeneration.
    pub dash_recharge_seconds: Option<f64>,
    pub size: f32,
    pub color: u32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            max_health: 100.0,
            max_dash_charges: 3,
            start_position: Position::new(0.0, 0.0),
            pickup_radius: 50.0,
            dash_recharge_seconds: Some(2.0),
            size: 30.0,
            color: 0x00FF_FFFF,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoteConfig {
    pub size: f32,
    pub color: u32,
}

impl Default for NoteConfig {
    fn default() -> Self {
        Self {
            size: 50.0,
            color: 0xFFFF_00FF,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoodConfig {
    /// Combo at which precision saturates.
    pub combo_cap: f32,
    /// Combo at which aggression saturates.
    pub aggro_cap: f32,
    pub precision_weight: f32,
    pub aggression_weight: f32,
    pub flow_weight: f32,
    pub recovery_weight: f32,
    pub transcendence_weight: f32,
    /// Boss HP per second at intensity 1.
    pub damage_rate: f32,
    pub aggression_threshold: f32,
    pub max_tempo: f32,
    pub tempo_combo_threshold: f32,
}

impl Default for MoodConfig {
    fn default() -> Self {
        Self {
            combo_cap: 100.0,
            aggro_cap: 50.0,
            precision_weight: 0.3,
            aggression_weight: 0.3,
            flow_weight: 0.2,
            recovery_weight: 0.1,
            transcendence_weight: 0.1,
            damage_rate: 10.0,
            aggression_threshold: 0.7,
            max_tempo: 1.5,
            tempo_combo_threshold: 50.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbilityConfig {
    pub pause_speed: f32,
    pub pause_precision_bonus: f32,
    pub pause_seconds: f64,
    pub fast_forward_aggression_bonus: f32,
    pub fast_forward_seconds: f64,
    pub rewind_health_fraction: f32,
    pub rewind_recovery_bonus: f32,
    pub rewind_seconds: f64,
    pub ultimate_seconds: f64,
    pub cooldowns: Cooldowns,
}

impl Default for AbilityConfig {
    fn default() -> Self {
        Self {
            pause_speed: 0.2,
            pause_precision_bonus: 0.1,
            pause_seconds: 0.2,
            fast_forward_aggression_bonus: 0.5,
            fast_forward_seconds: 1.0,
            rewind_health_fraction: 0.2,
            rewind_recovery_bonus: 0.2,
            rewind_seconds: 1.0,
            ultimate_seconds: 10.0,
            cooldowns: Cooldowns::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Cooldowns {
    pub pause: f64,
    pub fast_forward: f64,
    pub rewind: f64,
    pub ultimate: f64,
}

impl Default for Cooldowns {
    fn default() -> Self {
        Self {
            pause: 5.0,
            fast_forward: 10.0,
            rewind: 15.0,
            ultimate: 30.0,
        }
    }
}

impl Cooldowns {
    pub fn of(&self, kind: AbilityKind) -> f64 {
        match kind {
            AbilityKind::Pause => self.pause,
            AbilityKind::FastForward => self.fast_forward,
            AbilityKind::Rewind => self.rewind,
            AbilityKind::Ultimate => self.ultimate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BossConfig {
    pub max_health: f32,
    pub speed: f32,
    pub attack_range: f32,
    pub attack_cooldown: f64,
    pub aggro_range: f32,
    pub variant: BossVariant,
    pub spawn_position: Position,
    pub attacks_per_phrase: u32,
    /// Health fraction below which the boss goes straight to PERFORMING.
    pub enrage_fraction: f32,
    pub idle_intensity_threshold: f32,
    pub ultimate_transcendence_threshold: f32,
    pub perform_seconds: f64,
    pub size: f32,
    pub color: u32,
}

impl Default for BossConfig {
    fn default() -> Self {
        Self {
            max_health: 1000.0,
            speed: 120.0,
            attack_range: 150.0,
            attack_cooldown: 2.0,
            aggro_range: 400.0,
            variant: BossVariant::Conductor,
            spawn_position: Position::new(0.0, -600.0),
            attacks_per_phrase: 3,
            enrage_fraction: 0.5,
            idle_intensity_threshold: 0.5,
            ultimate_transcendence_threshold: 0.8,
            perform_seconds: 5.0,
            size: 120.0,
            color: 0xFF00_FFFF,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: EncounterConfig =
            serde_json::from_str(r#"{ "judge": { "tolerance_ms": 80 }, "player": { "dash_recharge_seconds": null } }"#)
                .unwrap();
        assert_eq!(config.judge.tolerance_ms, 80.0);
        assert_eq!(config.judge.default_bpm, 120.0);
        assert_eq!(config.player.dash_recharge_seconds, None);
        assert_eq!(config.boss, BossConfig::default());
    }

    #[test]
    fn cooldowns_by_kind() {
        let c = Cooldowns::default();
        assert_eq!(c.of(AbilityKind::Ultimate), 30.0);
        assert_eq!(c.of(AbilityKind::Pause), 5.0);
    }
}
