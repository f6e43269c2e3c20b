//! Scoring and mood
//!
//! Counters are updated from gameplay events; the mood vector is rebuilt
//! from them every tick. Recovery and transcendence are the exception:
//! they carry over between ticks and only abilities touch them.
//!
//! Ability handlers live here as well since every ability writes mood or
//! game-speed state. Each activation schedules a deferred `AbilityRevert`
//! keyed by the field it changed.

use crate::components::{
    BossResources, BossTag, GameSpeed, Health, MoodModifiers, MoodVector, PlayerResources,
    PlayerTag, ScoreCounters,
};
use crate::config::{AbilityConfig, MoodConfig};
use crate::events::{EventKey, GameBus, GameEvent, Reversion};
use cadence_core::ecs::{System, SystemDescriptor, TickContext, World};
use cadence_services::input::AbilityKind;
use tracing::{debug, info};

/// Rebuild the mood vector from counters, keeping the ability-owned axes.
pub fn derive_mood(
    counters: &ScoreCounters,
    previous: &MoodVector,
    modifiers: &MoodModifiers,
    config: &MoodConfig,
) -> MoodVector {
    let combo = counters.combo as f32;
    let precision = ((combo / config.combo_cap).min(1.0) + modifiers.precision_bonus).clamp(0.0, 1.0);
    let aggression = ((combo / config.aggro_cap).min(1.0) + modifiers.aggression_bonus).clamp(0.0, 1.0);
    let flow = if counters.dash_attempts > 0 {
        counters.dash_successes as f32 / counters.dash_attempts as f32
    } else {
        0.0
    };
    let chaos = if counters.combo == 0 && counters.dash_attempts > 0 && counters.dash_failures > 0 {
        1.0
    } else {
        0.0
    };
    let recovery = previous.recovery.clamp(0.0, 1.0);
    let transcendence = previous.transcendence.clamp(0.0, 1.0);
    let intensity = (config.precision_weight * precision
        + config.aggression_weight * aggression
        + config.flow_weight * flow
        + config.recovery_weight * recovery
        + config.transcendence_weight * transcendence)
        .clamp(0.0, 1.0);

    MoodVector {
        intensity,
        precision,
        aggression,
        flow,
        chaos,
        recovery,
        transcendence,
    }
}

/// Music tempo multiplier for the audio collaborator.
pub fn tempo_multiplier(combo: u32, config: &MoodConfig) -> f32 {
    let progress = (combo as f32 / config.tempo_combo_threshold).min(1.0);
    1.0 + (config.max_tempo - 1.0) * progress
}

pub struct ScoringSystem {
    mood: MoodConfig,
    abilities: AbilityConfig,
}

impl ScoringSystem {
    pub fn new(mood: MoodConfig, abilities: AbilityConfig) -> Self {
        Self { mood, abilities }
    }
}

fn with_counters(world: &mut World, f: impl FnOnce(&mut ScoreCounters)) {
    if let Some(entity) = world.single::<ScoreCounters>() {
        if let Some(counters) = world.get_component_mut::<ScoreCounters>(entity) {
            f(counters);
        }
    }
}

fn primary_target(kind: AbilityKind) -> &'static str {
    match kind {
        AbilityKind::Pause => "game.speed",
        AbilityKind::FastForward => "mood.aggression_bonus",
        AbilityKind::Rewind => "mood.recovery",
        AbilityKind::Ultimate => "mood.transcendence",
    }
}

/// Schedule the reversion for one field and return the value it will
/// restore. A pending reversion for the same field keeps its restore value
/// and only has its fire time pushed back.
fn schedule_revert(bus: &GameBus, kind: AbilityKind, current: Reversion, fire_at: f64) -> f32 {
    let restore = match bus.pending(current.task_key()) {
        Some((_, GameEvent::AbilityRevert { reversion, .. })) => reversion,
        _ => current,
    };
    bus.schedule(
        restore.task_key(),
        fire_at,
        GameEvent::AbilityRevert {
            kind,
            reversion: restore,
        },
    );
    restore.value()
}

fn activate(world: &mut World, bus: &GameBus, kind: AbilityKind, now: f64, cfg: &AbilityConfig) {
    let Some(mood_entity) = world.single::<MoodVector>() else {
        debug!(%kind, "no mood singleton; ability ignored");
        return;
    };
    let Some(modifiers) = world.get_component::<MoodModifiers>(mood_entity).copied() else {
        return;
    };
    let Some(mut mood) = world.get_component::<MoodVector>(mood_entity).copied() else {
        return;
    };
    let mut modifiers = modifiers;

    match kind {
        AbilityKind::Pause => {
            let fire_at = now + cfg.pause_seconds;
            if let Some(speed_entity) = world.single::<GameSpeed>() {
                let current = world
                    .get_component::<GameSpeed>(speed_entity)
                    .map_or(1.0, |s| s.multiplier);
                schedule_revert(bus, kind, Reversion::GameSpeed(current), fire_at);
                if let Some(speed) = world.get_component_mut::<GameSpeed>(speed_entity) {
                    speed.multiplier = cfg.pause_speed;
                }
                bus.publish(world, GameEvent::GameSpeedChanged { multiplier: cfg.pause_speed });
            }
            let base = schedule_revert(
                bus,
                kind,
                Reversion::PrecisionBonus(modifiers.precision_bonus),
                fire_at,
            );
            modifiers.precision_bonus = base + cfg.pause_precision_bonus;
            mood.precision = (mood.precision + cfg.pause_precision_bonus).min(1.0);
        }
        AbilityKind::FastForward => {
            let base = schedule_revert(
                bus,
                kind,
                Reversion::AggressionBonus(modifiers.aggression_bonus),
                now + cfg.fast_forward_seconds,
            );
            modifiers.aggression_bonus = base + cfg.fast_forward_aggression_bonus;
            mood.aggression = (mood.aggression + cfg.fast_forward_aggression_bonus).min(1.0);
        }
        AbilityKind::Rewind => {
            if let Some(player) = world.single::<PlayerTag>() {
                if let Some(res) = world.get_component_mut::<PlayerResources>(player) {
                    res.health = (res.health + res.max_health * cfg.rewind_health_fraction).min(res.max_health);
                    res.dash_charges = (res.dash_charges + 1).min(res.max_dash_charges);
                    let res = *res;
                    if let Some(health) = world.get_component_mut::<Health>(player) {
                        health.current = res.health;
                        health.max = res.max_health;
                    }
                    bus.publish(
                        world,
                        GameEvent::RewindActivated {
                            health: res.health,
                            dash_charges: res.dash_charges,
                        },
                    );
                    bus.publish(world, GameEvent::PlayerStateUpdated(res));
                }
            }
            let base = schedule_revert(
                bus,
                kind,
                Reversion::Recovery(mood.recovery),
                now + cfg.rewind_seconds,
            );
            mood.recovery = (base + cfg.rewind_recovery_bonus).min(1.0);
        }
        AbilityKind::Ultimate => {
            schedule_revert(
                bus,
                kind,
                Reversion::Transcendence(mood.transcendence),
                now + cfg.ultimate_seconds,
            );
            mood.transcendence = 1.0;
        }
    }

    if let Some(slot) = world.get_component_mut::<MoodModifiers>(mood_entity) {
        *slot = modifiers;
    }
    if let Some(slot) = world.get_component_mut::<MoodVector>(mood_entity) {
        *slot = mood.clamped();
    }
    info!(%kind, now, "ability activated");

    match kind {
        AbilityKind::FastForward => bus.publish(
            world,
            GameEvent::FastForwardActivated {
                aggression: mood.aggression,
            },
        ),
        AbilityKind::Ultimate => bus.publish(world, GameEvent::UltimateActivated),
        AbilityKind::Pause | AbilityKind::Rewind => {}
    }
}

fn revert(world: &mut World, bus: &GameBus, kind: AbilityKind, reversion: Reversion) {
    match reversion {
        Reversion::GameSpeed(v) => {
            if let Some(e) = world.single::<GameSpeed>() {
                if let Some(speed) = world.get_component_mut::<GameSpeed>(e) {
                    speed.multiplier = v;
                }
                bus.publish(world, GameEvent::GameSpeedChanged { multiplier: v });
            }
        }
        Reversion::PrecisionBonus(v) | Reversion::AggressionBonus(v) => {
            if let Some(e) = world.single::<MoodModifiers>() {
                if let Some(m) = world.get_component_mut::<MoodModifiers>(e) {
                    match reversion {
                        Reversion::PrecisionBonus(_) => m.precision_bonus = v,
                        _ => m.aggression_bonus = v,
                    }
                }
            }
        }
        Reversion::Recovery(v) | Reversion::Transcendence(v) => {
            if let Some(e) = world.single::<MoodVector>() {
                if let Some(mood) = world.get_component_mut::<MoodVector>(e) {
                    match reversion {
                        Reversion::Recovery(_) => mood.recovery = v.clamp(0.0, 1.0),
                        _ => mood.transcendence = v.clamp(0.0, 1.0),
                    }
                }
            }
            if matches!(reversion, Reversion::Transcendence(_)) {
                bus.publish(world, GameEvent::UltimateDeactivated);
            }
        }
    }

    if reversion.task_key() == primary_target(kind) {
        debug!(%kind, "ability expired");
        bus.publish(world, GameEvent::AbilityExpired { kind });
    }
}

impl System<GameEvent> for ScoringSystem {
    fn descriptor(&self) -> SystemDescriptor {
        SystemDescriptor::new("scoring")
            .read::<ScoreCounters>()
            .read::<MoodModifiers>()
            .write::<MoodVector>()
            .write::<BossResources>()
            .write::<Health>()
    }

    fn subscribe(&mut self, bus: &GameBus) {
        bus.subscribe(EventKey::NoteHit, |world, _, _| {
            with_counters(world, |c| {
                c.combo += 1;
                c.hits += 1;
                c.max_combo = c.max_combo.max(c.combo);
            });
        });
        bus.subscribe(EventKey::NoteMissed, |world, _, _| {
            with_counters(world, |c| {
                c.combo = 0;
                c.misses += 1;
            });
        });
        bus.subscribe(EventKey::DashSucceeded, |world, _, _| {
            with_counters(world, |c| {
                c.dash_attempts += 1;
                c.dash_successes += 1;
            });
        });
        bus.subscribe(EventKey::DashFailed, |world, _, _| {
            with_counters(world, |c| {
                c.dash_attempts += 1;
                c.dash_failures += 1;
            });
        });

        let abilities = self.abilities;
        bus.subscribe(EventKey::AbilityUsed, move |world, bus, event| {
            if let GameEvent::AbilityUsed { kind, now } = *event {
                activate(world, bus, kind, now, &abilities);
            }
        });
        bus.subscribe(EventKey::AbilityRevert, |world, bus, event| {
            if let GameEvent::AbilityRevert { kind, reversion } = *event {
                revert(world, bus, kind, reversion);
            }
        });
    }

    fn update(&mut self, world: &mut World, bus: &GameBus, ctx: &TickContext) {
        let Some(mood_entity) = world.single::<MoodVector>() else {
            return;
        };
        let (Some(counters), Some(previous)) = (
            world.get_component::<ScoreCounters>(mood_entity).copied(),
            world.get_component::<MoodVector>(mood_entity).copied(),
        ) else {
            return;
        };
        let modifiers = world
            .get_component::<MoodModifiers>(mood_entity)
            .copied()
            .unwrap_or_default();

        let mood = derive_mood(&counters, &previous, &modifiers, &self.mood);
        if let Some(slot) = world.get_component_mut::<MoodVector>(mood_entity) {
            *slot = mood;
        }

        let boss = world
            .single::<BossTag>()
            .filter(|&b| !world.is_pending_destroy(b));
        if let Some(boss) = boss {
            if let Some(res) = world.get_component_mut::<BossResources>(boss) {
                let damage = mood.intensity * self.mood.damage_rate * ctx.delta as f32;
                res.health = (res.health - damage).max(0.0);
                let res = *res;
                if let Some(health) = world.get_component_mut::<Health>(boss) {
                    health.current = res.health;
                    health.max = res.max_health;
                }
                bus.publish(
                    world,
                    GameEvent::BossHealthUpdated {
                        boss,
                        health: res.health,
                        max: res.max_health,
                    },
                );

                if mood.intensity > self.mood.aggression_threshold && !res.is_aggressive {
                    if let Some(res) = world.get_component_mut::<BossResources>(boss) {
                        res.is_aggressive = true;
                    }
                    info!(%boss, intensity = mood.intensity, "boss escalates");
                    bus.publish(
                        world,
                        GameEvent::BossAggressive {
                            boss,
                            intensity: mood.intensity,
                        },
                    );
                }
            }
        }

        bus.publish(
            world,
            GameEvent::TempoScaled {
                intensity: mood.intensity,
                combo: counters.combo,
                multiplier: tempo_multiplier(counters.combo, &self.mood),
            },
        );
        bus.publish(
            world,
            GameEvent::MoodUpdated {
                mood,
                combo: counters.combo,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counters(combo: u32, attempts: u32, successes: u32) -> ScoreCounters {
        ScoreCounters {
            combo,
            dash_attempts: attempts,
            dash_successes: successes,
            dash_failures: attempts - successes,
            ..ScoreCounters::default()
        }
    }

    #[test]
    fn axes_follow_counters() {
        let cfg = MoodConfig::default();
        let mood = derive_mood(
            &counters(25, 4, 3),
            &MoodVector::default(),
            &MoodModifiers::default(),
            &cfg,
        );
        assert!((mood.precision - 0.25).abs() < 1e-6);
        assert!((mood.aggression - 0.5).abs() < 1e-6);
        assert!((mood.flow - 0.75).abs() < 1e-6);
        assert_eq!(mood.chaos, 0.0);
        let expected = 0.3 * 0.25 + 0.3 * 0.5 + 0.2 * 0.75;
        assert!((mood.intensity - expected).abs() < 1e-6);
    }

    #[test]
    fn chaos_needs_zero_combo_and_a_failed_dash() {
        let cfg = MoodConfig::default();
        let none = MoodModifiers::default();
        let prev = MoodVector::default();
        assert_eq!(derive_mood(&counters(0, 2, 1), &prev, &none, &cfg).chaos, 1.0);
        assert_eq!(derive_mood(&counters(0, 2, 2), &prev, &none, &cfg).chaos, 0.0);
        assert_eq!(derive_mood(&counters(0, 0, 0), &prev, &none, &cfg).chaos, 0.0);
        assert_eq!(derive_mood(&counters(1, 2, 1), &prev, &none, &cfg).chaos, 0.0);
    }

    #[test]
    fn intensity_saturates() {
        let cfg = MoodConfig::default();
        let prev = MoodVector {
            recovery: 1.0,
            transcendence: 1.0,
            ..MoodVector::default()
        };
        for combo in [0, 1, 10_000] {
            let mood = derive_mood(&counters(combo, 1, 1), &prev, &MoodModifiers::default(), &cfg);
            assert!((0.0..=1.0).contains(&mood.intensity), "combo {combo}");
        }
        let maxed = derive_mood(&counters(10_000, 1, 1), &prev, &MoodModifiers::default(), &cfg);
        assert!((maxed.intensity - 1.0).abs() < 1e-6);
    }

    #[test]
    fn modifiers_survive_recompute_and_clamp() {
        let cfg = MoodConfig::default();
        let mods = MoodModifiers {
            precision_bonus: 0.1,
            aggression_bonus: 0.5,
        };
        let mood = derive_mood(&counters(40, 0, 0), &MoodVector::default(), &mods, &cfg);
        assert!((mood.precision - 0.5).abs() < 1e-6);
        assert_eq!(mood.aggression, 1.0);
    }

    #[test]
    fn tempo_ramps_to_max() {
        let cfg = MoodConfig::default();
        assert_eq!(tempo_multiplier(0, &cfg), 1.0);
        assert!((tempo_multiplier(25, &cfg) - 1.25).abs() < 1e-6);
        assert_eq!(tempo_multiplier(500, &cfg), 1.5);
    }
}
