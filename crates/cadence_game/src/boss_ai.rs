//! Boss AI state machine
//!
//! IDLE -> CHASING -> ATTACKING -> PERFORMING -> IDLE, evaluated once per
//! boss per tick. The defeat check runs last and ignores the state.

use crate::components::{
    Ai, BossResources, BossState, BossTag, Health, MoodVector, PlayerTag, Position, Session,
    StateMachine, Velocity,
};
use crate::config::BossConfig;
use crate::events::{BossCast, GameBus, GameEvent};
use cadence_core::ecs::{Entity, System, SystemDescriptor, TickContext, World};
use cadence_core::query;
use glam::Vec2;
use tracing::{debug, info};

pub struct BossAiSystem {
    config: BossConfig,
}

impl BossAiSystem {
    pub fn new(config: BossConfig) -> Self {
        Self { config }
    }
}

/// Outcome of one FSM step, applied after the components are written back.
#[derive(Debug, Default)]
struct Step {
    transitions: Vec<(BossState, BossState)>,
    casts: Vec<BossCast>,
}

fn transition(sm: &mut StateMachine, to: BossState, out: &mut Step) {
    out.transitions.push((sm.state, to));
    sm.enter(to);
}

fn boss_health(world: &World, boss: Entity) -> Option<(f32, f32)> {
    if let Some(h) = world.get_component::<Health>(boss) {
        return Some((h.current, h.max));
    }
    world
        .get_component::<BossResources>(boss)
        .map(|r| (r.health, r.max_health))
}

impl BossAiSystem {
    #[allow(clippy::too_many_arguments)]
    fn step(
        &self,
        sm: &mut StateMachine,
        pos: &mut Vec2,
        velocity: &mut Vec2,
        ai: &Ai,
        health: (f32, f32),
        player: Option<Vec2>,
        mood: &MoodVector,
        delta: f64,
    ) -> Step {
        let mut out = Step::default();

        sm.time_in_state += delta;
        *velocity = Vec2::ZERO;

        match sm.state {
            BossState::Idle => {
                let near = player.is_some_and(|p| pos.distance(p) < ai.aggro_range);
                if near || mood.intensity > self.config.idle_intensity_threshold {
                    transition(sm, BossState::Chasing, &mut out);
                }
            }
            BossState::Chasing => {
                let Some(target) = player else {
                    return out;
                };
                let distance = pos.distance(target);
                if distance > ai.attack_range {
                    let dir = (target - *pos).normalize_or_zero();
                    let stride = (ai.speed * delta as f32).min(distance);
                    *pos += dir * stride;
                    *velocity = dir * ai.speed;
                }
                if pos.distance(target) <= ai.attack_range {
                    transition(sm, BossState::Attacking, &mut out);
                }
            }
            BossState::Attacking => {
                sm.phrase_timer += delta;
                if sm.phrase_timer >= ai.attack_cooldown {
                    out.casts.push(BossCast::Attack);
                    sm.phrase_attack_counter += 1;
                    sm.phrase_timer = 0.0;

                    let (current, max) = health;
                    let enraged = current < max * self.config.enrage_fraction;
                    if sm.phrase_attack_counter >= self.config.attacks_per_phrase || enraged {
                        sm.phrase_attack_counter = 0;
                        transition(sm, BossState::Performing, &mut out);
                    } else {
                        transition(sm, BossState::Chasing, &mut out);
                    }
                }
            }
            BossState::Performing => {
                if !sm.performed {
                    sm.performed = true;
                    out.casts.push(
                        if mood.transcendence > self.config.ultimate_transcendence_threshold {
                            BossCast::Ultimate
                        } else {
                            BossCast::Special
                        },
                    );
                }
                if sm.time_in_state >= self.config.perform_seconds {
                    transition(sm, BossState::Idle, &mut out);
                }
            }
        }
        out
    }
}

impl System<GameEvent> for BossAiSystem {
    fn descriptor(&self) -> SystemDescriptor {
        SystemDescriptor::new("boss_ai")
            .read::<MoodVector>()
            .read::<Ai>()
            .read::<Health>()
            .write::<StateMachine>()
            .write::<Position>()
            .write::<Velocity>()
            .write::<Session>()
    }

    fn update(&mut self, world: &mut World, bus: &GameBus, ctx: &TickContext) {
        let Some(mood) = world
            .single::<MoodVector>()
            .and_then(|e| world.get_component::<MoodVector>(e))
            .copied()
        else {
            return;
        };
        let player = world
            .single::<PlayerTag>()
            .and_then(|e| world.get_component::<Position>(e))
            .map(|p| p.vec());

        let bosses: Vec<Entity> = query!(world, BossTag, Ai, Position, StateMachine)
            .filter(|&b| !world.is_pending_destroy(b))
            .collect();

        for boss in bosses {
            let (Some(ai), Some(pos), Some(mut sm)) = (
                world.get_component::<Ai>(boss).copied(),
                world.get_component::<Position>(boss).copied(),
                world.get_component::<StateMachine>(boss).copied(),
            ) else {
                continue;
            };
            let health = boss_health(world, boss).unwrap_or((1.0, 1.0));
            let mut pos = pos.vec();
            let mut velocity = Vec2::ZERO;

            let step = self.step(&mut sm, &mut pos, &mut velocity, &ai, health, player, &mood, ctx.delta);

            if let Some(slot) = world.get_component_mut::<StateMachine>(boss) {
                *slot = sm;
            }
            if let Some(slot) = world.get_component_mut::<Position>(boss) {
                *slot = pos.into();
            }
            if let Some(slot) = world.get_component_mut::<Velocity>(boss) {
                *slot = Velocity {
                    vx: velocity.x,
                    vy: velocity.y,
                };
            }

            for cast in step.casts {
                debug!(%boss, ability = cast.ability_id(), "boss cast");
                bus.publish(world, GameEvent::BossAbilityCast { boss, cast });
            }
            for (from, to) in step.transitions {
                debug!(%boss, %from, %to, "boss transition");
                bus.publish(world, GameEvent::BossStateChanged { boss, from, to });
            }

            // defeat: independent of state
            let defeated = boss_health(world, boss).is_some_and(|(current, _)| current <= 0.0);
            if defeated && world.destroy_entity(boss) {
                info!(%boss, "boss defeated");
                bus.publish(world, GameEvent::BossDefeated { boss });
                if let Some(state) = world.single::<Session>() {
                    if let Some(session) = world.get_component_mut::<Session>(state) {
                        session.victory = true;
                        session.running = false;
                    }
                }
                bus.publish(world, GameEvent::EncounterEnded { victory: true });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::BossVariant;

    fn ai() -> Ai {
        Ai {
            speed: 100.0,
            attack_range: 150.0,
            attack_cooldown: 2.0,
            aggro_range: 400.0,
            variant: BossVariant::Conductor,
        }
    }

    fn system() -> BossAiSystem {
        BossAiSystem::new(BossConfig::default())
    }

    #[test]
    fn idle_wakes_on_proximity_or_intensity() {
        let sys = system();
        let mut sm = StateMachine::default();
        let mut pos = Vec2::new(0.0, 1000.0);
        let mut vel = Vec2::ZERO;
        let calm = MoodVector::default();

        let step = sys.step(&mut sm, &mut pos, &mut vel, &ai(), (1.0, 1.0), Some(Vec2::ZERO), &calm, 0.1);
        assert!(step.transitions.is_empty());

        let hot = MoodVector {
            intensity: 0.6,
            ..MoodVector::default()
        };
        let step = sys.step(&mut sm, &mut pos, &mut vel, &ai(), (1.0, 1.0), Some(Vec2::ZERO), &hot, 0.1);
        assert_eq!(step.transitions, vec![(BossState::Idle, BossState::Chasing)]);
    }

    #[test]
    fn chase_stops_exactly_when_in_range() {
        let sys = system();
        let mut sm = StateMachine {
            state: BossState::Chasing,
            ..StateMachine::default()
        };
        let mut pos = Vec2::new(0.0, 300.0);
        let mut vel = Vec2::ZERO;
        let mood = MoodVector::default();

        // 300 -> 200: still chasing
        let step = sys.step(&mut sm, &mut pos, &mut vel, &ai(), (1.0, 1.0), Some(Vec2::ZERO), &mood, 1.0);
        assert!(step.transitions.is_empty());
        assert_eq!(sm.state, BossState::Chasing);
        assert!((pos.y - 200.0).abs() < 1e-4);
        assert!((vel.y + 100.0).abs() < 1e-4);

        // 200 -> 100: within range this tick
        let step = sys.step(&mut sm, &mut pos, &mut vel, &ai(), (1.0, 1.0), Some(Vec2::ZERO), &mood, 1.0);
        assert_eq!(step.transitions, vec![(BossState::Chasing, BossState::Attacking)]);
    }

    #[test]
    fn chase_never_overshoots_the_player() {
        let sys = system();
        let mut sm = StateMachine {
            state: BossState::Chasing,
            ..StateMachine::default()
        };
        let mut pos = Vec2::new(0.0, 200.0);
        let mut vel = Vec2::ZERO;
        let mut fast = ai();
        fast.speed = 10_000.0;
        fast.attack_range = 10.0;
        sys.step(&mut sm, &mut pos, &mut vel, &fast, (1.0, 1.0), Some(Vec2::ZERO), &MoodVector::default(), 1.0);
        assert!(pos.y >= -1e-4);
        assert_eq!(sm.state, BossState::Attacking);
    }

    #[test]
    fn attacks_cycle_into_performing_after_three() {
        let sys = system();
        let mut sm = StateMachine {
            state: BossState::Attacking,
            ..StateMachine::default()
        };
        let mut pos = Vec2::ZERO;
        let mut vel = Vec2::ZERO;
        let mood = MoodVector::default();
        let healthy = (1000.0, 1000.0);

        for round in 1..=3 {
            sm.enter(BossState::Attacking);
            let step = sys.step(&mut sm, &mut pos, &mut vel, &ai(), healthy, Some(Vec2::ZERO), &mood, 2.0);
            assert_eq!(step.casts, vec![BossCast::Attack]);
            let expected = if round < 3 { BossState::Chasing } else { BossState::Performing };
            assert_eq!(sm.state, expected, "round {round}");
        }
        assert_eq!(sm.phrase_attack_counter, 0);
    }

    #[test]
    fn low_health_goes_straight_to_performing() {
        let sys = system();
        let mut sm = StateMachine {
            state: BossState::Attacking,
            ..StateMachine::default()
        };
        let mut pos = Vec2::ZERO;
        let mut vel = Vec2::ZERO;
        let step = sys.step(&mut sm, &mut pos, &mut vel, &ai(), (400.0, 1000.0), None, &MoodVector::default(), 2.5);
        assert_eq!(step.transitions, vec![(BossState::Attacking, BossState::Performing)]);
    }

    #[test]
    fn performing_casts_once_then_idles() {
        let sys = system();
        let mut sm = StateMachine {
            state: BossState::Performing,
            ..StateMachine::default()
        };
        let mut pos = Vec2::ZERO;
        let mut vel = Vec2::ZERO;
        let transcendent = MoodVector {
            transcendence: 0.9,
            ..MoodVector::default()
        };

        let first = sys.step(&mut sm, &mut pos, &mut vel, &ai(), (1.0, 1.0), None, &transcendent, 1.0);
        assert_eq!(first.casts, vec![BossCast::Ultimate]);
        let second = sys.step(&mut sm, &mut pos, &mut vel, &ai(), (1.0, 1.0), None, &transcendent, 1.0);
        assert!(second.casts.is_empty());

        let done = sys.step(&mut sm, &mut pos, &mut vel, &ai(), (1.0, 1.0), None, &transcendent, 3.0);
        assert_eq!(done.transitions, vec![(BossState::Performing, BossState::Idle)]);
    }
}
