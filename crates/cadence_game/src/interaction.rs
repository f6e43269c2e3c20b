//! Player interaction: turns verdicts into dashes, note hits and misses.
//!
//! Resource gate first, then movement, then the spatial check. This system
//! is the only place dash charges are spent.

use crate::components::{DashRecharge, Note, PlayerResources, PlayerTag, Position};
use crate::config::PlayerConfig;
use crate::events::{DashFailure, EventKey, GameBus, GameEvent};
use crate::judge::Verdict;
use cadence_core::ecs::{Entity, System, SystemDescriptor, TickContext, World};
use cadence_core::query;
use tracing::{debug, trace};

pub struct InteractionSystem {
    pickup_radius: f32,
    recharge_seconds: Option<f64>,
}

impl InteractionSystem {
    pub fn new(config: &PlayerConfig) -> Self {
        Self {
            pickup_radius: config.pickup_radius,
            recharge_seconds: config.dash_recharge_seconds.filter(|s| *s > 0.0),
        }
    }
}

/// Closest live, unhit note strictly within `radius` of `origin`.
/// Ties keep the first note found.
pub fn nearest_note(world: &World, origin: Position, radius: f32) -> Option<Entity> {
    let origin = origin.vec();
    let mut best: Option<(Entity, f32)> = None;
    for note in query!(world, Note, Position) {
        if world.is_pending_destroy(note) {
            continue;
        }
        let (Some(n), Some(pos)) = (
            world.get_component::<Note>(note),
            world.get_component::<Position>(note),
        ) else {
            continue;
        };
        if n.hit {
            continue;
        }
        let distance = pos.vec().distance(origin);
        if distance < radius && best.map_or(true, |(_, d)| distance < d) {
            best = Some((note, distance));
        }
    }
    best.map(|(note, _)| note)
}

fn resolve_dash(world: &mut World, bus: &GameBus, verdict: &Verdict, radius: f32) {
    let Some(player) = world.single::<PlayerTag>() else {
        return;
    };

    if !verdict.on_rhythm {
        debug!(offset_ms = verdict.offset_ms, "dash off rhythm");
        bus.publish(world, GameEvent::DashFailed { reason: DashFailure::OffRhythm });
        bus.publish(world, GameEvent::NoteMissed { note: None });
        return;
    }

    let Some(resources) = world.get_component_mut::<PlayerResources>(player) else {
        return;
    };
    if resources.dash_charges == 0 {
        debug!("dash with no charges left");
        bus.publish(world, GameEvent::DashFailed { reason: DashFailure::NoCharges });
        bus.publish(world, GameEvent::NoteMissed { note: None });
        return;
    }
    resources.dash_charges -= 1;
    let resources = *resources;

    if let Some(pos) = world.get_component_mut::<Position>(player) {
        *pos = verdict.target;
    }

    bus.publish(
        world,
        GameEvent::DashSucceeded {
            target: verdict.target,
            charges: resources.dash_charges,
        },
    );
    bus.publish(world, GameEvent::PlayerStateUpdated(resources));

    match nearest_note(world, verdict.target, radius) {
        Some(note) => {
            if let Some(n) = world.get_component_mut::<Note>(note) {
                n.hit = true;
            }
            world.destroy_entity(note);
            debug!(%note, "note hit");
            bus.publish(world, GameEvent::NoteHit { note });
        }
        None => {
            trace!(x = verdict.target.x, y = verdict.target.y, "dash landed on empty floor");
            bus.publish(world, GameEvent::NoteMissed { note: None });
        }
    }
}

impl System<GameEvent> for InteractionSystem {
    fn descriptor(&self) -> SystemDescriptor {
        SystemDescriptor::new("interaction")
            .read::<PlayerTag>()
            .write::<PlayerResources>()
            .write::<DashRecharge>()
            .write::<Position>()
            .write::<Note>()
    }

    fn subscribe(&mut self, bus: &GameBus) {
        let radius = self.pickup_radius;
        bus.subscribe(EventKey::RhythmVerdict, move |world, bus, event| {
            if let GameEvent::RhythmVerdict(verdict) = event {
                resolve_dash(world, bus, verdict, radius);
            }
        });
    }

    fn update(&mut self, world: &mut World, bus: &GameBus, ctx: &TickContext) {
        let Some(player) = world.single::<PlayerTag>() else {
            return;
        };
        let Some(mut resources) = world.get_component::<PlayerResources>(player).copied() else {
            return;
        };
        let before = resources;
        resources.dash_charges = resources.dash_charges.min(resources.max_dash_charges);

        if let Some(period) = self.recharge_seconds {
            let mut recharge = world
                .get_component::<DashRecharge>(player)
                .copied()
                .unwrap_or_default();
            if resources.dash_charges < resources.max_dash_charges {
                recharge.timer += ctx.delta;
                if recharge.timer >= period {
                    recharge.timer -= period;
                    resources.dash_charges += 1;
                }
            } else {
                recharge.timer = 0.0;
            }
            if let Some(slot) = world.get_component_mut::<DashRecharge>(player) {
                *slot = recharge;
            }
        }

        if resources != before {
            if let Some(slot) = world.get_component_mut::<PlayerResources>(player) {
                *slot = resources;
            }
            bus.publish(world, GameEvent::PlayerStateUpdated(resources));
        }
    }
}
