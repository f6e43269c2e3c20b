//! Read-only view of the world for the renderer and HUD

use crate::components::{
    AbilityCooldowns, BossResources, BossState, BossTag, ChartCursor, GameSpeed, Health,
    MoodVector, Note, PlayerResources, PlayerTag, Position, Renderable, ScoreCounters, Session,
    StateMachine, Velocity,
};
use crate::config::Cooldowns;
use cadence_core::ecs::{Entity, World};
use cadence_core::query;
use cadence_services::input::AbilityKind;

#[derive(Debug, Clone, PartialEq)]
pub struct RenderItem {
    pub entity: Entity,
    pub position: Position,
    pub renderable: Renderable,
    pub health: Option<Health>,
    pub velocity: Option<Velocity>,
    pub note: Option<Note>,
    pub boss_state: Option<BossState>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hud {
    pub combo: u32,
    pub max_combo: u32,
    pub mood: MoodVector,
    pub beats_seen: u64,
    pub game_speed: f32,
    pub player: Option<PlayerResources>,
    pub boss: Option<BossResources>,
    pub paused: bool,
    /// Seconds left on each ability's cooldown, in `AbilityKind::ALL` order.
    pub cooldowns: Vec<(AbilityKind, f64)>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderFeed {
    pub items: Vec<RenderItem>,
    pub hud: Hud,
}

/// Build the frame view. `at` is the host time cooldowns are measured at.
pub fn render_feed(world: &World, cooldowns: &Cooldowns, at: f64) -> RenderFeed {
    let items = query!(world, Position, Renderable)
        .filter(|&e| !world.is_pending_destroy(e))
        .filter_map(|entity| {
            Some(RenderItem {
                entity,
                position: *world.get_component::<Position>(entity)?,
                renderable: *world.get_component::<Renderable>(entity)?,
                health: world.get_component::<Health>(entity).copied(),
                velocity: world.get_component::<Velocity>(entity).copied(),
                note: world.get_component::<Note>(entity).copied(),
                boss_state: world.get_component::<StateMachine>(entity).map(|sm| sm.state),
            })
        })
        .collect();

    let counters = first::<ScoreCounters>(world).unwrap_or_default();
    let hud = Hud {
        combo: counters.combo,
        max_combo: counters.max_combo,
        mood: first::<MoodVector>(world).unwrap_or_default(),
        beats_seen: world
            .single::<ChartCursor>()
            .and_then(|e| world.get_component::<ChartCursor>(e))
            .map_or(0, |c| c.beats_seen),
        game_speed: first::<GameSpeed>(world).unwrap_or_default().multiplier,
        player: world
            .single::<PlayerTag>()
            .and_then(|e| world.get_component::<PlayerResources>(e))
            .copied(),
        boss: world
            .single::<BossTag>()
            .and_then(|e| world.get_component::<BossResources>(e))
            .copied(),
        paused: first::<Session>(world).is_some_and(|s| s.paused),
        cooldowns: cooldowns_remaining(world, cooldowns, at),
    };

    RenderFeed { items, hud }
}

/// Remaining cooldown per ability; empty without a player.
pub fn cooldowns_remaining(world: &World, config: &Cooldowns, at: f64) -> Vec<(AbilityKind, f64)> {
    let Some(used) = world
        .single::<PlayerTag>()
        .and_then(|e| world.get_component::<AbilityCooldowns>(e))
    else {
        return Vec::new();
    };
    AbilityKind::ALL
        .iter()
        .map(|&kind| (kind, used.remaining(kind, config.of(kind), at)))
        .collect()
}

fn first<T: cadence_core::ecs::Component + Copy>(world: &World) -> Option<T> {
    world.single::<T>().and_then(|e| world.get_component::<T>(e)).copied()
}
