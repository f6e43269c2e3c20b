//! Snapshot capture/restore and the autosave system

use crate::components::{
    BossResources, BossTag, GameSpeed, MoodVector, PlayerResources, PlayerTag,
};
use crate::events::{EventKey, GameBus, GameEvent};
use cadence_core::ecs::{System, SystemDescriptor, TickContext, World};
use cadence_services::{BackgroundSaver, MemoryStore, SnapshotStore};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, error, info};

/// Everything that survives a restart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub game_speed_multiplier: f32,
    pub player_resources: PlayerResources,
    pub mood: MoodVector,
    pub boss_resources: BossResources,
}

/// Read the current snapshot; `None` if any singleton is missing.
pub fn capture(world: &World) -> Option<Snapshot> {
    let speed = world.get_component::<GameSpeed>(world.single::<GameSpeed>()?)?;
    let player = world.get_component::<PlayerResources>(world.single::<PlayerTag>()?)?;
    let mood = world.get_component::<MoodVector>(world.single::<MoodVector>()?)?;
    let boss = world.get_component::<BossResources>(world.single::<BossTag>()?)?;
    Some(Snapshot {
        game_speed_multiplier: speed.multiplier,
        player_resources: *player,
        mood: *mood,
        boss_resources: *boss,
    })
}

/// Write every snapshot field into the live components. Returns false if
/// some target was missing (the rest are still applied).
pub fn apply(world: &mut World, snapshot: &Snapshot) -> bool {
    let mut complete = true;

    match world.single::<GameSpeed>().and_then(|e| world.get_component_mut::<GameSpeed>(e)) {
        Some(speed) => speed.multiplier = snapshot.game_speed_multiplier,
        None => complete = false,
    }
    match world.single::<PlayerTag>().and_then(|e| world.get_component_mut::<PlayerResources>(e)) {
        Some(res) => *res = snapshot.player_resources,
        None => complete = false,
    }
    match world.single::<MoodVector>().and_then(|e| world.get_component_mut::<MoodVector>(e)) {
        Some(mood) => *mood = snapshot.mood,
        None => complete = false,
    }
    match world.single::<BossTag>().and_then(|e| world.get_component_mut::<BossResources>(e)) {
        Some(res) => *res = snapshot.boss_resources,
        None => complete = false,
    }
    complete
}

/// Non-blocking destination for snapshots.
pub trait SnapshotSink {
    fn submit(&mut self, snapshot: Snapshot);
}

impl SnapshotSink for BackgroundSaver<Snapshot> {
    fn submit(&mut self, snapshot: Snapshot) {
        self.try_submit(snapshot);
    }
}

impl SnapshotSink for MemoryStore {
    fn submit(&mut self, snapshot: Snapshot) {
        if let Err(err) = self.save(&snapshot) {
            error!(%err, "snapshot save failed");
        }
    }
}

pub type SharedSink = Rc<RefCell<dyn SnapshotSink>>;

pub struct PersistenceSystem {
    sink: SharedSink,
    interval: f64,
    last_save: Option<f64>,
}

impl PersistenceSystem {
    pub fn new(sink: SharedSink, interval_seconds: f64) -> Self {
        Self {
            sink,
            interval: interval_seconds,
            last_save: None,
        }
    }
}

fn save_now(world: &World, sink: &SharedSink, reason: &'static str) -> bool {
    match capture(world) {
        Some(snapshot) => {
            sink.borrow_mut().submit(snapshot);
            info!(reason, "game saved");
            true
        }
        None => {
            debug!(reason, "save skipped; state incomplete");
            false
        }
    }
}

impl System<GameEvent> for PersistenceSystem {
    fn descriptor(&self) -> SystemDescriptor {
        SystemDescriptor::new("persistence")
            .read::<GameSpeed>()
            .read::<PlayerResources>()
            .read::<MoodVector>()
            .read::<BossResources>()
    }

    fn subscribe(&mut self, bus: &GameBus) {
        let sink = Rc::clone(&self.sink);
        bus.subscribe(EventKey::EncounterEnded, move |world, _, _| {
            save_now(world, &sink, "encounter ended");
        });
    }

    fn update(&mut self, world: &mut World, _bus: &GameBus, ctx: &TickContext) {
        let last = *self.last_save.get_or_insert(ctx.wall_clock);
        if ctx.wall_clock - last > self.interval {
            save_now(world, &self.sink, "autosave");
            self.last_save = Some(ctx.wall_clock);
        }
    }
}
