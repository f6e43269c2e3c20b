//! Note (floor tile) lifecycle: spawn from the chart, age out, report misses.

use crate::chart::Chart;
use crate::components::{ChartCursor, GameSpeed, Note, Position, Renderable, Shape};
use crate::config::NoteConfig;
use crate::events::{EventKey, GameBus, GameEvent};
use cadence_core::ecs::{Entity, System, SystemDescriptor, TickContext, World};
use cadence_core::query;
use std::rc::Rc;
use tracing::{debug, info, warn};

pub struct NoteSystem {
    config: NoteConfig,
}

impl NoteSystem {
    pub fn new(config: NoteConfig) -> Self {
        Self { config }
    }
}

/// Point the cursor at `chart`, dropping any notes still on the floor.
pub fn load_chart(world: &mut World, bus: &GameBus, chart: Rc<Chart>) {
    let residual: Vec<Entity> = query!(world, Note).collect();
    for note in &residual {
        world.destroy_entity(*note);
    }

    let Some(state) = world.single::<ChartCursor>() else {
        warn!("no chart cursor; chart not loaded");
        return;
    };
    let id = chart.id.clone();
    let notes = chart.len();
    if let Some(cursor) = world.get_component_mut::<ChartCursor>(state) {
        *cursor = ChartCursor {
            chart: Some(chart),
            ..ChartCursor::default()
        };
    }
    info!(chart = %id, notes, cleared = residual.len(), "chart selected");
    bus.publish(world, GameEvent::ChartLoaded { id, notes });
}

impl System<GameEvent> for NoteSystem {
    fn descriptor(&self) -> SystemDescriptor {
        SystemDescriptor::new("notes")
            .read::<GameSpeed>()
            .write::<ChartCursor>()
            .write::<Note>()
            .write::<Position>()
            .write::<Renderable>()
    }

    fn subscribe(&mut self, bus: &GameBus) {
        bus.subscribe(EventKey::Beat, |world, _bus, _event| {
            if let Some(state) = world.single::<ChartCursor>() {
                if let Some(cursor) = world.get_component_mut::<ChartCursor>(state) {
                    cursor.beats_seen += 1;
                }
            }
        });
    }

    fn update(&mut self, world: &mut World, bus: &GameBus, ctx: &TickContext) {
        let Some(state) = world.single::<ChartCursor>() else {
            return;
        };
        let speed = world
            .single::<GameSpeed>()
            .and_then(|e| world.get_component::<GameSpeed>(e))
            .map_or(1.0, |s| s.multiplier as f64);

        // advance the chart clock and collect due entries
        let (now, due, chart_done) = {
            let Some(cursor) = world.get_component_mut::<ChartCursor>(state) else {
                return;
            };
            let Some(chart) = cursor.chart.clone() else {
                return;
            };
            cursor.elapsed += ctx.delta * speed;
            let start = cursor.next;
            while chart
                .note_map
                .get(cursor.next)
                .is_some_and(|n| n.timestamp <= cursor.elapsed)
            {
                cursor.next += 1;
            }
            let due = chart.note_map[start..cursor.next].to_vec();
            (cursor.elapsed, due, cursor.next >= chart.len() && !cursor.completed)
        };

        for entry in due {
            let note = world.create_entity();
            let component = Note {
                position: entry.position,
                spawn_time: entry.timestamp,
                duration: entry.duration,
                color: self.config.color,
                hit: false,
            };
            let renderable = Renderable {
                shape: Shape::Rectangle,
                width: self.config.size,
                height: self.config.size,
                color: self.config.color,
            };
            let added = world
                .add_component(note, component)
                .and_then(|_| world.add_component(note, entry.position))
                .and_then(|_| world.add_component(note, renderable));
            if let Err(err) = added {
                warn!(%err, "note spawn failed");
                continue;
            }
            debug!(%note, at = entry.timestamp, x = entry.position.x, y = entry.position.y, "note spawned");
            bus.publish(
                world,
                GameEvent::TileSpawned {
                    note,
                    position: entry.position,
                    color: self.config.color,
                },
            );
        }

        let expired: Vec<Entity> = query!(world, Note)
            .filter(|&e| !world.is_pending_destroy(e))
            .filter(|&e| {
                world
                    .get_component::<Note>(e)
                    .is_some_and(|n| !n.hit && now - n.spawn_time >= n.duration)
            })
            .collect();
        for note in expired {
            world.destroy_entity(note);
            debug!(%note, now, "note expired");
            bus.publish(world, GameEvent::NoteExpired { note });
            bus.publish(world, GameEvent::NoteMissed { note: Some(note) });
        }

        if chart_done {
            let live = query!(world, Note)
                .filter(|&e| !world.is_pending_destroy(e))
                .count();
            if live == 0 {
                if let Some(cursor) = world.get_component_mut::<ChartCursor>(state) {
                    cursor.completed = true;
                }
                info!(now, "chart completed");
                bus.publish(world, GameEvent::ChartCompleted);
            }
        }
    }
}
