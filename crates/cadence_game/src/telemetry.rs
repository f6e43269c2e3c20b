//! Periodic mood push to the visualizer backend

use crate::components::MoodVector;
use crate::events::{GameBus, GameEvent};
use cadence_core::ecs::{System, SystemDescriptor, TickContext, World};
use cadence_services::TelemetryClient;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::trace;

pub trait TelemetrySink {
    fn push(&mut self, mood: MoodVector);
}

impl TelemetrySink for TelemetryClient<MoodVector> {
    fn push(&mut self, mood: MoodVector) {
        self.try_push(mood);
    }
}

/// Collects samples in memory; used by headless runs and tests.
impl TelemetrySink for Rc<RefCell<Vec<MoodVector>>> {
    fn push(&mut self, mood: MoodVector) {
        self.borrow_mut().push(mood);
    }
}

pub struct TelemetrySystem {
    sink: Box<dyn TelemetrySink>,
    interval: f64,
    last_push: Option<f64>,
}

impl TelemetrySystem {
    pub fn new(sink: Box<dyn TelemetrySink>, interval_seconds: f64) -> Self {
        Self {
            sink,
            interval: interval_seconds.max(0.0),
            last_push: None,
        }
    }
}

impl System<GameEvent> for TelemetrySystem {
    fn descriptor(&self) -> SystemDescriptor {
        SystemDescriptor::new("telemetry").read::<MoodVector>()
    }

    fn update(&mut self, world: &mut World, _bus: &GameBus, ctx: &TickContext) {
        let due = self
            .last_push
            .map_or(true, |last| ctx.wall_clock - last >= self.interval);
        if !due {
            return;
        }
        let Some(mood) = world
            .single::<MoodVector>()
            .and_then(|e| world.get_component::<MoodVector>(e))
            .copied()
        else {
            return;
        };
        trace!(intensity = mood.intensity, "telemetry sample");
        self.sink.push(mood);
        self.last_push = Some(ctx.wall_clock);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EncounterConfig;
    use crate::encounter::Encounter;

    fn live(interval: f64) -> (Encounter, Rc<RefCell<Vec<MoodVector>>>) {
        let mut encounter = Encounter::new(EncounterConfig::default()).unwrap();
        let samples = Rc::new(RefCell::new(Vec::new()));
        encounter
            .attach_telemetry(Box::new(Rc::clone(&samples)), interval)
            .unwrap();
        encounter.start();
        (encounter, samples)
    }

    #[test]
    fn pushes_on_first_tick_then_at_the_interval() {
        let (mut encounter, samples) = live(1.0);
        encounter.tick(0.1, 0.0);
        assert_eq!(samples.borrow().len(), 1);
        encounter.tick(0.1, 0.5);
        assert_eq!(samples.borrow().len(), 1);
        encounter.tick(0.1, 1.0);
        assert_eq!(samples.borrow().len(), 2);
    }

    #[test]
    fn samples_match_the_live_mood() {
        let (mut encounter, samples) = live(0.0);
        encounter.tick(0.1, 0.0);
        encounter.tick(0.1, 0.1);
        assert_eq!(samples.borrow().len(), 2);
        assert_eq!(samples.borrow()[1], encounter.mood());
    }

    #[test]
    fn nothing_is_pushed_while_paused() {
        let (mut encounter, samples) = live(0.0);
        encounter.pause(true);
        encounter.tick(0.1, 0.0);
        assert!(samples.borrow().is_empty());
    }
}
