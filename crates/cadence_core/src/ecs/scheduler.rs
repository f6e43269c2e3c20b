// scheduler.rs - Ordered system execution
//
// One `tick` = advance time, fire due deferred events, run every system in
// registration order, then flush destroyed entities.

use crate::ecs::{
    BusEvent, EventBus, SystemDescriptor, SystemHandle, SystemRegistrationError, SystemRegistry,
    World,
};
use crate::time::SimulationTime;
use cadence_metrics::{SystemProfiler, SystemTiming};
use tracing::{debug, warn};

/// Per-tick values handed to every system.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickContext {
    /// Seconds since the previous tick (already clamped to >= 0).
    pub delta: f64,
    /// Host wall-clock time in seconds.
    pub wall_clock: f64,
    /// Simulation seconds since the scheduler was created.
    pub elapsed: f64,
    pub tick: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    pub destroyed: usize,
}

/// A unit of per-tick logic.
pub trait System<E: BusEvent> {
    fn descriptor(&self) -> SystemDescriptor;

    /// Install event handlers. Called once, at registration.
    fn subscribe(&mut self, _bus: &EventBus<E>) {}

    fn update(&mut self, world: &mut World, bus: &EventBus<E>, ctx: &TickContext);
}

pub struct Scheduler<E: BusEvent> {
    registry: SystemRegistry,
    systems: Vec<Box<dyn System<E>>>,
    time: SimulationTime,
    profiler: SystemProfiler,
}

impl<E: BusEvent> Scheduler<E> {
    pub fn new() -> Self {
        Self {
            registry: SystemRegistry::new(),
            systems: Vec::new(),
            time: SimulationTime::new(),
            profiler: SystemProfiler::new(120),
        }
    }

    /// Register a system at the end of the run order and let it subscribe.
    pub fn add_system<S>(
        &mut self,
        mut system: S,
        bus: &EventBus<E>,
    ) -> Result<SystemHandle, SystemRegistrationError>
    where
        S: System<E> + 'static,
    {
        let handle = self.registry.register(system.descriptor())?;
        system.subscribe(bus);
        debug!(%handle, name = ?self.registry.descriptor(handle).map(SystemDescriptor::name), "system registered");
        self.systems.push(Box::new(system));
        Ok(handle)
    }

    pub fn tick(
        &mut self,
        world: &mut World,
        bus: &EventBus<E>,
        delta: f64,
        wall_clock: f64,
    ) -> TickReport {
        let delta = if delta.is_finite() && delta >= 0.0 {
            delta
        } else {
            warn!(delta, "invalid tick delta clamped to 0");
            0.0
        };

        self.time.advance(delta);
        let ctx = TickContext {
            delta,
            wall_clock,
            elapsed: self.time.elapsed(),
            tick: self.time.tick_count(),
        };

        bus.fire_due(world, ctx.elapsed);

        for (system, (_, descriptor)) in self.systems.iter_mut().zip(self.registry.iter()) {
            cadence_metrics::time_scope!(self.profiler, descriptor.name(), {
                system.update(world, bus, &ctx)
            });
        }

        let destroyed = world.flush_destroyed();
        TickReport {
            tick: ctx.tick,
            destroyed,
        }
    }

    pub fn registry(&self) -> &SystemRegistry {
        &self.registry
    }

    pub fn time(&self) -> &SimulationTime {
        &self.time
    }

    /// Rolling update timings per system (empty without `metrics`).
    pub fn profile(&self) -> Vec<SystemTiming> {
        self.profiler.report()
    }
}

impl<E: BusEvent> Default for Scheduler<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{define_component, query};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Debug)]
    struct Tick;

    impl BusEvent for Tick {
        type Key = ();
        fn key(&self) {}
        fn name(&self) -> &'static str {
            "tick"
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Counter(u32);
    define_component!(Counter, 1, "Counter");

    struct Bump {
        name: &'static str,
        log: Rc<RefCell<Vec<&'static str>>>,
    }

    impl System<Tick> for Bump {
        fn descriptor(&self) -> SystemDescriptor {
            SystemDescriptor::new(self.name).write::<Counter>()
        }

        fn update(&mut self, world: &mut World, _bus: &EventBus<Tick>, _ctx: &TickContext) {
            self.log.borrow_mut().push(self.name);
            let entities: Vec<_> = query!(world, Counter).collect();
            for e in entities {
                if let Some(c) = world.get_component_mut::<Counter>(e) {
                    c.0 += 1;
                    if c.0 >= 2 {
                        world.destroy_entity(e);
                    }
                }
            }
        }
    }

    #[test]
    fn systems_run_in_registration_order_then_flush() {
        let bus = EventBus::new();
        let mut world = World::new();
        let mut scheduler = Scheduler::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        for name in ["first", "second"] {
            scheduler
                .add_system(Bump { name, log: Rc::clone(&log) }, &bus)
                .unwrap();
        }
        let e = world.create_entity();
        world.add_component(e, Counter(0)).unwrap();

        let report = scheduler.tick(&mut world, &bus, 0.016, 0.0);
        assert_eq!(*log.borrow(), vec!["first", "second"]);
        assert_eq!(report, TickReport { tick: 1, destroyed: 1 });
        assert!(!world.entity_exists(e));
    }

    #[test]
    fn duplicate_system_is_rejected() {
        let bus = EventBus::new();
        let mut scheduler = Scheduler::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        scheduler
            .add_system(Bump { name: "a", log: Rc::clone(&log) }, &bus)
            .unwrap();
        let err = scheduler
            .add_system(Bump { name: "a", log }, &bus)
            .unwrap_err();
        assert!(matches!(err, SystemRegistrationError::DuplicateName { .. }));
    }

    #[test]
    fn bad_delta_is_clamped_and_deferred_events_fire_first() {
        let bus: EventBus<Tick> = EventBus::new();
        let mut world = World::new();
        let mut scheduler = Scheduler::new();
        let fired = Rc::new(RefCell::new(0));
        let f = Rc::clone(&fired);
        bus.subscribe((), move |_, _, _| *f.borrow_mut() += 1);

        scheduler.tick(&mut world, &bus, f64::NAN, 0.0);
        scheduler.tick(&mut world, &bus, -1.0, 0.0);
        assert_eq!(scheduler.time().elapsed(), 0.0);

        bus.schedule("later", 0.5, Tick);
        scheduler.tick(&mut world, &bus, 0.25, 0.25);
        assert_eq!(*fired.borrow(), 0);
        scheduler.tick(&mut world, &bus, 0.25, 0.5);
        assert_eq!(*fired.borrow(), 1);
        assert_eq!(scheduler.time().tick_count(), 4);
    }
}
