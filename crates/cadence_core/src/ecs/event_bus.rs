// event_bus.rs - Synchronous publish/subscribe with deferred one-shot events
//
// Handlers receive the world and the bus itself, so a handler may mutate
// components and publish follow-up events. Nested publishes run
// immediately (depth-first). The bus is single-threaded by construction.

use crate::ecs::World;
use cadence_metrics::Counter;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::rc::Rc;
use tracing::{trace, warn};

/// An event type that can travel over an [`EventBus`].
pub trait BusEvent: Clone + Debug + 'static {
    /// Subscription key; one per event variant.
    type Key: Copy + Eq + Hash + Debug;

    fn key(&self) -> Self::Key;

    /// Stable name for logs and metrics.
    fn name(&self) -> &'static str;
}

/// Token identifying one subscription.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler<E> = Rc<RefCell<dyn FnMut(&mut World, &EventBus<E>, &E)>>;

struct Subscriber<E: BusEvent> {
    id: SubscriptionId,
    handler: Handler<E>,
}

impl<E: BusEvent> Clone for Subscriber<E> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            handler: Rc::clone(&self.handler),
        }
    }
}

struct Deferred<E> {
    task: String,
    fire_at: f64,
    seq: u64,
    event: E,
}

pub struct EventBus<E: BusEvent> {
    handlers: RefCell<HashMap<E::Key, Vec<Subscriber<E>>>>,
    deferred: RefCell<Vec<Deferred<E>>>,
    next_id: Cell<u64>,
    next_seq: Cell<u64>,
    counter: RefCell<Counter>,
}

impl<E: BusEvent> EventBus<E> {
    pub fn new() -> Self {
        Self {
            handlers: RefCell::new(HashMap::new()),
            deferred: RefCell::new(Vec::new()),
            next_id: Cell::new(1),
            next_seq: Cell::new(0),
            counter: RefCell::new(Counter::new()),
        }
    }

    /// Register a handler for `key`.
    pub fn subscribe<F>(&self, key: E::Key, handler: F) -> SubscriptionId
    where
        F: FnMut(&mut World, &EventBus<E>, &E) + 'static,
    {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        let handler: Handler<E> = Rc::new(RefCell::new(handler));
        self.handlers
            .borrow_mut()
            .entry(key)
            .or_default()
            .push(Subscriber { id, handler });
        id
    }

    /// Remove exactly the handler registered under `id`. Returns false if
    /// no such subscription exists.
    pub fn unsubscribe(&self, key: E::Key, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.borrow_mut();
        let Some(list) = handlers.get_mut(&key) else {
            return false;
        };
        let before = list.len();
        list.retain(|sub| sub.id != id);
        before != list.len()
    }

    pub fn subscriber_count(&self, key: E::Key) -> usize {
        self.handlers.borrow().get(&key).map_or(0, Vec::len)
    }

    /// Deliver `event` to every handler subscribed to its key.
    ///
    /// Dispatch walks a snapshot of the handler list taken before the first
    /// call, so subscribing or unsubscribing during dispatch only takes
    /// effect from the next event.
    pub fn publish(&self, world: &mut World, event: E) {
        let key = event.key();
        self.counter.borrow_mut().increment(event.name(), 1);

        let snapshot: Vec<Subscriber<E>> = match self.handlers.borrow().get(&key) {
            Some(list) if !list.is_empty() => list.clone(),
            _ => return,
        };
        trace!(event = event.name(), handlers = snapshot.len(), "publish");

        for sub in snapshot {
            match sub.handler.try_borrow_mut() {
                Ok(mut handler) => (&mut *handler)(world, self, &event),
                Err(_) => warn!(
                    event = event.name(),
                    subscription = sub.id.0,
                    "handler re-entered by its own event; skipped"
                ),
            }
        }
    }

    /// How many times an event with this name has been published.
    /// Always zero without the `metrics` feature.
    pub fn publish_count(&self, name: &str) -> u64 {
        self.counter.borrow().get(name)
    }

    /// Publish `event` once the simulation clock reaches `fire_at`.
    ///
    /// Scheduling under an existing task key replaces the pending event.
    pub fn schedule(&self, task: impl Into<String>, fire_at: f64, event: E) {
        let task = task.into();
        let seq = self.next_seq.get();
        self.next_seq.set(seq + 1);

        let mut deferred = self.deferred.borrow_mut();
        match deferred.iter_mut().find(|d| d.task == task) {
            Some(existing) => {
                existing.fire_at = fire_at;
                existing.seq = seq;
                existing.event = event;
            }
            None => deferred.push(Deferred {
                task,
                fire_at,
                seq,
                event,
            }),
        }
    }

    /// The event and fire time pending under `task`, if any.
    pub fn pending(&self, task: &str) -> Option<(f64, E)> {
        self.deferred
            .borrow()
            .iter()
            .find(|d| d.task == task)
            .map(|d| (d.fire_at, d.event.clone()))
    }

    pub fn cancel(&self, task: &str) -> bool {
        let mut deferred = self.deferred.borrow_mut();
        let before = deferred.len();
        deferred.retain(|d| d.task != task);
        before != deferred.len()
    }

    pub fn cancel_all(&self) {
        self.deferred.borrow_mut().clear();
    }

    pub fn scheduled_count(&self) -> usize {
        self.deferred.borrow().len()
    }

    /// Publish every deferred event whose fire time is `<= now`, ordered by
    /// fire time then scheduling order. Events scheduled by these handlers
    /// wait for the next call even if already due.
    pub fn fire_due(&self, world: &mut World, now: f64) -> usize {
        let mut due = {
            let mut deferred = self.deferred.borrow_mut();
            let (due, later): (Vec<_>, Vec<_>) =
                deferred.drain(..).partition(|d| d.fire_at <= now);
            *deferred = later;
            due
        };
        due.sort_by(|a, b| a.fire_at.total_cmp(&b.fire_at).then(a.seq.cmp(&b.seq)));

        let fired = due.len();
        for d in due {
            trace!(task = %d.task, fire_at = d.fire_at, now, "deferred event due");
            self.publish(world, d.event);
        }
        fired
    }
}

impl<E: BusEvent> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    enum TestEvent {
        Ping(u32),
        Pong(u32),
    }

    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    enum TestKey {
        Ping,
        Pong,
    }

    impl BusEvent for TestEvent {
        type Key = TestKey;

        fn key(&self) -> TestKey {
            match self {
                TestEvent::Ping(_) => TestKey::Ping,
                TestEvent::Pong(_) => TestKey::Pong,
            }
        }

        fn name(&self) -> &'static str {
            match self {
                TestEvent::Ping(_) => "ping",
                TestEvent::Pong(_) => "pong",
            }
        }
    }

    fn recorder(bus: &EventBus<TestEvent>, key: TestKey) -> Rc<RefCell<Vec<TestEvent>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        bus.subscribe(key, move |_, _, event| sink.borrow_mut().push(event.clone()));
        log
    }

    #[test]
    fn unknown_key_is_a_noop() {
        let bus = EventBus::<TestEvent>::new();
        let mut world = World::new();
        bus.publish(&mut world, TestEvent::Ping(1));
        assert_eq!(bus.subscriber_count(TestKey::Ping), 0);
    }

    #[test]
    fn unsubscribe_removes_only_that_handler() {
        let bus = EventBus::<TestEvent>::new();
        let mut world = World::new();
        let kept = recorder(&bus, TestKey::Ping);
        let dropped_log = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&dropped_log);
        let id = bus.subscribe(TestKey::Ping, move |_, _, _| *sink.borrow_mut() += 1);

        assert!(bus.unsubscribe(TestKey::Ping, id));
        assert!(!bus.unsubscribe(TestKey::Ping, id));
        bus.publish(&mut world, TestEvent::Ping(7));

        assert_eq!(*kept.borrow(), vec![TestEvent::Ping(7)]);
        assert_eq!(*dropped_log.borrow(), 0);
    }

    #[test]
    fn subscribe_during_dispatch_does_not_receive_current_event() {
        let bus = EventBus::<TestEvent>::new();
        let mut world = World::new();
        let late = Rc::new(RefCell::new(0));
        let late_sink = Rc::clone(&late);

        bus.subscribe(TestKey::Ping, move |_, bus, _| {
            let sink = Rc::clone(&late_sink);
            bus.subscribe(TestKey::Ping, move |_, _, _| *sink.borrow_mut() += 1);
        });

        bus.publish(&mut world, TestEvent::Ping(1));
        assert_eq!(*late.borrow(), 0);
        bus.publish(&mut world, TestEvent::Ping(2));
        assert_eq!(*late.borrow(), 1);
    }

    #[test]
    fn unsubscribe_during_dispatch_applies_from_the_next_event() {
        let bus = EventBus::<TestEvent>::new();
        let mut world = World::new();
        let calls = Rc::new(RefCell::new(Vec::new()));

        // first handler removes itself and the second one
        let victim: Rc<Cell<Option<SubscriptionId>>> = Rc::new(Cell::new(None));
        let own: Rc<Cell<Option<SubscriptionId>>> = Rc::new(Cell::new(None));
        let (c, v, o) = (Rc::clone(&calls), Rc::clone(&victim), Rc::clone(&own));
        let first = bus.subscribe(TestKey::Ping, move |_, bus, _| {
            c.borrow_mut().push("first");
            if let Some(id) = o.get() {
                assert!(bus.unsubscribe(TestKey::Ping, id));
            }
            if let Some(id) = v.get() {
                assert!(bus.unsubscribe(TestKey::Ping, id));
            }
        });
        own.set(Some(first));
        let c = Rc::clone(&calls);
        let second = bus.subscribe(TestKey::Ping, move |_, _, _| c.borrow_mut().push("second"));
        victim.set(Some(second));
        let kept = recorder(&bus, TestKey::Ping);

        bus.publish(&mut world, TestEvent::Ping(1));
        // the snapshot still delivers the current event to both
        assert_eq!(*calls.borrow(), vec!["first", "second"]);
        assert_eq!(bus.subscriber_count(TestKey::Ping), 1);

        bus.publish(&mut world, TestEvent::Ping(2));
        assert_eq!(*calls.borrow(), vec!["first", "second"]);
        assert_eq!(*kept.borrow(), vec![TestEvent::Ping(1), TestEvent::Ping(2)]);
    }

    #[test]
    fn nested_publish_runs_depth_first() {
        let bus = EventBus::<TestEvent>::new();
        let mut world = World::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        let o = Rc::clone(&order);
        bus.subscribe(TestKey::Ping, move |world, bus, event| {
            if let TestEvent::Ping(n) = event {
                o.borrow_mut().push(format!("ping{n}"));
                bus.publish(world, TestEvent::Pong(*n));
                o.borrow_mut().push(format!("after{n}"));
            }
        });
        let o = Rc::clone(&order);
        bus.subscribe(TestKey::Pong, move |_, _, event| {
            o.borrow_mut().push(format!("{event:?}"));
        });

        bus.publish(&mut world, TestEvent::Ping(3));
        assert_eq!(*order.borrow(), vec!["ping3", "Pong(3)", "after3"]);
    }

    #[test]
    fn self_retrigger_terminates() {
        let bus = EventBus::<TestEvent>::new();
        let mut world = World::new();
        let calls = Rc::new(RefCell::new(0));
        let c = Rc::clone(&calls);
        bus.subscribe(TestKey::Ping, move |world, bus, _| {
            *c.borrow_mut() += 1;
            bus.publish(world, TestEvent::Ping(0));
        });

        bus.publish(&mut world, TestEvent::Ping(0));
        assert_eq!(*calls.borrow(), 1);
    }

    #[test]
    fn deferred_events_fire_in_time_order() {
        let bus = EventBus::<TestEvent>::new();
        let mut world = World::new();
        let log = recorder(&bus, TestKey::Ping);

        bus.schedule("b", 2.0, TestEvent::Ping(2));
        bus.schedule("a", 1.0, TestEvent::Ping(1));
        bus.schedule("c", 5.0, TestEvent::Ping(5));

        assert_eq!(bus.fire_due(&mut world, 0.5), 0);
        assert_eq!(bus.fire_due(&mut world, 2.0), 2);
        assert_eq!(*log.borrow(), vec![TestEvent::Ping(1), TestEvent::Ping(2)]);
        assert_eq!(bus.scheduled_count(), 1);
    }

    #[test]
    fn rescheduling_a_task_replaces_it() {
        let bus = EventBus::<TestEvent>::new();
        let mut world = World::new();
        let log = recorder(&bus, TestKey::Ping);

        bus.schedule("revert", 1.0, TestEvent::Ping(1));
        bus.schedule("revert", 3.0, TestEvent::Ping(3));
        assert_eq!(bus.pending("revert"), Some((3.0, TestEvent::Ping(3))));

        bus.fire_due(&mut world, 2.0);
        assert!(log.borrow().is_empty());
        bus.fire_due(&mut world, 3.0);
        assert_eq!(*log.borrow(), vec![TestEvent::Ping(3)]);
        assert_eq!(bus.pending("revert"), None);
    }

    #[test]
    fn cancel_drops_pending_event() {
        let bus = EventBus::<TestEvent>::new();
        let mut world = World::new();
        let log = recorder(&bus, TestKey::Pong);
        bus.schedule("x", 0.0, TestEvent::Pong(0));
        assert!(bus.cancel("x"));
        assert!(!bus.cancel("x"));
        bus.fire_due(&mut world, 10.0);
        assert!(log.borrow().is_empty());
    }

    #[cfg(feature = "metrics")]
    #[test]
    fn publishes_are_counted_by_name() {
        let bus = EventBus::<TestEvent>::new();
        let mut world = World::new();
        bus.publish(&mut world, TestEvent::Pong(1));
        bus.publish(&mut world, TestEvent::Pong(2));
        assert_eq!(bus.publish_count("pong"), 2);
        assert_eq!(bus.publish_count("ping"), 0);
    }
}
