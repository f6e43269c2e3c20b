//! Encounter: owns the world, bus and scheduler and exposes the host entry
//! points (select, start, pause, beat, pointer input, abilities, tick).
//! Charts live in a library so a victory can continue into the next one.

use crate::boss_ai::BossAiSystem;
use crate::chart::{Chart, ChartLibrary};
use crate::components::*;
use crate::config::{BossConfig, EncounterConfig};
use crate::error::{GameError, Result};
use crate::events::{GameBus, GameEvent};
use crate::interaction::InteractionSystem;
use crate::judge::InputSystem;
use crate::mood::ScoringSystem;
use crate::notes::{self, NoteSystem};
use crate::persistence::{self, PersistenceSystem, SharedSink, Snapshot};
use crate::render_feed::{self, RenderFeed};
use crate::telemetry::{TelemetrySink, TelemetrySystem};
use cadence_core::ecs::{Entity, Scheduler, TickReport, World};
use cadence_core::spawn;
use cadence_metrics::SystemTiming;
use cadence_services::input::{AbilityKind, PointerDown};
use cadence_services::SnapshotStore;
use std::path::Path;
use std::rc::Rc;
use tracing::{debug, info, warn};

/// Beat notification from the audio clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatNotification {
    pub time: f64,
    pub bpm: f64,
}

pub struct Encounter {
    world: World,
    bus: GameBus,
    scheduler: Scheduler<GameEvent>,
    config: EncounterConfig,
    player: Entity,
    boss: Entity,
    state: Entity,
    mood: Entity,
    chart: Option<Rc<Chart>>,
    library: ChartLibrary,
    /// Latest host time seen by `tick` or `use_ability`.
    host_time: f64,
}

fn spawn_boss(world: &mut World, b: &BossConfig) -> Result<Entity> {
    let boss = spawn!(
        *world,
        BossTag,
        b.spawn_position,
        Velocity::default(),
        Renderable {
            shape: Shape::GenerativeBoss,
            width: b.size,
            height: b.size,
            color: b.color,
        },
        Health {
            current: b.max_health,
            max: b.max_health,
        },
        BossResources {
            health: b.max_health,
            max_health: b.max_health,
            is_aggressive: false,
        },
        Ai {
            speed: b.speed,
            attack_range: b.attack_range,
            attack_cooldown: b.attack_cooldown,
            aggro_range: b.aggro_range,
            variant: b.variant,
        },
        StateMachine::default()
    )?;
    Ok(boss)
}

impl Encounter {
    pub fn new(config: EncounterConfig) -> Result<Self> {
        let mut world = World::new();
        let bus = GameBus::new();
        let mut scheduler = Scheduler::new();

        let p = &config.player;
        let player = spawn!(
            world,
            PlayerTag,
            p.start_position,
            Velocity::default(),
            Renderable {
                shape: Shape::Circle,
                width: p.size,
                height: p.size,
                color: p.color,
            },
            Health {
                current: p.max_health,
                max: p.max_health,
            },
            PlayerResources {
                health: p.max_health,
                max_health: p.max_health,
                dash_charges: p.max_dash_charges,
                max_dash_charges: p.max_dash_charges,
            },
            AbilityCooldowns::default(),
            DashRecharge::default()
        )?;

        let boss = spawn_boss(&mut world, &config.boss)?;

        let mood = spawn!(
            world,
            MoodVector::default(),
            MoodModifiers::default(),
            ScoreCounters::default()
        )?;

        let state = spawn!(
            world,
            GameSpeed::default(),
            Session::default(),
            InputQueue::default(),
            ChartCursor::default(),
            BeatTracker {
                last_beat_time: 0.0,
                bpm: config.judge.default_bpm,
                beats_seen: 0,
                has_beat: false,
            }
        )?;

        scheduler.add_system(NoteSystem::new(config.notes), &bus)?;
        scheduler.add_system(InputSystem::new(config.judge), &bus)?;
        scheduler.add_system(InteractionSystem::new(&config.player), &bus)?;
        scheduler.add_system(ScoringSystem::new(config.mood, config.abilities), &bus)?;
        scheduler.add_system(BossAiSystem::new(config.boss), &bus)?;

        info!(%player, %boss, "encounter created");
        Ok(Self {
            world,
            bus,
            scheduler,
            config,
            player,
            boss,
            state,
            mood,
            chart: None,
            library: ChartLibrary::new(),
            host_time: 0.0,
        })
    }

    /// Append the autosave system. Call before `attach_telemetry`.
    pub fn attach_persistence(&mut self, sink: SharedSink, interval_seconds: f64) -> Result<()> {
        self.scheduler
            .add_system(PersistenceSystem::new(sink, interval_seconds), &self.bus)?;
        Ok(())
    }

    pub fn attach_telemetry(&mut self, sink: Box<dyn TelemetrySink>, interval_seconds: f64) -> Result<()> {
        self.scheduler
            .add_system(TelemetrySystem::new(sink, interval_seconds), &self.bus)?;
        Ok(())
    }

    /// Register `chart` in the library and make it current.
    pub fn select(&mut self, chart: Chart) {
        let chart = Rc::new(chart);
        self.library.insert(Rc::clone(&chart));
        self.load(chart);
    }

    /// Make a previously registered chart current.
    pub fn select_by_id(&mut self, id: &str) -> Result<()> {
        let chart = self
            .library
            .get(id)
            .ok_or_else(|| GameError::UnknownChart(id.to_string()))?;
        self.load(chart);
        Ok(())
    }

    /// Add a chart to the library without selecting it.
    pub fn register_chart(&mut self, chart: Chart) {
        self.library.insert(Rc::new(chart));
    }

    /// Ids of every registered chart, in registration order.
    pub fn chart_ids(&self) -> Vec<&str> {
        self.library.ids()
    }

    fn load(&mut self, chart: Rc<Chart>) {
        self.settle_reversions();
        self.chart = Some(Rc::clone(&chart));
        notes::load_chart(&mut self.world, &self.bus, chart);
        // residual notes go now, not at the next tick
        self.world.flush_destroyed();
    }

    /// Apply every pending ability reversion now so no timer from the
    /// previous chart or save fires into the next one.
    fn settle_reversions(&mut self) {
        let settled = self.bus.fire_due(&mut self.world, f64::INFINITY);
        if settled > 0 {
            debug!(settled, "pending reversions applied early");
        }
    }

    /// After a victory, respawn the boss and load the chart registered
    /// after the current one. Returns false if there is nothing to continue
    /// to. Call `start` to begin the next encounter.
    pub fn continue_after_victory(&mut self) -> Result<bool> {
        if !self.session().victory {
            return Ok(false);
        }
        let Some(next) = self
            .chart
            .as_ref()
            .and_then(|current| self.library.next_after(&current.id))
        else {
            info!("no further chart; campaign complete");
            return Ok(false);
        };
        if self.world.entity_exists(self.boss) {
            self.world.destroy_entity(self.boss);
            self.world.flush_destroyed();
        }
        self.boss = spawn_boss(&mut self.world, &self.config.boss)?;
        if let Some(session) = self.world.get_component_mut::<Session>(self.state) {
            *session = Session::default();
        }
        info!(chart = %next.id, boss = %self.boss, "continuing after victory");
        self.load(next);
        Ok(true)
    }

    /// Load and select a chart file. On error the current chart stays.
    pub fn select_from_path(&mut self, path: &Path) -> Result<()> {
        let chart = Chart::load(path)?;
        self.select(chart);
        Ok(())
    }

    pub fn start(&mut self) {
        if let Some(session) = self.world.get_component_mut::<Session>(self.state) {
            session.running = true;
            session.paused = false;
        }
        info!(chart = ?self.chart.as_ref().map(|c| c.id.as_str()), "encounter started");
        self.bus.publish(&mut self.world, GameEvent::EncounterStarted);
    }

    pub fn pause(&mut self, paused: bool) {
        if let Some(session) = self.world.get_component_mut::<Session>(self.state) {
            if session.paused == paused {
                return;
            }
            session.paused = paused;
        }
        if paused {
            if let Some(queue) = self.world.get_component_mut::<InputQueue>(self.state) {
                if !queue.pending.is_empty() {
                    debug!(dropped = queue.pending.len(), "inputs discarded on pause");
                    queue.pending.clear();
                }
            }
        }
        info!(paused, "pause toggled");
        self.bus.publish(&mut self.world, GameEvent::GamePaused { paused });
    }

    pub fn beat(&mut self, beat: BeatNotification) {
        self.bus.publish(
            &mut self.world,
            GameEvent::Beat {
                time: beat.time,
                bpm: beat.bpm,
            },
        );
    }

    /// Queue a primary press for judging on the next tick. Ignored while
    /// paused or before `start`.
    pub fn pointer_down(&mut self, at: f64, x: f32, y: f32) -> bool {
        let session = self.session();
        if !session.running || session.paused {
            debug!(at, "pointer ignored; encounter not live");
            return false;
        }
        match self.world.get_component_mut::<InputQueue>(self.state) {
            Some(queue) => {
                queue.pending.push(PointerDown { at, x, y });
                true
            }
            None => false,
        }
    }

    /// Trigger an ability at host time `at`. Returns false if the encounter
    /// is not live or the ability is cooling down.
    pub fn use_ability(&mut self, kind: AbilityKind, at: f64) -> bool {
        let session = self.session();
        if !session.running || session.paused {
            return false;
        }
        self.host_time = self.host_time.max(at);
        let cooldown = self.config.abilities.cooldowns.of(kind);
        let Some(cooldowns) = self.world.get_component_mut::<AbilityCooldowns>(self.player) else {
            return false;
        };
        let remaining = cooldowns.remaining(kind, cooldown, at);
        if remaining > 0.0 {
            debug!(%kind, remaining, "ability on cooldown");
            self.bus
                .publish(&mut self.world, GameEvent::AbilityRejected { kind, remaining });
            return false;
        }
        cooldowns.last_used.insert(kind, at);

        let now = self.scheduler.time().elapsed();
        self.bus
            .publish(&mut self.world, GameEvent::AbilityUsed { kind, now });
        true
    }

    /// Advance one frame. Does nothing before `start`, while paused, or
    /// after the encounter ended.
    pub fn tick(&mut self, delta: f64, wall_clock: f64) -> TickReport {
        let session = self.session();
        if !session.running || session.paused {
            return TickReport {
                tick: self.scheduler.time().tick_count(),
                destroyed: 0,
            };
        }
        self.host_time = self.host_time.max(wall_clock);
        let report = self
            .scheduler
            .tick(&mut self.world, &self.bus, delta, wall_clock);

        if self.session().victory {
            let next = self
                .chart
                .as_ref()
                .and_then(|current| self.library.next_after(&current.id))
                .map(|chart| chart.id.clone());
            debug!(?next, "continue prompt");
            self.bus
                .publish(&mut self.world, GameEvent::ContinuePrompt { next });
        }
        report
    }

    pub fn snapshot(&self) -> Option<Snapshot> {
        persistence::capture(&self.world)
    }

    pub fn restore(&mut self, snapshot: &Snapshot) -> bool {
        self.settle_reversions();
        let complete = persistence::apply(&mut self.world, snapshot);
        // keep the render mirror in step
        if let Some(res) = self.world.get_component::<BossResources>(self.boss).copied() {
            if let Some(health) = self.world.get_component_mut::<Health>(self.boss) {
                health.current = res.health;
                health.max = res.max_health;
            }
        }
        if let Some(res) = self.world.get_component::<PlayerResources>(self.player).copied() {
            if let Some(health) = self.world.get_component_mut::<Health>(self.player) {
                health.current = res.health;
                health.max = res.max_health;
            }
        }
        complete
    }

    /// Restore from a store at startup. Missing or unreadable saves leave
    /// the defaults in place.
    pub fn restore_from<S>(&mut self, store: &S) -> bool
    where
        S: SnapshotStore<Snapshot> + ?Sized,
    {
        match store.load() {
            Ok(Some(snapshot)) => {
                let complete = self.restore(&snapshot);
                info!(complete, "game loaded");
                complete
            }
            Ok(None) => {
                info!("no saved game found; starting new game");
                false
            }
            Err(err) => {
                warn!(%err, "saved game unreadable; starting new game");
                false
            }
        }
    }

    /// Frame view with cooldowns as of the latest host time.
    pub fn render_feed(&self) -> RenderFeed {
        render_feed::render_feed(&self.world, &self.config.abilities.cooldowns, self.host_time)
    }

    /// Seconds left on each ability's cooldown at host time `at`.
    pub fn cooldowns(&self, at: f64) -> Vec<(AbilityKind, f64)> {
        render_feed::cooldowns_remaining(&self.world, &self.config.abilities.cooldowns, at)
    }

    /// Bus for collaborator subscriptions (audio, HUD, telemetry).
    pub fn bus(&self) -> &GameBus {
        &self.bus
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn config(&self) -> &EncounterConfig {
        &self.config
    }

    pub fn chart(&self) -> Option<&Chart> {
        self.chart.as_deref()
    }

    pub fn player(&self) -> Entity {
        self.player
    }

    pub fn boss(&self) -> Entity {
        self.boss
    }

    pub fn session(&self) -> Session {
        self.world
            .get_component::<Session>(self.state)
            .copied()
            .unwrap_or_default()
    }

    pub fn mood(&self) -> MoodVector {
        self.world
            .get_component::<MoodVector>(self.mood)
            .copied()
            .unwrap_or_default()
    }

    pub fn counters(&self) -> ScoreCounters {
        self.world
            .get_component::<ScoreCounters>(self.mood)
            .copied()
            .unwrap_or_default()
    }

    pub fn combo(&self) -> u32 {
        self.counters().combo
    }

    pub fn player_resources(&self) -> Option<PlayerResources> {
        self.world.get_component::<PlayerResources>(self.player).copied()
    }

    pub fn player_position(&self) -> Option<Position> {
        self.world.get_component::<Position>(self.player).copied()
    }

    /// `None` once the boss has been destroyed.
    pub fn boss_resources(&self) -> Option<BossResources> {
        self.world.get_component::<BossResources>(self.boss).copied()
    }

    pub fn boss_state(&self) -> Option<BossState> {
        self.world
            .get_component::<StateMachine>(self.boss)
            .map(|sm| sm.state)
    }

    pub fn game_speed(&self) -> f32 {
        self.world
            .get_component::<GameSpeed>(self.state)
            .map_or(1.0, |s| s.multiplier)
    }

    /// Simulation seconds since construction.
    pub fn elapsed(&self) -> f64 {
        self.scheduler.time().elapsed()
    }

    pub fn profile(&self) -> Vec<SystemTiming> {
        self.scheduler.profile()
    }

    #[cfg(test)]
    pub(crate) fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    #[cfg(test)]
    pub(crate) fn publish(&mut self, event: GameEvent) {
        self.bus.publish(&mut self.world, event);
    }
}
