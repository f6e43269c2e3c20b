//! Cadence Runtime
//!
//! Headless host for a run of encounters: loads settings and charts, drives
//! the frame loop with a metronome and optional scripted input, and hands
//! autosave and telemetry to background tasks. Each victory continues into
//! the next chart given on the command line.

mod autoplay;
mod demo;
mod metronome;

use anyhow::{bail, Context, Result};
use autoplay::Autoplay;
use cadence_game::components::MoodVector;
use cadence_game::{Chart, Encounter, EncounterConfig, SharedSink, Snapshot, SnapshotSink};
use cadence_metrics::TickTimer;
use cadence_services::input::KeyBindings;
use cadence_services::settings::load_or_default;
use cadence_services::{BackgroundSaver, JsonFileStore, Settings, TelemetryClient};
use clap::Parser;
use metronome::Metronome;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

#[derive(Parser, Debug)]
#[command(name = "cadence", version, about = "Run a rhythm boss encounter headless")]
struct Args {
    /// Chart JSON, repeatable and played in order; the built-in demo chart
    /// when omitted
    #[arg(long = "chart")]
    charts: Vec<PathBuf>,

    /// Encounter tuning JSON (judge, player, mood, abilities, boss)
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, default_value = "cadence.json")]
    settings: PathBuf,

    /// Stop after this many simulated seconds
    #[arg(long, default_value_t = 30.0)]
    seconds: f64,

    /// Dash onto each spawned note on the beat
    #[arg(long)]
    autoplay: bool,

    /// Pace frames against the wall clock instead of running flat out
    #[arg(long)]
    realtime: bool,

    /// Continue from the saved game if there is one
    #[arg(long)]
    resume: bool,

    #[arg(long)]
    no_telemetry: bool,

    /// Ability key press as KEY@SECONDS, e.g. `q@2.5`. Repeatable.
    #[arg(long = "press", value_parser = parse_press)]
    presses: Vec<Press>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Press {
    key: char,
    at: f64,
}

fn parse_press(text: &str) -> std::result::Result<Press, String> {
    let (key, at) = text
        .split_once('@')
        .ok_or_else(|| format!("expected KEY@SECONDS, got `{text}`"))?;
    let mut chars = key.chars();
    let (Some(key), None) = (chars.next(), chars.next()) else {
        return Err(format!("key must be a single character, got `{key}`"));
    };
    let at: f64 = at
        .parse()
        .map_err(|err| format!("bad time `{at}`: {err}"))?;
    if !at.is_finite() || at < 0.0 {
        return Err(format!("time must be non-negative, got {at}"));
    }
    Ok(Press { key, at })
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    info!("Cadence v{}", cadence_core::VERSION);
    if !(args.seconds.is_finite() && args.seconds > 0.0) {
        bail!("--seconds must be positive, got {}", args.seconds);
    }

    let settings = Settings::load(&args.settings)
        .with_context(|| format!("loading settings from {}", args.settings.display()))?;
    let config: EncounterConfig = match &args.config {
        Some(path) => load_or_default(path)
            .with_context(|| format!("loading encounter config from {}", path.display()))?,
        None => EncounterConfig::default(),
    };
    let mut charts = Vec::with_capacity(args.charts.len().max(1));
    for path in &args.charts {
        charts.push(Chart::load(path).with_context(|| format!("loading chart {}", path.display()))?);
    }
    if charts.is_empty() {
        charts.push(demo::chart().context("building demo chart")?);
    }

    // Background I/O only; the simulation stays on this thread.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("starting background runtime")?;

    runtime.block_on(run(args, settings, config, charts))
}

async fn run(args: Args, settings: Settings, config: EncounterConfig, charts: Vec<Chart>) -> Result<()> {
    let handle = tokio::runtime::Handle::current();
    let mut encounter = Encounter::new(config).context("building encounter")?;

    let save_path = settings.persistence.save_path.clone();
    if args.resume {
        encounter.restore_from(&JsonFileStore::new(&save_path));
    }
    let (saver, save_task) =
        BackgroundSaver::<Snapshot>::spawn(&handle, save_path, settings.persistence.queue_depth);
    let saver = Rc::new(RefCell::new(saver));
    let sink: SharedSink = saver.clone();
    encounter.attach_persistence(sink, settings.persistence.autosave_interval_seconds)?;

    let telemetry_task = if settings.telemetry.enabled && !args.no_telemetry {
        let (client, task) = TelemetryClient::<MoodVector>::spawn(
            &handle,
            settings.telemetry.endpoint.clone(),
            settings.telemetry.queue_depth,
        );
        encounter.attach_telemetry(Box::new(client), settings.telemetry.interval_seconds)?;
        info!(endpoint = %settings.telemetry.endpoint, "telemetry enabled");
        Some(task)
    } else {
        None
    };

    let first = charts
        .first()
        .map(|chart| chart.id.clone())
        .context("no chart to play")?;
    for chart in charts {
        encounter.register_chart(chart);
    }
    encounter.select_by_id(&first)?;
    let mut metronome = Metronome::new(encounter.chart().map_or(120.0, |c| c.bpm), 0.0);
    let autoplay = args.autoplay.then(|| Autoplay::attach(&encounter));

    let bindings = KeyBindings::default();
    let mut presses: Vec<Press> = args.presses.clone();
    presses.sort_by(|a, b| a.at.total_cmp(&b.at));
    let mut presses: VecDeque<Press> = presses.into();

    let frame = 1.0 / f64::from(settings.frame_rate.max(1));
    let mut ticker = tokio::time::interval(Duration::from_secs_f64(frame));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let started = Instant::now();
    let mut timer = TickTimer::new(120, Duration::from_secs_f64(frame));
    let mut now = 0.0;

    encounter.start();
    while now < args.seconds && encounter.session().running {
        if args.realtime {
            ticker.tick().await;
        }
        now += frame;

        for beat in metronome.due(now) {
            encounter.beat(beat);
            if let Some(autoplay) = &autoplay {
                autoplay.on_beat(&mut encounter, &beat);
            }
        }
        while let Some(press) = presses.front().copied().filter(|p| p.at <= now) {
            presses.pop_front();
            match bindings.ability_for(press.key) {
                Some(kind) => {
                    let used = encounter.use_ability(kind, now);
                    debug!(%kind, used, at = now, "ability key");
                }
                None => warn!(key = %press.key, "no ability bound to key"),
            }
        }

        let wall = if args.realtime {
            started.elapsed().as_secs_f64()
        } else {
            now
        };
        timer.begin();
        encounter.tick(frame, wall);
        timer.end();

        if encounter.session().victory && encounter.continue_after_victory()? {
            if let Some(chart) = encounter.chart() {
                metronome = Metronome::new(chart.bpm, now);
            }
            encounter.start();
        }
    }

    report(&encounter, &timer, autoplay.as_ref());

    if let Some(snapshot) = encounter.snapshot() {
        saver.borrow_mut().submit(snapshot);
    }
    // dropping every saver handle lets the writer drain and exit
    drop(encounter);
    drop(saver);
    save_task.await.context("save writer task panicked")?;
    if let Some(task) = telemetry_task {
        task.abort();
    }
    Ok(())
}

fn report(encounter: &Encounter, timer: &TickTimer, autoplay: Option<&Autoplay>) {
    let counters = encounter.counters();
    let mood = encounter.mood();
    let session = encounter.session();
    info!(
        victory = session.victory,
        elapsed = encounter.elapsed(),
        hits = counters.hits,
        misses = counters.misses,
        max_combo = counters.max_combo,
        "encounter finished"
    );
    info!(
        intensity = mood.intensity,
        precision = mood.precision,
        aggression = mood.aggression,
        flow = mood.flow,
        chaos = mood.chaos,
        "final mood"
    );
    match encounter.boss_resources() {
        Some(boss) => info!(health = boss.health, max = boss.max_health, aggressive = boss.is_aggressive, "boss"),
        None => info!("boss defeated"),
    }
    if let Some(autoplay) = autoplay {
        debug!(untouched = autoplay.pending(), "autoplay targets left");
    }

    let budget = timer.summary();
    info!(
        budget_ms = budget.budget_ms,
        avg_ms = budget.average_ms,
        worst_ms = budget.worst_ms,
        usage = budget.usage,
        overruns = budget.overruns,
        "tick budget"
    );
    for timing in encounter.profile() {
        debug!(
            system = %timing.name,
            avg_ms = timing.average_ms,
            max_ms = timing.max_ms,
            "system timing"
        );
    }
    for name in ["floor_tile_spawned", "player_hit_note", "player_miss_note", "player_ability"] {
        debug!(event = name, count = encounter.bus().publish_count(name), "event count");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_key_presses() {
        assert_eq!(parse_press("q@2.5"), Ok(Press { key: 'q', at: 2.5 }));
        assert!(parse_press("q").is_err());
        assert!(parse_press("qq@1").is_err());
        assert!(parse_press("r@-1").is_err());
        assert!(parse_press("r@soon").is_err());
    }

    #[test]
    fn args_parse() {
        let args = Args::try_parse_from([
            "cadence",
            "--seconds",
            "5",
            "--autoplay",
            "--press",
            "w@1",
            "--press",
            "r@3.5",
            "--chart",
            "intro.json",
            "--chart",
            "finale.json",
        ])
        .unwrap();
        assert_eq!(
            args.charts,
            vec![PathBuf::from("intro.json"), PathBuf::from("finale.json")]
        );
        assert!(args.autoplay);
        assert_eq!(args.seconds, 5.0);
        assert_eq!(args.presses.len(), 2);
        assert_eq!(args.settings, PathBuf::from("cadence.json"));
    }

    #[test]
    fn autoplay_clears_part_of_the_demo() {
        let mut encounter = Encounter::new(EncounterConfig::default()).unwrap();
        encounter.select(demo::chart().unwrap());
        let autoplay = Autoplay::attach(&encounter);
        let mut metronome = Metronome::new(120.0, 0.0);
        encounter.start();

        let frame = 1.0 / 60.0;
        let mut now = 0.0;
        while now < 6.0 {
            now += frame;
            for beat in metronome.due(now) {
                encounter.beat(beat);
                autoplay.on_beat(&mut encounter, &beat);
            }
            encounter.tick(frame, now);
        }
        assert!(encounter.counters().hits > 0);
        assert!(encounter.counters().max_combo >= 1);
    }
}
