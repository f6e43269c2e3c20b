//! Rhythmic input judge
//!
//! The judge only grades timing: an input is on-rhythm when it lands within
//! the tolerance window of the nearest beat of the current tempo grid. It
//! knows nothing about notes or charges.

use crate::components::{BeatTracker, InputQueue, Position, Session};
use crate::config::JudgeConfig;
use crate::events::{EventKey, GameBus, GameEvent};
use cadence_core::ecs::{System, SystemDescriptor, TickContext, World};
use cadence_services::input::PointerDown;
use tracing::{debug, trace, warn};

/// Timing grade for one input, with its pointer context attached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    pub on_rhythm: bool,
    pub at: f64,
    pub target: Position,
    /// Signed distance to the nearest beat; negative means early.
    pub offset_ms: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RhythmJudge {
    tolerance_ms: f64,
    default_bpm: f64,
}

impl RhythmJudge {
    pub fn new(config: JudgeConfig) -> Self {
        Self {
            tolerance_ms: config.tolerance_ms,
            default_bpm: config.default_bpm,
        }
    }

    pub fn tolerance_ms(&self) -> f64 {
        self.tolerance_ms
    }

    /// Signed offset in ms from `at` to the nearest beat.
    ///
    /// Without a beat the grid starts at 0 with the default tempo.
    pub fn offset_ms(&self, tracker: Option<&BeatTracker>, at: f64) -> f64 {
        let (origin, bpm) = match tracker {
            Some(t) if t.has_beat => (t.last_beat_time, t.bpm),
            _ => (0.0, self.default_bpm),
        };
        let interval = 60.0 / bpm;
        let phase = (at - origin).rem_euclid(interval);
        let offset = if phase > interval / 2.0 { phase - interval } else { phase };
        offset * 1000.0
    }

    pub fn judge(&self, tracker: Option<&BeatTracker>, input: PointerDown) -> Verdict {
        let offset_ms = self.offset_ms(tracker, input.at);
        Verdict {
            on_rhythm: offset_ms.abs() <= self.tolerance_ms,
            at: input.at,
            target: Position::new(input.x, input.y),
            offset_ms,
        }
    }
}

/// Records beats and turns queued pointer presses into verdicts.
pub struct InputSystem {
    judge: RhythmJudge,
}

impl InputSystem {
    pub fn new(config: JudgeConfig) -> Self {
        Self {
            judge: RhythmJudge::new(config),
        }
    }
}

impl System<GameEvent> for InputSystem {
    fn descriptor(&self) -> SystemDescriptor {
        SystemDescriptor::new("input")
            .read::<Session>()
            .write::<BeatTracker>()
            .write::<InputQueue>()
    }

    fn subscribe(&mut self, bus: &GameBus) {
        bus.subscribe(EventKey::Beat, |world, _bus, event| {
            let GameEvent::Beat { time, bpm } = *event else {
                return;
            };
            let Some(entity) = world.single::<BeatTracker>() else {
                return;
            };
            let Some(tracker) = world.get_component_mut::<BeatTracker>(entity) else {
                return;
            };
            if !(bpm.is_finite() && bpm > 0.0) {
                warn!(bpm, time, "ignoring beat with invalid tempo");
                return;
            }
            tracker.last_beat_time = time;
            tracker.bpm = bpm;
            tracker.beats_seen += 1;
            tracker.has_beat = true;
            trace!(time, bpm, "beat");
        });
    }

    fn update(&mut self, world: &mut World, bus: &GameBus, _ctx: &TickContext) {
        let Some(state) = world.single::<InputQueue>() else {
            return;
        };
        let pending = match world.get_component_mut::<InputQueue>(state) {
            Some(queue) if !queue.pending.is_empty() => std::mem::take(&mut queue.pending),
            _ => return,
        };

        if world.get_component::<Session>(state).is_some_and(|s| s.paused) {
            debug!(dropped = pending.len(), "inputs discarded while paused");
            return;
        }

        for input in pending {
            let verdict = self.judge.judge(world.get_component::<BeatTracker>(state), input);
            debug!(
                on_rhythm = verdict.on_rhythm,
                offset_ms = verdict.offset_ms,
                at = verdict.at,
                "input judged"
            );
            bus.publish(world, GameEvent::RhythmVerdict(verdict));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker(last: f64, bpm: f64) -> BeatTracker {
        BeatTracker {
            last_beat_time: last,
            bpm,
            beats_seen: 1,
            has_beat: true,
        }
    }

    fn press(at: f64) -> PointerDown {
        PointerDown { at, x: 3.0, y: 4.0 }
    }

    #[test]
    fn grades_against_last_beat() {
        let judge = RhythmJudge::new(JudgeConfig::default());
        let t = tracker(10.0, 120.0);

        let on = judge.judge(Some(&t), press(10.040));
        assert!(on.on_rhythm);
        assert!((on.offset_ms - 40.0).abs() < 1e-6);
        assert_eq!(on.target, Position::new(3.0, 4.0));

        let off = judge.judge(Some(&t), press(10.300));
        assert!(!off.on_rhythm);
        assert!((off.offset_ms + 200.0).abs() < 1e-6);
    }

    #[test]
    fn one_interval_later_is_still_on_the_grid() {
        let judge = RhythmJudge::new(JudgeConfig::default());
        let t = tracker(10.0, 120.0);
        assert!(judge.judge(Some(&t), press(10.52)).on_rhythm);
        // slightly before the recorded beat
        let early = judge.judge(Some(&t), press(9.95));
        assert!(early.on_rhythm);
        assert!(early.offset_ms < 0.0);
    }

    #[test]
    fn no_beat_uses_default_grid_from_zero() {
        let judge = RhythmJudge::new(JudgeConfig::default());
        assert!(judge.judge(None, press(1.05)).on_rhythm);
        assert!(!judge.judge(None, press(1.25)).on_rhythm);

        let silent = BeatTracker {
            last_beat_time: 0.3,
            bpm: 60.0,
            beats_seen: 0,
            has_beat: false,
        };
        assert!(judge.judge(Some(&silent), press(0.5)).on_rhythm);
    }

    #[test]
    fn tolerance_is_inclusive() {
        let judge = RhythmJudge::new(JudgeConfig {
            tolerance_ms: 250.0,
            default_bpm: 60.0,
        });
        // 0.25 s is exact in binary
        assert!(judge.judge(None, press(2.25)).on_rhythm);
        assert!(!judge.judge(None, press(2.375)).on_rhythm);
    }
}
