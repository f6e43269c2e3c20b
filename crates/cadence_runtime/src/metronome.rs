//! Beat clock for hosts without an audio backend.

use cadence_game::BeatNotification;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metronome {
    bpm: f64,
    next_beat: f64,
}

impl Metronome {
    /// `bpm` must be positive; charts are validated on load.
    pub fn new(bpm: f64, first_beat: f64) -> Self {
        Self {
            bpm,
            next_beat: first_beat,
        }
    }

    pub fn interval(&self) -> f64 {
        60.0 / self.bpm
    }

    pub fn next_beat(&self) -> f64 {
        self.next_beat
    }

    /// Every beat at or before `now` that has not been emitted yet, oldest
    /// first. A long frame yields several.
    pub fn due(&mut self, now: f64) -> Vec<BeatNotification> {
        let mut beats = Vec::new();
        while self.next_beat <= now {
            beats.push(BeatNotification {
                time: self.next_beat,
                bpm: self.bpm,
            });
            self.next_beat += self.interval();
        }
        beats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_each_beat_once() {
        let mut metronome = Metronome::new(120.0, 0.0);
        assert_eq!(metronome.due(0.1).len(), 1);
        assert!(metronome.due(0.2).is_empty());
        let beats = metronome.due(1.6);
        let times: Vec<f64> = beats.iter().map(|b| b.time).collect();
        assert_eq!(times, [0.5, 1.0, 1.5]);
        assert_eq!(metronome.next_beat(), 2.0);
    }

    #[test]
    fn nothing_before_the_first_beat() {
        let mut metronome = Metronome::new(90.0, 3.0);
        assert!(metronome.due(2.9).is_empty());
        assert!((metronome.interval() - 2.0 / 3.0).abs() < 1e-12);
    }
}
