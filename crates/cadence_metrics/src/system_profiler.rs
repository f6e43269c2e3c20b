//! Rolling per-system update timings

use super::ring_buffer::RingBuffer;
use crate::SystemTiming;
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct SystemProfiler {
    window: usize,
    // Registration order is preserved so reports read like the tick.
    timings: Vec<(String, RingBuffer<Duration>)>,
}

impl SystemProfiler {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            timings: Vec::new(),
        }
    }

    pub fn time_system<F, R>(&mut self, name: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let start = Instant::now();
        let result = f();
        self.record(name, start.elapsed());
        result
    }

    pub fn record(&mut self, name: &str, elapsed: Duration) {
        if let Some((_, samples)) = self.timings.iter_mut().find(|(n, _)| n == name) {
            samples.push(elapsed);
            return;
        }
        let mut samples = RingBuffer::new(self.window);
        samples.push(elapsed);
        self.timings.push((name.to_string(), samples));
    }

    pub fn report(&self) -> Vec<SystemTiming> {
        self.timings
            .iter()
            .map(|(name, samples)| SystemTiming {
                name: name.clone(),
                last_ms: samples.last().map_or(0.0, |d| d.as_secs_f64() * 1000.0),
                average_ms: samples.average().as_secs_f64() * 1000.0,
                max_ms: samples.max().as_secs_f64() * 1000.0,
                samples: samples.len(),
            })
            .collect()
    }

    pub fn reset(&mut self) {
        self.timings.clear();
    }
}

impl Default for SystemProfiler {
    fn default() -> Self {
        Self::new(120)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_keeps_first_seen_order() {
        let mut profiler = SystemProfiler::new(4);
        profiler.record("notes", Duration::from_millis(2));
        profiler.record("scoring", Duration::from_millis(4));
        profiler.record("notes", Duration::from_millis(4));

        let report = profiler.report();
        assert_eq!(report.len(), 2);
        assert_eq!(report[0].name, "notes");
        assert_eq!(report[0].samples, 2);
        assert!((report[0].average_ms - 3.0).abs() < 1e-9);
        assert!((report[0].last_ms - 4.0).abs() < 1e-9);
        assert_eq!(report[1].name, "scoring");
    }
}
