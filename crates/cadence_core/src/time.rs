//! Simulation time
//!
//! The simulation advances by whatever delta the host frame reports.

/// Simulation time tracker: tick count and summed deltas in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SimulationTime {
    tick_count: u64,
    elapsed: f64,
}

impl SimulationTime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Seconds of simulation time since construction.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn advance(&mut self, delta: f64) {
        self.tick_count += 1;
        self.elapsed += delta;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_accumulates() {
        let mut time = SimulationTime::new();
        time.advance(0.5);
        time.advance(0.25);
        assert_eq!(time.tick_count(), 2);
        assert_eq!(time.elapsed(), 0.75);
    }
}
