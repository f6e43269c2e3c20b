//! Encounter tick cost measured against the host frame budget

use super::ring_buffer::RingBuffer;
use crate::TickBudget;
use std::time::{Duration, Instant};

/// Measures how much of each frame period the encounter tick consumes.
///
/// The window keeps the most recent costs for averages; overruns are
/// counted over the whole run.
#[derive(Debug)]
pub struct TickTimer {
    started: Instant,
    costs: RingBuffer<Duration>,
    budget: Duration,
    ticks: u64,
    overruns: u64,
}

impl TickTimer {
    pub fn new(window: usize, budget: Duration) -> Self {
        Self {
            started: Instant::now(),
            costs: RingBuffer::new(window),
            budget,
            ticks: 0,
            overruns: 0,
        }
    }

    pub fn begin(&mut self) {
        self.started = Instant::now();
    }

    pub fn end(&mut self) {
        self.record(self.started.elapsed());
    }

    pub fn record(&mut self, cost: Duration) {
        self.ticks += 1;
        if cost > self.budget {
            self.overruns += 1;
        }
        self.costs.push(cost);
    }

    /// Average cost as a fraction of the budget; above 1.0 the host
    /// cannot keep its frame rate.
    pub fn budget_usage(&self) -> f64 {
        let budget = self.budget.as_secs_f64();
        if budget > 0.0 {
            self.costs.average().as_secs_f64() / budget
        } else {
            0.0
        }
    }

    pub fn overruns(&self) -> u64 {
        self.overruns
    }

    pub fn summary(&self) -> TickBudget {
        TickBudget {
            budget_ms: self.budget.as_secs_f64() * 1000.0,
            average_ms: self.costs.average().as_secs_f64() * 1000.0,
            worst_ms: self.costs.max().as_secs_f64() * 1000.0,
            usage: self.budget_usage(),
            ticks: self.ticks,
            overruns: self.overruns,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overruns_count_ticks_past_the_budget() {
        let mut timer = TickTimer::new(4, Duration::from_millis(10));
        timer.record(Duration::from_millis(4));
        timer.record(Duration::from_millis(12));
        timer.record(Duration::from_millis(8));

        let summary = timer.summary();
        assert_eq!(summary.ticks, 3);
        assert_eq!(summary.overruns, 1);
        assert!((summary.average_ms - 8.0).abs() < 1e-6);
        assert!((summary.worst_ms - 12.0).abs() < 1e-6);
        assert!((summary.usage - 0.8).abs() < 1e-6);
    }

    #[test]
    fn window_drops_old_costs_but_keeps_the_overrun_total() {
        let mut timer = TickTimer::new(2, Duration::from_millis(10));
        timer.record(Duration::from_millis(30));
        timer.record(Duration::from_millis(2));
        timer.record(Duration::from_millis(2));

        assert_eq!(timer.overruns(), 1);
        assert!((timer.summary().worst_ms - 2.0).abs() < 1e-6);
    }

    #[test]
    fn zero_budget_reports_no_usage() {
        let mut timer = TickTimer::new(2, Duration::ZERO);
        timer.record(Duration::from_millis(1));
        assert_eq!(timer.budget_usage(), 0.0);
    }
}
