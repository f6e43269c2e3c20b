//! Cadence Metrics - tick and event instrumentation
//!
//! Rolling per-system update timings, whole-tick timing and named event
//! counters for the simulation scheduler and event bus.
//!
//! # Feature Flags
//!
//! - `metrics` - Enable metrics collection (default: disabled)
//!
//! # Usage
//!
//! ```ignore
//! use cadence_metrics::{SystemProfiler, TickTimer};
//!
//! let mut timer = TickTimer::new(120, Duration::from_secs_f64(1.0 / 60.0));
//! let mut profiler = SystemProfiler::new(120);
//! timer.begin();
//! profiler.time_system("scoring", || run_scoring());
//! timer.end();
//! println!("budget used: {:.0}%", timer.budget_usage() * 100.0);
//! ```
//!
//! Without the `metrics` feature every type below is a unit stub and all
//! instrumentation compiles away.

#[cfg(feature = "metrics")]
mod counter;
#[cfg(feature = "metrics")]
mod ring_buffer;
#[cfg(feature = "metrics")]
mod system_profiler;
#[cfg(feature = "metrics")]
mod tick_timer;

#[cfg(feature = "metrics")]
pub use counter::Counter;
#[cfg(feature = "metrics")]
pub use ring_buffer::RingBuffer;
#[cfg(feature = "metrics")]
pub use system_profiler::SystemProfiler;
#[cfg(feature = "metrics")]
pub use tick_timer::TickTimer;

use serde::Serialize;

/// Rolling timing summary for one named system.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemTiming {
    pub name: String,
    pub last_ms: f64,
    pub average_ms: f64,
    pub max_ms: f64,
    pub samples: usize,
}

/// Tick cost against the host frame period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TickBudget {
    pub budget_ms: f64,
    pub average_ms: f64,
    pub worst_ms: f64,
    /// Average cost over budget.
    pub usage: f64,
    pub ticks: u64,
    pub overruns: u64,
}

// ============================================================================
// Macros for conditional compilation
// ============================================================================

/// Execute code only when metrics are enabled
#[macro_export]
macro_rules! metrics {
    ($($tt:tt)*) => {
        #[cfg(feature = "metrics")]
        {
            $($tt)*
        }
    };
}

/// Time a scope under `$name` (zero-cost when metrics disabled)
#[macro_export]
macro_rules! time_scope {
    ($profiler:expr, $name:expr, $body:block) => {{
        #[cfg(feature = "metrics")]
        let result = $profiler.time_system($name, || $body);
        #[cfg(not(feature = "metrics"))]
        let result = $body;
        result
    }};
}

// ============================================================================
// No-op stubs when metrics disabled
// ============================================================================

#[cfg(not(feature = "metrics"))]
#[derive(Debug, Default)]
pub struct TickTimer;

#[cfg(not(feature = "metrics"))]
impl TickTimer {
    pub fn new(_window: usize, _budget: std::time::Duration) -> Self { Self }
    pub fn begin(&mut self) {}
    pub fn end(&mut self) {}
    pub fn record(&mut self, _cost: std::time::Duration) {}
    pub fn budget_usage(&self) -> f64 { 0.0 }
    pub fn overruns(&self) -> u64 { 0 }
    pub fn summary(&self) -> TickBudget { TickBudget::default() }
}

#[cfg(not(feature = "metrics"))]
#[derive(Debug)]
pub struct RingBuffer<T>(std::marker::PhantomData<T>);

#[cfg(not(feature = "metrics"))]
impl<T> RingBuffer<T> {
    pub fn new(_capacity: usize) -> Self { Self(std::marker::PhantomData) }
    pub fn push(&mut self, _value: T) {}
    pub fn len(&self) -> usize { 0 }
    pub fn is_empty(&self) -> bool { true }
}

#[cfg(not(feature = "metrics"))]
#[derive(Debug, Default)]
pub struct Counter;

#[cfg(not(feature = "metrics"))]
impl Counter {
    pub fn new() -> Self { Self }
    pub fn increment(&mut self, _name: &str, _value: u64) {}
    pub fn get(&self, _name: &str) -> u64 { 0 }
    pub fn reset_all(&mut self) {}
}

#[cfg(not(feature = "metrics"))]
#[derive(Debug, Default)]
pub struct SystemProfiler;

#[cfg(not(feature = "metrics"))]
impl SystemProfiler {
    pub fn new(_window: usize) -> Self { Self }
    pub fn time_system<F, R>(&mut self, _name: &str, f: F) -> R where F: FnOnce() -> R { f() }
    pub fn record(&mut self, _name: &str, _elapsed: std::time::Duration) {}
    pub fn report(&self) -> Vec<SystemTiming> { Vec::new() }
    pub fn reset(&mut self) {}
}
