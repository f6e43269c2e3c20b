//! Named counters for tracking published events

use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct Counter {
    counters: HashMap<String, u64>,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, name: &str, value: u64) {
        match self.counters.get_mut(name) {
            Some(count) => *count += value,
            None => {
                self.counters.insert(name.to_string(), value);
            }
        }
    }

    pub fn get(&self, name: &str) -> u64 {
        self.counters.get(name).copied().unwrap_or(0)
    }

    pub fn reset_all(&mut self) {
        self.counters.clear();
    }

    /// Counters sorted by name, for stable reports.
    pub fn sorted(&self) -> Vec<(&str, u64)> {
        let mut out: Vec<_> = self.counters.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        out.sort_unstable_by(|a, b| a.0.cmp(b.0));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_by_name() {
        let mut counter = Counter::new();
        counter.increment("note_hit", 1);
        counter.increment("note_hit", 2);
        counter.increment("beat", 1);
        assert_eq!(counter.get("note_hit"), 3);
        assert_eq!(counter.get("missing"), 0);
        assert_eq!(counter.sorted(), vec![("beat", 1), ("note_hit", 3)]);
        counter.reset_all();
        assert_eq!(counter.get("beat"), 0);
    }
}
