//! Phase timing
//!
//! `track` returns a guard that records how long a phase ran when it
//! drops, both as a `debug` event and in the process-wide [`Timings`].

use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

/// Accumulated durations per phase name.
#[derive(Default)]
pub struct Timings {
    phases: Mutex<BTreeMap<&'static str, PhaseStats>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PhaseStats {
    pub count: usize,
    pub total: Duration,
    pub max: Duration,
}

impl Timings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, name: &'static str, elapsed: Duration) {
        if let Ok(mut phases) = self.phases.lock() {
            let stats = phases.entry(name).or_default();
            stats.count += 1;
            stats.total += elapsed;
            stats.max = stats.max.max(elapsed);
        }
    }

    pub fn get(&self, name: &str) -> Option<PhaseStats> {
        self.phases.lock().ok()?.get(name).copied()
    }

    /// All phases, sorted by name.
    pub fn snapshot(&self) -> Vec<(&'static str, PhaseStats)> {
        match self.phases.lock() {
            Ok(phases) => phases.iter().map(|(k, v)| (*k, *v)).collect(),
            Err(_) => Vec::new(),
        }
    }
}

static GLOBAL: Lazy<Timings> = Lazy::new(Timings::new);

pub fn global() -> &'static Timings {
    &GLOBAL
}

/// Records into `timings` on drop.
pub struct PerfGuard<'a> {
    name: &'static str,
    start: Instant,
    timings: &'a Timings,
}

impl Drop for PerfGuard<'_> {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        self.timings.record(self.name, elapsed);
        debug!(
            target: "perf",
            operation = self.name,
            duration_us = elapsed.as_micros() as u64,
            "operation complete"
        );
    }
}

/// Times the enclosing scope as phase `name`.
pub fn track(name: &'static str) -> PerfGuard<'static> {
    track_in(global(), name)
}

pub fn track_in<'a>(timings: &'a Timings, name: &'static str) -> PerfGuard<'a> {
    PerfGuard {
        name,
        start: Instant::now(),
        timings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_guard_records_on_drop() {
        let timings = Timings::new();
        {
            let _t = track_in(&timings, "walk");
            thread::sleep(Duration::from_millis(5));
        }
        {
            let _t = track_in(&timings, "walk");
        }
        let stats = timings.get("walk").unwrap();
        assert_eq!(stats.count, 2);
        assert!(stats.total >= Duration::from_millis(5));
        assert!(stats.max >= Duration::from_millis(5));
        assert!(timings.get("emit").is_none());
    }

    #[test]
    fn test_snapshot_is_sorted() {
        let timings = Timings::new();
        drop(track_in(&timings, "walk"));
        drop(track_in(&timings, "emit"));
        let names: Vec<&str> = timings.snapshot().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["emit", "walk"]);
    }
}
