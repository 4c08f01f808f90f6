use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::pipeline::resolver::Tier;

/// Minimal counters for operational visibility.
#[derive(Clone, Default)]
pub struct Counters {
    pub cycles_completed: Arc<AtomicU64>,
    pub cycles_failed: Arc<AtomicU64>,

    // triggers that did not start a cycle
    pub busy_rejections: Arc<AtomicU64>,
    pub scheduled_skips: Arc<AtomicU64>,

    // per-field outcomes
    pub source_failures: Arc<AtomicU64>,
    pub implausible_values: Arc<AtomicU64>,
    pub fallback_previous: Arc<AtomicU64>,
    pub fallback_default: Arc<AtomicU64>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    pub cycles_completed: u64,
    pub cycles_failed: u64,
    pub busy_rejections: u64,
    pub scheduled_skips: u64,
    pub source_failures: u64,
    pub implausible_values: u64,
    pub fallback_previous: u64,
    pub fallback_default: u64,
}

impl Counters {
    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tier(&self, tier: Tier) {
        match tier {
            Tier::Fresh => {}
            Tier::Previous => Self::incr(&self.fallback_previous),
            Tier::Default => Self::incr(&self.fallback_default),
        }
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);

        CounterSnapshot {
            cycles_completed: load(&self.cycles_completed),
            cycles_failed: load(&self.cycles_failed),
            busy_rejections: load(&self.busy_rejections),
            scheduled_skips: load(&self.scheduled_skips),
            source_failures: load(&self.source_failures),
            implausible_values: load(&self.implausible_values),
            fallback_previous: load(&self.fallback_previous),
            fallback_default: load(&self.fallback_default),
        }
    }
}
