//! Lightweight per-container counters.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Atomic counters updated on the resolution hot path. Recording can be
/// disabled wholesale through the container configuration.
#[derive(Debug, Default)]
pub struct ContainerMetrics {
    enabled: AtomicBool,
    registrations: AtomicU64,
    resolutions: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    failures: AtomicU64,
}

impl ContainerMetrics {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
            ..Self::default()
        }
    }

    fn bump(&self, counter: &AtomicU64) {
        if self.enabled.load(Ordering::Relaxed) {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_registration(&self) {
        self.bump(&self.registrations);
    }

    pub fn record_resolution(&self) {
        self.bump(&self.resolutions);
    }

    pub fn record_cache_hit(&self) {
        self.bump(&self.cache_hits);
    }

    pub fn record_cache_miss(&self) {
        self.bump(&self.cache_misses);
    }

    pub fn record_failure(&self) {
        self.bump(&self.failures);
    }

    pub fn snapshot(&self) -> ContainerStats {
        ContainerStats {
            registrations: self.registrations.load(Ordering::Relaxed),
            resolutions: self.resolutions.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of the counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerStats {
    pub registrations: u64,
    pub resolutions: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub failures: u64,
}

impl ContainerStats {
    pub fn cache_hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }
}
