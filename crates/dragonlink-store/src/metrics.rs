//! Store counters.
//!
//! Each counter is published through the `metrics` facade, labelled with the
//! store name, and mirrored in an atomic for in-process reads.

use metrics::{counter, describe_counter};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for the store coordinator
#[derive(Debug)]
pub struct StoreMetrics {
    telemetry_inserted: AtomicU64,
    telemetry_updated: AtomicU64,
    status_inserted: AtomicU64,
    status_updated: AtomicU64,
    clears: AtomicU64,
}

impl StoreMetrics {
    pub fn new() -> Self {
        describe_counter!(
            "dragonlink_store_inserted_total",
            "Records added under a new identity"
        );
        describe_counter!(
            "dragonlink_store_updated_total",
            "Records that replaced an existing identity"
        );
        describe_counter!("dragonlink_store_clears_total", "Store clear operations");

        Self {
            telemetry_inserted: AtomicU64::new(0),
            telemetry_updated: AtomicU64::new(0),
            status_inserted: AtomicU64::new(0),
            status_updated: AtomicU64::new(0),
            clears: AtomicU64::new(0),
        }
    }

    pub fn record_inserted(&self, store: &'static str) {
        match store {
            "status" => self.status_inserted.fetch_add(1, Ordering::Relaxed),
            _ => self.telemetry_inserted.fetch_add(1, Ordering::Relaxed),
        };
        counter!("dragonlink_store_inserted_total", "store" => store).increment(1);
    }

    pub fn record_updated(&self, store: &'static str) {
        match store {
            "status" => self.status_updated.fetch_add(1, Ordering::Relaxed),
            _ => self.telemetry_updated.fetch_add(1, Ordering::Relaxed),
        };
        counter!("dragonlink_store_updated_total", "store" => store).increment(1);
    }

    pub fn record_clear(&self, store: &'static str) {
        self.clears.fetch_add(1, Ordering::Relaxed);
        counter!("dragonlink_store_clears_total", "store" => store).increment(1);
    }

    pub fn snapshot(&self) -> StoreMetricsSnapshot {
        StoreMetricsSnapshot {
            telemetry_inserted: self.telemetry_inserted.load(Ordering::Relaxed),
            telemetry_updated: self.telemetry_updated.load(Ordering::Relaxed),
            status_inserted: self.status_inserted.load(Ordering::Relaxed),
            status_updated: self.status_updated.load(Ordering::Relaxed),
            clears: self.clears.load(Ordering::Relaxed),
        }
    }
}

impl Default for StoreMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreMetricsSnapshot {
    pub telemetry_inserted: u64,
    pub telemetry_updated: u64,
    pub status_inserted: u64,
    pub status_updated: u64,
    pub clears: u64,
}
