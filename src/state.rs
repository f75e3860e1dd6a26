use crate::config::AppConfig;
use crate::feeds::MarketDataSource;
use portable_atomic::{AtomicU64, Ordering};
use std::sync::Arc;

// ── Performance Counters (lock-free) ──

pub struct PerfCounters {
    pub requests_received: AtomicU64,
    pub requests_rejected: AtomicU64,
    pub analyses_completed: AtomicU64,
    pub symbols_estimated: AtomicU64,
    pub symbol_issues: AtomicU64,
}

impl PerfCounters {
    pub fn new() -> Self {
        Self {
            requests_received: AtomicU64::new(0),
            requests_rejected: AtomicU64::new(0),
            analyses_completed: AtomicU64::new(0),
            symbols_estimated: AtomicU64::new(0),
            symbol_issues: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn bump(counter: &AtomicU64, by: u64) {
        counter.fetch_add(by, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot {
            requests_received: self.requests_received.load(Ordering::Relaxed),
            requests_rejected: self.requests_rejected.load(Ordering::Relaxed),
            analyses_completed: self.analyses_completed.load(Ordering::Relaxed),
            symbols_estimated: self.symbols_estimated.load(Ordering::Relaxed),
            symbol_issues: self.symbol_issues.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct CountersSnapshot {
    pub requests_received: u64,
    pub requests_rejected: u64,
    pub analyses_completed: u64,
    pub symbols_estimated: u64,
    pub symbol_issues: u64,
}

// ── Application shared state ──
//
// Only immutable configuration, the data source handle and counters live here.
// Every analysis pass builds its own request-scoped data.

pub struct AppState {
    pub config: AppConfig,
    pub source: Arc<dyn MarketDataSource>,
    pub counters: PerfCounters,
}

impl AppState {
    pub fn new(config: AppConfig, source: Arc<dyn MarketDataSource>) -> Arc<Self> {
        Arc::new(Self {
            config,
            source,
            counters: PerfCounters::new(),
        })
    }
}
