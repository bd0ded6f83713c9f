//! Per-transport request counters.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Mutex;

/// Point-in-time copy of a transport's counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClientStats {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    /// Running mean over successful calls, in milliseconds.
    pub average_response_time_ms: f64,
    pub last_request_time: Option<DateTime<Utc>>,
}

/// Mutex-guarded accumulator owned by one transport.
#[derive(Debug, Default)]
pub struct StatsRecorder {
    inner: Mutex<ClientStats>,
}

impl StatsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<R>(&self, f: impl FnOnce(&mut ClientStats) -> R) -> R {
        match self.inner.lock() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }

    /// A call (not an attempt) has started.
    pub fn record_start(&self) {
        self.with(|s| {
            s.total_requests += 1;
            s.last_request_time = Some(Utc::now());
        });
    }

    /// A call succeeded after `elapsed_ms`.
    ///
    /// `avg' = (avg * (n - 1) + elapsed) / n`, n = new success count.
    pub fn record_success(&self, elapsed_ms: f64) {
        self.with(|s| {
            s.successful_requests += 1;
            let n = s.successful_requests as f64;
            s.average_response_time_ms = (s.average_response_time_ms * (n - 1.0) + elapsed_ms) / n;
        });
    }

    /// A call failed for good.
    pub fn record_failure(&self) {
        self.with(|s| s.failed_requests += 1);
    }

    pub fn snapshot(&self) -> ClientStats {
        self.with(|s| s.clone())
    }

    pub fn reset(&self) {
        self.with(|s| *s = ClientStats::default());
    }
}
