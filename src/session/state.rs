//! Receive session state, retry policy and statistics

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Position of the receive session in its acquire / configure / poll cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Transceiver not held, next step tries to acquire it
    Unacquired,
    /// Another process held the transceiver, retry once the instant is reached
    ContentionBackoff(Instant),
    /// Transceiver held, configuration pending
    Configuring,
    /// Waiting for packets
    Polling,
    /// Transceiver released after an anomaly, cooldown pending
    Reconfiguring,
    Ended,
}

/// Timing policy of the receive session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// First wait after the transceiver was found locked
    pub initial_backoff: Duration,
    /// Growth of the wait per consecutive contention
    pub backoff_factor: u32,
    /// Minimum spacing of packet waits
    pub flood_protection: Duration,
    /// Pause between release and reacquisition on reconfiguration
    pub reconfigure_cooldown: Duration,
    /// Lower bound of a single packet wait
    pub min_wait: Duration,
    /// Longest backoff sleep before the session yields a `None` item
    pub yield_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_secs(2),
            backoff_factor: 2,
            flood_protection: Duration::from_secs(1),
            reconfigure_cooldown: Duration::from_secs(1),
            min_wait: Duration::from_secs(1),
            yield_interval: Duration::from_secs(2),
        }
    }
}

/// Counters of a receive session
#[derive(Debug, Default)]
pub struct SessionStats {
    pub measurements: AtomicU64,
    pub empty_polls: AtomicU64,
    pub decode_errors: AtomicU64,
    pub contentions: AtomicU64,
    pub reconfigurations: AtomicU64,
}

impl SessionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_measurement(&self) {
        self.measurements.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_empty_poll(&self) {
        self.empty_polls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_contention(&self) {
        self.contentions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reconfiguration(&self) {
        self.reconfigurations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_measurements(&self) -> u64 {
        self.measurements.load(Ordering::Relaxed)
    }

    pub fn get_empty_polls(&self) -> u64 {
        self.empty_polls.load(Ordering::Relaxed)
    }

    pub fn get_decode_errors(&self) -> u64 {
        self.decode_errors.load(Ordering::Relaxed)
    }

    pub fn get_contentions(&self) -> u64 {
        self.contentions.load(Ordering::Relaxed)
    }

    pub fn get_reconfigurations(&self) -> u64 {
        self.reconfigurations.load(Ordering::Relaxed)
    }
}

impl fmt::Display for SessionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Measurements: {} | Empty polls: {} | Decode errors: {} | Contentions: {} | Reconfigurations: {}",
            self.get_measurements(),
            self.get_empty_polls(),
            self.get_decode_errors(),
            self.get_contentions(),
            self.get_reconfigurations(),
        )
    }
}
