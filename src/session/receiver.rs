//! Receive session: acquire, configure, poll, back off, reconfigure

use std::iter::FusedIterator;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::clock::{Clock, SystemClock};
use super::state::{RetryPolicy, SessionState, SessionStats};
use crate::ft017th::{decode_transmission, SYNC_WORD, TRANSMISSION_LENGTH_BYTES};
use crate::measurement::Measurement;
use crate::radio::{RadioSettings, Transceiver, TransceiverError};

/// Session construction errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("expecting timeout >= 1 second, got {0}")]
    InvalidTimeout(u64),
}

#[derive(Debug, thiserror::Error)]
#[error("unexpected packet length: {actual} bytes, expected {expected}")]
struct UnexpectedPacketLength {
    actual: usize,
    expected: usize,
}

/// Receive session parameters
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Inactivity timeout, restarted by every measurement
    pub timeout_seconds: u64,
    /// Release the exclusive lock after configuring, so another process
    /// may access the transceiver now and then
    pub unlock_spi_device: bool,
    pub radio: RadioSettings,
    pub policy: RetryPolicy,
}

impl SessionConfig {
    pub fn new(timeout_seconds: u64) -> Self {
        Self {
            timeout_seconds,
            unlock_spi_device: false,
            radio: RadioSettings::ft017th(),
            policy: RetryPolicy::default(),
        }
    }
}

/// Pull driven receive loop.
///
/// Every item is the outcome of one step: `Some(measurement)`, or `None` when
/// the step produced nothing usable (no packet, undecodable packet, transceiver
/// locked or reconfigured). The iterator ends once no measurement arrived
/// within the timeout. The transceiver is released when the session ends or
/// is dropped.
pub struct ReceiveSession<T: Transceiver, C: Clock = SystemClock> {
    transceiver: T,
    clock: C,
    config: SessionConfig,
    timeout: Duration,
    deadline: Instant,
    backoff: Duration,
    state: SessionState,
    acquired: bool,
    stats: Arc<SessionStats>,
}

impl<T: Transceiver> ReceiveSession<T> {
    pub fn new(transceiver: T, config: SessionConfig) -> Result<Self, SessionError> {
        Self::with_clock(transceiver, SystemClock, config)
    }
}

impl<T: Transceiver, C: Clock> ReceiveSession<T, C> {
    pub fn with_clock(
        transceiver: T,
        clock: C,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        if config.timeout_seconds < 1 {
            return Err(SessionError::InvalidTimeout(config.timeout_seconds));
        }
        let timeout = Duration::from_secs(config.timeout_seconds);
        let deadline = clock.now() + timeout;
        let backoff = config.policy.initial_backoff;
        Ok(Self {
            transceiver,
            clock,
            config,
            timeout,
            deadline,
            backoff,
            state: SessionState::Unacquired,
            acquired: false,
            stats: Arc::new(SessionStats::new()),
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn stats(&self) -> Arc<SessionStats> {
        self.stats.clone()
    }

    fn deadline_passed(&self) -> bool {
        self.clock.now() >= self.deadline
    }

    fn acquire(&mut self) -> Option<Option<Measurement>> {
        match self.transceiver.acquire_exclusive() {
            Ok(()) => {
                self.acquired = true;
                self.backoff = self.config.policy.initial_backoff;
                self.state = SessionState::Configuring;
                None
            }
            Err(e) => {
                match e {
                    TransceiverError::WouldBlock => info!(
                        "SPI device locked, waiting {} seconds",
                        self.backoff.as_secs_f32()
                    ),
                    e => warn!(
                        "Failed to acquire transceiver ({}), waiting {} seconds",
                        e,
                        self.backoff.as_secs_f32()
                    ),
                }
                self.stats.record_contention();
                self.state = SessionState::ContentionBackoff(self.clock.now() + self.backoff);
                self.backoff *= self.config.policy.backoff_factor;
                Some(None)
            }
        }
    }

    fn configure(&mut self) -> Option<Option<Measurement>> {
        let settings = &self.config.radio;
        if let Err(e) = self.transceiver.configure(settings) {
            warn!("Failed to configure transceiver: {}", e);
            self.stats.record_reconfiguration();
            self.release();
            self.state = SessionState::Reconfiguring;
            return Some(None);
        }
        debug!(
            "{}, filter_bandwidth={:.0}kHz",
            settings,
            settings.filter_bandwidth.hertz() / 1000.0
        );
        if self.config.unlock_spi_device {
            match self.transceiver.release_shared_lock() {
                Ok(()) => debug!("unlocked SPI device"),
                Err(e) => warn!("Failed to unlock SPI device: {}", e),
            }
        }
        self.state = SessionState::Polling;
        None
    }

    /// Sleeps towards `wake_at`, at most one yield interval per call.
    /// Returns `true` once the backoff is over.
    fn back_off(&mut self, wake_at: Instant) -> bool {
        let remaining = wake_at.saturating_duration_since(self.clock.now());
        if remaining > self.config.policy.yield_interval {
            self.clock.sleep(self.config.policy.yield_interval);
            return false;
        }
        self.clock.sleep(remaining);
        true
    }

    fn poll(&mut self) -> Option<Measurement> {
        // protect against packet flood
        self.clock.sleep(self.config.policy.flood_protection);
        let timeout = self
            .deadline
            .saturating_duration_since(self.clock.now())
            .max(self.config.policy.min_wait);

        match self.receive_measurement(timeout) {
            Ok(Some(measurement)) => {
                self.stats.record_measurement();
                self.deadline = self.clock.now() + self.timeout;
                Some(measurement)
            }
            Ok(None) => {
                self.stats.record_empty_poll();
                None
            }
            Err(e) => {
                info!(
                    "{}; reconfiguring as transceiver was potentially accessed by another process",
                    e
                );
                self.stats.record_reconfiguration();
                self.release();
                self.state = SessionState::Reconfiguring;
                None
            }
        }
    }

    fn receive_measurement(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<Measurement>, UnexpectedPacketLength> {
        let Some(packet) = self.transceiver.wait_for_packet(timeout) else {
            debug!("timeout or fetching packet failed");
            return Ok(None);
        };

        let mut signal = Vec::with_capacity(TRANSMISSION_LENGTH_BYTES);
        signal.extend_from_slice(&SYNC_WORD);
        signal.extend_from_slice(&packet.payload);
        if signal.len() != TRANSMISSION_LENGTH_BYTES {
            return Err(UnexpectedPacketLength {
                actual: signal.len(),
                expected: TRANSMISSION_LENGTH_BYTES,
            });
        }

        match decode_transmission(&signal) {
            Ok(measurement) => Ok(Some(measurement)),
            Err(e) => {
                debug!("failed to decode {}: {}", packet, e);
                self.stats.record_decode_error();
                Ok(None)
            }
        }
    }

    fn release(&mut self) {
        if self.acquired {
            self.transceiver.release();
            self.acquired = false;
        }
    }

    fn finish(&mut self) {
        self.release();
        self.state = SessionState::Ended;
        warn!("timeout waiting for packet");
    }
}

impl<T: Transceiver, C: Clock> Iterator for ReceiveSession<T, C> {
    type Item = Option<Measurement>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.state {
                SessionState::Ended => return None,
                SessionState::Unacquired => {
                    if self.deadline_passed() {
                        self.finish();
                        continue;
                    }
                    if let Some(item) = self.acquire() {
                        return Some(item);
                    }
                }
                SessionState::ContentionBackoff(wake_at) => {
                    if !self.back_off(wake_at) {
                        return Some(None);
                    }
                    self.state = SessionState::Unacquired;
                }
                SessionState::Configuring => {
                    if let Some(item) = self.configure() {
                        return Some(item);
                    }
                }
                SessionState::Polling => {
                    if self.deadline_passed() {
                        self.finish();
                        continue;
                    }
                    return Some(self.poll());
                }
                SessionState::Reconfiguring => {
                    self.clock.sleep(self.config.policy.reconfigure_cooldown);
                    self.state = SessionState::Unacquired;
                }
            }
        }
    }
}

impl<T: Transceiver, C: Clock> FusedIterator for ReceiveSession<T, C> {}

impl<T: Transceiver, C: Clock> Drop for ReceiveSession<T, C> {
    fn drop(&mut self) {
        self.release();
    }
}
