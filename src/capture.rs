//! Background capture
//!
//! Runs a receive session on a dedicated thread and hands its items to an
//! async consumer through a bounded channel. The session only advances while
//! the consumer keeps pulling.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info};

use crate::measurement::Measurement;
use crate::radio::Transceiver;
use crate::session::{Clock, ReceiveSession, SessionStats};

/// Items handed over before the session blocks on the consumer
const CHANNEL_CAPACITY: usize = 1;

/// Stream of session items: `Some` per decoded measurement, `None` per empty step
pub type MeasurementStream = ReceiverStream<Option<Measurement>>;

/// Capture thread controller
pub struct SensorCapture {
    running: Arc<AtomicBool>,
    stats: Arc<SessionStats>,
    handle: Option<JoinHandle<()>>,
}

impl SensorCapture {
    /// Start the session on a background thread
    pub fn start<T, C>(session: ReceiveSession<T, C>) -> Result<(Self, MeasurementStream)>
    where
        T: Transceiver + Send + 'static,
        C: Clock + Send + 'static,
    {
        let (item_tx, item_rx) = mpsc::channel::<Option<Measurement>>(CHANNEL_CAPACITY);
        let running = Arc::new(AtomicBool::new(true));
        let stats = session.stats();

        let thread_running = running.clone();
        let handle = thread::Builder::new()
            .name("sensor-capture".to_string())
            .spawn(move || run_capture(session, thread_running, item_tx))
            .context("Failed to spawn capture thread")?;

        info!("Sensor capture started");
        Ok((
            Self {
                running,
                stats,
                handle: Some(handle),
            },
            ReceiverStream::new(item_rx),
        ))
    }

    /// Ask the session to stop after its current step. Backoff steps last at
    /// most the retry policy's yield interval.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> &Arc<SessionStats> {
        &self.stats
    }

    /// Stop and wait for the capture thread, which releases the transceiver
    pub fn join(mut self) {
        self.stop();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Capture thread panicked");
            }
        }
    }
}

impl Drop for SensorCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Capture loop (runs in dedicated thread)
fn run_capture<T, C>(
    session: ReceiveSession<T, C>,
    running: Arc<AtomicBool>,
    item_tx: mpsc::Sender<Option<Measurement>>,
) where
    T: Transceiver,
    C: Clock,
{
    let stats = session.stats();
    for item in session {
        if !running.load(Ordering::SeqCst) {
            debug!("Capture stopped");
            break;
        }
        if item_tx.blocking_send(item).is_err() {
            debug!("Consumer gone, stopping capture");
            break;
        }
    }
    // session dropped here, transceiver released
    running.store(false, Ordering::SeqCst);
    info!("Sensor capture stopped. {}", stats);
}
