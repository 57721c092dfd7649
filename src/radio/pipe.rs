//! Transceiver backed by an external receiver process
//!
//! The receiver command is spawned with the radio settings as arguments and
//! prints one line per packet: `*<payload hex>;` optionally followed by
//! ` rssi=<index>`. Exclusive access is an advisory lock on a file shared
//! with other processes using the same transceiver. The kernel drops the lock
//! together with the holder's file handle, including when the holder dies.

use std::fs::{File, OpenOptions, TryLockError};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use tracing::{debug, info, warn};

use super::{RadioSettings, ReceivedPacket, Transceiver, TransceiverError};

/// Packets buffered between the reader thread and the session
const PACKET_BUFFER: usize = 16;

type SharedChild = Arc<Mutex<Option<Child>>>;

/// Transceiver driving an external packet source process
pub struct PipeTransceiver {
    program: String,
    program_args: Vec<String>,
    gdo0_gpio_line: String,
    lock_path: PathBuf,
    lock_file: Option<File>,
    acquired: bool,
    child: SharedChild,
    packet_rx: Option<Receiver<ReceivedPacket>>,
}

/// Kills the running packet source from another thread, waking a pending
/// [`Transceiver::wait_for_packet`].
#[derive(Clone)]
pub struct InterruptHandle {
    child: SharedChild,
}

impl InterruptHandle {
    pub fn interrupt(&self) {
        if let Ok(mut child) = self.child.lock() {
            if let Some(child) = child.as_mut() {
                debug!("Interrupting packet source (pid {})", child.id());
                let _ = child.kill();
            }
        }
    }
}

impl PipeTransceiver {
    /// `command` is split on whitespace into program and leading arguments
    pub fn new(command: &str, gdo0_gpio_line: &str, lock_path: impl AsRef<Path>) -> Self {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next().unwrap_or_default();
        Self {
            program,
            program_args: parts.collect(),
            gdo0_gpio_line: gdo0_gpio_line.to_string(),
            lock_path: lock_path.as_ref().to_path_buf(),
            lock_file: None,
            acquired: false,
            child: Arc::new(Mutex::new(None)),
            packet_rx: None,
        }
    }

    pub fn interrupt_handle(&self) -> InterruptHandle {
        InterruptHandle {
            child: self.child.clone(),
        }
    }

    fn settings_args(&self, settings: &RadioSettings) -> Vec<String> {
        let mut args = vec![
            "--frequency-hz".to_string(),
            settings.base_frequency_hz.to_string(),
            "--symbol-rate".to_string(),
            settings.symbol_rate_baud.to_string(),
            "--sync-word".to_string(),
            hex::encode(settings.sync_word),
            "--sync-mode".to_string(),
            settings.sync_mode.to_string(),
            "--packet-length".to_string(),
            settings.packet_length_bytes.to_string(),
            "--filter-bandwidth-hz".to_string(),
            format!("{:.0}", settings.filter_bandwidth.hertz()),
            "--gdo0".to_string(),
            self.gdo0_gpio_line.clone(),
        ];
        if settings.manchester_encoding {
            args.push("--manchester".to_string());
        }
        if settings.carrier_sense_threshold {
            args.push("--carrier-sense".to_string());
        }
        if !settings.checksum {
            args.push("--no-checksum".to_string());
        }
        args
    }

    fn stop_child(&mut self) {
        self.packet_rx = None;
        let child = self.child.lock().ok().and_then(|mut child| child.take());
        if let Some(mut child) = child {
            let _ = child.kill();
            let _ = child.wait();
        }
    }

    fn unlock(&mut self) -> Result<(), TransceiverError> {
        if let Some(lock_file) = self.lock_file.take() {
            lock_file.unlock()?;
            debug!("Unlocked {}", self.lock_path.display());
        }
        Ok(())
    }
}

impl Transceiver for PipeTransceiver {
    fn acquire_exclusive(&mut self) -> Result<(), TransceiverError> {
        let mut lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)?;
        match lock_file.try_lock() {
            Ok(()) => {}
            Err(TryLockError::WouldBlock) => return Err(TransceiverError::WouldBlock),
            Err(TryLockError::Error(e)) => return Err(e.into()),
        }
        if let Err(e) = lock_file
            .set_len(0)
            .and_then(|()| writeln!(lock_file, "{}", std::process::id()))
        {
            debug!("Failed to write pid to lock file: {}", e);
        }
        self.lock_file = Some(lock_file);
        self.acquired = true;
        debug!("Locked {}", self.lock_path.display());
        Ok(())
    }

    fn configure(&mut self, settings: &RadioSettings) -> Result<(), TransceiverError> {
        if !self.acquired {
            return Err(TransceiverError::NotAcquired);
        }
        self.stop_child();

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.program_args)
            .args(self.settings_args(settings))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        debug!("Executing: {:?}", cmd);

        let mut child = cmd.spawn()?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::new(ErrorKind::BrokenPipe, "no packet source stdout"))?;

        if let Some(stderr) = child.stderr.take() {
            thread::spawn(move || {
                for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                    if !line.trim().is_empty() {
                        info!("[packet source] {}", line.trim());
                    }
                }
            });
        }

        let (packet_tx, packet_rx) = bounded::<ReceivedPacket>(PACKET_BUFFER);
        thread::Builder::new()
            .name("packet-reader".to_string())
            .spawn(move || {
                for line in BufReader::new(stdout).lines().map_while(Result::ok) {
                    match parse_packet_line(&line) {
                        Some(packet) => {
                            if packet_tx.try_send(packet).is_err() {
                                debug!("Packet channel full or closed, dropping packet");
                            }
                        }
                        None if line.starts_with('*') => {
                            debug!("Failed to parse line: {}", line);
                        }
                        None => {}
                    }
                }
                debug!("Packet source stdout closed");
            })?;

        if let Ok(mut slot) = self.child.lock() {
            *slot = Some(child);
        }
        self.packet_rx = Some(packet_rx);
        Ok(())
    }

    fn release_shared_lock(&mut self) -> Result<(), TransceiverError> {
        self.unlock()
    }

    fn wait_for_packet(&mut self, timeout: Duration) -> Option<ReceivedPacket> {
        let packet_rx = self.packet_rx.as_ref()?;
        match packet_rx.recv_timeout(timeout) {
            Ok(packet) => Some(packet),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                debug!("Packet source disconnected");
                None
            }
        }
    }

    fn release(&mut self) {
        self.stop_child();
        self.acquired = false;
        if let Err(e) = self.unlock() {
            warn!("Failed to unlock {}: {}", self.lock_path.display(), e);
        }
    }
}

impl Drop for PipeTransceiver {
    fn drop(&mut self) {
        self.release();
    }
}

/// Parse a packet source line of the form `*<payload hex>;[ rssi=<index>]`
pub fn parse_packet_line(line: &str) -> Option<ReceivedPacket> {
    let line = line.trim();
    let rest = line.strip_prefix('*')?;
    let end_idx = rest.find(';')?;
    let payload = hex::decode(&rest[..end_idx]).ok()?;

    let rssi_index = rest[end_idx + 1..]
        .split_whitespace()
        .find_map(|field| field.strip_prefix("rssi="))
        .and_then(|value| value.parse().ok())
        .unwrap_or(0);

    Some(ReceivedPacket {
        payload,
        rssi_index,
        checksum_valid: false,
    })
}
