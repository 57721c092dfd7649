//! Scripted transceiver for session tests

use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use super::clock::manual::{Event, ManualClock};
use super::clock::Clock;
use crate::radio::{RadioSettings, ReceivedPacket, Transceiver, TransceiverError};

pub(crate) mod packets {
    use crate::radio::ReceivedPacket;

    // FF A8 stripped by the transceiver
    const PAYLOAD: &str = "b3209005ef21ffd459904802f790ffffffffffffffffff";

    fn packet(payload: Vec<u8>) -> ReceivedPacket {
        ReceivedPacket {
            payload,
            rssi_index: 0,
            checksum_valid: true,
        }
    }

    pub fn valid() -> ReceivedPacket {
        packet(hex::decode(PAYLOAD).unwrap())
    }

    pub fn repeats_mismatch() -> ReceivedPacket {
        let mut payload = hex::decode(PAYLOAD).unwrap();
        payload[10] = 0x47;
        packet(payload)
    }

    pub fn zeros() -> ReceivedPacket {
        packet(vec![0; 23])
    }

    pub fn wrong_length() -> ReceivedPacket {
        packet(vec![0xff; 17])
    }
}

#[derive(Debug, Clone, Copy)]
enum Acquisition {
    Granted,
    Locked,
    Failed,
}

/// Records every call on the shared [`ManualClock`]; packet waits advance
/// virtual time. Once the script runs dry, acquisitions succeed and waits
/// time out after the full timeout.
pub(crate) struct FakeTransceiver {
    clock: ManualClock,
    acquisitions: VecDeque<Acquisition>,
    failing_configurations: usize,
    polls: VecDeque<(Duration, Option<ReceivedPacket>)>,
}

impl FakeTransceiver {
    pub fn new(clock: &ManualClock) -> Self {
        Self {
            clock: clock.clone(),
            acquisitions: VecDeque::new(),
            failing_configurations: 0,
            polls: VecDeque::new(),
        }
    }

    /// `false` = locked by another process
    pub fn push_acquisitions(&mut self, granted: &[bool]) {
        self.acquisitions.extend(granted.iter().map(|&granted| {
            if granted {
                Acquisition::Granted
            } else {
                Acquisition::Locked
            }
        }));
    }

    /// An acquisition failing for another reason than contention
    pub fn push_acquire_failure(&mut self) {
        self.acquisitions.push_back(Acquisition::Failed);
    }

    /// The next `count` configurations fail
    pub fn fail_configurations(&mut self, count: usize) {
        self.failing_configurations = count;
    }

    pub fn push_packet(&mut self, packet: ReceivedPacket) {
        self.polls.push_back((Duration::ZERO, Some(packet)));
    }

    /// A wait returning nothing after `duration`
    pub fn push_silence(&mut self, duration: Duration) {
        self.polls.push_back((duration, None));
    }
}

impl Transceiver for FakeTransceiver {
    fn acquire_exclusive(&mut self) -> Result<(), TransceiverError> {
        match self.acquisitions.pop_front().unwrap_or(Acquisition::Granted) {
            Acquisition::Granted => {
                self.clock.record(Event::Acquire);
                Ok(())
            }
            Acquisition::Locked => {
                self.clock.record(Event::WouldBlock);
                Err(TransceiverError::WouldBlock)
            }
            Acquisition::Failed => {
                self.clock.record(Event::AcquireFailed);
                let e = io::Error::new(io::ErrorKind::PermissionDenied, "lock file not writable");
                Err(e.into())
            }
        }
    }

    fn configure(&mut self, settings: &RadioSettings) -> Result<(), TransceiverError> {
        assert_eq!(settings.packet_length_bytes, 23);
        if self.failing_configurations > 0 {
            self.failing_configurations -= 1;
            self.clock.record(Event::ConfigureFailed);
            return Err(io::Error::new(io::ErrorKind::NotFound, "packet source not found").into());
        }
        self.clock.record(Event::Configure);
        Ok(())
    }

    fn release_shared_lock(&mut self) -> Result<(), TransceiverError> {
        self.clock.record(Event::UnlockSharedLock);
        Ok(())
    }

    fn wait_for_packet(&mut self, timeout: Duration) -> Option<ReceivedPacket> {
        self.clock.record(Event::Wait {
            at: self.clock.elapsed(),
            timeout,
        });
        let (duration, packet) = self.polls.pop_front().unwrap_or((timeout, None));
        self.clock.advance(duration.min(timeout));
        packet
    }

    fn release(&mut self) {
        self.clock.record(Event::Release);
    }
}

#[test]
fn test_fake_clock_is_virtual() {
    let clock = ManualClock::new();
    let start = clock.now();
    clock.sleep(Duration::from_secs(3600));
    assert_eq!(clock.now() - start, Duration::from_secs(3600));
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(3600)]);
    clock.clear_events();
    assert!(clock.events().is_empty());
}
