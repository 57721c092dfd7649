//! Receive & decode signals of FT017TH wireless thermo/hygrometers
//!
//! The sensor transmits on 433.945 MHz; a CC1101 transceiver (driven by an
//! external packet source) delivers raw packets, which are validated and
//! calibrated into [`Measurement`]s by a [`ReceiveSession`].
//!
//! The library never installs a logging subscriber; that is up to the caller.

pub mod capture;
pub mod config;
pub mod ft017th;
pub mod measurement;
pub mod radio;
pub mod session;

pub use capture::{MeasurementStream, SensorCapture};
pub use ft017th::{decode_message, decode_transmission, BitMessage, DecodeError};
pub use measurement::Measurement;
pub use radio::{PipeTransceiver, RadioSettings, ReceivedPacket, Transceiver, TransceiverError};
pub use session::{ReceiveSession, SessionConfig, SessionError};
