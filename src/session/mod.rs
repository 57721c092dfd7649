//! Receive session for the FT017TH
//!
//! A session repeatedly
//! 1. takes the transceiver's exclusive lock (exponential backoff while
//!    another process holds it),
//! 2. reapplies the full radio configuration,
//! 3. polls for packets, at most one wait per flood protection interval,
//! 4. releases and reconfigures when a packet of unexpected length suggests
//!    another process touched the transceiver,
//!
//! until no measurement was decoded within the timeout.

pub mod clock;
mod receiver;
mod state;
#[cfg(test)]
pub(crate) mod testing;

pub use clock::{Clock, SystemClock};
pub use receiver::{ReceiveSession, SessionConfig, SessionError};
pub use state::{RetryPolicy, SessionState, SessionStats};
