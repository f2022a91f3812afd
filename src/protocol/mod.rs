//! Relay wire protocol.
//!
//! ## Message flow
//!
//! ```text
//! Client                               Relay
//!   |--- authenticate {token} --------->|  (bind identity or close)
//!   |--- NTP_REQUEST {T0} ------------->|  (T1 = receipt time)
//!   |<-- NTP_RESPONSE {T0,T1,T2} -------|  (T2 = send time)
//!   |--- START_LISTENING {target} ----->|  (record edge, replay state)
//!   |--- BROADCAST_ACTION {payload} --->|
//!   |                                   |--- SCHEDULED_ACTION ---> listeners
//!   |--- STOP_LISTENING --------------->|
//! ```

mod message;

pub use message::{ClientMessage, ServerMessage};

#[cfg(test)]
mod tests;
