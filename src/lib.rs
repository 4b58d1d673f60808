//! Corobus - a bus of bounded FIFO message channels for cooperatively scheduled tasks
//!
//! channels are opened on a [`Bus`] and addressed by [`Handle`]s. every channel has a fixed
//! capacity; sending to a full channel (or receiving from an empty one) either parks the task
//! until that changes, or with the `try_` variants fails with [`BusError::WouldBlock`].
//! on top of that there is broadcast (one message to every channel, all or nothing) and batched
//! send / receive (as many messages as fit, in one call).
//!
//! parked tasks are woken strictly in the order they parked. closing a channel wakes everyone
//! parked on it, and they all fail with [`BusError::NoChannel`].
//!
//! the bus does not care what executor it runs on, it is built for a single threaded one
//! (e.g. a tokio `current_thread` runtime) but is safe to share between threads.

#[macro_use]
extern crate tracing;

mod bus;
mod channel;
pub mod config;
pub mod error;
mod flag;
mod id;
mod msg;
mod wait;

pub use bus::{Bus, ChannelStats, Handle};
pub use config::BusConfig;
pub use error::{BusError, ErrorKind};
pub use msg::Message;

/// the legacy "check the last error" accessor (see [`error::scope`])
pub mod errno {
    pub use crate::error::{last_error, scope};
}
