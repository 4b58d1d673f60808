//! vectored send and receive.
//!
//! these are best effort: a single call moves as many messages as it can in one pass and reports
//! how many that was. only the blocking variants wait, and only while *no* progress is possible.

use super::{Bus, Handle};
use crate::{
    channel::{Channel, Side},
    error::{record, BusError},
    msg::Message,
};

impl Bus {
    /// send as many of `msgs` as currently fit, waiting only if there is no room at all.
    ///
    /// returns the number of messages sent, which may be less than `msgs.len()`.
    pub async fn send_many(&self, handle: Handle, msgs: &[Message]) -> Result<usize, BusError> {
        if msgs.is_empty() {
            return record(self.immediate(handle, |_| Ok(0)));
        }
        record(
            self.blocking(handle, Side::Send, |ch| ch.try_send_many(msgs))
                .await,
        )
    }

    /// send as many of `msgs` as currently fit, failing with `WouldBlock` if the channel is full
    pub fn try_send_many(&self, handle: Handle, msgs: &[Message]) -> Result<usize, BusError> {
        if msgs.is_empty() {
            return record(self.immediate(handle, |_| Ok(0)));
        }
        record(self.immediate(handle, |ch| ch.try_send_many(msgs)))
    }

    /// keep calling [`send_many`](Self::send_many) until every message in `msgs` has been sent.
    ///
    /// if the channel is closed part way through, the messages already sent stay sent and the
    /// error is returned.
    pub async fn send_all(&self, handle: Handle, msgs: &[Message]) -> Result<usize, BusError> {
        if msgs.is_empty() {
            return self.send_many(handle, msgs).await;
        }
        let mut sent = 0;
        while sent < msgs.len() {
            sent += self.send_many(handle, &msgs[sent..]).await?;
        }
        Ok(sent)
    }

    /// receive up to `max` messages (oldest first), waiting if the channel is empty
    pub async fn recv_many(&self, handle: Handle, max: usize) -> Result<Vec<Message>, BusError> {
        if max == 0 {
            return record(self.immediate(handle, |_| Ok(Vec::new())));
        }
        record(
            self.blocking(handle, Side::Recv, |ch| recv_many_cascading(ch, max))
                .await,
        )
    }

    /// receive up to `max` messages (oldest first), failing with `WouldBlock` if there are none
    pub fn try_recv_many(&self, handle: Handle, max: usize) -> Result<Vec<Message>, BusError> {
        if max == 0 {
            return record(self.immediate(handle, |_| Ok(Vec::new())));
        }
        record(self.immediate(handle, |ch| ch.try_recv_many(max)))
    }
}

/// a blocking batch receive that leaves messages behind hands them on to the next parked receiver
fn recv_many_cascading(ch: &mut Channel, max: usize) -> Result<Vec<Message>, BusError> {
    let msgs = ch.try_recv_many(max)?;
    if ch.pending() > 0 {
        ch.waiters(Side::Recv).wake_oldest();
    }
    Ok(msgs)
}
