//! sending one message to every open channel at once.
//!
//! a broadcast is all or nothing: it is only committed once every channel has room, and the check
//! and the commit happen under one lock, so no task can ever observe a partial broadcast.
//!
//! the set of channels is whatever is open at the time of each attempt. channels opened while a
//! broadcast is parked are included in its next attempt, closed ones are simply no longer there.

use super::{Bus, Handle, Parked, Slots};
use crate::{
    channel::Side,
    error::{record, BusError},
    msg::Message,
};

impl Bus {
    /// send `msg` to every open channel, waiting until all of them have room.
    ///
    /// fails with `NoChannel` if there are no open channels (including when the last ones are
    /// closed while waiting)
    pub async fn broadcast(&self, msg: Message) -> Result<(), BusError> {
        record(self.broadcast_inner(msg).await)
    }

    async fn broadcast_inner(&self, msg: Message) -> Result<(), BusError> {
        // channels the previous attempt was parked on
        let mut parked_on: Vec<Handle> = Vec::new();
        loop {
            let (waiter, spots) = {
                let mut slots = self.slots();
                if slots.live_count() == 0 {
                    return Err(BusError::NoChannel);
                }
                let full = slots
                    .live()
                    .filter(|(_, ch)| ch.is_full())
                    .map(|(handle, _)| handle)
                    .collect::<Vec<_>>();
                if full.is_empty() {
                    let res = commit(&mut slots, msg);
                    pass_on_wakeups(&mut slots, &parked_on);
                    return res;
                }
                pass_on_wakeups(&mut slots, &parked_on);
                parked_on.clone_from(&full);
                // one waiter in every full channel: whichever frees up first restarts the scan
                let waiter = self.new_waiter();
                for (_, ch) in slots.live().filter(|(_, ch)| ch.is_full()) {
                    ch.park(Side::Send, waiter.clone());
                }
                trace!(
                    "broadcast waiting on {} full channel(s) as {}",
                    full.len(),
                    waiter.id
                );
                let spots = full
                    .into_iter()
                    .map(|handle| (handle, Side::Send))
                    .collect::<Vec<_>>();
                (waiter, spots)
            };
            Parked::new(self, waiter, spots).wait().await;
        }
    }

    /// send `msg` to every open channel if all of them have room, otherwise fail with `WouldBlock`
    /// without touching any of them
    pub fn try_broadcast(&self, msg: Message) -> Result<(), BusError> {
        let res = {
            let mut slots = self.slots();
            if slots.live_count() == 0 {
                Err(BusError::NoChannel)
            } else if slots.live().any(|(_, ch)| ch.is_full()) {
                Err(BusError::WouldBlock)
            } else {
                commit(&mut slots, msg)
            }
        };
        record(res)
    }
}

/// append `msg` to every channel. callers have checked that all of them have room.
fn commit(slots: &mut Slots, msg: Message) -> Result<(), BusError> {
    // grow storage everywhere first, so that running out of memory can not leave the message in
    // only some of the channels
    for (_, ch) in slots.live() {
        ch.reserve_one()?;
    }
    for (_, ch) in slots.live() {
        ch.commit_broadcast(msg)?;
    }
    Ok(())
}

/// the wakeup that resumed a broadcast may have come from a channel whose room the broadcast did
/// not end up using. hand it to the next sender parked there, or it is lost.
fn pass_on_wakeups(slots: &mut Slots, parked_on: &[Handle]) {
    for handle in parked_on {
        if let Ok(ch) = slots.get_mut(*handle) {
            if !ch.is_full() && ch.waiters(Side::Send).wake_oldest() {
                trace!("broadcast passed a wakeup on to the next sender on {handle}");
            }
        }
    }
}
