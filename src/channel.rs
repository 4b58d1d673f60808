use std::sync::Arc;

use crate::{
    error::BusError,
    msg::{Message, MessageQueue},
    wait::{WaitQueue, Waiter},
};

/// which wait queue of a channel a task is parked in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Side {
    /// waiting for room
    Send,
    /// waiting for messages
    Recv,
}

/// a bounded FIFO channel. only ever touched while the bus slot table is locked.
///
/// every operation here is immediate: it either makes progress or reports `WouldBlock`. parking
/// and retrying is done by the bus.
#[derive(Debug)]
pub(crate) struct Channel {
    /// max number of pending messages, fixed at creation
    capacity: usize,
    queue: MessageQueue,
    /// tasks waiting until the channel is not full
    senders: WaitQueue,
    /// tasks waiting until the channel is not empty
    receivers: WaitQueue,
}

impl Channel {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            queue: MessageQueue::new(),
            senders: WaitQueue::new(),
            receivers: WaitQueue::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// number of messages that can be sent right now
    pub fn room(&self) -> usize {
        self.capacity.saturating_sub(self.queue.len())
    }

    pub fn is_full(&self) -> bool {
        self.room() == 0
    }

    pub fn waiters(&mut self, side: Side) -> &mut WaitQueue {
        match side {
            Side::Send => &mut self.senders,
            Side::Recv => &mut self.receivers,
        }
    }

    pub fn parked(&self, side: Side) -> usize {
        match side {
            Side::Send => self.senders.len(),
            Side::Recv => self.receivers.len(),
        }
    }

    pub fn park(&mut self, side: Side, waiter: Arc<Waiter>) {
        trace!("parking {} ({side:?})", waiter.id);
        self.waiters(side).park(waiter);
    }

    /// enqueue one message, waking one receiver.
    ///
    /// `cascade` also wakes one sender, so that when several senders are parked and several slots
    /// were freed at once they wake each other one by one. only the blocking send does this.
    pub fn try_send(&mut self, msg: Message, cascade: bool) -> Result<(), BusError> {
        if self.is_full() {
            return Err(BusError::WouldBlock);
        }
        self.queue.push(msg)?;
        self.receivers.wake_oldest();
        if cascade {
            self.senders.wake_oldest();
        }
        Ok(())
    }

    pub fn try_recv(&mut self) -> Result<Message, BusError> {
        if self.queue.is_empty() {
            return Err(BusError::WouldBlock);
        }
        let msg = self.queue.pop_front();
        self.senders.wake_oldest();
        Ok(msg)
    }

    /// enqueue as many of `msgs` as there is room for, returning how many were taken.
    pub fn try_send_many(&mut self, msgs: &[Message]) -> Result<usize, BusError> {
        let room = self.room();
        if room == 0 {
            return Err(BusError::WouldBlock);
        }
        let count = room.min(msgs.len());
        self.queue.extend_from_slice(&msgs[..count])?;
        for _ in 0..count {
            self.receivers.wake_oldest();
        }
        self.senders.wake_oldest();
        Ok(count)
    }

    /// dequeue up to `max` messages, oldest first.
    pub fn try_recv_many(&mut self, max: usize) -> Result<Vec<Message>, BusError> {
        if self.queue.is_empty() {
            return Err(BusError::WouldBlock);
        }
        let count = max.min(self.queue.len());
        let msgs = self.queue.pop_front_many(count);
        self.senders.wake_oldest();
        Ok(msgs)
    }

    /// make room in storage for one more message (used by broadcast, so that its commit cannot fail
    /// half way through)
    pub fn reserve_one(&mut self) -> Result<(), BusError> {
        self.queue.reserve(1)
    }

    /// append to a channel that has already been checked for room and reserved
    pub fn commit_broadcast(&mut self, msg: Message) -> Result<(), BusError> {
        debug_assert!(!self.is_full());
        self.queue.push(msg)?;
        self.receivers.wake_oldest();
        Ok(())
    }

    #[cfg(test)]
    pub fn contents(&self) -> &[Message] {
        self.queue.as_slice()
    }

    /// destroy the channel: every parked task is woken (and, finding the channel gone, fails with
    /// `NoChannel`). returns the number of tasks that were parked.
    pub fn close(mut self) -> usize {
        self.receivers.drain() + self.senders.drain()
    }
}
