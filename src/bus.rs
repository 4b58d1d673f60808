//! the channel registry, and the blocking send/receive loops
//!
//! channels live in a slot table addressed by [`Handle`]. a handle carries the generation of the
//! slot it was issued for, and closing a channel bumps that generation, so a handle to a closed
//! channel never resolves again (even after its slot is reused by a later `open`).
//!
//! blocking operations follow one pattern: lock the table, try the immediate operation, and if it
//! would block, put a fresh waiter into the relevant wait queue and sleep on it. after every wake
//! the handle is resolved again from scratch, which is how a task notices that its channel was
//! closed (or replaced) while it was parked.

use std::{
    collections::BTreeSet,
    fmt,
    sync::{atomic::AtomicU64, Arc, Mutex, MutexGuard, PoisonError},
};

use crate::{
    channel::{Channel, Side},
    config::BusConfig,
    error::{record, BusError},
    id::Uid,
    msg::Message,
    wait::Waiter,
};

mod batch;
mod broadcast;

/// identifies a channel on a [`Bus`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    index: u32,
    generation: u32,
}

impl Handle {
    /// the slot number. small, and reused once the channel is closed
    pub fn index(&self) -> u32 {
        self.index
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ch{}:{}", self.index, self.generation)
    }
}

/// a snapshot of one channel's state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelStats {
    pub capacity: usize,
    /// messages currently queued
    pub pending: usize,
    /// tasks parked waiting for room
    pub parked_senders: usize,
    /// tasks parked waiting for messages
    pub parked_receivers: usize,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    channel: Option<Channel>,
}

#[derive(Debug, Default)]
pub(crate) struct Slots {
    slots: Vec<Slot>,
    /// indices of empty slots. ordered, so the lowest one is reused first
    free: BTreeSet<u32>,
    live: usize,
}

impl Slots {
    pub fn get_mut(&mut self, handle: Handle) -> Result<&mut Channel, BusError> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.channel.as_mut())
            .ok_or(BusError::NoChannel)
    }

    fn insert(&mut self, channel: Channel, limit: Option<usize>) -> Result<Handle, BusError> {
        if limit.is_some_and(|limit| self.live >= limit) {
            warn!("refusing to open channel: limit of {} channels reached", self.live);
            return Err(BusError::Allocation);
        }
        let index = match self.free.pop_first() {
            Some(index) => index,
            None => {
                let index = u32::try_from(self.slots.len()).map_err(|_| BusError::Allocation)?;
                self.slots.try_reserve(1).map_err(|e| {
                    error!("failed to grow channel table: {e}");
                    BusError::Allocation
                })?;
                self.slots.push(Slot {
                    generation: 0,
                    channel: None,
                });
                index
            }
        };
        let slot = &mut self.slots[index as usize];
        slot.channel = Some(channel);
        self.live += 1;
        Ok(Handle {
            index,
            generation: slot.generation,
        })
    }

    fn remove(&mut self, handle: Handle) -> Result<Channel, BusError> {
        let slot = self
            .slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .ok_or(BusError::NoChannel)?;
        let channel = slot.channel.take().ok_or(BusError::NoChannel)?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.insert(handle.index);
        self.live -= 1;
        Ok(channel)
    }

    pub fn live_count(&self) -> usize {
        self.live
    }

    /// every open channel, in slot order
    pub fn live(&mut self) -> impl Iterator<Item = (Handle, &mut Channel)> + '_ {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(index, slot)| {
                let generation = slot.generation;
                slot.channel.as_mut().map(|ch| {
                    (
                        Handle {
                            // insert() never hands out an index that does not fit
                            index: index as u32,
                            generation,
                        },
                        ch,
                    )
                })
            })
    }
}

struct Shared {
    slots: Mutex<Slots>,
    /// source for waiter ids
    uid_src: AtomicU64,
    config: BusConfig,
}

/// a set of bounded channels shared between tasks.
///
/// `Bus` is a cheap handle: clone it into every task that needs it. all clones see the same
/// channels, and the channels (and anything still queued in them) are freed when the last clone
/// is dropped.
#[derive(Clone)]
pub struct Bus {
    inner: Arc<Shared>,
}

impl Bus {
    pub fn new() -> Self {
        Self::with_config(BusConfig::default())
    }

    #[instrument]
    pub fn with_config(config: BusConfig) -> Self {
        Self {
            inner: Arc::new(Shared {
                slots: Mutex::new(Slots::default()),
                uid_src: AtomicU64::new(0),
                config,
            }),
        }
    }

    pub fn config(&self) -> &BusConfig {
        &self.inner.config
    }

    /// the lock is never held across an await point, so a panic while holding it is the only way
    /// to poison it. the table is still consistent in that case (every mutation is a single step)
    pub(crate) fn slots(&self) -> MutexGuard<'_, Slots> {
        self.inner
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn new_waiter(&self) -> Arc<Waiter> {
        Waiter::new(Uid::gen_with(&self.inner.uid_src))
    }

    /// open a channel holding at most `capacity` pending messages
    ///
    /// the lowest free slot is reused if there is one. fails with `Allocation` if the table can
    /// not grow or `max_channels` channels are already open.
    pub fn open(&self, capacity: usize) -> Result<Handle, BusError> {
        let res = self
            .slots()
            .insert(Channel::new(capacity), self.inner.config.max_channels);
        if let Ok(handle) = &res {
            debug!("opened channel {handle} (capacity {capacity})");
        }
        record(res)
    }

    /// close a channel. every task parked on it resumes with `NoChannel`, and anything still
    /// queued is dropped.
    pub fn close(&self, handle: Handle) -> Result<(), BusError> {
        let res = self.slots().remove(handle).map(|channel| {
            let parked = channel.close();
            if parked > 0 {
                warn!("closed channel {handle} with {parked} task(s) parked on it");
            } else {
                debug!("closed channel {handle}");
            }
        });
        record(res)
    }

    /// close every open channel, returning how many there were
    pub fn shutdown(&self) -> usize {
        let handles = self.slots().live().map(|(h, _)| h).collect::<Vec<_>>();
        let closed = handles
            .into_iter()
            .filter(|handle| self.close(*handle).is_ok())
            .count();
        debug!("bus shut down, closed {closed} channel(s)");
        closed
    }

    /// number of open channels
    pub fn channel_count(&self) -> usize {
        self.slots().live_count()
    }

    pub fn stats(&self, handle: Handle) -> Result<ChannelStats, BusError> {
        record(self.immediate(handle, |ch| {
            Ok(ChannelStats {
                capacity: ch.capacity(),
                pending: ch.pending(),
                parked_senders: ch.parked(Side::Send),
                parked_receivers: ch.parked(Side::Recv),
            })
        }))
    }

    /// send `msg`, waiting for room if the channel is full
    pub async fn send(&self, handle: Handle, msg: Message) -> Result<(), BusError> {
        record(
            self.blocking(handle, Side::Send, |ch| ch.try_send(msg, true))
                .await,
        )
    }

    /// send `msg` if there is room, otherwise fail with `WouldBlock`
    pub fn try_send(&self, handle: Handle, msg: Message) -> Result<(), BusError> {
        record(self.immediate(handle, |ch| ch.try_send(msg, false)))
    }

    /// receive the oldest message, waiting for one if the channel is empty
    pub async fn recv(&self, handle: Handle) -> Result<Message, BusError> {
        record(self.blocking(handle, Side::Recv, Channel::try_recv).await)
    }

    /// receive the oldest message if there is one, otherwise fail with `WouldBlock`
    pub fn try_recv(&self, handle: Handle) -> Result<Message, BusError> {
        record(self.immediate(handle, Channel::try_recv))
    }

    fn immediate<T>(
        &self,
        handle: Handle,
        op: impl FnOnce(&mut Channel) -> Result<T, BusError>,
    ) -> Result<T, BusError> {
        op(self.slots().get_mut(handle)?)
    }

    /// retry `op` until it stops returning `WouldBlock`, parking on `side` of the channel between
    /// attempts
    async fn blocking<T>(
        &self,
        handle: Handle,
        side: Side,
        mut op: impl FnMut(&mut Channel) -> Result<T, BusError>,
    ) -> Result<T, BusError> {
        loop {
            let waiter = {
                let mut slots = self.slots();
                let chan = slots.get_mut(handle)?;
                match op(&mut *chan) {
                    Err(BusError::WouldBlock) => {}
                    res => return res,
                }
                let waiter = self.new_waiter();
                chan.park(side, waiter.clone());
                waiter
            };
            Parked::new(self, waiter, vec![(handle, side)]).wait().await;
        }
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Bus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bus")
            .field("channels", &self.channel_count())
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

/// a waiter that has been put into one or more wait queues.
///
/// dropping it (normally after `wait` returns, or because the parked future itself was dropped)
/// takes the waiter back out of every queue whose channel still exists. if the waiter had been
/// woken but never got to act on it, the wakeup is passed on to the next waiter so it is not lost.
struct Parked<'a> {
    bus: &'a Bus,
    waiter: Arc<Waiter>,
    spots: Vec<(Handle, Side)>,
    resumed: bool,
}

impl<'a> Parked<'a> {
    fn new(bus: &'a Bus, waiter: Arc<Waiter>, spots: Vec<(Handle, Side)>) -> Self {
        Self {
            bus,
            waiter,
            spots,
            resumed: false,
        }
    }

    async fn wait(mut self) {
        self.waiter.wait().await;
        self.resumed = true;
        trace!("{} resumed", self.waiter.id);
    }
}

impl Drop for Parked<'_> {
    fn drop(&mut self) {
        let forward = !self.resumed && self.waiter.is_woken();
        let mut slots = self.bus.slots();
        for (handle, side) in &self.spots {
            // a closed channel has already emptied its queues
            if let Ok(chan) = slots.get_mut(*handle) {
                let queue = chan.waiters(*side);
                queue.remove(self.waiter.id);
                if forward {
                    trace!("{} dropped after wakeup, passing it on", self.waiter.id);
                    queue.wake_oldest();
                }
            }
        }
    }
}
