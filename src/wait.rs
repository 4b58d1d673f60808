//! FIFO queues of parked tasks.
//!
//! a task parks by creating a [`Waiter`], putting it in one (or several) [`WaitQueue`]s, and
//! awaiting [`Waiter::wait`]. whoever makes progress possible calls [`WaitQueue::wake_oldest`].
//! the waiter is NOT removed by the wake: it stays queued until the parked task itself resumes
//! and takes it out (see `bus::Parked`), which is also what happens when a parked future is dropped.

use std::{collections::VecDeque, sync::Arc};

use futures::future::poll_fn;

use crate::{flag::Flag, id::Uid};

/// one parked task
#[derive(Debug)]
pub(crate) struct Waiter {
    pub id: Uid,
    flag: Flag,
}

impl Waiter {
    pub fn new(id: Uid) -> Arc<Self> {
        Arc::new(Self {
            id,
            flag: Flag::new(),
        })
    }

    /// resolves once the waiter has been woken (by a wake, or by its channel closing)
    pub async fn wait(&self) {
        poll_fn(|cx| self.flag.poll_wait(cx)).await
    }

    pub fn is_woken(&self) -> bool {
        self.flag.is_set()
    }

    pub fn wake(&self) {
        self.flag.signal()
    }
}

#[derive(Debug, Default)]
pub(crate) struct WaitQueue {
    waiters: VecDeque<Arc<Waiter>>,
}

impl WaitQueue {
    pub fn new() -> Self {
        Self {
            waiters: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.waiters.len()
    }

    pub fn park(&mut self, waiter: Arc<Waiter>) {
        self.waiters.push_back(waiter);
    }

    /// removes the waiter with `id`, returning if it was present
    pub fn remove(&mut self, id: Uid) -> bool {
        if let Some(pos) = self.waiters.iter().position(|w| w.id == id) {
            self.waiters.remove(pos);
            true
        } else {
            false
        }
    }

    /// wake the oldest waiter that has not been woken yet.
    ///
    /// waiters that were already woken (but have not resumed) are skipped, so that several wakes in
    /// a row reach several distinct tasks. returns false if there was no one to wake
    pub fn wake_oldest(&mut self) -> bool {
        match self.waiters.iter().find(|w| !w.is_woken()) {
            Some(waiter) => {
                trace!("waking {}", waiter.id);
                waiter.wake();
                true
            }
            None => false,
        }
    }

    /// removes every waiter, waking each one. returns how many there were
    pub fn drain(&mut self) -> usize {
        let count = self.waiters.len();
        for waiter in self.waiters.drain(..) {
            waiter.wake();
        }
        count
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::AtomicU64;

    use super::{WaitQueue, Waiter};
    use crate::id::Uid;

    #[test]
    fn wakes_in_park_order_skipping_woken() {
        let src = AtomicU64::new(0);
        let mut q = WaitQueue::new();
        let a = Waiter::new(Uid::gen_with(&src));
        let b = Waiter::new(Uid::gen_with(&src));
        q.park(a.clone());
        q.park(b.clone());

        assert!(q.wake_oldest());
        assert!(a.is_woken());
        assert!(!b.is_woken());
        // a is still queued until it resumes, but it does not soak up the next wake
        assert_eq!(q.len(), 2);
        assert!(q.wake_oldest());
        assert!(b.is_woken());
        assert!(!q.wake_oldest());
    }

    #[test]
    fn remove_and_drain() {
        let src = AtomicU64::new(0);
        let mut q = WaitQueue::new();
        let a = Waiter::new(Uid::gen_with(&src));
        let b = Waiter::new(Uid::gen_with(&src));
        q.park(a.clone());
        q.park(b.clone());
        assert!(q.remove(a.id));
        assert!(!q.remove(a.id));
        assert_eq!(q.drain(), 1);
        assert!(b.is_woken());
        assert!(!a.is_woken());
        assert_eq!(q.len(), 0);
    }
}
