use futures::task::{AtomicWaker, Context, Poll};
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering::{Acquire, Release};

/// one-shot wakeup signal for a single parked task.
///
/// once signaled, it stays signaled (there is no reset, a new park gets a new flag)
#[derive(Debug)]
pub struct Flag {
    waker: AtomicWaker,
    set: AtomicBool,
}

impl Flag {
    pub fn new() -> Self {
        Self {
            waker: AtomicWaker::new(),
            set: AtomicBool::new(false),
        }
    }

    pub fn signal(&self) {
        self.set.store(true, Release);
        self.waker.wake();
    }

    pub fn is_set(&self) -> bool {
        self.set.load(Acquire)
    }

    pub fn poll_wait(&self, cx: &mut Context<'_>) -> Poll<()> {
        // quick check to avoid registration if already done.
        if self.is_set() {
            return Poll::Ready(());
        }

        self.waker.register(cx.waker());

        // Need to check condition **after** `register` to avoid a race
        // condition that would result in lost notifications.
        if self.is_set() {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }
}

impl Default for Flag {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use std::{sync::Arc, time::Duration};

    use super::Flag;

    #[tokio::test]
    async fn signal_before_wait_completes_immediately() {
        let flag = Flag::new();
        flag.signal();
        futures::future::poll_fn(|cx| flag.poll_wait(cx)).await;
        assert!(flag.is_set());
    }

    #[tokio::test]
    async fn signal_from_other_task_wakes_waiter() {
        let flag = Arc::new(Flag::new());
        let waiter = {
            let flag = flag.clone();
            tokio::spawn(async move { futures::future::poll_fn(|cx| flag.poll_wait(cx)).await })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());
        flag.signal();
        tokio::time::timeout(Duration::from_secs(5), waiter)
            .await
            .expect("flag waiter was never woken")
            .unwrap();
    }
}
