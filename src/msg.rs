use crate::error::BusError;

/// a single message. fixed size, no metadata
pub type Message = u32;

/// initial storage size of a message queue, once anything is put in it
const MIN_CAPACITY: usize = 4;

/// pending messages of one channel, oldest first.
///
/// storage grows geometrically (4, 8, 16.. or straight to what is needed, whichever is larger)
/// and growth failures are reported instead of aborting.
#[derive(Debug, Default)]
pub(crate) struct MessageQueue {
    data: Vec<Message>,
}

impl MessageQueue {
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[cfg(test)]
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// make sure `count` more messages can be appended without reallocating
    pub fn reserve(&mut self, count: usize) -> Result<(), BusError> {
        let needed = self.data.len() + count;
        if needed <= self.data.capacity() {
            return Ok(());
        }
        let grown = if self.data.capacity() == 0 {
            MIN_CAPACITY
        } else {
            self.data.capacity() * 2
        };
        let target = grown.max(needed);
        self.data
            .try_reserve_exact(target - self.data.len())
            .map_err(|e| {
                error!("failed to grow message queue to {target} entries: {e}");
                BusError::Allocation
            })
    }

    pub fn push(&mut self, msg: Message) -> Result<(), BusError> {
        self.extend_from_slice(&[msg])
    }

    pub fn extend_from_slice(&mut self, msgs: &[Message]) -> Result<(), BusError> {
        self.reserve(msgs.len())?;
        self.data.extend_from_slice(msgs);
        Ok(())
    }

    /// removes the oldest message.
    ///
    /// # Panics
    /// if the queue is empty
    pub fn pop_front(&mut self) -> Message {
        assert!(!self.data.is_empty(), "pop from an empty message queue");
        self.data.remove(0)
    }

    /// removes the `count` oldest messages, in order.
    ///
    /// # Panics
    /// if fewer than `count` messages are queued
    pub fn pop_front_many(&mut self, count: usize) -> Vec<Message> {
        assert!(
            count <= self.data.len(),
            "attempted to pop {count} messages from a queue of {}",
            self.data.len()
        );
        self.data.drain(..count).collect()
    }

    #[cfg(test)]
    pub fn as_slice(&self) -> &[Message] {
        &self.data
    }
}

#[cfg(test)]
mod test {
    use super::MessageQueue;

    #[test]
    fn growth_starts_at_four_and_doubles() {
        let mut q = MessageQueue::new();
        assert_eq!(q.capacity(), 0);
        q.push(1).unwrap();
        assert!(q.capacity() >= 4);
        let first = q.capacity();
        for i in 0..first as u32 {
            q.push(i).unwrap();
        }
        assert!(q.capacity() >= first * 2);
    }

    #[test]
    fn bulk_append_larger_than_double() {
        let mut q = MessageQueue::new();
        q.extend_from_slice(&(0..100).collect::<Vec<_>>()).unwrap();
        assert_eq!(q.len(), 100);
        assert!(q.capacity() >= 100);
    }

    #[test]
    fn pops_are_fifo() {
        let mut q = MessageQueue::new();
        q.extend_from_slice(&[10, 20, 30, 40]).unwrap();
        assert_eq!(q.pop_front(), 10);
        assert_eq!(q.pop_front_many(2), vec![20, 30]);
        assert_eq!(q.as_slice(), &[40]);
        assert_eq!(q.pop_front_many(0), Vec::<u32>::new());
        assert!(!q.is_empty());
    }

    #[test]
    #[should_panic]
    fn popping_too_many_is_a_bug() {
        let mut q = MessageQueue::new();
        q.push(1).unwrap();
        q.pop_front_many(2);
    }
}
