use std::{
    fmt,
    sync::atomic::{self, AtomicU64},
};

/// NON UNIVERSALLY unique identifier, used to tell parked tasks apart
///
/// all Uids that are compared with each other must come from the same `source`
/// (in practice, the `Bus` that minted them)
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Uid(u64);

impl Uid {
    /// generates a new Unique identifer by taking the current value in `source` and incrementing
    /// it by 1. this will generate unique ids, as long as they are only compared to values coming
    /// from the same source.
    pub(crate) fn gen_with(source: &AtomicU64) -> Self {
        Self(source.fetch_add(1, atomic::Ordering::Relaxed))
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "waiter#{}", self.0)
    }
}

#[cfg(test)]
#[test]
fn uids_from_one_source_are_distinct() {
    let src = AtomicU64::new(0);
    let a = Uid::gen_with(&src);
    let b = Uid::gen_with(&src);
    assert_ne!(a, b);
    assert_eq!(a.to_string(), "waiter#0");
}
