//! bus errors, and the legacy "last error" accessor
//!
//! every operation on [`Bus`](crate::Bus) returns its error directly. for callers that want the
//! older "check the error code after a failed call" style, the outcome of the most recent
//! operation is also recorded per task (see [`scope`]), or per thread for unscoped tasks, and read
//! back with [`last_error`].

use std::{cell::Cell, future::Future};

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    /// the handle is out of range, names an empty slot, or the channel was closed
    /// (possibly while the caller was parked on it)
    #[error("no such channel (invalid handle, or the channel was closed)")]
    NoChannel,
    /// a non-blocking operation could not proceed; nothing was modified
    #[error("operation would block")]
    WouldBlock,
    /// storage for channels or messages could not be grown
    #[error("failed to allocate storage")]
    Allocation,
}

/// the error code as seen through [`last_error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ErrorKind {
    #[default]
    None,
    NoChannel,
    WouldBlock,
    Allocation,
}

impl From<BusError> for ErrorKind {
    fn from(err: BusError) -> Self {
        match err {
            BusError::NoChannel => Self::NoChannel,
            BusError::WouldBlock => Self::WouldBlock,
            BusError::Allocation => Self::Allocation,
        }
    }
}

tokio::task_local! {
    static LAST_ERROR: Cell<ErrorKind>;
}

thread_local! {
    /// used outside of a [`scope`]. on a single threaded runtime this is shared by every unscoped task
    static THREAD_LAST_ERROR: Cell<ErrorKind> = Cell::new(ErrorKind::None);
}

/// runs `f` with its own last-error slot. bus operations made inside `f` (and only those) are
/// visible through [`last_error`] from inside `f`.
pub async fn scope<F: Future>(f: F) -> F::Output {
    LAST_ERROR.scope(Cell::new(ErrorKind::None), f).await
}

/// outcome of the most recent bus operation made by the current task.
///
/// outside of [`scope`] this is the most recent operation made by any unscoped task on this thread
pub fn last_error() -> ErrorKind {
    LAST_ERROR
        .try_with(Cell::get)
        .unwrap_or_else(|_| THREAD_LAST_ERROR.with(Cell::get))
}

/// overwrite the current task's last error with the outcome of `res`
pub(crate) fn record<T>(res: Result<T, BusError>) -> Result<T, BusError> {
    let kind = match &res {
        Ok(..) => ErrorKind::None,
        Err(e) => ErrorKind::from(*e),
    };
    if LAST_ERROR.try_with(|slot| slot.set(kind)).is_err() {
        THREAD_LAST_ERROR.with(|slot| slot.set(kind));
    }
    res
}
