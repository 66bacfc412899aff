//! Single-use rendezvous between a blocking emitter and the reaction that
//! consumes its molecule.
//!
//! A pair is created per blocking emission. The [`Reply`] half travels with
//! the consumed molecule into the reaction body; the receiving half stays
//! with the blocked emitter. Dropping an unfulfilled [`Reply`] wakes the
//! waiter with a no-reply sentinel, which is the runtime's safety net for
//! bodies that forget to reply or panic.

use std::mem;
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

/// Creates a connected reply pair for one blocking emission.
pub(crate) fn reply_pair<R>() -> (Reply<R>, ReplyReceiver<R>) {
    let inner = Arc::new(ReplyInner {
        state: Mutex::new(ReplyState::Empty),
        condvar: Condvar::new(),
    });
    (
        Reply {
            inner: inner.clone(),
        },
        ReplyReceiver { inner },
    )
}

enum ReplyState<R> {
    Empty,
    Fulfilled(R),
    NoReply,
}

struct ReplyInner<R> {
    state: Mutex<ReplyState<R>>,
    condvar: Condvar,
}

/// Handle through which a reaction body answers one blocking emission.
///
/// The consuming reaction must call [`Reply::reply`] exactly once. If the
/// handle is dropped unfulfilled — the body forgot, or it panicked — the
/// blocked emitter is woken with a no-reply error instead.
pub struct Reply<R> {
    inner: Arc<ReplyInner<R>>,
}

impl<R> Reply<R> {
    /// Deliver the reply and wake the blocked emitter.
    ///
    /// Returns `true` on the first invocation. Any later invocation returns
    /// `false` and leaves the stored value untouched. A reply delivered after
    /// the waiter gave up (deadline) is accepted and silently discarded.
    pub fn reply(&self, value: R) -> bool {
        let mut state = self.inner.state.lock().unwrap();
        if let ReplyState::Empty = *state {
            *state = ReplyState::Fulfilled(value);
            self.inner.condvar.notify_one();
            true
        } else {
            false
        }
    }
}

impl<R> Drop for Reply<R> {
    fn drop(&mut self) {
        let mut state = self.inner.state.lock().unwrap();
        if let ReplyState::Empty = *state {
            *state = ReplyState::NoReply;
            self.inner.condvar.notify_one();
        }
    }
}

/// Sentinels observed by the blocked emitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReplyError {
    /// The consuming reaction finished without replying.
    NoReply,
    /// The deadline elapsed before the reply arrived.
    Timeout,
}

impl From<ReplyError> for crate::error::EmitError {
    fn from(err: ReplyError) -> Self {
        match err {
            ReplyError::NoReply => crate::error::EmitError::NoReply,
            ReplyError::Timeout => crate::error::EmitError::Timeout,
        }
    }
}

/// The emitter-side half: blocks the calling thread until the reply arrives.
pub(crate) struct ReplyReceiver<R> {
    inner: Arc<ReplyInner<R>>,
}

impl<R> ReplyReceiver<R> {
    /// Block until the reply arrives or the consuming reaction gives up.
    pub(crate) fn recv(self) -> Result<R, ReplyError> {
        let mut state = self.inner.state.lock().unwrap();
        loop {
            match &*state {
                ReplyState::Empty => state = self.inner.condvar.wait(state).unwrap(),
                ReplyState::NoReply => return Err(ReplyError::NoReply),
                ReplyState::Fulfilled(_) => return Ok(take_value(&mut state)),
            }
        }
    }

    /// Block until the reply arrives, the reaction gives up, or the timeout
    /// elapses. A zero timeout observes the current state and returns.
    pub(crate) fn recv_timeout(self, timeout: Duration) -> Result<R, ReplyError> {
        let start = Instant::now();
        let mut state = self.inner.state.lock().unwrap();
        loop {
            match &*state {
                ReplyState::NoReply => return Err(ReplyError::NoReply),
                ReplyState::Fulfilled(_) => return Ok(take_value(&mut state)),
                ReplyState::Empty => {
                    let elapsed = start.elapsed();
                    if elapsed >= timeout {
                        return Err(ReplyError::Timeout);
                    }
                    let (guard, _) = self
                        .inner
                        .condvar
                        .wait_timeout(state, timeout - elapsed)
                        .unwrap();
                    state = guard;
                }
            }
        }
    }
}

fn take_value<R>(state: &mut ReplyState<R>) -> R {
    match mem::replace(state, ReplyState::NoReply) {
        ReplyState::Fulfilled(value) => value,
        ReplyState::Empty | ReplyState::NoReply => unreachable!(),
    }
}
