// Correlation tables shared between the reader task and callers.
//
// `ResponseSlots` delivers response frames to the caller waiting on the
// matching correlation id; `DataQueue` hands push frames to consumers in
// FIFO order. Both fan a single failure cause out to every outstanding
// waiter when the connection dies. All mutations happen inside short
// non-suspending sections.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::error::{Error, Result};

/// Pending response waiters keyed by stringified correlation id, plus a
/// stash for responses that arrive before their waiter registers.
#[derive(Default)]
pub(crate) struct ResponseSlots {
    state: Mutex<SlotsState>,
}

#[derive(Default)]
struct SlotsState {
    stash: HashMap<String, Value>,
    waiters: HashMap<String, oneshot::Sender<Result<Value>>>,
}

/// What `register` hands back: either the stashed response or a channel the
/// reader will complete.
pub(crate) enum ResponseWaiter {
    Ready(Box<Value>),
    Pending(oneshot::Receiver<Result<Value>>),
}

impl ResponseWaiter {
    pub(crate) async fn wait(self) -> Result<Value> {
        match self {
            ResponseWaiter::Ready(frame) => Ok(*frame),
            ResponseWaiter::Pending(rx) => rx.await.map_err(|_| Error::ConnectionClosed {
                normal: false,
                reason: "response waiter dropped before completion".into(),
            })?,
        }
    }
}

impl ResponseSlots {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers a waiter for `sync_id`. Must be called before the request
    /// frame is written. Registration is exclusive per key; a second
    /// registration under a live key is a logic error.
    pub(crate) fn register(&self, sync_id: String) -> Result<ResponseWaiter> {
        let mut state = self.state.lock();
        if let Some(frame) = state.stash.remove(&sync_id) {
            return Ok(ResponseWaiter::Ready(Box::new(frame)));
        }
        if state.waiters.contains_key(&sync_id) {
            return Err(Error::Contract(format!(
                "a waiter is already registered for sync id {sync_id}"
            )));
        }
        let (tx, rx) = oneshot::channel();
        state.waiters.insert(sync_id, tx);
        Ok(ResponseWaiter::Pending(rx))
    }

    /// Drops the waiter for `sync_id`, if still registered.
    pub(crate) fn unregister(&self, sync_id: &str) {
        self.state.lock().waiters.remove(sync_id);
    }

    /// Delivers a response frame: completes the registered waiter, or
    /// stashes the frame for a waiter that has not registered yet.
    pub(crate) fn complete(&self, sync_id: &str, frame: Value) {
        let waiter = {
            let mut state = self.state.lock();
            match state.waiters.remove(sync_id) {
                Some(tx) => Some(tx),
                None => {
                    state.stash.insert(sync_id.to_string(), frame.clone());
                    None
                }
            }
        };
        if let Some(tx) = waiter {
            // The caller may have given up; nothing to do then.
            let _ = tx.send(Ok(frame));
        }
    }

    /// Fails every outstanding waiter with a clone of `cause`.
    pub(crate) fn fail(&self, cause: &Error) {
        let waiters: Vec<_> = {
            let mut state = self.state.lock();
            state.waiters.drain().map(|(_, tx)| tx).collect()
        };
        for tx in waiters {
            let _ = tx.send(Err(cause.clone()));
        }
    }

    pub(crate) fn clear(&self) {
        let mut state = self.state.lock();
        state.stash.clear();
        state.waiters.clear();
    }

    #[doc(hidden)]
    pub fn outstanding(&self) -> usize {
        let state = self.state.lock();
        state.waiters.len() + state.stash.len()
    }
}

/// Unbounded FIFO of push frames with blocked consumers.
#[derive(Default)]
pub(crate) struct DataQueue {
    state: Mutex<QueueState>,
}

#[derive(Default)]
struct QueueState {
    queue: VecDeque<Value>,
    consumers: VecDeque<oneshot::Sender<Result<Value>>>,
}

impl DataQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Returns the oldest queued frame, or blocks until one is pushed.
    pub(crate) async fn pop(&self) -> Result<Value> {
        let rx = {
            let mut state = self.state.lock();
            if let Some(frame) = state.queue.pop_front() {
                return Ok(frame);
            }
            let (tx, rx) = oneshot::channel();
            state.consumers.push_back(tx);
            rx
        };
        rx.await.map_err(|_| Error::ConnectionClosed {
            normal: false,
            reason: "push consumer dropped before completion".into(),
        })?
    }

    /// Wakes the oldest blocked consumer, or enqueues the frame.
    pub(crate) fn push(&self, frame: Value) {
        let mut state = self.state.lock();
        let mut frame = frame;
        while let Some(tx) = state.consumers.pop_front() {
            match tx.send(Ok(frame)) {
                Ok(()) => return,
                // Consumer gave up waiting; try the next one.
                Err(Ok(returned)) => frame = returned,
                Err(Err(_)) => unreachable!("push never sends Err"),
            }
        }
        state.queue.push_back(frame);
    }

    /// Fails every blocked consumer with a clone of `cause`.
    pub(crate) fn fail(&self, cause: &Error) {
        let consumers: Vec<_> = {
            let mut state = self.state.lock();
            state.consumers.drain(..).collect()
        };
        for tx in consumers {
            let _ = tx.send(Err(cause.clone()));
        }
    }

    pub(crate) fn clear(&self) {
        let mut state = self.state.lock();
        state.queue.clear();
        state.consumers.clear();
    }

    #[doc(hidden)]
    pub fn queued(&self) -> usize {
        self.state.lock().queue.len()
    }
}
