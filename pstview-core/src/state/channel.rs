//! StateChannel: a last-value-cached, multi-subscriber broadcast slot.
//!
//! `next` stores the value and delivers it synchronously to every subscriber
//! registered at that moment, in subscription order. `subscribe` replays the
//! current value to the new subscriber before it can observe any later update.
//!
//! Deliveries go through a per-channel FIFO queue. A `next` issued from inside
//! a subscriber callback is queued and delivered once the running delivery has
//! finished, so callbacks may publish to the channel they observe.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::trace;

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

enum Delivery<T> {
    /// Broadcast to the subscribers registered when `next` was called.
    Broadcast { value: T, targets: Vec<u64> },
    /// Initial replay of the current value to one new subscriber.
    Replay { id: u64, value: T },
}

struct Inner<T> {
    value: T,
    subscribers: Vec<(u64, Callback<T>)>,
    pending: VecDeque<Delivery<T>>,
    delivering: bool,
    next_id: u64,
    disposed: bool,
}

impl<T> Inner<T> {
    fn callback(&self, id: u64) -> Option<Callback<T>> {
        self.subscribers
            .iter()
            .find(|(sid, _)| *sid == id)
            .map(|(_, cb)| cb.clone())
    }
}

pub struct StateChannel<T> {
    name: &'static str,
    inner: Arc<Mutex<Inner<T>>>,
}

impl<T> Clone for StateChannel<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + Send + 'static> StateChannel<T> {
    pub fn new(name: &'static str, initial: T) -> Self {
        Self {
            name,
            inner: Arc::new(Mutex::new(Inner {
                value: initial,
                subscribers: Vec::new(),
                pending: VecDeque::new(),
                delivering: false,
                next_id: 0,
                disposed: false,
            })),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Current value.
    pub fn value(&self) -> T {
        self.lock().value.clone()
    }

    pub fn next(&self, value: T) {
        let mut inner = self.lock();
        if inner.disposed {
            trace!(channel = self.name, "next on disposed channel ignored");
            return;
        }
        inner.value = value.clone();
        let targets = inner.subscribers.iter().map(|(id, _)| *id).collect();
        inner.pending.push_back(Delivery::Broadcast { value, targets });
        self.drain(inner);
    }

    /// Register `callback`; it immediately receives the current value.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let mut inner = self.lock();
        if inner.disposed {
            return Subscription::inactive();
        }
        let id = inner.next_id;
        inner.next_id += 1;
        inner.subscribers.push((id, Arc::new(callback)));
        let value = inner.value.clone();
        inner.pending.push_back(Delivery::Replay { id, value });

        let weak: Weak<Mutex<Inner<T>>> = Arc::downgrade(&self.inner);
        let name = self.name;
        let sub = Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                let mut inner = inner.lock().unwrap_or_else(PoisonError::into_inner);
                inner.subscribers.retain(|(sid, _)| *sid != id);
                trace!(channel = name, id, "unsubscribed");
            }
        });
        self.drain(inner);
        sub
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    /// Drop every subscriber and stop accepting updates.
    pub fn dispose(&self) {
        let mut inner = self.lock();
        inner.disposed = true;
        inner.subscribers.clear();
        inner.pending.clear();
    }

    pub fn is_disposed(&self) -> bool {
        self.lock().disposed
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Deliver queued updates in order. Only one caller drains at a time; a
    /// re-entrant caller just leaves its delivery in the queue.
    fn drain<'a>(&'a self, mut inner: MutexGuard<'a, Inner<T>>) {
        if inner.delivering {
            return;
        }
        inner.delivering = true;
        while let Some(delivery) = inner.pending.pop_front() {
            match delivery {
                Delivery::Replay { id, value } => {
                    let cb = inner.callback(id);
                    drop(inner);
                    if let Some(cb) = cb {
                        cb(&value);
                    }
                    inner = self.lock();
                }
                Delivery::Broadcast { value, targets } => {
                    for id in targets {
                        // Look the subscriber up again: an earlier callback may
                        // have unsubscribed it.
                        let cb = inner.callback(id);
                        drop(inner);
                        if let Some(cb) = cb {
                            cb(&value);
                        }
                        inner = self.lock();
                    }
                }
            }
        }
        inner.delivering = false;
    }
}

/// Handle returned by [`StateChannel::subscribe`]. Dropping it does not
/// unsubscribe; call [`Subscription::unsubscribe`].
pub struct Subscription {
    active: AtomicBool,
    cancel: Option<Box<dyn Fn() + Send + Sync>>,
}

impl Subscription {
    fn new(cancel: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            active: AtomicBool::new(true),
            cancel: Some(Box::new(cancel)),
        }
    }

    fn inactive() -> Self {
        Self {
            active: AtomicBool::new(false),
            cancel: None,
        }
    }

    /// Remove the subscriber. Further calls are no-ops.
    pub fn unsubscribe(&self) {
        if self.active.swap(false, Ordering::AcqRel) {
            if let Some(cancel) = &self.cancel {
                cancel();
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}
