//! Change notification.
//!
//! A [`Subject`] fans an "it changed" signal out to callback subscribers and
//! to async watchers. Each emit bumps a generation counter; watchers only
//! see the latest generation, so a burst of emits wakes them once.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::watch;

/// Handle returned by [`Subject::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback = Arc<dyn Fn(u64) + Send + Sync>;

#[derive(Clone)]
pub struct Subject {
    inner: Arc<SubjectInner>,
}

struct SubjectInner {
    next_id: AtomicU64,
    subscribers: Mutex<Vec<(SubscriptionId, Callback)>>,
    generation: watch::Sender<u64>,
}

impl Subject {
    pub fn new() -> Self {
        let (generation, _) = watch::channel(0);
        Self { inner: Arc::new(SubjectInner { next_id: AtomicU64::new(1), subscribers: Mutex::new(Vec::new()), generation }) }
    }

    /// Register a callback invoked with the new generation on every emit.
    pub fn subscribe(&self, callback: impl Fn(u64) + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner.subscribers.lock().push((id, Arc::new(callback)));
        id
    }

    /// Remove a callback. Returns whether it was registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.inner.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        subscribers.len() != before
    }

    /// Signal a change.
    ///
    /// Callbacks run on the emitting thread after the subscriber list lock is
    /// released, so a callback may subscribe or unsubscribe.
    pub fn emit(&self) -> u64 {
        let mut generation = 0;
        self.inner.generation.send_modify(|g| {
            *g += 1;
            generation = *g;
        });

        let callbacks: Vec<Callback> = self.inner.subscribers.lock().iter().map(|(_, cb)| cb.clone()).collect();
        for callback in callbacks {
            callback(generation);
        }
        generation
    }

    /// Current generation (number of emits so far).
    pub fn generation(&self) -> u64 {
        *self.inner.generation.borrow()
    }

    /// Async receiver that resolves `changed()` after the next emit.
    pub fn watch(&self) -> watch::Receiver<u64> {
        self.inner.generation.subscribe()
    }
}

impl Default for Subject {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subject")
            .field("generation", &self.generation())
            .field("subscribers", &self.inner.subscribers.lock().len())
            .finish()
    }
}
