//! Key-keyed pending-callback queue
//!
//! Buffers callbacks until a consumer is ready to serve them. While the
//! queue is in serving mode callbacks are invoked immediately, so anything
//! enqueued by a flush is itself flushed without extra bookkeeping.

use std::collections::VecDeque;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Mutex;
use tokio::sync::oneshot;
use tracing::trace;

type Callback = Box<dyn FnOnce() + Send>;

struct QueueInner<K> {
    serving: bool,
    entries: VecDeque<(K, Callback)>,
    flush_waiters: Vec<oneshot::Sender<()>>,
}

/// A key-keyed store of pending callbacks with a serving flag.
///
/// At most one callback is held per key; enqueueing under an occupied key
/// replaces the previous callback.
pub struct RequestQueue<K> {
    inner: Mutex<QueueInner<K>>,
}

impl<K: Eq + Hash + Copy + Debug> RequestQueue<K> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                serving: false,
                entries: VecDeque::new(),
                flush_waiters: Vec::new(),
            }),
        }
    }

    /// Invoke `callback` immediately when serving, otherwise store it under
    /// `key`, replacing any previously queued callback for that key.
    pub fn enqueue(&self, key: K, callback: impl FnOnce() + Send + 'static) {
        let run_now = {
            let mut inner = self.lock();
            if inner.serving {
                true
            } else {
                inner.entries.retain(|(k, _)| *k != key);
                inner.entries.push_back((key, Box::new(callback)));
                trace!(?key, pending = inner.entries.len(), "request queued");
                return;
            }
        };
        if run_now {
            callback();
        }
    }

    /// Invoke and remove the callback queued under `key`, if any.
    pub fn serve(&self, key: K) {
        let callback = {
            let mut inner = self.lock();
            let index = inner.entries.iter().position(|(k, _)| *k == key);
            index.and_then(|i| inner.entries.remove(i))
        };
        if let Some((_, callback)) = callback {
            callback();
        }
    }

    /// Flip into serving mode and flush queued callbacks in insertion
    /// order. Callbacks enqueued during the flush run immediately.
    pub fn start(&self) {
        {
            let mut inner = self.lock();
            inner.serving = true;
        }
        loop {
            let next = {
                let mut inner = self.lock();
                inner.entries.pop_front()
            };
            match next {
                Some((_, callback)) => callback(),
                None => break,
            }
        }
        self.release_waiters();
    }

    /// Flip out of serving mode without touching queued entries.
    pub fn stop(&self) {
        self.lock().serving = false;
    }

    /// Stop, discard all entries, and release pending flush waiters.
    pub fn reset(&self) {
        {
            let mut inner = self.lock();
            inner.serving = false;
            inner.entries.clear();
        }
        self.release_waiters();
    }

    /// Resolves the next time `start()` or `reset()` executes.
    pub fn wait_for_flush(&self) -> impl std::future::Future<Output = ()> {
        let (tx, rx) = oneshot::channel();
        self.lock().flush_waiters.push(tx);
        async move {
            let _ = rx.await;
        }
    }

    pub fn is_serving(&self) -> bool {
        self.lock().serving
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    fn release_waiters(&self) {
        let waiters = std::mem::take(&mut self.lock().flush_waiters);
        for waiter in waiters {
            let _ = waiter.send(());
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, QueueInner<K>> {
        // Callbacks are never invoked under the lock, so the only way to
        // poison it is a panic inside the queue itself.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<K: Eq + Hash + Copy + Debug> Default for RequestQueue<K> {
    fn default() -> Self {
        Self::new()
    }
}
