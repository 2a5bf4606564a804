//! Single-slot value broadcast.
//!
//! A [`ValueChannel`] republishes every value written to a slot. In replay
//! mode it also keeps the latest value, hands it to each new subscriber
//! first, and serves it as the slot's in-memory cache. In live mode new
//! subscribers only see values published after they subscribed.

use futures::Stream;
use parking_lot::Mutex;
use tokio::sync::broadcast::{self, error};
use tracing::warn;

use crate::error::TryRecvError;

enum Inner<T> {
    Replay {
        latest: Mutex<Option<T>>,
        tx: broadcast::Sender<Option<T>>,
    },
    Live {
        tx: broadcast::Sender<Option<T>>,
    },
}

/// Broadcast of `Option<T>` values with optional replay of the latest one.
///
/// Publishing never fails, including when nobody is subscribed.
pub struct ValueChannel<T> {
    inner: Inner<T>,
}

impl<T: Clone + Send + 'static> ValueChannel<T> {
    /// Create a channel; `replay` selects the replay-last variant.
    pub fn new(replay: bool, capacity: usize) -> Self {
        if replay {
            Self::replay(capacity)
        } else {
            Self::live(capacity)
        }
    }

    /// A channel that retains the latest value, initially absent.
    pub fn replay(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            inner: Inner::Replay {
                latest: Mutex::new(None),
                tx,
            },
        }
    }

    /// A forward-only channel.
    pub fn live(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            inner: Inner::Live { tx },
        }
    }

    pub fn is_replay(&self) -> bool {
        matches!(self.inner, Inner::Replay { .. })
    }

    /// Publish a value to every current subscriber.
    pub fn publish(&self, value: Option<T>) {
        match &self.inner {
            Inner::Replay { latest, tx } => {
                // Held across the send so a concurrent subscribe sees either
                // the old value plus this send, or the new value only.
                let mut guard = latest.lock();
                *guard = value.clone();
                let _ = tx.send(value);
            }
            Inner::Live { tx } => {
                let _ = tx.send(value);
            }
        }
    }

    /// Replace the retained value without notifying current subscribers.
    /// No-op in live mode.
    pub fn remember(&self, value: Option<T>) {
        if let Inner::Replay { latest, .. } = &self.inner {
            *latest.lock() = value;
        }
    }

    /// The retained value; always `None` in live mode.
    pub fn latest(&self) -> Option<T> {
        match &self.inner {
            Inner::Replay { latest, .. } => latest.lock().clone(),
            Inner::Live { .. } => None,
        }
    }

    /// Register a new subscriber. Dropping the subscription unsubscribes.
    pub fn subscribe(&self) -> Subscription<T> {
        match &self.inner {
            Inner::Replay { latest, tx } => {
                let guard = latest.lock();
                Subscription {
                    pending: Some(guard.clone()),
                    rx: tx.subscribe(),
                }
            }
            Inner::Live { tx } => Subscription {
                pending: None,
                rx: tx.subscribe(),
            },
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        match &self.inner {
            Inner::Replay { tx, .. } | Inner::Live { tx } => tx.receiver_count(),
        }
    }
}

/// One subscriber's view of a [`ValueChannel`].
pub struct Subscription<T> {
    pending: Option<Option<T>>,
    rx: broadcast::Receiver<Option<T>>,
}

impl<T: Clone + Send + 'static> Subscription<T> {
    /// Wait for the next value.
    ///
    /// Returns `None` once the owning slot has been dropped and every value
    /// published before that has been received.
    pub async fn recv(&mut self) -> Option<Option<T>> {
        if let Some(value) = self.pending.take() {
            return Some(value);
        }
        loop {
            match self.rx.recv().await {
                Ok(value) => return Some(value),
                Err(error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "slot subscriber lagged; skipping overwritten values");
                }
                Err(error::RecvError::Closed) => return None,
            }
        }
    }

    /// Take the next value if one is ready.
    pub fn try_recv(&mut self) -> Result<Option<T>, TryRecvError> {
        if let Some(value) = self.pending.take() {
            return Ok(value);
        }
        loop {
            match self.rx.try_recv() {
                Ok(value) => return Ok(value),
                Err(error::TryRecvError::Lagged(n)) => {
                    warn!(skipped = n, "slot subscriber lagged; skipping overwritten values");
                }
                Err(error::TryRecvError::Empty) => return Err(TryRecvError::Empty),
                Err(error::TryRecvError::Closed) => return Err(TryRecvError::Closed),
            }
        }
    }

    /// Adapt into a [`Stream`] that ends when the slot is dropped.
    pub fn into_stream(self) -> impl Stream<Item = Option<T>> {
        futures::stream::unfold(self, |mut sub| async move {
            sub.recv().await.map(|value| (value, sub))
        })
    }
}
