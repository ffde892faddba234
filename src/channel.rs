//! # Bounded FIFO channel between the Producer and the Consumer.
//!
//! [`BoundedChannel`] is a thin wrapper over [`tokio::sync::mpsc`] that keeps both halves
//! in one shared value and bounds every wait with a timeout.
//!
//! ```text
//! Producer ── put(item, timeout) ──► [ capacity N ] ── get(timeout) ──► Consumer
//!              └─ Err(Full(item)) after timeout      └─ Err(Empty) after timeout
//! ```
//!
//! ## Rules
//! - FIFO: the n-th successful `get` returns the n-th successful `put`.
//! - No peeking, no reordering, no duplication.
//! - A rejected `put` hands the item back inside [`ChannelError::Full`].
//! - The channel never closes while it is alive (it owns both halves).

use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio::time;

use crate::error::ChannelError;

/// Fixed-capacity FIFO buffer with timeout-bounded `put`/`get`.
///
/// Safe to share between one writer task and one reader task (or more).
#[derive(Debug)]
pub struct BoundedChannel<T> {
    tx: mpsc::Sender<T>,
    rx: Mutex<mpsc::Receiver<T>>,
}

impl<T: Send> BoundedChannel<T> {
    /// Creates a channel holding at most `capacity` items (clamped to a minimum of 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Self {
            tx,
            rx: Mutex::new(rx),
        }
    }

    /// Enqueues `item`, waiting up to `timeout` for free space.
    ///
    /// A zero timeout makes a single attempt.
    pub async fn put(&self, item: T, timeout: Duration) -> Result<(), ChannelError<T>> {
        if timeout.is_zero() {
            return self.tx.try_send(item).map_err(|e| match e {
                mpsc::error::TrySendError::Full(item) | mpsc::error::TrySendError::Closed(item) => {
                    ChannelError::Full(item)
                }
            });
        }
        match self.tx.send_timeout(item, timeout).await {
            Ok(()) => Ok(()),
            Err(mpsc::error::SendTimeoutError::Timeout(item))
            | Err(mpsc::error::SendTimeoutError::Closed(item)) => Err(ChannelError::Full(item)),
        }
    }

    /// Dequeues the oldest item, waiting up to `timeout` for one to arrive.
    pub async fn get(&self, timeout: Duration) -> Result<T, ChannelError<T>> {
        let recv = async {
            let mut rx = self.rx.lock().await;
            rx.recv().await
        };
        match time::timeout(timeout, recv).await {
            Ok(Some(item)) => Ok(item),
            Ok(None) | Err(_) => Err(ChannelError::Empty),
        }
    }

    /// Maximum number of buffered items.
    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    /// Number of buffered items.
    pub fn len(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    /// True if nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
