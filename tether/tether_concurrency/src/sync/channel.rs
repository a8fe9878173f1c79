//! Bounded blocking channel for handing values between threads.
//!
//! A channel is a fixed-capacity ring buffer guarded by one mutex and two
//! condition variables (not-empty, not-full). Senders block while the buffer
//! is full, receivers block while it is empty, and `close` releases every
//! waiter. Values leave the channel in the order they entered it.
//!
//! Every state change happens under the lock, and the matching wake-up is
//! issued before the lock is released.

use log::{debug, trace};
use parking_lot::{Condvar, Mutex};
use std::collections::TryReserveError;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// A send rejected because the channel is closed.
///
/// Carries the value that was not enqueued.
#[derive(Error, PartialEq, Eq)]
#[error("sending on a closed channel")]
pub struct SendError<T>(pub T);

impl<T> SendError<T> {
    /// Recover the value that was not sent
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for SendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SendError").finish_non_exhaustive()
    }
}

/// Statistics about a channel
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ChannelStats {
    /// Number of slots in the ring buffer
    pub capacity: usize,

    /// Number of values currently buffered
    pub len: usize,

    /// Number of values accepted by `send`
    pub sent: u64,

    /// Number of values handed out by `receive`
    pub received: u64,

    /// Number of sends rejected because the channel was closed
    pub rejected: u64,

    /// Whether the channel has been closed
    pub closed: bool,
}

/// Ring buffer state, only ever touched under the channel lock
struct RingBuffer<T> {
    slots: Box<[Option<T>]>,
    read: usize,
    write: usize,
    len: usize,
    closed: bool,
    sent: u64,
    received: u64,
    rejected: u64,
}

impl<T> RingBuffer<T> {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            read: 0,
            write: 0,
            len: 0,
            closed: false,
            sent: 0,
            received: 0,
            rejected: 0,
        }
    }

    fn try_with_capacity(capacity: usize) -> Result<Self, TryReserveError> {
        let mut slots = Vec::new();
        slots.try_reserve_exact(capacity)?;
        slots.resize_with(capacity, || None);

        let mut ring = Self::with_capacity(0);
        ring.slots = slots.into_boxed_slice();
        Ok(ring)
    }

    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn push(&mut self, value: T) {
        debug_assert!(!self.is_full());
        self.slots[self.write] = Some(value);
        self.write = (self.write + 1) % self.capacity();
        self.len += 1;
        self.sent += 1;
    }

    fn pop(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }

        let value = self.slots[self.read].take();
        self.read = (self.read + 1) % self.capacity();
        self.len -= 1;
        self.received += 1;
        value
    }
}

/// A bounded, blocking, closable FIFO channel.
///
/// Any number of threads may send and receive concurrently; share the
/// channel with an [`Arc`].
///
/// # Examples
///
/// ```
/// use tether_concurrency::sync::Channel;
///
/// let channel = Channel::new(2);
/// channel.send(10).unwrap();
/// channel.send(20).unwrap();
/// channel.close();
///
/// assert_eq!(channel.receive(), Some(10));
/// assert_eq!(channel.receive(), Some(20));
/// assert_eq!(channel.receive(), None);
/// ```
pub struct Channel<T> {
    state: Mutex<RingBuffer<T>>,
    not_empty: Condvar,
    not_full: Condvar,
}

impl<T> Channel<T> {
    /// Create an open, empty channel holding up to `capacity` values.
    ///
    /// A capacity of zero is raised to one; the channel never behaves as an
    /// unbuffered rendezvous.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        debug!("Creating channel with capacity {}", capacity);

        Self {
            state: Mutex::new(RingBuffer::with_capacity(capacity)),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }

    /// Like [`Channel::new`], but reports a failed buffer allocation instead
    /// of aborting.
    pub fn try_new(capacity: usize) -> Result<Self, TryReserveError> {
        let capacity = capacity.max(1);
        let state = RingBuffer::try_with_capacity(capacity)?;
        debug!("Creating channel with capacity {}", capacity);

        Ok(Self {
            state: Mutex::new(state),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        })
    }

    /// Create a channel already wrapped for sharing between threads
    pub fn shared(capacity: usize) -> Arc<Self> {
        Arc::new(Self::new(capacity))
    }

    /// Append a value, blocking while the channel is full and open.
    ///
    /// If the channel is closed before a slot frees up, the value is not
    /// enqueued and comes back inside the error.
    pub fn send(&self, value: T) -> Result<(), SendError<T>> {
        let mut state = self.state.lock();

        while state.is_full() && !state.closed {
            self.not_full.wait(&mut state);
        }

        if state.closed {
            state.rejected += 1;
            trace!("Send rejected: channel closed");
            return Err(SendError(value));
        }

        state.push(value);
        trace!("Sent value ({}/{} buffered)", state.len, state.capacity());
        self.not_empty.notify_one();

        Ok(())
    }

    /// Take the oldest value, blocking while the channel is empty and open.
    ///
    /// Returns `None`, without blocking, once the channel is closed and
    /// drained. Values buffered before the close are still delivered.
    pub fn receive(&self) -> Option<T> {
        let mut state = self.state.lock();

        while state.is_empty() && !state.closed {
            self.not_empty.wait(&mut state);
        }

        let value = state.pop()?;
        trace!("Received value ({}/{} buffered)", state.len, state.capacity());
        self.not_full.notify_one();

        Some(value)
    }

    /// Close the channel and wake every blocked sender and receiver.
    ///
    /// Closing is permanent and idempotent. Returns `true` if this call
    /// performed the transition.
    pub fn close(&self) -> bool {
        let mut state = self.state.lock();
        let newly_closed = !state.closed;
        state.closed = true;

        self.not_empty.notify_all();
        self.not_full.notify_all();

        if newly_closed {
            debug!("Channel closed with {} value(s) buffered", state.len);
        }

        newly_closed
    }

    /// Whether at least one value is buffered (non-blocking snapshot)
    pub fn has_data(&self) -> bool {
        !self.state.lock().is_empty()
    }

    /// Whether the channel has been closed (non-blocking snapshot)
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Number of values currently buffered
    pub fn len(&self) -> usize {
        self.state.lock().len
    }

    /// Whether no values are buffered
    pub fn is_empty(&self) -> bool {
        !self.has_data()
    }

    /// Maximum number of buffered values
    pub fn capacity(&self) -> usize {
        self.state.lock().capacity()
    }

    /// Get current statistics for this channel
    pub fn stats(&self) -> ChannelStats {
        let state = self.state.lock();
        ChannelStats {
            capacity: state.capacity(),
            len: state.len,
            sent: state.sent,
            received: state.received,
            rejected: state.rejected,
            closed: state.closed,
        }
    }

    /// Iterate over received values until the channel is closed and drained
    pub fn iter(&self) -> Iter<'_, T> {
        Iter { channel: self }
    }
}

impl<T> fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Channel")
            .field("capacity", &state.capacity())
            .field("len", &state.len)
            .field("closed", &state.closed)
            .finish()
    }
}

/// Blocking iterator returned by [`Channel::iter`]
pub struct Iter<'a, T> {
    channel: &'a Channel<T>,
}

impl<T> Iterator for Iter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.channel.receive()
    }
}

impl<'a, T> IntoIterator for &'a Channel<T> {
    type Item = T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}
