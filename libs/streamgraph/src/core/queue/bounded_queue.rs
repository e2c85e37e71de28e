// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Blocking FIFO shared by all workers of one node.
//!
//! Every non-provider node owns exactly one inbound queue. All upstream
//! workers put into it and all of the node's workers compete to take from
//! it, so each item is handled by exactly one worker.
//!
//! Closing is driven by producer registration: each upstream worker is a
//! registered producer and releases its registration when it exits. The queue
//! closes once the last producer is gone, after which buffered items can
//! still be taken and `take` reports [`Take::Closed`] once drained.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use super::QueueCapacity;
use crate::core::{Result, StreamError};

/// Outcome of a take.
#[derive(Debug, PartialEq, Eq)]
pub enum Take<T> {
    /// Next item in FIFO order.
    Item(T),
    /// The wait bound elapsed with nothing available. The queue is still open.
    TimedOut,
    /// Closed and drained: no item will ever arrive.
    Closed,
}

/// Cumulative queue counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueCounters {
    pub total_put: u64,
    pub total_taken: u64,
    /// Items thrown away by [`BoundedQueue::abort`].
    pub discarded: u64,
}

struct QueueState<T> {
    items: VecDeque<T>,
    producers: usize,
    closed: bool,
}

pub struct BoundedQueue<T> {
    name: String,
    capacity: QueueCapacity,
    state: Mutex<QueueState<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    total_put: AtomicU64,
    total_taken: AtomicU64,
    discarded: AtomicU64,
}

impl<T> BoundedQueue<T> {
    pub fn new(name: impl Into<String>, capacity: QueueCapacity) -> Self {
        let items = match capacity.limit() {
            Some(limit) => VecDeque::with_capacity(limit.min(1024)),
            None => VecDeque::new(),
        };
        Self {
            name: name.into(),
            capacity,
            state: Mutex::new(QueueState {
                items,
                producers: 0,
                closed: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            total_put: AtomicU64::new(0),
            total_taken: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
        }
    }

    pub fn unbounded(name: impl Into<String>) -> Self {
        Self::new(name, QueueCapacity::Unbounded)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> QueueCapacity {
        self.capacity
    }

    /// Append an item, blocking while the queue is full.
    ///
    /// Fails with [`StreamError::QueueClosed`] if the queue is closed before
    /// or while waiting; the item is dropped in that case.
    pub fn put(&self, item: T) -> Result<()> {
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return Err(StreamError::QueueClosed(self.name.clone()));
            }
            if self.capacity.has_room(state.items.len()) {
                state.items.push_back(item);
                self.total_put.fetch_add(1, Ordering::Relaxed);
                self.not_empty.notify_one();
                return Ok(());
            }
            self.not_full.wait(&mut state);
        }
    }

    /// Take the next item, blocking until one arrives or the queue closes.
    pub fn take(&self) -> Take<T> {
        self.take_timeout(None)
    }

    /// Take the next item, waiting at most `timeout` (`None` waits forever).
    pub fn take_timeout(&self, timeout: Option<Duration>) -> Take<T> {
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
        let mut state = self.state.lock();
        loop {
            if let Some(item) = state.items.pop_front() {
                self.total_taken.fetch_add(1, Ordering::Relaxed);
                self.not_full.notify_one();
                return Take::Item(item);
            }
            if state.closed {
                return Take::Closed;
            }
            match deadline {
                None => self.not_empty.wait(&mut state),
                Some(deadline) => {
                    if self.not_empty.wait_until(&mut state, deadline).timed_out() {
                        // A put may have raced the timeout.
                        if let Some(item) = state.items.pop_front() {
                            self.total_taken.fetch_add(1, Ordering::Relaxed);
                            self.not_full.notify_one();
                            return Take::Item(item);
                        }
                        return if state.closed {
                            Take::Closed
                        } else {
                            Take::TimedOut
                        };
                    }
                }
            }
        }
    }

    /// Stop accepting puts. Buffered items remain takeable.
    pub fn close(&self) {
        let mut state = self.state.lock();
        if !state.closed {
            state.closed = true;
            tracing::trace!("[{}] Queue closed with {} buffered", self.name, state.items.len());
        }
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    /// Close and discard everything buffered, waking every blocked caller.
    ///
    /// Returns the number of items discarded.
    pub fn abort(&self) -> usize {
        let mut state = self.state.lock();
        state.closed = true;
        let dropped = state.items.len();
        state.items.clear();
        self.discarded.fetch_add(dropped as u64, Ordering::Relaxed);
        self.not_empty.notify_all();
        self.not_full.notify_all();
        dropped
    }

    /// Register `count` producers that will each call
    /// [`release_producer`](Self::release_producer) when finished.
    pub fn register_producers(&self, count: usize) {
        self.state.lock().producers += count;
    }

    /// Release one producer registration; the last release closes the queue.
    pub fn release_producer(&self) {
        let mut state = self.state.lock();
        state.producers = state.producers.saturating_sub(1);
        if state.producers == 0 && !state.closed {
            state.closed = true;
            tracing::trace!(
                "[{}] Last producer released, queue closed with {} buffered",
                self.name,
                state.items.len()
            );
            self.not_empty.notify_all();
            self.not_full.notify_all();
        }
    }

    /// Number of producers still registered.
    pub fn producers(&self) -> usize {
        self.state.lock().producers
    }

    /// Current occupancy.
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Closed with nothing left to take.
    pub fn is_drained(&self) -> bool {
        let state = self.state.lock();
        state.closed && state.items.is_empty()
    }

    pub fn counters(&self) -> QueueCounters {
        QueueCounters {
            total_put: self.total_put.load(Ordering::Relaxed),
            total_taken: self.total_taken.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
        }
    }
}

impl<T> std::fmt::Debug for BoundedQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("BoundedQueue")
            .field("name", &self.name)
            .field("capacity", &self.capacity)
            .field("len", &state.items.len())
            .field("producers", &state.producers)
            .field("closed", &state.closed)
            .finish()
    }
}
