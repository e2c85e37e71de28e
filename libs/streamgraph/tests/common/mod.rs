//! Test stages shared by the integration tests.
//!
//! Every stage keeps its counters behind an `Arc` so the test can read them
//! after the stream has consumed the stage itself.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use streamgraph::{Datum, Processor, Provider, Result, Writer};

pub fn init() {
    streamgraph::init_tracing();
}

/// Live OS threads in this process, read from `/proc/self/status`.
#[cfg(target_os = "linux")]
pub fn os_thread_count() -> usize {
    std::fs::read_to_string("/proc/self/status")
        .unwrap()
        .lines()
        .find_map(|line| line.strip_prefix("Threads:"))
        .and_then(|count| count.trim().parse().ok())
        .unwrap()
}

/// Poll until at most `limit` OS threads remain or `within` elapses.
#[cfg(target_os = "linux")]
pub fn settle_os_threads(limit: usize, within: Duration) -> usize {
    let deadline = Instant::now() + within;
    loop {
        let count = os_thread_count();
        if count <= limit || Instant::now() >= deadline {
            return count;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
}

// =============================================================================
// Providers
// =============================================================================

/// Finite provider emitting `0..total` in small batches.
pub struct NumericProvider {
    next: u64,
    total: u64,
    batch: u64,
}

impl NumericProvider {
    pub fn new(total: u64) -> Self {
        Self {
            next: 0,
            total,
            batch: 64,
        }
    }
}

impl Provider for NumericProvider {
    fn read_current(&mut self) -> Result<Vec<Datum>> {
        let end = (self.next + self.batch).min(self.total);
        let batch = (self.next..end)
            .map(|n| Datum::new(n).with_id(n.to_string()).with_sequence_id(n))
            .collect();
        self.next = end;
        Ok(batch)
    }

    fn is_running(&self) -> bool {
        self.next < self.total
    }
}

/// Perpetual provider that never runs dry.
pub struct TickingProvider {
    next: u64,
}

impl TickingProvider {
    pub fn new() -> Self {
        Self { next: 0 }
    }
}

impl Provider for TickingProvider {
    fn read_current(&mut self) -> Result<Vec<Datum>> {
        let start = self.next;
        self.next += 8;
        Ok((start..self.next)
            .map(|n| Datum::new(n).with_id(n.to_string()))
            .collect())
    }
}

/// Provider that never yields anything.
pub struct EmptyProvider;

impl Provider for EmptyProvider {
    fn read_current(&mut self) -> Result<Vec<Datum>> {
        Ok(Vec::new())
    }
}

// =============================================================================
// Processors
// =============================================================================

/// Passes datums through, counting them.
pub struct CountingProcessor {
    count: Arc<AtomicU64>,
}

impl CountingProcessor {
    pub fn new() -> (Self, Arc<AtomicU64>) {
        let count = Arc::new(AtomicU64::new(0));
        (
            Self {
                count: count.clone(),
            },
            count,
        )
    }
}

impl Processor for CountingProcessor {
    fn process(&self, datum: Datum) -> Result<Vec<Datum>> {
        self.count.fetch_add(1, Ordering::SeqCst);
        Ok(vec![datum])
    }
}

/// Passes datums through after sleeping.
pub struct SlowProcessor {
    delay: Duration,
}

impl SlowProcessor {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Processor for SlowProcessor {
    fn process(&self, datum: Datum) -> Result<Vec<Datum>> {
        std::thread::sleep(self.delay);
        Ok(vec![datum])
    }
}

// =============================================================================
// Writers
// =============================================================================

#[derive(Default)]
pub struct Collected {
    pub count: AtomicU64,
    pub ids: Mutex<HashSet<String>>,
}

impl Collected {
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::SeqCst)
    }

    pub fn distinct(&self) -> usize {
        self.ids.lock().len()
    }
}

/// Records every datum identity it sees.
pub struct CollectingWriter {
    collected: Arc<Collected>,
}

impl CollectingWriter {
    pub fn new() -> (Self, Arc<Collected>) {
        let collected = Arc::new(Collected::default());
        (
            Self {
                collected: collected.clone(),
            },
            collected,
        )
    }
}

impl Writer for CollectingWriter {
    fn write(&self, datum: Datum) -> Result<()> {
        self.collected.count.fetch_add(1, Ordering::SeqCst);
        self.collected.ids.lock().insert(datum.identity());
        Ok(())
    }
}
