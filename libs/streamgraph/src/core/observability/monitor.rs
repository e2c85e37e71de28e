// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use super::QueueSnapshot;
use crate::core::{BoundedQueue, Datum, NodeId};

/// Turns cumulative take counts into a per-second rate.
#[derive(Debug, Clone)]
pub struct ThroughputTracker {
    last_sample: Instant,
    last_total: u64,
}

impl ThroughputTracker {
    pub fn new(initial_total: u64) -> Self {
        Self {
            last_sample: Instant::now(),
            last_total: initial_total,
        }
    }

    /// Rate since the previous sample. Zero for a sample taken immediately
    /// after the previous one.
    pub fn sample(&mut self, total: u64) -> f64 {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_sample).as_secs_f64();
        let delta = total.saturating_sub(self.last_total);
        self.last_sample = now;
        self.last_total = total;
        if elapsed > 0.0 {
            delta as f64 / elapsed
        } else {
            0.0
        }
    }
}

/// Samples every inbound queue of a run.
pub(crate) struct QueueMonitor {
    queues: Vec<(NodeId, Arc<BoundedQueue<Datum>>)>,
    trackers: Mutex<HashMap<NodeId, ThroughputTracker>>,
}

impl QueueMonitor {
    pub fn new(queues: Vec<(NodeId, Arc<BoundedQueue<Datum>>)>) -> Self {
        let trackers = queues
            .iter()
            .map(|(id, queue)| (id.clone(), ThroughputTracker::new(queue.counters().total_taken)))
            .collect();
        Self {
            queues,
            trackers: Mutex::new(trackers),
        }
    }

    pub fn snapshots(&self) -> Vec<QueueSnapshot> {
        let mut trackers = self.trackers.lock();
        self.queues
            .iter()
            .map(|(id, queue)| {
                let counters = queue.counters();
                let throughput_per_sec = trackers
                    .entry(id.clone())
                    .or_insert_with(|| ThroughputTracker::new(counters.total_taken))
                    .sample(counters.total_taken);
                QueueSnapshot {
                    node_id: id.clone(),
                    depth: queue.len(),
                    capacity: queue.capacity().limit(),
                    total_put: counters.total_put,
                    total_taken: counters.total_taken,
                    throughput_per_sec,
                }
            })
            .collect()
    }

    pub fn queues(&self) -> impl Iterator<Item = &(NodeId, Arc<BoundedQueue<Datum>>)> {
        self.queues.iter()
    }
}
