// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Point-in-time snapshot types for queue observation.

use serde::{Deserialize, Serialize};

use crate::core::NodeId;

/// Point-in-time snapshot of one node's inbound queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    /// Node that owns the queue.
    pub node_id: NodeId,
    /// Current queue depth.
    pub depth: usize,
    /// Queue capacity, `None` when unbounded.
    pub capacity: Option<usize>,
    /// Datums ever put on the queue.
    pub total_put: u64,
    /// Datums ever taken from the queue.
    pub total_taken: u64,
    /// Take rate since the previous snapshot of this queue.
    pub throughput_per_sec: f64,
}

impl QueueSnapshot {
    /// Fraction of capacity in use; always 0 for unbounded queues.
    pub fn fill_ratio(&self) -> f64 {
        match self.capacity {
            Some(capacity) if capacity > 0 => self.depth as f64 / capacity as f64,
            _ => 0.0,
        }
    }

    /// A bounded queue at capacity is exerting backpressure on its producers.
    pub fn is_saturated(&self) -> bool {
        matches!(self.capacity, Some(capacity) if self.depth >= capacity)
    }
}

/// Receives queue snapshots while a stream runs.
///
/// Called from the coordinator thread once per metrics interval and once more
/// when the run ends. Registration with any external metrics system is the
/// implementor's concern.
pub trait MetricsSink: Send + Sync {
    fn record(&self, snapshot: &QueueSnapshot);

    /// Called after every queue of one tick has been recorded.
    fn flush(&self) {}
}

impl<F> MetricsSink for F
where
    F: Fn(&QueueSnapshot) + Send + Sync,
{
    fn record(&self, snapshot: &QueueSnapshot) {
        self(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(depth: usize, capacity: Option<usize>) -> QueueSnapshot {
        QueueSnapshot {
            node_id: NodeId::parse("w").unwrap(),
            depth,
            capacity,
            total_put: 10,
            total_taken: 10u64.saturating_sub(depth as u64),
            throughput_per_sec: 0.0,
        }
    }

    #[test]
    fn test_saturation() {
        assert!(snapshot(4, Some(4)).is_saturated());
        assert!(!snapshot(3, Some(4)).is_saturated());
        assert!(!snapshot(1_000, None).is_saturated());
        assert_eq!(snapshot(2, Some(4)).fill_ratio(), 0.5);
    }

    #[test]
    fn test_snapshot_serializes_node_id_as_string() {
        let json = serde_json::to_value(snapshot(1, None)).unwrap();
        assert_eq!(json["node_id"], "w");
        assert!(json["capacity"].is_null());
    }
}
