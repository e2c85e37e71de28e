// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::RunId;
use crate::core::{NodeId, NodeKind};

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Completion {
    /// Every provider exhausted and every queue drained.
    Natural,
    /// `stop()` was called and buffered datums drained within the shutdown timeout.
    Stopped,
    /// The shutdown timeout elapsed; buffered datums were discarded.
    Forced,
}

/// Counters for one node over a whole run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeReport {
    pub node_id: NodeId,
    pub kind: NodeKind,
    pub parallelism: usize,
    /// Datums taken from the inbound queue. Always 0 for providers.
    pub received: u64,
    /// Datums produced, counted once regardless of fan-out.
    pub emitted: u64,
    /// Datums dropped because stage logic failed.
    pub failed: u64,
}

/// Summary returned by [`LocalStream::start`](super::LocalStream::start).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub completion: Completion,
    pub elapsed: Duration,
    /// Datums thrown away from queues at a forced shutdown.
    pub discarded: u64,
    /// In topological order.
    pub nodes: Vec<NodeReport>,
}

impl RunReport {
    pub fn node(&self, id: &str) -> Option<&NodeReport> {
        self.nodes.iter().find(|n| n.node_id == id)
    }

    pub fn received(&self, id: &str) -> u64 {
        self.node(id).map_or(0, |n| n.received)
    }

    pub fn emitted(&self, id: &str) -> u64 {
        self.node(id).map_or(0, |n| n.emitted)
    }

    pub fn total_failed(&self) -> u64 {
        self.nodes.iter().map(|n| n.failed).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_lookup() {
        let report = RunReport {
            run_id: RunId::new(),
            completion: Completion::Natural,
            elapsed: Duration::from_millis(5),
            discarded: 0,
            nodes: vec![NodeReport {
                node_id: NodeId::parse("w").unwrap(),
                kind: NodeKind::Writer,
                parallelism: 2,
                received: 7,
                emitted: 0,
                failed: 1,
            }],
        };
        assert_eq!(report.received("w"), 7);
        assert_eq!(report.received("missing"), 0);
        assert_eq!(report.total_failed(), 1);
    }
}
