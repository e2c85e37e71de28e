// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Optional queue monitoring for a running stream.

mod monitor;
mod snapshots;

pub(crate) use monitor::QueueMonitor;
pub use monitor::ThroughputTracker;
pub use snapshots::{MetricsSink, QueueSnapshot};
