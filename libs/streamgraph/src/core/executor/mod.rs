// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Per-node worker pools.

mod counters;
mod fan_out;
mod pool;
mod signals;
mod thread_runner;

pub(crate) use counters::NodeCounters;
pub(crate) use fan_out::fan_out;
pub(crate) use pool::{spawn_worker, WorkerExit, WorkerGuard};
pub(crate) use signals::RunSignals;
pub(crate) use thread_runner::{run_consumer_loop, run_provider_loop, ConsumerStage, WorkerContext};
