// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

#![allow(clippy::type_complexity)] // Complex types are clear in context

// Re-export crossbeam_channel and serde_json for stage implementations
pub use crossbeam_channel;
pub use serde_json;

pub mod core;

pub use core::{
    init_tracing, ActivityEntry, ActivityObject, ActivityRepository, BackOff, BackOffStrategy,
    BoundedQueue, Completion, ConstantBackOff, Datum, ExponentialBackOff, GraphNode,
    InMemoryActivityRepository, LinearBackOff, LocalStream, MetricsSink, NodeId, NodeKind,
    NodeReport, ParallelismHint, Processor, Provider, QueueCapacity, QueueSnapshot, ReadMode,
    RepositoryProvider, RepositoryWriter, Result, RunId, RunReport, RuntimeStatus, StreamBuilder,
    StreamConfig, StreamError, StreamGraph, Take, TimeoutSupervisor, Writer,
};
