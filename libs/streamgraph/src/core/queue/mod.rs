// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

mod bounded_queue;
mod capacity;

pub use bounded_queue::{BoundedQueue, QueueCounters, Take};
pub use capacity::QueueCapacity;
