// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

pub mod backoff;
pub mod config;
pub mod datum;
pub mod error;
pub(crate) mod executor;
pub mod graph;
pub mod logging;
pub mod observability;
pub mod persistence;
pub mod queue;
pub mod runtime;
pub mod stages;
pub mod timeout;

pub use backoff::*;
pub use config::*;
pub use datum::*;
pub use error::*;
pub use graph::*;
pub use logging::*;
pub use observability::*;
pub use persistence::*;
pub use queue::*;
pub use runtime::*;
pub use stages::*;
pub use timeout::*;
