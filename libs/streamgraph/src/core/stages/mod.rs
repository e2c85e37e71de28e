// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Capability contracts for the three kinds of stage logic.

mod processor;
mod provider;
mod writer;

pub use processor::Processor;
pub use provider::{Provider, ReadMode};
pub use writer::Writer;
