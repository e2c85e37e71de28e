// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use chrono::{DateTime, Utc};

use crate::core::{Datum, Result, StreamError};

/// Source of datums.
///
/// The provider worker calls one of the `read_*` methods in a loop; each call
/// returns the next batch of a lazy sequence, and an empty batch means nothing
/// is available yet. A finite provider reports exhaustion by returning `false`
/// from [`is_running`](Provider::is_running).
pub trait Provider: Send {
    /// Called once on the coordinator thread before any worker starts.
    fn setup(&mut self) -> Result<()> {
        Ok(())
    }

    /// Read whatever is currently available.
    fn read_current(&mut self) -> Result<Vec<Datum>>;

    /// Read items produced after `sequence`.
    fn read_new(&mut self, sequence: u64) -> Result<Vec<Datum>> {
        let _ = sequence;
        Err(StreamError::NotSupported(
            "provider does not support sequence reads".into(),
        ))
    }

    /// Read items timestamped within `[start, end]`.
    fn read_range(&mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Datum>> {
        let _ = (start, end);
        Err(StreamError::NotSupported(
            "provider does not support range reads".into(),
        ))
    }

    /// False once a finite provider has nothing further to emit.
    fn is_running(&self) -> bool {
        true
    }

    /// Called once on the provider's worker thread after its last read.
    fn teardown(&mut self) {}
}

/// How a provider node is driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// Finite: `read_current` until the provider stops running.
    Current,
    /// Finite: `read_new(sequence)` until the provider stops running.
    New { sequence: u64 },
    /// Finite: `read_range(start, end)` until the provider stops running.
    Range {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    /// Unbounded: `read_current` until stopped or the read timeout elapses.
    Perpetual,
}

impl ReadMode {
    /// Whether the provider's own `is_running` ends the stream.
    pub fn is_finite(&self) -> bool {
        !matches!(self, ReadMode::Perpetual)
    }

    pub(crate) fn read_from(&self, provider: &mut dyn Provider) -> Result<Vec<Datum>> {
        match *self {
            ReadMode::Current | ReadMode::Perpetual => provider.read_current(),
            ReadMode::New { sequence } => provider.read_new(sequence),
            ReadMode::Range { start, end } => provider.read_range(start, end),
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ReadMode::Current => "read-current",
            ReadMode::New { .. } => "read-new",
            ReadMode::Range { .. } => "read-range",
            ReadMode::Perpetual => "perpetual",
        }
    }
}
