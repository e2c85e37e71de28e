// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use crate::core::{Datum, Result};

/// Transforms one datum into zero or more datums.
///
/// A single instance is shared by every worker of the node, so `process`
/// takes `&self`; keep any mutable state behind atomics or locks.
pub trait Processor: Send + Sync {
    fn setup(&self) -> Result<()> {
        Ok(())
    }

    fn process(&self, datum: Datum) -> Result<Vec<Datum>>;

    fn teardown(&self) {}
}

impl<F> Processor for F
where
    F: Fn(Datum) -> Result<Vec<Datum>> + Send + Sync,
{
    fn process(&self, datum: Datum) -> Result<Vec<Datum>> {
        self(datum)
    }
}
