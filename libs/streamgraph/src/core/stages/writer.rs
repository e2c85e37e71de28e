// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use crate::core::{Datum, Result};

/// Terminal stage: consumes a datum for its side effect.
///
/// Shared by every worker of the node, like [`Processor`](crate::core::Processor).
pub trait Writer: Send + Sync {
    fn setup(&self) -> Result<()> {
        Ok(())
    }

    fn write(&self, datum: Datum) -> Result<()>;

    fn teardown(&self) {}
}

impl<F> Writer for F
where
    F: Fn(Datum) -> Result<()> + Send + Sync,
{
    fn write(&self, datum: Datum) -> Result<()> {
        self(datum)
    }
}
