// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::sync::Arc;

use crate::core::{BoundedQueue, Datum, Result};

/// Put an independent copy of `datum` on every outbound queue.
///
/// All but the last queue receive a deep clone; the last takes the original.
/// Blocks on full queues, and fails once any queue has been aborted.
pub(crate) fn fan_out(datum: Datum, outbound: &[Arc<BoundedQueue<Datum>>]) -> Result<()> {
    let Some((last, rest)) = outbound.split_last() else {
        return Ok(());
    };
    for queue in rest {
        queue.put(datum.clone())?;
    }
    last.put(datum)
}
