// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;

use crate::core::{Result, StreamError};

/// Maximum number of buffered items a queue holds before `put` blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum QueueCapacity {
    Bounded(NonZeroUsize),
    #[default]
    Unbounded,
}

impl QueueCapacity {
    /// Bounded capacity, or `None` for zero.
    pub fn bounded(capacity: usize) -> Option<Self> {
        NonZeroUsize::new(capacity).map(Self::Bounded)
    }

    /// Interpret a signed configuration value: `-1` is the unbounded
    /// sentinel, positive values are bounded, anything else is rejected.
    pub fn from_signed(value: i64) -> Result<Self> {
        match value {
            -1 => Ok(Self::Unbounded),
            n if n > 0 => usize::try_from(n)
                .ok()
                .and_then(Self::bounded)
                .ok_or_else(|| {
                    StreamError::Configuration(format!("queue capacity {} is too large", n))
                }),
            n => Err(StreamError::Configuration(format!(
                "queue capacity must be positive or -1 (unbounded), got {}",
                n
            ))),
        }
    }

    /// Upper bound on occupancy, `None` when unbounded.
    pub fn limit(&self) -> Option<usize> {
        match self {
            Self::Bounded(n) => Some(n.get()),
            Self::Unbounded => None,
        }
    }

    /// True if a queue holding `len` items can accept one more.
    pub fn has_room(&self, len: usize) -> bool {
        match self {
            Self::Bounded(n) => len < n.get(),
            Self::Unbounded => true,
        }
    }
}

impl FromStr for QueueCapacity {
    type Err = StreamError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("unbounded") {
            return Ok(Self::Unbounded);
        }
        let n: i64 = s.parse().map_err(|_| {
            StreamError::Configuration(format!(
                "queue capacity must be an integer or 'unbounded', got '{}'",
                s
            ))
        })?;
        Self::from_signed(n)
    }
}

impl fmt::Display for QueueCapacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bounded(n) => write!(f, "{}", n),
            Self::Unbounded => write!(f, "unbounded"),
        }
    }
}
