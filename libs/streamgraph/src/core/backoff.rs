// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Retry pacing for stages that call flaky external systems.
//!
//! The scheduler never backs off on its own. Providers and writers that talk
//! to a backend hold a [`BackOff`] and call [`BackOff::back_off`] after each
//! failed call.

use std::time::Duration;

use crate::core::{Result, StreamError};

/// Delay calculation for the `attempt`-th consecutive failure (1-based).
pub trait BackOffStrategy: Send + Sync {
    fn next_delay(&self, attempt: u32) -> Duration;

    /// Attempts allowed before giving up. `None` retries forever.
    fn max_attempts(&self) -> Option<u32> {
        None
    }
}

/// `round(base ^ attempt)` seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialBackOff {
    base_secs: u64,
    max_attempts: Option<u32>,
}

impl ExponentialBackOff {
    pub fn new(base_secs: u64) -> Self {
        Self {
            base_secs,
            max_attempts: None,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }
}

impl BackOffStrategy for ExponentialBackOff {
    fn next_delay(&self, attempt: u32) -> Duration {
        let secs = (self.base_secs as f64).powi(attempt as i32).round();
        if secs.is_finite() && secs < u64::MAX as f64 {
            Duration::from_secs(secs as u64)
        } else {
            Duration::MAX
        }
    }

    fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }
}

/// `base * attempt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearBackOff {
    base: Duration,
    max_attempts: Option<u32>,
}

impl LinearBackOff {
    pub fn new(base: Duration) -> Self {
        Self {
            base,
            max_attempts: None,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }
}

impl BackOffStrategy for LinearBackOff {
    fn next_delay(&self, attempt: u32) -> Duration {
        self.base.saturating_mul(attempt)
    }

    fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }
}

/// Same delay every time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantBackOff {
    delay: Duration,
    max_attempts: Option<u32>,
}

impl ConstantBackOff {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            max_attempts: None,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }
}

impl BackOffStrategy for ConstantBackOff {
    fn next_delay(&self, _attempt: u32) -> Duration {
        self.delay
    }

    fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }
}

/// Tracks consecutive failures against a strategy.
#[derive(Debug)]
pub struct BackOff<S> {
    strategy: S,
    attempts: u32,
}

impl<S: BackOffStrategy> BackOff<S> {
    pub fn new(strategy: S) -> Self {
        Self {
            strategy,
            attempts: 0,
        }
    }

    /// Failures recorded since the last reset.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Record a failure and return how long to wait before retrying.
    ///
    /// Fails with [`StreamError::BackOffExhausted`] once `max_attempts`
    /// failures have already been recorded.
    pub fn next_delay(&mut self) -> Result<Duration> {
        if let Some(max) = self.strategy.max_attempts() {
            if self.attempts >= max {
                return Err(StreamError::BackOffExhausted {
                    attempts: self.attempts,
                });
            }
        }
        self.attempts += 1;
        Ok(self.strategy.next_delay(self.attempts))
    }

    /// Record a failure and sleep for the computed delay.
    pub fn back_off(&mut self) -> Result<()> {
        let delay = self.next_delay()?;
        tracing::debug!("Backing off for {:?} (attempt {})", delay, self.attempts);
        std::thread::sleep(delay);
        Ok(())
    }

    /// Forget recorded failures after a success.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }
}
