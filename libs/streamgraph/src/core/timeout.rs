// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Bounds on how long a provider read or a queue take may block.
//!
//! A provider that yields nothing for longer than the bound is treated as
//! gracefully exhausted. A take that times out only hands control back to
//! the worker loop; end of stream is always signalled by the queue itself.

use std::time::{Duration, Instant};

/// Upper bound on the pause between provider polls that return nothing.
const MAX_IDLE_POLL: Duration = Duration::from_millis(10);

/// Lower bound on a single take wait so idle consumers block instead of spinning.
const MIN_TAKE_WAIT: Duration = Duration::from_millis(1);

/// Applies one configured maximum wait to provider reads and queue takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeoutSupervisor {
    bound: Option<Duration>,
}

impl TimeoutSupervisor {
    pub fn new(bound: Option<Duration>) -> Self {
        Self { bound }
    }

    /// No bound: reads and takes may wait indefinitely.
    pub fn unbounded() -> Self {
        Self { bound: None }
    }

    pub fn bound(&self) -> Option<Duration> {
        self.bound
    }

    /// Wait bound for a single queue take, never shorter than 1 ms.
    pub fn take_timeout(&self) -> Option<Duration> {
        self.bound.map(|bound| bound.max(MIN_TAKE_WAIT))
    }

    /// Start tracking provider inactivity.
    pub fn idle_watch(&self) -> IdleWatch {
        IdleWatch {
            bound: self.bound,
            last_activity: Instant::now(),
        }
    }

    /// Pause between provider polls that returned nothing.
    pub fn idle_poll_interval(&self) -> Duration {
        match self.bound {
            Some(bound) => (bound / 10).clamp(Duration::from_millis(1), MAX_IDLE_POLL),
            None => MAX_IDLE_POLL,
        }
    }
}

/// Measures time since a provider last produced data.
#[derive(Debug, Clone, Copy)]
pub struct IdleWatch {
    bound: Option<Duration>,
    last_activity: Instant,
}

impl IdleWatch {
    pub fn record_activity(&mut self) {
        self.last_activity = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.last_activity.elapsed()
    }

    /// True once the provider has been idle for at least the bound.
    pub fn is_expired(&self) -> bool {
        match self.bound {
            Some(bound) => self.idle_for() >= bound,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbounded_never_expires() {
        let watch = TimeoutSupervisor::unbounded().idle_watch();
        assert!(!watch.is_expired());
        assert_eq!(TimeoutSupervisor::default().take_timeout(), None);
    }

    #[test]
    fn test_idle_watch_expires_after_bound() {
        let supervisor = TimeoutSupervisor::new(Some(Duration::from_millis(20)));
        let mut watch = supervisor.idle_watch();
        assert!(!watch.is_expired());

        std::thread::sleep(Duration::from_millis(25));
        assert!(watch.is_expired());

        watch.record_activity();
        assert!(!watch.is_expired());
    }

    #[test]
    fn test_zero_bound_take_still_waits() {
        let supervisor = TimeoutSupervisor::new(Some(Duration::ZERO));
        assert_eq!(supervisor.take_timeout(), Some(MIN_TAKE_WAIT));

        let supervisor = TimeoutSupervisor::new(Some(Duration::from_millis(40)));
        assert_eq!(supervisor.take_timeout(), Some(Duration::from_millis(40)));
    }

    #[test]
    fn test_idle_poll_interval_is_clamped() {
        let tiny = TimeoutSupervisor::new(Some(Duration::from_millis(2)));
        assert_eq!(tiny.idle_poll_interval(), Duration::from_millis(1));

        let large = TimeoutSupervisor::new(Some(Duration::from_secs(60)));
        assert_eq!(large.idle_poll_interval(), MAX_IDLE_POLL);

        let medium = TimeoutSupervisor::new(Some(Duration::from_millis(50)));
        assert_eq!(medium.idle_poll_interval(), Duration::from_millis(5));
    }
}
