// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::sync::atomic::{AtomicBool, Ordering};

/// Flags the coordinator raises for every worker of one run.
#[derive(Debug, Default)]
pub(crate) struct RunSignals {
    stop_requested: AtomicBool,
    forced: AtomicBool,
}

impl RunSignals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Providers stop generating; buffered datums keep draining.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Every worker exits at its next suspension point.
    pub fn force(&self) {
        self.stop_requested.store(true, Ordering::Release);
        self.forced.store(true, Ordering::Release);
    }

    pub fn is_forced(&self) -> bool {
        self.forced.load(Ordering::Acquire)
    }
}
