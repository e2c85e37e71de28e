// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use serde::{Deserialize, Serialize};

/// Stream lifecycle status. A stream moves through these once, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RuntimeStatus {
    #[default]
    Initial,
    Starting,
    Started,
    Stopping,
    Stopped,
}
