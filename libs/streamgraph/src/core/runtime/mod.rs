// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

mod local_stream;
mod report;
mod run_id;
mod status;

pub use local_stream::LocalStream;
pub use report::{Completion, NodeReport, RunReport};
pub use run_id::RunId;
pub use status::RuntimeStatus;
