// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Activity storage used by repository-backed stages.

mod activity;
mod memory;
mod provider;
mod repository;
mod writer;

pub use activity::{ActivityCursor, ActivityEntry, ActivityObject};
pub use memory::{InMemoryActivityRepository, DEFAULT_QUERY_LIMIT};
pub use provider::RepositoryProvider;
pub use repository::ActivityRepository;
pub use writer::RepositoryWriter;
