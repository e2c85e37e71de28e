// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use super::{ActivityCursor, ActivityEntry, ActivityRepository};
use crate::core::Result;

/// Maximum entries returned by one query.
pub const DEFAULT_QUERY_LIMIT: usize = 10;

/// Process-local [`ActivityRepository`].
#[derive(Debug)]
pub struct InMemoryActivityRepository {
    entries: RwLock<Vec<ActivityEntry>>,
    limit: usize,
}

impl Default for InMemoryActivityRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryActivityRepository {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_QUERY_LIMIT)
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            limit,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn entries(&self) -> Vec<ActivityEntry> {
        self.entries.read().clone()
    }
}

impl ActivityRepository for InMemoryActivityRepository {
    fn save(&self, entry: &ActivityEntry) -> Result<()> {
        let mut entries = self.entries.write();
        match entries.iter_mut().find(|e| e.key() == entry.key()) {
            Some(existing) => *existing = entry.clone(),
            None => entries.push(entry.clone()),
        }
        Ok(())
    }

    fn query_by_filter_and_timestamp(
        &self,
        filters: &[String],
        since: DateTime<Utc>,
    ) -> Result<Vec<ActivityEntry>> {
        self.query_after(filters, &ActivityCursor::since(since))
    }

    fn query_after(
        &self,
        filters: &[String],
        cursor: &ActivityCursor,
    ) -> Result<Vec<ActivityEntry>> {
        if filters.is_empty() {
            tracing::info!("No filters specified, returning no activities");
            return Ok(Vec::new());
        }
        let mut matches: Vec<ActivityEntry> = self
            .entries
            .read()
            .iter()
            .filter(|e| cursor.admits(e) && filters.iter().any(|f| *f == e.tags))
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.page_order().cmp(&b.page_order()));
        matches.truncate(self.limit);
        Ok(matches)
    }
}
