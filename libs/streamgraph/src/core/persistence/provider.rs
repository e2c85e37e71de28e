// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::{ActivityCursor, ActivityRepository};
use crate::core::{BackOff, BackOffStrategy, Datum, Provider, Result};

/// Provider that polls a repository for entries newer than the last one seen.
///
/// Each read queries after a cursor and advances it past the last entry
/// returned, so entries sharing a publish time are paged through rather than
/// skipped. Failed queries are paced by the back-off strategy; once it
/// is exhausted the provider stops running.
pub struct RepositoryProvider<R: ActivityRepository, S: BackOffStrategy> {
    repository: Arc<R>,
    filters: Vec<String>,
    cursor: ActivityCursor,
    backoff: BackOff<S>,
    stop_when_caught_up: bool,
    running: bool,
}

impl<R: ActivityRepository, S: BackOffStrategy> RepositoryProvider<R, S> {
    pub fn new(repository: Arc<R>, filters: Vec<String>, strategy: S) -> Self {
        Self {
            repository,
            filters,
            cursor: ActivityCursor::since(DateTime::<Utc>::MIN_UTC),
            backoff: BackOff::new(strategy),
            stop_when_caught_up: false,
            running: true,
        }
    }

    /// Only return entries published after `since`.
    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.cursor = ActivityCursor::since(since);
        self
    }

    /// Stop running after the first read that finds nothing new.
    pub fn until_caught_up(mut self) -> Self {
        self.stop_when_caught_up = true;
        self
    }

    /// Publish time of the last entry emitted (or the `since` bound).
    pub fn high_water(&self) -> DateTime<Utc> {
        self.cursor.published()
    }

    fn poll(&mut self, until: Option<DateTime<Utc>>) -> Result<Vec<Datum>> {
        let entries = match self
            .repository
            .query_after(&self.filters, &self.cursor)
        {
            Ok(entries) => {
                self.backoff.reset();
                entries
            }
            Err(e) => {
                tracing::warn!("Activity query failed: {}", e);
                if let Err(exhausted) = self.backoff.back_off() {
                    tracing::warn!("Giving up on repository: {}", exhausted);
                    self.running = false;
                }
                return Ok(Vec::new());
            }
        };

        let entries: Vec<_> = entries
            .into_iter()
            .filter(|e| until.is_none_or(|end| e.published <= end))
            .collect();
        if entries.is_empty() {
            if self.stop_when_caught_up || until.is_some() {
                self.running = false;
            }
            return Ok(Vec::new());
        }

        if let Some(last) = entries.iter().max_by(|a, b| a.page_order().cmp(&b.page_order())) {
            self.cursor = ActivityCursor::after(last);
        }
        entries.iter().map(|e| e.to_datum()).collect()
    }
}

impl<R: ActivityRepository, S: BackOffStrategy> Provider for RepositoryProvider<R, S> {
    fn read_current(&mut self) -> Result<Vec<Datum>> {
        self.poll(None)
    }

    fn read_range(&mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Datum>> {
        if self.cursor.published() < start {
            self.cursor = ActivityCursor::since(start);
        }
        self.poll(Some(end))
    }

    fn is_running(&self) -> bool {
        self.running
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ActivityEntry, ConstantBackOff, InMemoryActivityRepository, StreamError};
    use chrono::Duration as ChronoDuration;
    use std::time::Duration;

    fn seeded(count: i64) -> Arc<InMemoryActivityRepository> {
        let repo = Arc::new(InMemoryActivityRepository::new());
        let base = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        for i in 0..count {
            repo.save(&ActivityEntry::new(
                format!("e{i}"),
                "rust",
                base + ChronoDuration::seconds(i),
            ))
            .unwrap();
        }
        repo
    }

    #[test]
    fn test_pages_through_repository() {
        let repo = seeded(25);
        let mut provider =
            RepositoryProvider::new(repo, vec!["rust".into()], ConstantBackOff::new(Duration::ZERO))
                .until_caught_up();

        let mut seen = 0;
        while provider.is_running() {
            seen += provider.read_current().unwrap().len();
        }
        assert_eq!(seen, 25);
    }

    #[test]
    fn test_emits_every_entry_sharing_a_timestamp() {
        let repo = Arc::new(InMemoryActivityRepository::new());
        let published = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        for i in 0..15 {
            repo.save(&ActivityEntry::new(format!("tie{i:02}"), "rust", published))
                .unwrap();
        }
        repo.save(&ActivityEntry::new(
            "later",
            "rust",
            published + ChronoDuration::seconds(1),
        ))
        .unwrap();

        let mut provider =
            RepositoryProvider::new(repo, vec!["rust".into()], ConstantBackOff::new(Duration::ZERO))
                .until_caught_up();
        let mut ids = Vec::new();
        while provider.is_running() {
            for datum in provider.read_current().unwrap() {
                ids.push(datum.id.unwrap());
            }
        }

        assert_eq!(ids.len(), 16);
        let distinct: std::collections::HashSet<_> = ids.iter().collect();
        assert_eq!(distinct.len(), 16);
        assert_eq!(ids.last().map(String::as_str), Some("later"));
    }

    #[test]
    fn test_range_read_stops_at_end() {
        let repo = seeded(30);
        let base = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let mut provider =
            RepositoryProvider::new(repo, vec!["rust".into()], ConstantBackOff::new(Duration::ZERO));

        let start = base + ChronoDuration::seconds(4);
        let end = base + ChronoDuration::seconds(14);
        let mut ids = Vec::new();
        while provider.is_running() {
            for datum in provider.read_range(start, end).unwrap() {
                ids.push(datum.id.unwrap());
            }
        }
        assert_eq!(ids.len(), 10);
        assert_eq!(ids.first().map(String::as_str), Some("e5"));
        assert_eq!(ids.last().map(String::as_str), Some("e14"));
    }

    struct Broken;

    impl ActivityRepository for Broken {
        fn save(&self, _entry: &ActivityEntry) -> Result<()> {
            Ok(())
        }

        fn query_by_filter_and_timestamp(
            &self,
            _filters: &[String],
            _since: DateTime<Utc>,
        ) -> Result<Vec<ActivityEntry>> {
            Err(StreamError::Runtime("backend unavailable".into()))
        }
    }

    #[test]
    fn test_gives_up_when_back_off_exhausted() {
        let mut provider = RepositoryProvider::new(
            Arc::new(Broken),
            vec!["rust".into()],
            ConstantBackOff::new(Duration::from_millis(1)).with_max_attempts(3),
        );
        let mut reads = 0;
        while provider.is_running() {
            assert!(provider.read_current().unwrap().is_empty());
            reads += 1;
        }
        assert_eq!(reads, 4);
    }
}
