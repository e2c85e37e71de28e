// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::sync::Arc;

use super::{ActivityEntry, ActivityRepository};
use crate::core::{Datum, Result, Writer};

/// Writer that saves every datum as an [`ActivityEntry`].
///
/// Datums whose document is not an activity entry fail and are dropped by
/// the worker like any other per-datum fault.
pub struct RepositoryWriter<R: ActivityRepository> {
    repository: Arc<R>,
}

impl<R: ActivityRepository> RepositoryWriter<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }
}

impl<R: ActivityRepository> Writer for RepositoryWriter<R> {
    fn write(&self, datum: Datum) -> Result<()> {
        let entry = ActivityEntry::from_datum(&datum)?;
        tracing::trace!("Saving activity {}", entry.id);
        self.repository.save(&entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::InMemoryActivityRepository;
    use chrono::Utc;

    #[test]
    fn test_saves_entries_and_rejects_other_documents() {
        let repo = Arc::new(InMemoryActivityRepository::new());
        let writer = RepositoryWriter::new(repo.clone());

        let entry = ActivityEntry::new("a1", "rust", Utc::now());
        writer.write(entry.to_datum().unwrap()).unwrap();
        assert!(writer.write(Datum::new("not an entry")).is_err());

        assert_eq!(repo.entries(), vec![entry]);
    }
}
