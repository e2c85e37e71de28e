// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use chrono::{DateTime, Utc};

use super::{ActivityCursor, ActivityEntry};
use crate::core::Result;

/// Durable store of activity entries.
pub trait ActivityRepository: Send + Sync {
    fn save(&self, entry: &ActivityEntry) -> Result<()>;

    /// Entries whose tag is one of `filters` and that were published strictly
    /// after `since`. An empty filter list matches nothing.
    fn query_by_filter_and_timestamp(
        &self,
        filters: &[String],
        since: DateTime<Utc>,
    ) -> Result<Vec<ActivityEntry>>;

    /// Matching entries ordered after `cursor`, in
    /// [`page_order`](ActivityEntry::page_order).
    ///
    /// The default widens the timestamp query by one nanosecond and filters
    /// the result. Stores that cap their result size must override it,
    /// otherwise entries tied on `published` beyond the cap are unreachable.
    fn query_after(
        &self,
        filters: &[String],
        cursor: &ActivityCursor,
    ) -> Result<Vec<ActivityEntry>> {
        let since = cursor
            .published()
            .checked_sub_signed(chrono::Duration::nanoseconds(1))
            .unwrap_or(cursor.published());
        let mut entries = self.query_by_filter_and_timestamp(filters, since)?;
        entries.retain(|e| cursor.admits(e));
        entries.sort_by(|a, b| a.page_order().cmp(&b.page_order()));
        Ok(entries)
    }
}
