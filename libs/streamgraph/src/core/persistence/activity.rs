// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{Datum, Result, StreamError};

/// Actor, target, object or provider of an activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActivityObject {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// One activity-stream entry.
///
/// Entries are keyed by `(id, tags, published)`: saving an entry with the
/// same key replaces the stored one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub id: String,
    pub published: DateTime<Utc>,
    #[serde(default)]
    pub verb: String,
    /// Filter tag matched by repository queries.
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub actor: ActivityObject,
    #[serde(default)]
    pub target: ActivityObject,
    #[serde(default)]
    pub object: ActivityObject,
    #[serde(default)]
    pub provider: ActivityObject,
}

impl ActivityEntry {
    pub fn new(id: impl Into<String>, tags: impl Into<String>, published: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            published,
            verb: String::new(),
            tags: tags.into(),
            actor: ActivityObject::default(),
            target: ActivityObject::default(),
            object: ActivityObject::default(),
            provider: ActivityObject::default(),
        }
    }

    pub fn with_verb(mut self, verb: impl Into<String>) -> Self {
        self.verb = verb.into();
        self
    }

    pub fn with_actor(mut self, actor: ActivityObject) -> Self {
        self.actor = actor;
        self
    }

    pub fn key(&self) -> (&str, &str, DateTime<Utc>) {
        (&self.id, &self.tags, self.published)
    }

    /// Total order used for paging: `published`, then `id`, then `tags`.
    pub fn page_order(&self) -> (DateTime<Utc>, &str, &str) {
        (self.published, &self.id, &self.tags)
    }

    /// Read an entry back out of a datum's document.
    pub fn from_datum(datum: &Datum) -> Result<Self> {
        serde_json::from_value(datum.document.clone()).map_err(|e| {
            StreamError::StageExecution(format!(
                "datum {} is not an activity entry: {}",
                datum.identity(),
                e
            ))
        })
    }

    /// Wrap the entry in a datum carrying its id and publish time.
    pub fn to_datum(&self) -> Result<Datum> {
        let document = serde_json::to_value(self)
            .map_err(|e| StreamError::StageExecution(format!("entry {}: {}", self.id, e)))?;
        Ok(Datum::new(document)
            .with_id(self.id.clone())
            .with_timestamp(self.published))
    }
}

/// Resume point for paging through a repository in
/// [`page_order`](ActivityEntry::page_order).
///
/// Entries sharing a `published` value are told apart by `(id, tags)`, so a
/// page cut in the middle of a tie resumes exactly where it stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityCursor {
    published: DateTime<Utc>,
    last: Option<(String, String)>,
}

impl ActivityCursor {
    /// Everything published strictly after `since`.
    pub fn since(since: DateTime<Utc>) -> Self {
        Self {
            published: since,
            last: None,
        }
    }

    /// Everything ordered after `entry`.
    pub fn after(entry: &ActivityEntry) -> Self {
        Self {
            published: entry.published,
            last: Some((entry.id.clone(), entry.tags.clone())),
        }
    }

    pub fn published(&self) -> DateTime<Utc> {
        self.published
    }

    pub fn admits(&self, entry: &ActivityEntry) -> bool {
        if entry.published != self.published {
            return entry.published > self.published;
        }
        match &self.last {
            Some((id, tags)) => {
                (entry.id.as_str(), entry.tags.as_str()) > (id.as_str(), tags.as_str())
            }
            None => false,
        }
    }
}
