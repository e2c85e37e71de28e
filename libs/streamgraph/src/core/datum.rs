// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! The unit of payload moving through a stream graph.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One unit of data moving between stages.
///
/// Cloning is a deep copy, so every branch of a fan-out owns an independent
/// value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Datum {
    /// Payload.
    pub document: Value,
    /// Identity used for counting and de-duplication.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Position in the originating provider's sequence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl Datum {
    pub fn new(document: impl Into<Value>) -> Self {
        Self {
            document: document.into(),
            id: None,
            timestamp: None,
            sequence_id: None,
            metadata: Map::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_sequence_id(mut self, sequence_id: u64) -> Self {
        self.sequence_id = Some(sequence_id);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Identity for counting: the explicit id if set, otherwise the
    /// document rendered as JSON.
    pub fn identity(&self) -> String {
        match &self.id {
            Some(id) => id.clone(),
            None => self.document.to_string(),
        }
    }
}

impl From<Value> for Datum {
    fn from(document: Value) -> Self {
        Self::new(document)
    }
}
