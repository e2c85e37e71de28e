// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("Node id already registered: {0}")]
    DuplicateNodeId(String),

    #[error("Node '{node}' references unknown upstream '{upstream}'")]
    UnknownUpstream { node: String, upstream: String },

    #[error("Node '{node}' has invalid parallelism {parallelism} (must be >= 1)")]
    InvalidParallelism { node: String, parallelism: usize },

    #[error("Invalid node id: {0}")]
    InvalidNodeId(String),

    #[error("Node '{0}' must declare at least one upstream")]
    MissingUpstream(String),

    #[error("Stream graph contains a cycle through '{0}'")]
    CyclicGraph(String),

    #[error("Stage execution failed: {0}")]
    StageExecution(String),

    #[error("Stage setup failed for '{node}': {reason}")]
    StageSetup { node: String, reason: String },

    #[error("Queue closed: {0}")]
    QueueClosed(String),

    #[error("Stream has already been started")]
    AlreadyStarted,

    #[error("Back-off exhausted after {attempts} attempts")]
    BackOffExhausted { attempts: u32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Operation not supported: {0}")]
    NotSupported(String),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, StreamError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_node() {
        let err = StreamError::UnknownUpstream {
            node: "proc".into(),
            upstream: "missing".into(),
        };
        assert_eq!(
            err.to_string(),
            "Node 'proc' references unknown upstream 'missing'"
        );

        let err = StreamError::InvalidParallelism {
            node: "proc".into(),
            parallelism: 0,
        };
        assert!(err.to_string().contains("invalid parallelism 0"));
    }

    #[test]
    fn test_anyhow_converts_into_stream_error() {
        fn fails() -> Result<()> {
            Err(anyhow::anyhow!("boom"))?;
            Ok(())
        }
        let err = fails().unwrap_err();
        assert!(matches!(err, StreamError::Other(_)));
        assert_eq!(err.to_string(), "boom");
    }
}
