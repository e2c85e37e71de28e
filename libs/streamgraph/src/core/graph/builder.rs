// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Declarative assembly of a stream graph.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::{GraphNode, NodeId, NodeKind, ParallelismHint, StageLogic, StreamGraph};
use crate::core::observability::MetricsSink;
use crate::core::runtime::LocalStream;
use crate::core::{Processor, Provider, ReadMode, Result, StreamConfig, StreamError, Writer};

/// Accumulates providers, processors and writers into a [`StreamGraph`].
///
/// Registration calls validate eagerly and return `&mut Self` so they chain
/// with `?`. A rejected call leaves the builder exactly as it was.
///
/// ```ignore
/// let mut builder = StreamBuilder::new();
/// builder
///     .new_read_current_stream("numbers", NumericProvider::new(100))?
///     .add_processor("double", double, 2, &["numbers"])?
///     .add_writer("sink", sink, 1, &["double"])?;
/// let report = builder.build()?.start()?;
/// ```
pub struct StreamBuilder {
    config: StreamConfig,
    graph: StreamGraph,
    metrics_sink: Option<Arc<dyn MetricsSink>>,
}

impl Default for StreamBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StreamBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamBuilder")
            .field("config", &self.config)
            .field("graph", &self.graph)
            .field("has_metrics_sink", &self.metrics_sink.is_some())
            .finish()
    }
}

impl StreamBuilder {
    /// Create a builder with the default configuration.
    pub fn new() -> Self {
        Self::with_config(StreamConfig::default())
    }

    pub fn with_config(config: StreamConfig) -> Self {
        Self {
            config,
            graph: StreamGraph::new(),
            metrics_sink: None,
        }
    }

    /// Create a builder from the key/value configuration form.
    pub fn from_map(map: &HashMap<String, Value>) -> Result<Self> {
        Ok(Self::with_config(StreamConfig::from_map(map)?))
    }

    /// Inject a sink that receives per-queue snapshots while the stream runs.
    pub fn with_metrics_sink<M: MetricsSink + 'static>(self, sink: M) -> Self {
        self.with_metrics_sink_arc(Arc::new(sink))
    }

    pub fn with_metrics_sink_arc(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.metrics_sink = Some(sink);
        self
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn graph(&self) -> &StreamGraph {
        &self.graph
    }

    // =========================================================================
    // Providers
    // =========================================================================

    /// Register a finite provider driven by `read_current`.
    pub fn new_read_current_stream<P: Provider + 'static>(
        &mut self,
        id: &str,
        provider: P,
    ) -> Result<&mut Self> {
        self.register_provider(id, Box::new(provider), ReadMode::Current)
    }

    /// Register a provider that never exhausts on its own.
    pub fn new_perpetual_stream<P: Provider + 'static>(
        &mut self,
        id: &str,
        provider: P,
    ) -> Result<&mut Self> {
        self.register_provider(id, Box::new(provider), ReadMode::Perpetual)
    }

    /// Register a finite provider asked for items after `sequence`.
    pub fn new_read_new_stream<P: Provider + 'static>(
        &mut self,
        id: &str,
        provider: P,
        sequence: u64,
    ) -> Result<&mut Self> {
        self.register_provider(id, Box::new(provider), ReadMode::New { sequence })
    }

    /// Register a finite provider asked for items within `[start, end]`.
    pub fn new_read_range_stream<P: Provider + 'static>(
        &mut self,
        id: &str,
        provider: P,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<&mut Self> {
        if end < start {
            return Err(StreamError::Configuration(format!(
                "read range for '{}' ends ({}) before it starts ({})",
                id, end, start
            )));
        }
        self.register_provider(id, Box::new(provider), ReadMode::Range { start, end })
    }

    fn register_provider(
        &mut self,
        id: &str,
        provider: Box<dyn Provider>,
        mode: ReadMode,
    ) -> Result<&mut Self> {
        let id = NodeId::parse(id)?;
        tracing::debug!("[{}] Registering {} provider", id, mode.description());
        self.graph.insert(GraphNode::new(
            id,
            1,
            Vec::new(),
            StageLogic::Provider { provider, mode },
        ))?;
        Ok(self)
    }

    // =========================================================================
    // Processors and writers
    // =========================================================================

    pub fn add_processor<P: Processor + 'static>(
        &mut self,
        id: &str,
        processor: P,
        parallelism: impl Into<ParallelismHint>,
        upstreams: &[&str],
    ) -> Result<&mut Self> {
        self.add_processor_arc(id, Arc::new(processor), parallelism, upstreams)
    }

    /// Register a processor the caller keeps a handle to.
    pub fn add_processor_arc(
        &mut self,
        id: &str,
        processor: Arc<dyn Processor>,
        parallelism: impl Into<ParallelismHint>,
        upstreams: &[&str],
    ) -> Result<&mut Self> {
        self.register_consumer(
            id,
            StageLogic::Processor(processor),
            parallelism.into(),
            upstreams,
        )
    }

    pub fn add_writer<W: Writer + 'static>(
        &mut self,
        id: &str,
        writer: W,
        parallelism: impl Into<ParallelismHint>,
        upstreams: &[&str],
    ) -> Result<&mut Self> {
        self.add_writer_arc(id, Arc::new(writer), parallelism, upstreams)
    }

    /// Register a writer the caller keeps a handle to.
    pub fn add_writer_arc(
        &mut self,
        id: &str,
        writer: Arc<dyn Writer>,
        parallelism: impl Into<ParallelismHint>,
        upstreams: &[&str],
    ) -> Result<&mut Self> {
        self.register_consumer(id, StageLogic::Writer(writer), parallelism.into(), upstreams)
    }

    fn register_consumer(
        &mut self,
        id: &str,
        stage: StageLogic,
        hint: ParallelismHint,
        upstreams: &[&str],
    ) -> Result<&mut Self> {
        let id = NodeId::parse(id)?;
        if self.graph.contains(&id) {
            return Err(StreamError::DuplicateNodeId(id.to_string()));
        }

        let mut upstream_ids: Vec<NodeId> = Vec::with_capacity(upstreams.len());
        for upstream in upstreams {
            let Some(upstream_node) = self.graph.node(upstream) else {
                return Err(StreamError::UnknownUpstream {
                    node: id.to_string(),
                    upstream: (*upstream).to_string(),
                });
            };
            if upstream_node.kind() == NodeKind::Writer {
                return Err(StreamError::Configuration(format!(
                    "writer '{}' is terminal and cannot feed '{}'",
                    upstream, id
                )));
            }
            let upstream = NodeId::parse(*upstream)?;
            if !upstream_ids.contains(&upstream) {
                upstream_ids.push(upstream);
            }
        }

        let parallelism = hint.resolve(self.config.default_parallelism);
        if parallelism < 1 {
            return Err(StreamError::InvalidParallelism {
                node: id.to_string(),
                parallelism,
            });
        }
        if upstream_ids.is_empty() {
            return Err(StreamError::MissingUpstream(id.to_string()));
        }

        tracing::debug!(
            "[{}] Registering {} with {} worker(s), upstreams {:?}",
            id,
            stage.kind(),
            parallelism,
            upstream_ids
        );
        self.graph
            .insert(GraphNode::new(id, parallelism, upstream_ids, stage))?;
        Ok(self)
    }

    // =========================================================================
    // Finalization
    // =========================================================================

    /// Validate the graph and hand it to a [`LocalStream`] ready to start.
    pub fn build(self) -> Result<LocalStream> {
        if self.graph.is_empty() {
            return Err(StreamError::Configuration(
                "stream graph has no nodes".into(),
            ));
        }
        // Surfaces cycles before any queue or thread exists.
        self.graph.topological_order()?;
        Ok(LocalStream::new(self.graph, self.config, self.metrics_sink))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Datum;
    use std::num::NonZeroUsize;

    struct Once(bool);

    impl Provider for Once {
        fn read_current(&mut self) -> Result<Vec<Datum>> {
            self.0 = false;
            Ok(vec![Datum::new(1)])
        }

        fn is_running(&self) -> bool {
            self.0
        }
    }

    fn passthrough(d: Datum) -> Result<Vec<Datum>> {
        Ok(vec![d])
    }

    fn discard(_d: Datum) -> Result<()> {
        Ok(())
    }

    #[test]
    fn test_fluent_registration() {
        let mut builder = StreamBuilder::new();
        builder
            .new_read_current_stream("src", Once(true))
            .unwrap()
            .add_processor("p", passthrough, 3, &["src"])
            .unwrap()
            .add_writer("w", discard, ParallelismHint::Default, &["p"])
            .unwrap();

        let graph = builder.graph();
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.node("p").unwrap().parallelism(), 3);
        assert_eq!(graph.node("w").unwrap().parallelism(), 1);
        assert_eq!(graph.node("src").unwrap().kind(), NodeKind::Provider);
    }

    #[test]
    fn test_default_parallelism_from_config() {
        let config = StreamConfig::default().with_default_parallelism(NonZeroUsize::new(4).unwrap());
        let mut builder = StreamBuilder::with_config(config);
        builder.new_perpetual_stream("src", Once(true)).unwrap();
        builder
            .add_writer("w", discard, ParallelismHint::Default, &["src"])
            .unwrap();
        assert_eq!(builder.graph().node("w").unwrap().parallelism(), 4);
    }

    #[test]
    fn test_duplicate_node_id() {
        let mut builder = StreamBuilder::new();
        builder.new_read_current_stream("src", Once(true)).unwrap();
        let err = builder.new_read_current_stream("src", Once(true)).unwrap_err();
        assert!(matches!(err, StreamError::DuplicateNodeId(id) if id == "src"));

        builder.add_processor("p", passthrough, 1, &["src"]).unwrap();
        let err = builder.add_writer("p", discard, 1, &["src"]).unwrap_err();
        assert!(matches!(err, StreamError::DuplicateNodeId(_)));
        assert_eq!(builder.graph().node_count(), 2);
    }

    #[test]
    fn test_debug_lists_registered_nodes() {
        let mut builder = StreamBuilder::new();
        builder.new_read_current_stream("src", Once(true)).unwrap();
        let rendered = format!("{:?}", builder);
        assert!(rendered.starts_with("StreamBuilder"));
        assert!(rendered.contains("src"));
        assert!(rendered.contains("has_metrics_sink: false"));
    }

    #[test]
    fn test_unknown_upstream() {
        let mut builder = StreamBuilder::new();
        builder.new_read_current_stream("src", Once(true)).unwrap();
        let err = builder
            .add_processor("p", passthrough, 1, &["src", "ghost"])
            .unwrap_err();
        match err {
            StreamError::UnknownUpstream { node, upstream } => {
                assert_eq!(node, "p");
                assert_eq!(upstream, "ghost");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!builder.graph().contains("p"));
    }

    #[test]
    fn test_invalid_parallelism_and_missing_upstream() {
        let mut builder = StreamBuilder::new();
        builder.new_read_current_stream("src", Once(true)).unwrap();
        assert!(matches!(
            builder.add_processor("p", passthrough, 0, &["src"]),
            Err(StreamError::InvalidParallelism { parallelism: 0, .. })
        ));
        assert!(matches!(
            builder.add_writer("w", discard, 1, &[]),
            Err(StreamError::MissingUpstream(_))
        ));
        assert!(matches!(
            builder.add_writer("bad id", discard, 1, &["src"]),
            Err(StreamError::InvalidNodeId(_))
        ));
    }

    #[test]
    fn test_writer_cannot_feed_another_node() {
        let mut builder = StreamBuilder::new();
        builder.new_read_current_stream("src", Once(true)).unwrap();
        builder.add_writer("w", discard, 1, &["src"]).unwrap();
        assert!(matches!(
            builder.add_writer("w2", discard, 1, &["w"]),
            Err(StreamError::Configuration(_))
        ));
    }

    #[test]
    fn test_duplicate_upstreams_collapse() {
        let mut builder = StreamBuilder::new();
        builder.new_read_current_stream("src", Once(true)).unwrap();
        builder
            .add_writer("w", discard, 1, &["src", "src"])
            .unwrap();
        assert_eq!(builder.graph().node("w").unwrap().upstreams().len(), 1);
        assert_eq!(builder.graph().edge_count(), 1);
    }

    #[test]
    fn test_range_stream_rejects_inverted_range() {
        let mut builder = StreamBuilder::new();
        let now = Utc::now();
        let earlier = now - chrono::Duration::seconds(5);
        assert!(builder
            .new_read_range_stream("src", Once(true), now, earlier)
            .is_err());
        builder
            .new_read_range_stream("src", Once(true), earlier, now)
            .unwrap();
        assert!(matches!(
            builder.graph().node("src").unwrap().read_mode(),
            Some(ReadMode::Range { .. })
        ));
    }

    #[test]
    fn test_build_empty_graph_fails() {
        assert!(matches!(
            StreamBuilder::new().build(),
            Err(StreamError::Configuration(_))
        ));
    }
}
