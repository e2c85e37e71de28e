// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::NodeId;
use crate::core::{Processor, Provider, ReadMode, Writer};

/// The three stage kinds a node can be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Provider,
    Processor,
    Writer,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Provider => "provider",
            NodeKind::Processor => "processor",
            NodeKind::Writer => "writer",
        };
        write!(f, "{}", name)
    }
}

/// Requested worker count for a processor or writer node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParallelismHint {
    /// Use the stream's configured default parallelism.
    #[default]
    Default,
    /// Exactly this many workers. Zero is rejected at registration.
    Workers(usize),
}

impl ParallelismHint {
    pub(crate) fn resolve(self, default: NonZeroUsize) -> usize {
        match self {
            ParallelismHint::Default => default.get(),
            ParallelismHint::Workers(n) => n,
        }
    }
}

impl From<usize> for ParallelismHint {
    fn from(workers: usize) -> Self {
        ParallelismHint::Workers(workers)
    }
}

/// Stage logic owned by a node until the stream starts.
pub(crate) enum StageLogic {
    Provider {
        provider: Box<dyn Provider>,
        mode: ReadMode,
    },
    Processor(Arc<dyn Processor>),
    Writer(Arc<dyn Writer>),
}

impl StageLogic {
    pub(crate) fn kind(&self) -> NodeKind {
        match self {
            StageLogic::Provider { .. } => NodeKind::Provider,
            StageLogic::Processor(_) => NodeKind::Processor,
            StageLogic::Writer(_) => NodeKind::Writer,
        }
    }
}

/// A registered node: identity, stage logic, worker count and upstream edges.
pub struct GraphNode {
    id: NodeId,
    parallelism: usize,
    upstreams: Vec<NodeId>,
    pub(crate) stage: StageLogic,
}

impl GraphNode {
    pub(crate) fn into_parts(self) -> (NodeId, usize, Vec<NodeId>, StageLogic) {
        (self.id, self.parallelism, self.upstreams, self.stage)
    }

    pub(crate) fn new(
        id: NodeId,
        parallelism: usize,
        upstreams: Vec<NodeId>,
        stage: StageLogic,
    ) -> Self {
        Self {
            id,
            parallelism,
            upstreams,
            stage,
        }
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn kind(&self) -> NodeKind {
        self.stage.kind()
    }

    /// Worker count. Providers always run a single worker.
    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Upstream ids in registration order, without duplicates.
    pub fn upstreams(&self) -> &[NodeId] {
        &self.upstreams
    }

    pub fn read_mode(&self) -> Option<ReadMode> {
        match &self.stage {
            StageLogic::Provider { mode, .. } => Some(*mode),
            _ => None,
        }
    }
}

impl fmt::Debug for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphNode")
            .field("id", &self.id)
            .field("kind", &self.kind())
            .field("parallelism", &self.parallelism)
            .field("upstreams", &self.upstreams)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parallelism_hint_resolution() {
        let default = NonZeroUsize::new(4).unwrap();
        assert_eq!(ParallelismHint::Default.resolve(default), 4);
        assert_eq!(ParallelismHint::from(2).resolve(default), 2);
        assert_eq!(ParallelismHint::from(0).resolve(default), 0);
    }

    #[test]
    fn test_node_kind_display() {
        assert_eq!(NodeKind::Writer.to_string(), "writer");
    }
}
