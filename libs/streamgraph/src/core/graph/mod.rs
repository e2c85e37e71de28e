// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

mod builder;
#[allow(clippy::module_inception)]
mod graph;
mod node;
mod node_id;

pub use builder::StreamBuilder;
pub use graph::StreamGraph;
pub use node::{GraphNode, NodeKind, ParallelismHint};
pub(crate) use node::StageLogic;
pub use node_id::NodeId;
