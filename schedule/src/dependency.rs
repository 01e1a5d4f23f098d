//! Producer/consumer graph between the tensors stored by a program.
//!
//! An edge `P -> C` means that the defining expression of `C` loads `P`.
//! The graph is built for diagnostics (dependency dumps, ordering checks);
//! no pass relies on it for correctness.

use std::collections::{BTreeSet, HashMap, VecDeque};

use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use smallvec::SmallVec;
use snafu::OptionExt;
use tessel_ir::collect::store_tensor_names;
use tessel_ir::{Expr, TensorMap};
use tracing::{debug, trace};

use crate::error::*;

/// Directed graph of tensor names.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    graph: DiGraph<String, ()>,
    nodes: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph from every `Store` in `expr`.
    ///
    /// Each stored tensor is linked from every tensor its definition loads.
    #[tracing::instrument(skip_all)]
    pub fn build(expr: &Expr, tensors: &TensorMap) -> Result<Self> {
        let mut graph = Self::new();
        for name in store_tensor_names(expr) {
            let tensor = tensors.get(&name).context(MissingTensorSnafu { name: name.as_str() })?;
            let consumer = graph.register_node(&name);
            for producer in tensor.depend_tensor_names() {
                let producer = graph.register_node(&producer);
                graph.link_to(producer, consumer);
            }
        }
        debug!(nodes = graph.node_count(), edges = graph.edge_count(), "built dependency graph");
        Ok(graph)
    }

    /// Node of `name`, created on first use.
    pub fn register_node(&mut self, name: &str) -> NodeIndex {
        if let Some(&idx) = self.nodes.get(name) {
            return idx;
        }
        let idx = self.graph.add_node(name.to_string());
        self.nodes.insert(name.to_string(), idx);
        idx
    }

    pub fn retrieve_node(&self, name: &str) -> Option<NodeIndex> {
        self.nodes.get(name).copied()
    }

    pub fn name(&self, idx: NodeIndex) -> Option<&str> {
        self.graph.node_weight(idx).map(String::as_str)
    }

    /// Add the edge `from -> to` unless it already exists.
    pub fn link_to(&mut self, from: NodeIndex, to: NodeIndex) {
        if self.graph.find_edge(from, to).is_none() {
            trace!(from = ?self.name(from), to = ?self.name(to), "dependency edge");
            self.graph.add_edge(from, to, ());
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Whether the edge `from -> to` exists.
    pub fn has_edge(&self, from: &str, to: &str) -> bool {
        match (self.retrieve_node(from), self.retrieve_node(to)) {
            (Some(from), Some(to)) => self.graph.contains_edge(from, to),
            _ => false,
        }
    }

    fn neighbors(&self, name: &str, direction: Direction) -> SmallVec<[&str; 4]> {
        let Some(idx) = self.retrieve_node(name) else {
            return SmallVec::new();
        };
        let mut names: SmallVec<[&str; 4]> =
            self.graph.neighbors_directed(idx, direction).filter_map(|n| self.name(n)).collect();
        names.sort_unstable();
        names
    }

    /// Tensors reading `name`, sorted.
    pub fn consumers(&self, name: &str) -> SmallVec<[&str; 4]> {
        self.neighbors(name, Direction::Outgoing)
    }

    /// Tensors read by `name`, sorted.
    pub fn producers(&self, name: &str) -> SmallVec<[&str; 4]> {
        self.neighbors(name, Direction::Incoming)
    }

    /// Every tensor `name` depends on, directly or not.
    pub fn transitive_producers(&self, name: &str) -> BTreeSet<String> {
        let mut seen = BTreeSet::new();
        let Some(start) = self.retrieve_node(name) else {
            return seen;
        };

        let mut queue = VecDeque::from([start]);
        while let Some(current) = queue.pop_front() {
            for producer in self.graph.neighbors_directed(current, Direction::Incoming) {
                if let Some(producer_name) = self.name(producer)
                    && seen.insert(producer_name.to_string())
                {
                    queue.push_back(producer);
                }
            }
        }
        seen
    }

    /// Tensor names with every producer before its consumers, or `None` on a cycle.
    pub fn producer_first_order(&self) -> Option<Vec<&str>> {
        let order = toposort(&self.graph, None).ok()?;
        Some(order.into_iter().filter_map(|idx| self.name(idx)).collect())
    }
}
