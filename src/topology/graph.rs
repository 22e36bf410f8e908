//! Topology graph container
//!
//! Nodes and edges are keyed by id, so the first producer of a given node or
//! edge wins and later duplicates are ignored. The graph is rebuilt every scrape.

use crate::config::Target;
use crate::metrics::MetricsCollector;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeType {
    CsVserver,
    LbVserver,
    Service,
    ServiceGroup,
    Server,
}

impl NodeType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CsVserver => "csvserver",
            Self::LbVserver => "lbvserver",
            Self::Service => "service",
            Self::ServiceGroup => "servicegroup",
            Self::Server => "server",
        }
    }

    /// `<type>:<name>`
    pub fn node_id(self, name: &str) -> String {
        format!("{}:{}", self.as_str(), name)
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Up,
    Down,
}

impl NodeState {
    /// Anything other than `UP` is down.
    pub fn from_nitro(state: &str) -> Self {
        if state.trim().eq_ignore_ascii_case("UP") {
            Self::Up
        } else {
            Self::Down
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Up => "UP",
            Self::Down => "DOWN",
        }
    }

    pub fn value(self) -> f64 {
        match self {
            Self::Up => 1.0,
            Self::Down => 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: String,
    pub title: String,
    pub node_type: NodeType,
    pub state: NodeState,
    /// Sorted, comma-joined chain names
    pub chain: String,
    pub health: Option<f64>,
    pub requests: Option<f64>,
    pub connections: Option<f64>,
    pub ttfb_ms: Option<f64>,
}

impl Node {
    pub fn new(node_type: NodeType, name: &str, state: NodeState) -> Self {
        Self {
            id: node_type.node_id(name),
            title: name.to_string(),
            node_type,
            state,
            chain: String::new(),
            health: None,
            requests: None,
            connections: None,
            ttfb_ms: None,
        }
    }

    pub fn with_chain(mut self, chain: String) -> Self {
        self.chain = chain;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub weight: String,
    pub priority: String,
    pub chain: String,
}

impl Edge {
    pub fn new(source: String, target: String, weight: String, priority: String) -> Self {
        Self {
            id: format!("{source}->{target}"),
            source,
            target,
            weight,
            priority,
            chain: String::new(),
        }
    }
}

#[derive(Debug, Default)]
pub struct TopologyGraph {
    nodes: BTreeMap<String, Node>,
    edges: BTreeMap<String, Edge>,
}

impl TopologyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when a node with the same id already exists.
    pub fn add_node(&mut self, node: Node) -> bool {
        if self.nodes.contains_key(&node.id) {
            return false;
        }
        self.nodes.insert(node.id.clone(), node);
        true
    }

    /// Returns false when an edge between the same endpoints already exists.
    pub fn add_edge(&mut self, edge: Edge) -> bool {
        if self.edges.contains_key(&edge.id) {
            return false;
        }
        self.edges.insert(edge.id.clone(), edge);
        true
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    /// Drop edges missing either endpoint and give every surviving edge its
    /// source node's chain. Returns the number of dropped edges.
    pub fn conclude(&mut self) -> usize {
        let nodes = &self.nodes;
        let before = self.edges.len();
        self.edges.retain(|id, edge| {
            let keep = nodes.contains_key(&edge.source) && nodes.contains_key(&edge.target);
            if !keep {
                debug!(edge = %id, "Dropping edge with a missing endpoint");
            }
            keep
        });
        for edge in self.edges.values_mut() {
            if let Some(source) = nodes.get(&edge.source) {
                edge.chain = source.chain.clone();
            }
        }
        before - self.edges.len()
    }

    pub fn publish(&self, metrics: &MetricsCollector, target: &Target) {
        for node in self.nodes.values() {
            let node_type = node.node_type.as_str();
            metrics.set(
                &metrics.topology_node,
                target,
                &[
                    node.id.as_str(),
                    node.title.as_str(),
                    node_type,
                    node.state.as_str(),
                    node.chain.as_str(),
                ],
                node.state.value(),
            );
            let keys = [node.id.as_str(), node_type, node.chain.as_str()];
            metrics.set(&metrics.topology_node_state, target, &keys, node.state.value());
            if let Some(health) = node.health {
                metrics.set(&metrics.topology_node_health, target, &keys, health);
            }
            if let Some(requests) = node.requests {
                metrics.set(&metrics.topology_node_requests_total, target, &keys, requests);
            }
            if let Some(connections) = node.connections {
                metrics.set(&metrics.topology_node_connections, target, &keys, connections);
            }
            if let Some(ttfb) = node.ttfb_ms {
                metrics.set(&metrics.topology_node_ttfb_ms, target, &keys, ttfb);
            }
        }
        for edge in self.edges.values() {
            metrics.set(
                &metrics.topology_edge,
                target,
                &[
                    edge.id.as_str(),
                    edge.source.as_str(),
                    edge.target.as_str(),
                    edge.weight.as_str(),
                    edge.priority.as_str(),
                    edge.chain.as_str(),
                ],
                1.0,
            );
        }
    }
}
