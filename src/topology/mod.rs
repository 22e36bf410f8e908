//! Topology Collector
//!
//! Reconstructs the routing graph of one appliance
//! (content switch -> load balancer -> service / service group -> member server)
//! and labels every node with the entry chains that reach it.
//!
//! # Metrics Produced
//! - `netscaler_topology_node` - one series per node (1=UP, 0=DOWN)
//!   - Labels: id, title, node_type, state, chain
//! - `netscaler_topology_edge` - one series per edge
//!   - Labels: id, source, target, weight, priority, chain
//! - `netscaler_topology_node_health`, `_requests_total`, `_connections`
//!   - Labels: id, node_type, chain
//!
//! The graph is shared with the service group collector, which adds group and
//! member nodes. It is concluded and published once every module has finished.

pub mod graph;
pub mod resolver;

pub use graph::{Edge, Node, NodeState, NodeType, TopologyGraph};
pub use resolver::{
    build_graph, resolve_cs_to_lb, BindingTables, ChainMembership, CsLbMapping, MappingSource,
    NodeListings, TopologyIndex,
};

use crate::collectors::{CollectionResult, CollectionStatus};
use crate::config::Target;
use crate::error::Result;
use crate::metrics::MetricsCollector;
use crate::scrape::{CollectionContext, ScrapeContext};
use std::future::Future;
use std::sync::{Mutex, OnceLock, PoisonError};
use tracing::{debug, info};

/// Topology data of one target scrape
#[derive(Debug, Default)]
pub struct TopologyState {
    enabled: bool,
    chains: OnceLock<ChainMembership>,
    graph: Mutex<TopologyGraph>,
}

impl TopologyState {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            ..Default::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn chains(&self) -> Option<&ChainMembership> {
        self.chains.get()
    }

    /// Chain label for a node id; empty before resolution or when unreachable.
    pub fn chain_label(&self, id: &str) -> String {
        self.chains.get().map(|c| c.label(id)).unwrap_or_default()
    }

    fn install(&self, chains: ChainMembership, graph: TopologyGraph) {
        if self.chains.set(chains).is_err() {
            debug!("Chain membership already resolved for this scrape");
        }
        *self.graph.lock().unwrap_or_else(PoisonError::into_inner) = graph;
    }

    /// Add nodes and edges produced by another collector. Ignored when the
    /// topology module is disabled.
    pub fn extend(&self, nodes: Vec<Node>, edges: Vec<Edge>) {
        if !self.enabled {
            return;
        }
        let mut graph = self.graph.lock().unwrap_or_else(PoisonError::into_inner);
        for node in nodes {
            graph.add_node(node);
        }
        for edge in edges {
            graph.add_edge(edge);
        }
    }

    /// Drop dangling edges and publish the graph.
    pub fn conclude(&self, metrics: &MetricsCollector, target: &Target) {
        if !self.enabled {
            return;
        }
        let mut graph = self.graph.lock().unwrap_or_else(PoisonError::into_inner);
        let dropped = graph.conclude();
        if dropped > 0 {
            debug!(target_url = %target.instance(), dropped, "Dropped edges with missing endpoints");
        }
        graph.publish(metrics, target);
    }

    /// Snapshot of the current graph
    pub fn with_graph<R>(&self, f: impl FnOnce(&TopologyGraph) -> R) -> R {
        f(&self.graph.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

/// One gated fetch. Failures are expected on appliances lacking a feature, so
/// they degrade to `None` at debug level.
async fn fetch<T>(
    ctx: &ScrapeContext,
    source: &str,
    query: impl Future<Output = Result<Vec<T>>>,
) -> Option<Vec<T>> {
    match ctx.gated(query).await {
        Some(Ok(rows)) => Some(rows),
        Some(Err(e)) => {
            debug!(target_url = %ctx.target.instance(), source, "Topology source unavailable: {}", e);
            None
        }
        None => None,
    }
}

/// Fetches every binding table and node listing concurrently, resolves chains
/// and seeds the shared graph.
pub async fn collect_topology(ctx: CollectionContext) -> CollectionResult {
    let client = &ctx.client;
    let (lb_services, lb_service_groups, cs_lb, cs_policies, policies, actions, cs, lb, services) = tokio::join!(
        fetch(&ctx, "lbvserver_service_binding", client.query_lb_service_bindings()),
        fetch(&ctx, "lbvserver_servicegroup_binding", client.query_lb_servicegroup_bindings()),
        fetch(&ctx, "csvserver_lbvserver_binding", client.query_cs_lb_bindings()),
        fetch(&ctx, "csvserver_cspolicy_binding", client.query_cs_policy_bindings()),
        fetch(&ctx, "cspolicy", client.query_cs_policies()),
        fetch(&ctx, "csaction", client.query_cs_actions()),
        fetch(&ctx, "csvserver", client.query_cs_vservers()),
        fetch(&ctx, "lbvserver", client.query_lb_vservers()),
        fetch(&ctx, "service", client.query_services()),
    );

    let fetched = [
        lb_services.is_some(),
        lb_service_groups.is_some(),
        cs_lb.is_some(),
        cs_policies.is_some(),
        policies.is_some(),
        actions.is_some(),
        cs.is_some(),
        lb.is_some(),
        services.is_some(),
    ];
    if !fetched.contains(&true) {
        return Ok(CollectionStatus::Failed);
    }

    let tables = BindingTables {
        lb_services: lb_services.unwrap_or_default(),
        lb_service_groups: lb_service_groups.unwrap_or_default(),
        cs_lb: cs_lb.unwrap_or_default(),
        cs_policies: cs_policies.unwrap_or_default(),
        policies: policies.unwrap_or_default(),
        actions: actions.unwrap_or_default(),
    };
    let listings = NodeListings {
        cs_vservers: cs.unwrap_or_default(),
        lb_vservers: lb.unwrap_or_default(),
        services: services.unwrap_or_default(),
    };

    let (chains, graph) = build_graph(&tables, &listings);
    info!(
        target_url = %ctx.target.instance(),
        nodes = chains.len(),
        "Updated topology metrics"
    );
    ctx.topology.install(chains, graph);
    Ok(CollectionStatus::Success)
}
