//! Routing graph resolution
//!
//! Pure functions over the six binding tables. Content switches reach load
//! balancers either directly or through one level of policy indirection
//! (policy -> action -> target load balancer); load balancers fan out to
//! services and service groups.
//!
//! A chain is named after its entry point: every content switch, plus every
//! load balancer that no content switch references. Membership is a set because
//! shared backends are reachable from several entry points.

use crate::netscaler::types::{
    CsAction, CsLbBinding, CsPolicy, CsPolicyBinding, CsVserverStats, LbServiceBinding,
    LbServiceGroupBinding, LbVserverStats, NitroValue, ServiceStats,
};
use crate::netscaler::types::num;
use crate::topology::graph::{Edge, Node, NodeState, NodeType, TopologyGraph};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

const DEFAULT_WEIGHT: &str = "1";
const DEFAULT_PRIORITY: &str = "0";

/// Raw binding tables as fetched. A table whose fetch failed is empty.
#[derive(Debug, Clone, Default)]
pub struct BindingTables {
    pub lb_services: Vec<LbServiceBinding>,
    pub lb_service_groups: Vec<LbServiceGroupBinding>,
    pub cs_lb: Vec<CsLbBinding>,
    pub cs_policies: Vec<CsPolicyBinding>,
    pub policies: Vec<CsPolicy>,
    pub actions: Vec<CsAction>,
}

/// Stat listings that supply node state for the graph
#[derive(Debug, Clone, Default)]
pub struct NodeListings {
    pub cs_vservers: Vec<CsVserverStats>,
    pub lb_vservers: Vec<LbVserverStats>,
    pub services: Vec<ServiceStats>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingSource {
    Direct,
    Policy(String),
}

/// One resolved content switch -> load balancer relationship
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsLbMapping {
    pub cs: String,
    pub lb: String,
    pub priority: Option<String>,
    /// Policy bind point (REQUEST/RESPONSE) when resolved through a policy
    pub bindpoint: Option<String>,
    pub source: MappingSource,
}

/// Non-empty trimmed text or `None`
fn present(value: &str) -> Option<&str> {
    Some(value.trim()).filter(|v| !v.is_empty())
}

fn label(value: &Option<NitroValue>) -> Option<String> {
    value
        .as_ref()
        .map(NitroValue::to_label)
        .filter(|v| !v.is_empty())
}

/// Merge direct and policy-based content switch bindings.
///
/// Direct bindings come first. A policy binding names its target load balancer
/// itself or through its policy's action. Deduplicated by `(cs, lb)`, first
/// occurrence wins. Policies that do not resolve to a load balancer are dropped.
pub fn resolve_cs_to_lb(tables: &BindingTables) -> Vec<CsLbMapping> {
    let policy_to_action: BTreeMap<&str, &str> = tables
        .policies
        .iter()
        .filter_map(|p| Some((present(&p.policyname)?, p.action.as_deref().and_then(present)?)))
        .collect();
    let action_to_lb: BTreeMap<&str, &str> = tables
        .actions
        .iter()
        .filter_map(|a| Some((present(&a.name)?, a.targetlbvserver.as_deref().and_then(present)?)))
        .collect();

    let mut seen = BTreeSet::new();
    let mut mappings = Vec::new();
    let mut push = |mapping: CsLbMapping| {
        if seen.insert((mapping.cs.clone(), mapping.lb.clone())) {
            mappings.push(mapping);
        }
    };

    for binding in &tables.cs_lb {
        let (Some(cs), Some(lb)) = (present(&binding.name), present(&binding.lbvserver))
        else {
            continue;
        };
        push(CsLbMapping {
            cs: cs.to_string(),
            lb: lb.to_string(),
            priority: label(&binding.priority),
            bindpoint: None,
            source: MappingSource::Direct,
        });
    }

    for binding in &tables.cs_policies {
        let Some(cs) = present(&binding.name) else {
            continue;
        };
        let policy = binding.policyname.trim();
        let lb = binding.targetlbvserver.as_deref().and_then(present).or_else(|| {
            policy_to_action
                .get(policy)
                .and_then(|action| action_to_lb.get(action))
                .copied()
        });
        match lb {
            Some(lb) => push(CsLbMapping {
                cs: cs.to_string(),
                lb: lb.to_string(),
                priority: label(&binding.priority),
                bindpoint: binding.bindpoint.as_deref().and_then(present).map(str::to_string),
                source: MappingSource::Policy(policy.to_string()),
            }),
            None => debug!(cs, policy, "Policy binding does not resolve to a load balancer"),
        }
    }

    mappings
}

/// Chain names per node id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainMembership(BTreeMap<String, BTreeSet<String>>);

impl ChainMembership {
    pub fn mark(&mut self, id: String, chain: &str) {
        self.0.entry(id).or_default().insert(chain.to_string());
    }

    pub fn get(&self, id: &str) -> Option<&BTreeSet<String>> {
        self.0.get(id)
    }

    /// Sorted, comma-joined chain names; empty when the node is in no chain.
    pub fn label(&self, id: &str) -> String {
        self.0
            .get(id)
            .map(|chains| chains.iter().map(String::as_str).collect::<Vec<_>>().join(","))
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone)]
struct Fanout {
    target: String,
    weight: String,
}

/// Lookup indices over the binding tables, keyed by source vserver
#[derive(Debug, Clone, Default)]
pub struct TopologyIndex {
    services_by_lb: BTreeMap<String, Vec<Fanout>>,
    groups_by_lb: BTreeMap<String, Vec<Fanout>>,
    lbs_by_cs: BTreeMap<String, Vec<CsLbMapping>>,
    cs_by_lb: BTreeMap<String, Vec<String>>,
    mappings: Vec<CsLbMapping>,
}

impl TopologyIndex {
    pub fn build(tables: &BindingTables) -> Self {
        let mut index = Self::default();

        for binding in &tables.lb_services {
            if let (Some(lb), Some(service)) =
                (present(&binding.name), present(&binding.servicename))
            {
                index.services_by_lb.entry(lb.to_string()).or_default().push(Fanout {
                    target: service.to_string(),
                    weight: label(&binding.weight).unwrap_or_else(|| DEFAULT_WEIGHT.to_string()),
                });
            }
        }
        for binding in &tables.lb_service_groups {
            if let (Some(lb), Some(group)) =
                (present(&binding.name), present(&binding.servicegroupname))
            {
                index.groups_by_lb.entry(lb.to_string()).or_default().push(Fanout {
                    target: group.to_string(),
                    weight: label(&binding.weight).unwrap_or_else(|| DEFAULT_WEIGHT.to_string()),
                });
            }
        }

        index.mappings = resolve_cs_to_lb(tables);
        for mapping in &index.mappings {
            index
                .lbs_by_cs
                .entry(mapping.cs.clone())
                .or_default()
                .push(mapping.clone());
            index
                .cs_by_lb
                .entry(mapping.lb.clone())
                .or_default()
                .push(mapping.cs.clone());
        }

        index
    }

    pub fn mappings(&self) -> &[CsLbMapping] {
        &self.mappings
    }

    /// Content switches that route to `lb`
    pub fn parents_of(&self, lb: &str) -> &[String] {
        self.cs_by_lb.get(lb).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Chain membership for every reachable node.
    ///
    /// `known_cs` and `known_lb` are vservers seen in stat listings; unbound ones
    /// still form a chain of their own.
    pub fn chain_membership(&self, known_cs: &[String], known_lb: &[String]) -> ChainMembership {
        let mut chains = ChainMembership::default();

        let content_switches: BTreeSet<&str> = known_cs
            .iter()
            .map(String::as_str)
            .chain(self.lbs_by_cs.keys().map(String::as_str))
            .collect();
        for cs in content_switches {
            chains.mark(NodeType::CsVserver.node_id(cs), cs);
            for mapping in self.lbs_by_cs.get(cs).into_iter().flatten() {
                chains.mark(NodeType::LbVserver.node_id(&mapping.lb), cs);
                self.mark_downstream(&mut chains, &mapping.lb, cs);
            }
        }

        let load_balancers: BTreeSet<&str> = known_lb
            .iter()
            .map(String::as_str)
            .chain(self.services_by_lb.keys().map(String::as_str))
            .chain(self.groups_by_lb.keys().map(String::as_str))
            .collect();
        for lb in load_balancers {
            if self.cs_by_lb.contains_key(lb) {
                continue;
            }
            chains.mark(NodeType::LbVserver.node_id(lb), lb);
            self.mark_downstream(&mut chains, lb, lb);
        }

        chains
    }

    fn mark_downstream(&self, chains: &mut ChainMembership, lb: &str, chain: &str) {
        for service in self.services_by_lb.get(lb).into_iter().flatten() {
            chains.mark(NodeType::Service.node_id(&service.target), chain);
        }
        for group in self.groups_by_lb.get(lb).into_iter().flatten() {
            chains.mark(NodeType::ServiceGroup.node_id(&group.target), chain);
        }
    }

    /// One edge per fan-out binding: lb->service, lb->servicegroup, cs->lb.
    pub fn edges(&self) -> Vec<Edge> {
        let mut edges = Vec::new();
        for (lb, services) in &self.services_by_lb {
            for service in services {
                edges.push(Edge::new(
                    NodeType::LbVserver.node_id(lb),
                    NodeType::Service.node_id(&service.target),
                    service.weight.clone(),
                    DEFAULT_PRIORITY.to_string(),
                ));
            }
        }
        for (lb, groups) in &self.groups_by_lb {
            for group in groups {
                edges.push(Edge::new(
                    NodeType::LbVserver.node_id(lb),
                    NodeType::ServiceGroup.node_id(&group.target),
                    group.weight.clone(),
                    DEFAULT_PRIORITY.to_string(),
                ));
            }
        }
        for mapping in &self.mappings {
            edges.push(Edge::new(
                NodeType::CsVserver.node_id(&mapping.cs),
                NodeType::LbVserver.node_id(&mapping.lb),
                DEFAULT_WEIGHT.to_string(),
                mapping
                    .priority
                    .clone()
                    .unwrap_or_else(|| DEFAULT_PRIORITY.to_string()),
            ));
        }
        edges
    }
}

/// Resolve chains and seed a graph with vserver/service nodes and all binding
/// edges. Service group nodes are added later by the member collector; the graph
/// still needs [`TopologyGraph::conclude`] before it is published.
pub fn build_graph(tables: &BindingTables, listings: &NodeListings) -> (ChainMembership, TopologyGraph) {
    let index = TopologyIndex::build(tables);
    let known_cs: Vec<String> = listings.cs_vservers.iter().map(|v| v.name.clone()).collect();
    let known_lb: Vec<String> = listings.lb_vservers.iter().map(|v| v.name.clone()).collect();
    let chains = index.chain_membership(&known_cs, &known_lb);

    let mut graph = TopologyGraph::new();
    for cs in &listings.cs_vservers {
        let mut node = Node::new(NodeType::CsVserver, &cs.name, NodeState::from_nitro(&cs.state));
        node.chain = chains.label(&node.id);
        node.requests = num(&cs.totalrequests);
        node.connections = num(&cs.curclntconnections);
        graph.add_node(node);
    }
    for lb in &listings.lb_vservers {
        let mut node = Node::new(NodeType::LbVserver, &lb.name, NodeState::from_nitro(&lb.state));
        node.chain = chains.label(&node.id);
        node.health = num(&lb.vslbhealth);
        node.requests = num(&lb.totalrequests);
        node.connections = num(&lb.curclntconnections);
        graph.add_node(node);
    }
    for service in &listings.services {
        let mut node = Node::new(
            NodeType::Service,
            &service.name,
            NodeState::from_nitro(&service.state),
        );
        node.chain = chains.label(&node.id);
        node.requests = num(&service.totalrequests);
        node.connections = num(&service.curclntconnections);
        node.ttfb_ms = num(&service.avgsvrttfb);
        graph.add_node(node);
    }
    for edge in index.edges() {
        graph.add_edge(edge);
    }

    (chains, graph)
}
