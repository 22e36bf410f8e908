//! Service Group Metrics Collector
//!
//! Lists service groups, then fetches member statistics with one nested task per
//! group. The listing can repeat groups and members, so samples are accumulated
//! in a [`MemberArena`] keyed by `(group, member, port)` and published once after
//! every nested task has joined.
//!
//! # Metrics Produced
//! - `netscaler_servicegroup_state` - member state (1=UP, 0=otherwise)
//! - `netscaler_servicegroup_*` - member traffic counters
//!   - Labels: servicegroup, member, port
//!
//! With topology enabled it also adds `servicegroup` and `server` nodes and the
//! `servicegroup -> server` edges to the shared graph.

use super::{CollectionContext, CollectionResult, CollectionStatus};
use crate::metrics::GaugeField;
use crate::netscaler::types::{state_value, ServiceGroupMemberStats};
use crate::topology::{Edge, Node, NodeState, NodeType};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

const MEMBER_FIELDS: &[GaugeField<ServiceGroupMemberStats>] = gauge_fields!(ServiceGroupMemberStats {
    "servicegroup_average_time_to_first_byte" => avgsvrttfb: "Average time to first byte from the member in milliseconds",
    "servicegroup_total_requests" => totalrequests: "Requests received by the member",
    "servicegroup_total_responses" => totalresponses: "Responses sent by the member",
    "servicegroup_total_request_bytes" => totalrequestbytes: "Request bytes received by the member",
    "servicegroup_total_response_bytes" => totalresponsebytes: "Response bytes sent by the member",
    "servicegroup_current_client_connections" => curclntconnections: "Current client connections",
    "servicegroup_surge_count" => surgecount: "Requests in the surge queue",
    "servicegroup_current_server_connections" => cursrvrconnections: "Current server connections",
    "servicegroup_server_established_connections" => svrestablishedconn: "Established server connections",
    "servicegroup_current_reuse_pool" => curreusepool: "Connections in the reuse pool",
    "servicegroup_max_clients" => maxclients: "Maximum open connections allowed",
});

/// `(servicegroup, member, port)`
pub type MemberKey = (String, String, String);

/// Member samples gathered during the nested fan-out, first sample per key wins
#[derive(Debug, Default)]
pub struct MemberArena {
    samples: BTreeMap<MemberKey, ServiceGroupMemberStats>,
}

impl MemberArena {
    /// Returns false when the triple was already recorded.
    pub fn insert(&mut self, group: &str, sample: ServiceGroupMemberStats) -> bool {
        let key = (group.to_string(), sample.member_name(), sample.port());
        if self.samples.contains_key(&key) {
            return false;
        }
        self.samples.insert(key, sample);
        true
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MemberKey, &ServiceGroupMemberStats)> {
        self.samples.iter()
    }
}

enum GroupOutcome {
    Fetched,
    Failed,
    Cancelled,
}

pub async fn collect_service_groups(mut ctx: CollectionContext) -> CollectionResult {
    let listing = match ctx.client.query_service_group_names().await {
        Ok(listing) => listing,
        Err(e) => {
            error!("Failed to query service_groups: {}", e);
            return Ok(CollectionStatus::Failed);
        }
    };

    let mut seen = BTreeSet::new();
    let groups: Vec<String> = listing
        .into_iter()
        .map(|g| g.servicegroupname.trim().to_string())
        .filter(|name| !name.is_empty() && seen.insert(name.clone()))
        .collect();

    // Nested fetches take their own slots.
    ctx.release_slot();

    let arena = Arc::new(Mutex::new(MemberArena::default()));
    let mut tasks = JoinSet::new();
    for group in &groups {
        let scrape = ctx.scrape().clone();
        let arena = arena.clone();
        let group = group.clone();
        tasks.spawn(async move {
            match scrape.gated(scrape.client.query_service_group(&group)).await {
                None => GroupOutcome::Cancelled,
                Some(Err(e)) => {
                    error!(servicegroup = %group, "Failed to query service group members: {}", e);
                    GroupOutcome::Failed
                }
                Some(Ok(stats)) => {
                    let members = stats.map(|s| s.servicegroupmember).unwrap_or_default();
                    let mut arena = arena.lock().unwrap_or_else(PoisonError::into_inner);
                    for member in members {
                        arena.insert(&group, member);
                    }
                    GroupOutcome::Fetched
                }
            }
        });
    }

    let (mut fetched, mut failed) = (0usize, 0usize);
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(GroupOutcome::Fetched) => fetched += 1,
            Ok(GroupOutcome::Failed) => failed += 1,
            Ok(GroupOutcome::Cancelled) => {}
            Err(e) => {
                warn!("Service group task failed to join: {}", e);
                failed += 1;
            }
        }
    }

    let arena = arena.lock().unwrap_or_else(PoisonError::into_inner);
    publish_members(&ctx, &arena);
    if ctx.topology.is_enabled() {
        publish_topology(&ctx, &groups, &arena);
    }

    if fetched == 0 && failed > 0 {
        return Ok(CollectionStatus::Failed);
    }
    info!(
        groups = groups.len(),
        members = arena.len(),
        "Updated service_groups metrics"
    );
    Ok(CollectionStatus::Success)
}

fn publish_members(ctx: &CollectionContext, arena: &MemberArena) {
    for ((group, member, port), sample) in arena.iter() {
        let labels = [
            ("servicegroup", group.as_str()),
            ("member", member.as_str()),
            ("port", port.as_str()),
        ];
        ctx.metrics.set_gauge(
            "servicegroup_state",
            "Service group member state (1=UP, 0=otherwise)",
            &ctx.target,
            &labels,
            state_value(&sample.state),
        );
        ctx.metrics
            .publish_fields(&ctx.target, MEMBER_FIELDS, sample, &labels);
    }
}

/// Group nodes are always UP; servers take their member state and inherit the
/// group's chain.
fn publish_topology(ctx: &CollectionContext, groups: &[String], arena: &MemberArena) {
    let mut nodes = Vec::new();
    let mut edges = Vec::new();

    for group in groups {
        let id = NodeType::ServiceGroup.node_id(group);
        let chain = ctx.topology.chain_label(&id);
        nodes.push(Node::new(NodeType::ServiceGroup, group, NodeState::Up).with_chain(chain));
    }

    for ((group, member, port), sample) in arena.iter() {
        let group_id = NodeType::ServiceGroup.node_id(group);
        let chain = ctx.topology.chain_label(&group_id);
        let mut server = Node::new(
            NodeType::Server,
            &format!("{}:{}", sample.primaryipaddress, port),
            NodeState::from_nitro(&sample.state),
        )
        .with_chain(chain);
        server.title = format!("{member}:{port}");
        server.requests = crate::netscaler::types::num(&sample.totalrequests);
        server.connections = crate::netscaler::types::num(&sample.curclntconnections);
        server.ttfb_ms = crate::netscaler::types::num(&sample.avgsvrttfb);

        edges.push(Edge::new(
            group_id,
            server.id.clone(),
            "1".to_string(),
            "0".to_string(),
        ));
        nodes.push(server);
    }

    ctx.topology.extend(nodes, edges);
}
