//! High Availability Metrics Collector
//!
//! Combines the HA node configuration (`config/hanode`) with the global HA
//! counters (`stat/hanode`). Either half may fail without dropping the other.
//!
//! # Metrics Produced
//!
//! Per node (Labels: node_id, name, ip):
//! - `netscaler_ha_node_state` - 1 when the node is Primary
//! - `netscaler_ha_node_status` - 1 when HA status is UP
//! - `netscaler_ha_node_sync_state` - 1 when config sync is SUCCESS or ENABLED
//! - `netscaler_ha_node_master_state_seconds` - time in the current master state
//!
//! Global:
//! - `netscaler_ha_current_state` - 1 when the local HA state is UP
//! - `netscaler_ha_packets_rx_total` / `netscaler_ha_packets_tx_total`
//! - `netscaler_ha_sync_failures_total` / `netscaler_ha_prop_timeouts_total`

use super::{CollectionContext, CollectionResult, CollectionStatus};
use crate::metrics::GaugeField;
use crate::netscaler::types::{num, HaNodeConfig, HaNodeStats};
use tracing::{error, info};

const HA_FIELDS: &[GaugeField<HaNodeStats>] = gauge_fields!(HaNodeStats {
    "ha_packets_rx_total" => hatotpktrx: "Heartbeat packets received from the peer",
    "ha_packets_tx_total" => hatotpkttx: "Heartbeat packets sent to the peer",
    "ha_sync_failures_total" => haerrsyncfailure: "Configuration sync failures",
    "ha_prop_timeouts_total" => haerrproptimeout: "Command propagation timeouts",
});

fn flag(matches: bool) -> f64 {
    if matches {
        1.0
    } else {
        0.0
    }
}

pub(crate) fn node_state_value(state: &str) -> f64 {
    flag(state.eq_ignore_ascii_case("primary"))
}

pub(crate) fn node_status_value(status: &str) -> f64 {
    flag(status.eq_ignore_ascii_case("up"))
}

pub(crate) fn sync_state_value(sync: &str) -> f64 {
    flag(sync.eq_ignore_ascii_case("success") || sync.eq_ignore_ascii_case("enabled"))
}

pub async fn collect_ha_node(ctx: CollectionContext) -> CollectionResult {
    let (nodes, stats) = tokio::join!(ctx.client.query_ha_nodes(), ctx.client.query_ha_stats());

    let nodes_ok = match nodes {
        Ok(nodes) => {
            publish_nodes(&ctx, &nodes);
            true
        }
        Err(e) => {
            error!("Failed to query ha_node configuration: {}", e);
            false
        }
    };

    let stats_ok = match stats {
        Ok(stats) => {
            ctx.metrics.set_gauge(
                "ha_current_state",
                "Local HA state (1=UP, 0=otherwise)",
                &ctx.target,
                &[],
                node_status_value(&stats.hacurstate),
            );
            ctx.metrics.publish_fields(&ctx.target, HA_FIELDS, &stats, &[]);
            true
        }
        Err(e) => {
            error!("Failed to query ha_node statistics: {}", e);
            false
        }
    };

    if !nodes_ok && !stats_ok {
        return Ok(CollectionStatus::Failed);
    }
    info!("Updated ha_node metrics");
    Ok(CollectionStatus::Success)
}

fn publish_nodes(ctx: &CollectionContext, nodes: &[HaNodeConfig]) {
    for node in nodes {
        let id = node.id.as_ref().map(|v| v.to_label()).unwrap_or_default();
        let labels = [
            ("node_id", id.as_str()),
            ("name", node.name.as_str()),
            ("ip", node.ipaddress.as_str()),
        ];

        ctx.metrics.set_gauge(
            "ha_node_state",
            "HA node state (1=Primary, 0=otherwise)",
            &ctx.target,
            &labels,
            node_state_value(&node.state),
        );
        ctx.metrics.set_gauge(
            "ha_node_status",
            "HA node status (1=UP, 0=otherwise)",
            &ctx.target,
            &labels,
            node_status_value(&node.hastatus),
        );
        ctx.metrics.set_gauge(
            "ha_node_sync_state",
            "HA config sync state (1=SUCCESS or ENABLED, 0=otherwise)",
            &ctx.target,
            &labels,
            sync_state_value(&node.hasync),
        );
        if let Some(seconds) = num(&node.masterstatetime) {
            ctx.metrics.set_gauge(
                "ha_node_master_state_seconds",
                "Time the node has been in its current master state",
                &ctx.target,
                &labels,
                seconds,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ha_string_states_map_to_flags() {
        assert_eq!(node_state_value("Primary"), 1.0);
        assert_eq!(node_state_value("Secondary"), 0.0);
        assert_eq!(node_status_value("UP"), 1.0);
        assert_eq!(node_status_value("DOWN"), 0.0);
        assert_eq!(sync_state_value("SUCCESS"), 1.0);
        assert_eq!(sync_state_value("ENABLED"), 1.0);
        assert_eq!(sync_state_value("FAILED"), 0.0);
    }
}
