//! ADM (MPS) Health Collector
//!
//! # Metrics Produced
//! - `netscaler_mps_cpu_usage`, `netscaler_mps_memory_usage`, `netscaler_mps_disk_usage`
//! - `netscaler_mps_memory_*` / `netscaler_mps_disk_*` capacity gauges
//!   - Labels: node_type

use super::{collect_with_handler, CollectionContext, CollectionResult};
use crate::metrics::GaugeField;
use crate::netscaler::types::MpsHealth;

const MPS_FIELDS: &[GaugeField<MpsHealth>] = gauge_fields!(MpsHealth {
    "mps_cpu_usage" => cpu_usage: "CPU utilization percentage",
    "mps_disk_usage" => disk_usage: "Disk utilization percentage",
    "mps_disk_free" => disk_free: "Free disk space",
    "mps_disk_total" => disk_total: "Total disk space",
    "mps_disk_used" => disk_used: "Used disk space",
    "mps_memory_usage" => memory_usage: "Memory utilization percentage",
    "mps_memory_free" => memory_free: "Free memory",
    "mps_memory_total" => memory_total: "Total memory",
});

pub async fn collect_mps_health(ctx: CollectionContext) -> CollectionResult {
    collect_with_handler("mps_health", ctx.client.query_mps_health(), |health| {
        ctx.metrics.publish_fields(
            &ctx.target,
            MPS_FIELDS,
            &health,
            &[("node_type", health.node_type.as_str())],
        );
    })
    .await
}
