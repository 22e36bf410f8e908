//! Appliance-wide Metrics Collectors
//!
//! Collects global counters from `stat/ns`, the license model, per-core CPU
//! usage, bandwidth capacity and AAA session counters.
//!
//! # Metrics Produced
//! - `netscaler_cpu_usage_percent`, `netscaler_mem_usage_percent`, ... - from `stat/ns`
//! - `netscaler_model_id` - licensed model number
//! - `netscaler_cpu_core_usage_percent` - Labels: core
//! - `netscaler_capacity_*_bandwidth` - licensed and observed bandwidth
//! - `netscaler_aaa_*` - AAA authentication and ICA session counters

use super::{collect_with_handler, CollectionContext, CollectionResult};
use crate::metrics::GaugeField;
use crate::netscaler::types::{num, AaaStats, NsCapacityStats, NsStats};

const NS_FIELDS: &[GaugeField<NsStats>] = gauge_fields!(NsStats {
    "cpu_usage_percent" => cpuusagepcnt: "CPU utilization percentage",
    "mem_usage_percent" => memusagepcnt: "Memory utilization percentage",
    "mgmt_cpu_usage_percent" => mgmtcpuusagepcnt: "Management CPU utilization percentage",
    "pkt_cpu_usage_percent" => pktcpuusagepcnt: "Packet engine CPU utilization percentage",
    "flash_partition_usage_percent" => disk0perusage: "Used space in /flash partition percentage",
    "var_partition_usage_percent" => disk1perusage: "Used space in /var partition percentage",
    "received_mbits" => totrxmbits: "Megabits received by the appliance",
    "transmitted_mbits" => tottxmbits: "Megabits transmitted by the appliance",
    "http_requests" => httptotrequests: "Total HTTP requests received",
    "http_responses" => httptotresponses: "Total HTTP responses sent",
    "tcp_current_client_connections" => tcpcurclientconn: "Client connections, including those not yet established",
    "tcp_current_client_connections_established" => tcpcurclientconnestablished: "Established client connections",
    "tcp_current_server_connections" => tcpcurserverconn: "Server connections, including those not yet established",
    "tcp_current_server_connections_established" => tcpcurserverconnestablished: "Established server connections",
});

const CAPACITY_FIELDS: &[GaugeField<NsCapacityStats>] = gauge_fields!(NsCapacityStats {
    "capacity_max_bandwidth" => maxbandwidth: "Maximum licensed bandwidth in Mbps",
    "capacity_min_bandwidth" => minbandwidth: "Minimum licensed bandwidth in Mbps",
    "capacity_actual_bandwidth" => actualbandwidth: "Actual bandwidth in Mbps",
    "capacity_bandwidth" => bandwidth: "Configured bandwidth in Mbps",
});

const AAA_FIELDS: &[GaugeField<AaaStats>] = gauge_fields!(AaaStats {
    "aaa_auth_success" => aaaauthsuccess: "Authentication successes",
    "aaa_auth_fail" => aaaauthfail: "Authentication failures",
    "aaa_auth_only_http_success" => aaaauthonlyhttpsuccess: "HTTP-only authentication successes",
    "aaa_auth_only_http_fail" => aaaauthonlyhttpfail: "HTTP-only authentication failures",
    "aaa_current_ica_sessions" => aaacuricasessions: "Current ICA sessions",
    "aaa_current_ica_only_connections" => aaacuricaonlyconn: "Current ICA-only connections",
});

pub async fn collect_ns_stats(ctx: CollectionContext) -> CollectionResult {
    collect_with_handler("ns_stats", ctx.client.query_ns_stats(), |stats| {
        ctx.metrics.publish_fields(&ctx.target, NS_FIELDS, &stats, &[]);
    })
    .await
}

pub async fn collect_ns_license(ctx: CollectionContext) -> CollectionResult {
    collect_with_handler("ns_license", ctx.client.query_ns_license(), |license| {
        if let Some(model) = num(&license.modelid) {
            ctx.metrics
                .set_gauge("model_id", "Licensed model number", &ctx.target, &[], model);
        }
    })
    .await
}

pub async fn collect_system_cpu(ctx: CollectionContext) -> CollectionResult {
    collect_with_handler("system_cpu", ctx.client.query_system_cpus(), |cpus| {
        for cpu in cpus {
            if let Some(usage) = num(&cpu.percpuuse) {
                ctx.metrics.set_gauge(
                    "cpu_core_usage_percent",
                    "Per-core CPU utilization percentage",
                    &ctx.target,
                    &[("core", cpu.id.as_str())],
                    usage,
                );
            }
        }
    })
    .await
}

pub async fn collect_ns_capacity(ctx: CollectionContext) -> CollectionResult {
    collect_with_handler("ns_capacity", ctx.client.query_ns_capacity(), |capacity| {
        ctx.metrics
            .publish_fields(&ctx.target, CAPACITY_FIELDS, &capacity, &[]);
    })
    .await
}

pub async fn collect_aaa_stats(ctx: CollectionContext) -> CollectionResult {
    collect_with_handler("aaa_stats", ctx.client.query_aaa_stats(), |aaa| {
        ctx.metrics.publish_fields(&ctx.target, AAA_FIELDS, &aaa, &[]);
    })
    .await
}
