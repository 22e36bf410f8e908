//! Network Interface Metrics Collector
//!
//! # Metrics Produced
//! - `netscaler_interfaces_received_bytes` / `_transmitted_bytes`
//! - `netscaler_interfaces_received_packets` / `_transmitted_packets`
//! - `netscaler_interfaces_jumbo_packets_received` / `_transmitted`
//! - `netscaler_interfaces_error_packets_received`
//!   - Labels: interface, alias

use super::{collect_with_handler, CollectionContext, CollectionResult};
use crate::metrics::GaugeField;
use crate::netscaler::types::InterfaceStats;

const INTERFACE_FIELDS: &[GaugeField<InterfaceStats>] = gauge_fields!(InterfaceStats {
    "interfaces_received_bytes" => totrxbytes: "Bytes received by the interface",
    "interfaces_transmitted_bytes" => tottxbytes: "Bytes transmitted by the interface",
    "interfaces_received_packets" => totrxpkts: "Packets received by the interface",
    "interfaces_transmitted_packets" => tottxpkts: "Packets transmitted by the interface",
    "interfaces_jumbo_packets_received" => jumbopktsreceived: "Jumbo packets received by the interface",
    "interfaces_jumbo_packets_transmitted" => jumbopktstransmitted: "Jumbo packets transmitted by the interface",
    "interfaces_error_packets_received" => errpktrx: "Error packets received by the interface",
});

pub async fn collect_interfaces(ctx: CollectionContext) -> CollectionResult {
    collect_with_handler("interfaces", ctx.client.query_interfaces(), |interfaces| {
        for iface in &interfaces {
            ctx.metrics.publish_fields(
                &ctx.target,
                INTERFACE_FIELDS,
                iface,
                &[
                    ("interface", iface.id.as_str()),
                    ("alias", iface.interfacealias.as_str()),
                ],
            );
        }
    })
    .await
}
