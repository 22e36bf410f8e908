//! Virtual Server Metrics Collectors
//!
//! Collects load balancing, content switching, GSLB and VPN virtual servers.
//!
//! # Metrics Produced
//! - `netscaler_virtual_servers_*` - load balancing vservers
//! - `netscaler_cs_virtual_servers_*` - content switching vservers
//! - `netscaler_gslb_virtual_servers_*` - GSLB vservers
//! - `netscaler_vpn_virtual_servers_*` - Gateway vservers
//!   - Labels: virtual_server
//!
//! Each family set includes a `_state` gauge (1=UP, 0=otherwise).

use super::{collect_with_handler, CollectionContext, CollectionResult};
use crate::metrics::GaugeField;
use crate::netscaler::types::{
    state_value, CsVserverStats, GslbVserverStats, LbVserverStats, VpnVserverStats,
};

const LB_FIELDS: &[GaugeField<LbVserverStats>] = gauge_fields!(LbVserverStats {
    "virtual_servers_waiting_requests" => vsvrsurgecount: "Requests waiting on the virtual server",
    "virtual_servers_health" => vslbhealth: "Percentage of UP services bound to the virtual server",
    "virtual_servers_inactive_services" => inactsvcs: "Inactive services bound to the virtual server",
    "virtual_servers_active_services" => actsvcs: "Active services bound to the virtual server",
    "virtual_servers_total_hits" => tothits: "Requests for which the virtual server was selected",
    "virtual_servers_total_requests" => totalrequests: "Requests received by the virtual server",
    "virtual_servers_total_responses" => totalresponses: "Responses sent by the virtual server",
    "virtual_servers_total_request_bytes" => totalrequestbytes: "Request bytes received by the virtual server",
    "virtual_servers_total_response_bytes" => totalresponsebytes: "Response bytes sent by the virtual server",
    "virtual_servers_current_client_connections" => curclntconnections: "Current client connections",
    "virtual_servers_current_server_connections" => cursrvrconnections: "Current server connections",
});

const CS_FIELDS: &[GaugeField<CsVserverStats>] = gauge_fields!(CsVserverStats {
    "cs_virtual_servers_total_hits" => tothits: "Requests for which the virtual server was selected",
    "cs_virtual_servers_total_requests" => totalrequests: "Requests received by the virtual server",
    "cs_virtual_servers_total_responses" => totalresponses: "Responses sent by the virtual server",
    "cs_virtual_servers_total_request_bytes" => totalrequestbytes: "Request bytes received by the virtual server",
    "cs_virtual_servers_total_response_bytes" => totalresponsebytes: "Response bytes sent by the virtual server",
    "cs_virtual_servers_current_client_connections" => curclntconnections: "Current client connections",
    "cs_virtual_servers_current_server_connections" => cursrvrconnections: "Current server connections",
    "cs_virtual_servers_established_connections" => establishedconn: "Established client connections",
    "cs_virtual_servers_total_packets_received" => totalpktsrecvd: "Packets received by the virtual server",
    "cs_virtual_servers_total_packets_sent" => totalpktssent: "Packets sent by the virtual server",
    "cs_virtual_servers_total_spillovers" => totspillovers: "Times traffic spilled over to the backup virtual server",
    "cs_virtual_servers_deferred_requests" => deferredreq: "Requests deferred by the virtual server",
    "cs_virtual_servers_number_invalid_request_response" => invalidrequestresponse: "Invalid requests and responses",
    "cs_virtual_servers_number_invalid_request_response_dropped" => invalidrequestresponsedropped: "Invalid requests and responses dropped",
    "cs_virtual_servers_total_vserver_down_backup_hits" => totvserverdownbackuphits: "Hits on the backup virtual server while the primary was down",
    "cs_virtual_servers_current_multipath_sessions" => curmptcpsessions: "Current multipath TCP sessions",
    "cs_virtual_servers_current_multipath_subflows" => cursubflowconn: "Current multipath TCP subflows",
});

const GSLB_FIELDS: &[GaugeField<GslbVserverStats>] = gauge_fields!(GslbVserverStats {
    "gslb_virtual_servers_health" => vslbhealth: "Percentage of UP services bound to the virtual server",
    "gslb_virtual_servers_inactive_services" => inactsvcs: "Inactive services bound to the virtual server",
    "gslb_virtual_servers_active_services" => actsvcs: "Active services bound to the virtual server",
    "gslb_virtual_servers_total_hits" => tothits: "Requests for which the virtual server was selected",
    "gslb_virtual_servers_total_requests" => totalrequests: "Requests received by the virtual server",
    "gslb_virtual_servers_total_responses" => totalresponses: "Responses sent by the virtual server",
    "gslb_virtual_servers_total_request_bytes" => totalrequestbytes: "Request bytes received by the virtual server",
    "gslb_virtual_servers_total_response_bytes" => totalresponsebytes: "Response bytes sent by the virtual server",
    "gslb_virtual_servers_current_client_connections" => curclntconnections: "Current client connections",
    "gslb_virtual_servers_current_server_connections" => cursrvrconnections: "Current server connections",
});

const VPN_FIELDS: &[GaugeField<VpnVserverStats>] = gauge_fields!(VpnVserverStats {
    "vpn_virtual_servers_total_requests" => totalrequests: "Requests received by the virtual server",
    "vpn_virtual_servers_total_responses" => totalresponses: "Responses sent by the virtual server",
    "vpn_virtual_servers_total_request_bytes" => totalrequestbytes: "Request bytes received by the virtual server",
    "vpn_virtual_servers_total_response_bytes" => totalresponsebytes: "Response bytes sent by the virtual server",
});

pub async fn collect_lb_vservers(ctx: CollectionContext) -> CollectionResult {
    collect_with_handler("virtual_servers", ctx.client.query_lb_vservers(), |vservers| {
        for vserver in &vservers {
            let labels = [("virtual_server", vserver.name.as_str())];
            ctx.metrics.set_gauge(
                "virtual_servers_state",
                "Virtual server state (1=UP, 0=otherwise)",
                &ctx.target,
                &labels,
                state_value(&vserver.state),
            );
            ctx.metrics
                .publish_fields(&ctx.target, LB_FIELDS, vserver, &labels);
        }
    })
    .await
}

pub async fn collect_cs_vservers(ctx: CollectionContext) -> CollectionResult {
    collect_with_handler("cs_vservers", ctx.client.query_cs_vservers(), |vservers| {
        for vserver in &vservers {
            let labels = [("virtual_server", vserver.name.as_str())];
            ctx.metrics.set_gauge(
                "cs_virtual_servers_state",
                "Content switching virtual server state (1=UP, 0=otherwise)",
                &ctx.target,
                &labels,
                state_value(&vserver.state),
            );
            ctx.metrics
                .publish_fields(&ctx.target, CS_FIELDS, vserver, &labels);
        }
    })
    .await
}

pub async fn collect_gslb_vservers(ctx: CollectionContext) -> CollectionResult {
    collect_with_handler("gslb_vservers", ctx.client.query_gslb_vservers(), |vservers| {
        for vserver in &vservers {
            let labels = [("virtual_server", vserver.name.as_str())];
            ctx.metrics.set_gauge(
                "gslb_virtual_servers_state",
                "GSLB virtual server state (1=UP, 0=otherwise)",
                &ctx.target,
                &labels,
                state_value(&vserver.state),
            );
            ctx.metrics
                .publish_fields(&ctx.target, GSLB_FIELDS, vserver, &labels);
        }
    })
    .await
}

pub async fn collect_vpn_vservers(ctx: CollectionContext) -> CollectionResult {
    collect_with_handler("vpn_vservers", ctx.client.query_vpn_vservers(), |vservers| {
        for vserver in &vservers {
            let labels = [("virtual_server", vserver.name.as_str())];
            ctx.metrics.set_gauge(
                "vpn_virtual_servers_state",
                "Gateway virtual server state (1=UP, 0=otherwise)",
                &ctx.target,
                &labels,
                state_value(&vserver.state),
            );
            ctx.metrics
                .publish_fields(&ctx.target, VPN_FIELDS, vserver, &labels);
        }
    })
    .await
}
