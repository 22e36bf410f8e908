//! Service Metrics Collectors
//!
//! # Metrics Produced
//! - `netscaler_service_*` - Labels: service
//! - `netscaler_gslb_service_*` - Labels: service

use super::{collect_with_handler, CollectionContext, CollectionResult};
use crate::metrics::GaugeField;
use crate::netscaler::types::{state_value, GslbServiceStats, ServiceStats};

const SERVICE_FIELDS: &[GaugeField<ServiceStats>] = gauge_fields!(ServiceStats {
    "service_throughput" => throughput: "Throughput of the service in Mbps",
    "service_average_time_to_first_byte" => avgsvrttfb: "Average time to first byte from the server in milliseconds",
    "service_total_requests" => totalrequests: "Requests received by the service",
    "service_total_responses" => totalresponses: "Responses sent by the service",
    "service_total_request_bytes" => totalrequestbytes: "Request bytes received by the service",
    "service_total_response_bytes" => totalresponsebytes: "Response bytes sent by the service",
    "service_current_client_connections" => curclntconnections: "Current client connections",
    "service_surge_count" => surgecount: "Requests in the surge queue",
    "service_current_server_connections" => cursrvrconnections: "Current server connections",
    "service_server_established_connections" => svrestablishedconn: "Established server connections",
    "service_current_reuse_pool" => curreusepool: "Connections in the reuse pool",
    "service_max_clients" => maxclients: "Maximum open connections allowed",
    "service_current_load" => curload: "Load on the service",
    "service_virtual_server_service_hits" => vsvrservicehits: "Times the service was selected by a virtual server",
    "service_active_transactions" => activetransactions: "Active transactions on the service",
});

const GSLB_SERVICE_FIELDS: &[GaugeField<GslbServiceStats>] = gauge_fields!(GslbServiceStats {
    "gslb_service_total_requests" => totalrequests: "Requests received by the service",
    "gslb_service_total_responses" => totalresponses: "Responses sent by the service",
    "gslb_service_total_request_bytes" => totalrequestbytes: "Request bytes received by the service",
    "gslb_service_total_response_bytes" => totalresponsebytes: "Response bytes sent by the service",
    "gslb_service_current_client_connections" => curclntconnections: "Current client connections",
    "gslb_service_current_server_connections" => cursrvrconnections: "Current server connections",
    "gslb_service_established_connections" => establishedconn: "Established connections",
    "gslb_service_current_load" => curload: "Load on the service",
    "gslb_service_virtual_server_service_hits" => vsvrservicehits: "Times the service was selected by a virtual server",
});

pub async fn collect_services(ctx: CollectionContext) -> CollectionResult {
    collect_with_handler("services", ctx.client.query_services(), |services| {
        for service in &services {
            let labels = [("service", service.name.as_str())];
            ctx.metrics.set_gauge(
                "service_state",
                "Service state (1=UP, 0=otherwise)",
                &ctx.target,
                &labels,
                state_value(&service.state),
            );
            ctx.metrics
                .publish_fields(&ctx.target, SERVICE_FIELDS, service, &labels);
        }
    })
    .await
}

pub async fn collect_gslb_services(ctx: CollectionContext) -> CollectionResult {
    collect_with_handler("gslb_services", ctx.client.query_gslb_services(), |services| {
        for service in &services {
            let labels = [("service", service.servicename.as_str())];
            ctx.metrics.set_gauge(
                "gslb_service_state",
                "GSLB service state (1=UP, 0=otherwise)",
                &ctx.target,
                &labels,
                state_value(&service.state),
            );
            ctx.metrics
                .publish_fields(&ctx.target, GSLB_SERVICE_FIELDS, service, &labels);
        }
    })
    .await
}
