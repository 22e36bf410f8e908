//! Protocol Counter Collectors
//!
//! Global HTTP, TCP and IP counters from `stat/protocolhttp`, `stat/protocoltcp`
//! and `stat/protocolip`. Counters end in `_total`, per-second rates in `_rate`.
//!
//! # Metrics Produced
//! - `netscaler_http_*` - request, response and error counters
//! - `netscaler_tcp_*` - connection, packet and error counters
//! - `netscaler_ip_*` - packet, byte and drop counters

use super::{collect_with_handler, CollectionContext, CollectionResult};
use crate::metrics::GaugeField;
use crate::netscaler::types::{ProtocolHttpStats, ProtocolIpStats, ProtocolTcpStats};

const HTTP_FIELDS: &[GaugeField<ProtocolHttpStats>] = gauge_fields!(ProtocolHttpStats {
    "http_requests_total" => httptotrequests: "HTTP requests received",
    "http_responses_total" => httptotresponses: "HTTP responses sent",
    "http_posts_total" => httptotposts: "HTTP POST requests received",
    "http_gets_total" => httptotgets: "HTTP GET requests received",
    "http_others_total" => httptotothers: "HTTP requests with other methods received",
    "http_request_bytes_received_total" => httptotrxrequestbytes: "HTTP request bytes received",
    "http_response_bytes_received_total" => httptotrxresponsebytes: "HTTP response bytes received",
    "http_request_bytes_transmitted_total" => httptottxrequestbytes: "HTTP request bytes transmitted",
    "http_chunked_requests_total" => httptotchunkedrequests: "Chunked HTTP requests received",
    "http_chunked_responses_total" => httptotchunkedresponses: "Chunked HTTP responses sent",
    "http_incomplete_headers_total" => httperrincompleteheaders: "HTTP requests and responses with incomplete headers",
    "http_incomplete_requests_total" => httperrincompleterequests: "Incomplete HTTP requests",
    "http_incomplete_responses_total" => httperrincompleteresponses: "Incomplete HTTP responses",
    "http_server_busy_errors_total" => httperrserverbusy: "HTTP server busy errors",
    "http_large_content_errors_total" => httperrlargecontent: "Requests and responses with content larger than the limit",
    "http_large_chunk_errors_total" => httperrlargechunk: "Requests and responses with chunks larger than the limit",
    "http_requests_rate" => httprequestsrate: "HTTP requests per second",
    "http_responses_rate" => httpresponsesrate: "HTTP responses per second",
    "http_posts_rate" => httppostsrate: "HTTP POST requests per second",
    "http_gets_rate" => httpgetsrate: "HTTP GET requests per second",
    "http_request_bytes_received_rate" => httprxrequestbytesrate: "HTTP request bytes received per second",
    "http_response_bytes_received_rate" => httprxresponsebytesrate: "HTTP response bytes received per second",
});

const TCP_FIELDS: &[GaugeField<ProtocolTcpStats>] = gauge_fields!(ProtocolTcpStats {
    "tcp_rx_packets_total" => tcptotrxpkts: "TCP packets received",
    "tcp_rx_bytes_total" => tcptotrxbytes: "TCP bytes received",
    "tcp_tx_bytes_total" => tcptottxbytes: "TCP bytes transmitted",
    "tcp_tx_packets_total" => tcptottxpkts: "TCP packets transmitted",
    "tcp_client_connections_opened_total" => tcptotclientconnopened: "Client connections opened",
    "tcp_server_connections_opened_total" => tcptotserverconnopened: "Server connections opened",
    "tcp_syn_total" => tcptotsyn: "SYN packets received",
    "tcp_syn_probe_total" => tcptotsynprobe: "Probes from the appliance to a server",
    "tcp_server_fin_total" => tcptotsvrfin: "FIN packets received from servers",
    "tcp_client_fin_total" => tcptotcltfin: "FIN packets received from clients",
    "tcp_active_server_connections" => tcpactiveserverconn: "Server connections currently serving requests",
    "tcp_cur_client_connections_established" => tcpcurclientconnestablished: "Established client connections",
    "tcp_cur_server_connections_established" => tcpcurserverconnestablished: "Established server connections",
    "tcp_rx_packets_rate" => tcprxpktsrate: "TCP packets received per second",
    "tcp_tx_packets_rate" => tcptxpktsrate: "TCP packets transmitted per second",
    "tcp_bad_checksum_total" => tcperrbadchecksum: "TCP packets with a bad checksum",
    "tcp_any_port_fail_total" => tcperranyportfail: "Port allocations that failed on a mapped IP",
    "tcp_bad_state_connections_total" => tcperrbadstateconn: "Connections that are not in a valid state",
    "tcp_reset_threshold_total" => tcperrrstthreshold: "Resets dropped after the reset threshold was reached",
});

const IP_FIELDS: &[GaugeField<ProtocolIpStats>] = gauge_fields!(ProtocolIpStats {
    "ip_rx_packets_total" => iptotrxpkts: "IP packets received",
    "ip_rx_bytes_total" => iptotrxbytes: "IP bytes received",
    "ip_tx_packets_total" => iptottxpkts: "IP packets transmitted",
    "ip_tx_bytes_total" => iptottxbytes: "IP bytes transmitted",
    "ip_rx_megabits_total" => iptotrxmbits: "IP megabits received",
    "ip_tx_megabits_total" => iptottxmbits: "IP megabits transmitted",
    "ip_routed_packets_total" => iptotroutedpkts: "IP packets routed",
    "ip_fragments_total" => iptotfragments: "IP fragments received",
    "ip_bad_checksums_total" => iptotbadchecksums: "IP packets with a bad checksum",
    "ip_ttl_expired_total" => iptotttlexpired: "IP packets dropped after TTL expiry",
    "ip_vip_down_total" => iptotvipdown: "IP packets dropped because the VIP was down",
    "ip_address_lookup_fail_total" => iptotaddrlookupfail: "IP address lookups that failed",
    "ip_rx_packets_rate" => iprxpktsrate: "IP packets received per second",
    "ip_tx_packets_rate" => iptxpktsrate: "IP packets transmitted per second",
    "ip_rx_bytes_rate" => iprxbytesrate: "IP bytes received per second",
    "ip_tx_bytes_rate" => iptxbytesrate: "IP bytes transmitted per second",
});

pub async fn collect_protocol_http(ctx: CollectionContext) -> CollectionResult {
    collect_with_handler("protocol_http", ctx.client.query_protocol_http(), |http| {
        ctx.metrics.publish_fields(&ctx.target, HTTP_FIELDS, &http, &[]);
    })
    .await
}

pub async fn collect_protocol_tcp(ctx: CollectionContext) -> CollectionResult {
    collect_with_handler("protocol_tcp", ctx.client.query_protocol_tcp(), |tcp| {
        ctx.metrics.publish_fields(&ctx.target, TCP_FIELDS, &tcp, &[]);
    })
    .await
}

pub async fn collect_protocol_ip(ctx: CollectionContext) -> CollectionResult {
    collect_with_handler("protocol_ip", ctx.client.query_protocol_ip(), |ip| {
        ctx.metrics.publish_fields(&ctx.target, IP_FIELDS, &ip, &[]);
    })
    .await
}
