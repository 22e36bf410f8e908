//! SSL Metrics Collectors
//!
//! # Metrics Produced
//! - `netscaler_ssl_*` - global SSL session and crypto counters
//! - `netscaler_ssl_cert_days_to_expire` - Labels: certkey
//! - `netscaler_sslvserver_*` - per SSL virtual server counters
//!   - Labels: virtual_server, type

use super::{collect_with_handler, CollectionContext, CollectionResult};
use crate::metrics::GaugeField;
use crate::netscaler::types::{num, state_value, SslStats, SslVserverStats};

const SSL_FIELDS: &[GaugeField<SslStats>] = gauge_fields!(SslStats {
    "ssl_sessions_total" => ssltotsessions: "SSL sessions",
    "ssl_new_sessions_total" => ssltotnewsessions: "New SSL sessions",
    "ssl_tlsv11_sessions_total" => ssltottlsv11sessions: "TLSv1.1 sessions",
    "ssl_encode_total" => ssltotenc: "Bytes encrypted",
    "ssl_crypto_utilization_percent" => sslcryptoutilizationstat: "Utilization of the crypto hardware",
    "ssl_sessions_rate" => sslsessionsrate: "SSL sessions per second",
    "ssl_new_sessions_rate" => sslnewsessionsrate: "New SSL sessions per second",
    "ssl_decrypt_rate" => ssldecrate: "Bytes decrypted per second",
    "ssl_encrypt_rate" => sslencrate: "Bytes encrypted per second",
});

const SSL_VSERVER_FIELDS: &[GaugeField<SslVserverStats>] = gauge_fields!(SslVserverStats {
    "sslvserver_decrypt_bytes_total" => sslctxtotdecbytes: "Bytes decrypted by the virtual server",
    "sslvserver_encrypt_bytes_total" => sslctxtotencbytes: "Bytes encrypted by the virtual server",
    "sslvserver_session_new_total" => sslctxtotsessionnew: "New SSL sessions on the virtual server",
    "sslvserver_session_hits_total" => sslctxtotsessionhits: "SSL session reuse hits on the virtual server",
    "sslvserver_client_auth_success_total" => ssltotclientauthsuccess: "Successful client authentications",
    "sslvserver_client_auth_failure_total" => ssltotclientauthfailure: "Failed client authentications",
    "sslvserver_health" => vslbhealth: "Percentage of UP services bound to the virtual server",
    "sslvserver_active_services" => actsvcs: "Active services bound to the virtual server",
    "sslvserver_encrypt_bytes_rate" => sslctxencbytesrate: "Bytes encrypted per second",
    "sslvserver_decrypt_bytes_rate" => sslctxdecbytesrate: "Bytes decrypted per second",
});

pub async fn collect_ssl_stats(ctx: CollectionContext) -> CollectionResult {
    collect_with_handler("ssl_stats", ctx.client.query_ssl_stats(), |ssl| {
        ctx.metrics.publish_fields(&ctx.target, SSL_FIELDS, &ssl, &[]);
    })
    .await
}

pub async fn collect_ssl_certs(ctx: CollectionContext) -> CollectionResult {
    collect_with_handler("ssl_certs", ctx.client.query_ssl_certs(), |certs| {
        for cert in &certs {
            // Certificates without an expiry (CA bundles, CRLs) are skipped
            if let Some(days) = num(&cert.daystoexpiration) {
                ctx.metrics.set_gauge(
                    "ssl_cert_days_to_expire",
                    "Days until the certificate expires",
                    &ctx.target,
                    &[("certkey", cert.certkey.as_str())],
                    days,
                );
            }
        }
    })
    .await
}

pub async fn collect_ssl_vservers(ctx: CollectionContext) -> CollectionResult {
    collect_with_handler("ssl_vservers", ctx.client.query_ssl_vservers(), |vservers| {
        for vserver in &vservers {
            let labels = [
                ("virtual_server", vserver.vservername.as_str()),
                ("type", vserver.kind.as_str()),
            ];
            ctx.metrics.set_gauge(
                "sslvserver_state",
                "SSL virtual server state (1=UP, 0=otherwise)",
                &ctx.target,
                &labels,
                state_value(&vserver.state),
            );
            ctx.metrics
                .publish_fields(&ctx.target, SSL_VSERVER_FIELDS, vserver, &labels);
        }
    })
    .await
}
