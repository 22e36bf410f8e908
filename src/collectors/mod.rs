//! Metrics Collectors
//!
//! This module contains the collection modules for the Nitro stat categories.
//! Each module queries one group of endpoints and publishes the matching
//! Prometheus families.
//!
//! # Architecture
//!
//! Collectors follow a consistent pattern:
//! - Accept a [`CollectionContext`] holding the target's client, the metric sink
//!   and one concurrency slot
//! - Query the Nitro API
//! - Publish through field tables (`gauge_fields!`) or explicit state gauges
//! - Return `CollectionResult` (`Ok(Success)` on success, `Ok(Failed)` on failure)
//!
//! # Error Handling
//!
//! Individual collector failures are non-fatal: they log and return
//! `Ok(CollectionStatus::Failed)`, publishing nothing for that cycle. Sibling
//! modules are unaffected.

use crate::config::TargetKind;
use crate::scrape::Module;
use tracing::{error, info};

pub use crate::scrape::CollectionContext;

/// Status of a metrics collection operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionStatus {
    /// Metrics were successfully collected and updated
    Success,
    /// Collection failed but is non-fatal (already logged)
    Failed,
}

/// Result type for collector functions
///
/// - `Ok(CollectionStatus::Success)` = Collection succeeded
/// - `Ok(CollectionStatus::Failed)` = Collection failed but non-fatal (logged)
/// - `Err(_)` = Unexpected failure, reported by the orchestrator
pub type CollectionResult = Result<CollectionStatus, anyhow::Error>;

/// Helper to reduce boilerplate in collectors
///
/// Wraps API queries with consistent error handling:
/// - On success: processes data, logs success, returns `CollectionStatus::Success`
/// - On error: logs the failure, returns `CollectionStatus::Failed` (non-fatal)
///
/// # Arguments
///
/// * `name` - Name of the module being collected (for logging)
/// * `query_future` - Async API call that returns data
/// * `process` - Function to process the data and update metrics
pub async fn collect_with_handler<T, F, P, E>(
    name: &str,
    query_future: F,
    process: P,
) -> CollectionResult
where
    F: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: FnOnce(T),
{
    match query_future.await {
        Ok(data) => {
            process(data);
            info!("Updated {} metrics", name);
            Ok(CollectionStatus::Success)
        }
        Err(e) => {
            error!("Failed to query {}: {}", name, e);
            Ok(CollectionStatus::Failed)
        }
    }
}

/// Declare a field table: `gauge_fields!(Type { "metric_name" => field: "help", ... })`.
/// Each field is coerced with [`crate::netscaler::types::num`] and skipped when
/// it does not hold a number.
macro_rules! gauge_fields {
    ($ty:ty { $($name:literal => $field:ident : $help:literal),* $(,)? }) => {
        &[$(
            $crate::metrics::GaugeField::<$ty> {
                name: $name,
                help: $help,
                value: |item: &$ty| $crate::netscaler::types::num(&item.$field),
            }
        ),*]
    };
}

// Collector modules
pub mod ha;
pub mod interfaces;
pub mod mps;
pub mod protocols;
pub mod service_groups;
pub mod services;
pub mod ssl;
pub mod system;
pub mod vservers;

pub use ha::collect_ha_node;
pub use interfaces::collect_interfaces;
pub use mps::collect_mps_health;
pub use protocols::{collect_protocol_http, collect_protocol_ip, collect_protocol_tcp};
pub use service_groups::collect_service_groups;
pub use services::{collect_gslb_services, collect_services};
pub use ssl::{collect_ssl_certs, collect_ssl_stats, collect_ssl_vservers};
pub use system::{
    collect_aaa_stats, collect_ns_capacity, collect_ns_license, collect_ns_stats,
    collect_system_cpu,
};
pub use vservers::{
    collect_cs_vservers, collect_gslb_vservers, collect_lb_vservers, collect_vpn_vservers,
};

/// Every module an ADC target runs, topology first
pub fn adc_modules() -> Vec<Module> {
    vec![
        Module::new("topology", crate::topology::collect_topology),
        Module::new("ns_stats", collect_ns_stats),
        Module::new("ns_license", collect_ns_license),
        Module::new("interfaces", collect_interfaces),
        Module::new("virtual_servers", collect_lb_vservers),
        Module::new("services", collect_services),
        Module::new("service_groups", collect_service_groups),
        Module::new("gslb_services", collect_gslb_services),
        Module::new("gslb_vservers", collect_gslb_vservers),
        Module::new("cs_vservers", collect_cs_vservers),
        Module::new("vpn_vservers", collect_vpn_vservers),
        Module::new("aaa_stats", collect_aaa_stats),
        Module::new("protocol_http", collect_protocol_http),
        Module::new("protocol_tcp", collect_protocol_tcp),
        Module::new("protocol_ip", collect_protocol_ip),
        Module::new("ssl_stats", collect_ssl_stats),
        Module::new("ssl_certs", collect_ssl_certs),
        Module::new("ssl_vservers", collect_ssl_vservers),
        Module::new("system_cpu", collect_system_cpu),
        Module::new("ns_capacity", collect_ns_capacity),
        Module::new("ha_node", collect_ha_node),
    ]
}

/// ADM targets expose a single health endpoint
pub fn mps_modules() -> Vec<Module> {
    vec![Module::new("mps_health", collect_mps_health)]
}

pub fn modules_for(kind: TargetKind) -> Vec<Module> {
    match kind {
        TargetKind::Adc => adc_modules(),
        TargetKind::Mps => mps_modules(),
    }
}
