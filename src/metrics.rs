//! Prometheus Metrics Definitions
//!
//! This module defines the metric sink shared by every collection module.
//!
//! # Metric Categories
//!
//! ## Exporter Health
//! - `netscaler_up`, `netscaler_scrape_duration_seconds` per target
//! - `netscaler_module_success` per target and module
//!
//! ## Topology
//! - `netscaler_topology_node` / `netscaler_topology_edge` describe the routing graph
//! - node state, health, request, connection and TTFB gauges keyed by node id
//!
//! ## Appliance Counters
//! - One family per published Nitro field, declared from the module field tables
//!   the first time a module publishes it
//!
//! # Labels
//!
//! Every series carries `ns_instance` followed by the configured static label keys
//! (sorted), then the family's own labels. Values are always produced through
//! [`MetricsCollector::labels`] so arity matches the declaration.
//!
//! All metrics use the `netscaler_` namespace prefix.

use crate::config::Target;
use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::warn;

pub const NAMESPACE: &str = "netscaler";
pub const INSTANCE_LABEL: &str = "ns_instance";

/// Label names used by families and collectors. A static label key must not
/// reuse one, or the family cannot be declared.
pub const RESERVED_LABELS: &[&str] = &[
    INSTANCE_LABEL,
    "module",
    // topology
    "id",
    "title",
    "node_type",
    "state",
    "chain",
    "source",
    "target",
    "weight",
    "priority",
    // collectors
    "alias",
    "certkey",
    "core",
    "interface",
    "ip",
    "member",
    "name",
    "node_id",
    "port",
    "service",
    "servicegroup",
    "type",
    "virtual_server",
];

/// Prometheus label name syntax, excluding the `__` prefix reserved for
/// internal use.
pub fn is_valid_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    let first_ok = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
    first_ok && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') && !name.starts_with("__")
}

/// One Nitro field published as one gauge family
pub struct GaugeField<T> {
    pub name: &'static str,
    pub help: &'static str,
    pub value: fn(&T) -> Option<f64>,
}

/// Metrics sink for one collection across all targets
pub struct MetricsCollector {
    registry: Registry,
    label_keys: Vec<String>,

    // Exporter health
    pub up: Arc<GaugeVec>,
    pub scrape_duration_seconds: Arc<GaugeVec>,
    pub module_success: Arc<GaugeVec>,

    // Topology
    pub topology_node: Arc<GaugeVec>,
    pub topology_edge: Arc<GaugeVec>,
    pub topology_node_health: Arc<GaugeVec>,
    pub topology_node_requests_total: Arc<GaugeVec>,
    pub topology_node_connections: Arc<GaugeVec>,
    pub topology_node_state: Arc<GaugeVec>,
    pub topology_node_ttfb_ms: Arc<GaugeVec>,

    /// Field families, declared on first use
    families: Mutex<HashMap<&'static str, GaugeVec>>,
}

impl MetricsCollector {
    /// `label_keys` is the sorted union of configured static label keys.
    pub fn new(label_keys: &[String]) -> anyhow::Result<Self> {
        let registry = Registry::new();
        let label_keys = label_keys.to_vec();

        let base = base_label_names(&label_keys);
        let with = |extra: &[&str]| -> Vec<String> {
            base.iter()
                .cloned()
                .chain(extra.iter().map(|s| s.to_string()))
                .collect()
        };

        let up = register(
            &registry,
            "up",
            "Whether the last scrape of the target succeeded (1=up, 0=down)",
            &with(&[]),
        )?;
        let scrape_duration_seconds = register(
            &registry,
            "scrape_duration_seconds",
            "Wall-clock duration of the last scrape of the target",
            &with(&[]),
        )?;
        let module_success = register(
            &registry,
            "module_success",
            "Whether a collection module completed (1=success, 0=failure or cancelled)",
            &with(&["module"]),
        )?;

        let topology_node = register(
            &registry,
            "topology_node",
            "Topology graph node (1=UP, 0=DOWN)",
            &with(&["id", "title", "node_type", "state", "chain"]),
        )?;
        let topology_edge = register(
            &registry,
            "topology_edge",
            "Topology graph edge between two nodes",
            &with(&["id", "source", "target", "weight", "priority", "chain"]),
        )?;
        let topology_node_health = register(
            &registry,
            "topology_node_health",
            "Health percentage of a topology node",
            &with(&["id", "node_type", "chain"]),
        )?;
        let topology_node_requests_total = register(
            &registry,
            "topology_node_requests_total",
            "Total requests seen by a topology node",
            &with(&["id", "node_type", "chain"]),
        )?;
        let topology_node_connections = register(
            &registry,
            "topology_node_connections",
            "Current client connections of a topology node",
            &with(&["id", "node_type", "chain"]),
        )?;
        let topology_node_state = register(
            &registry,
            "topology_node_state",
            "State of a topology node (1=UP, 0=DOWN)",
            &with(&["id", "node_type", "chain"]),
        )?;
        let topology_node_ttfb_ms = register(
            &registry,
            "topology_node_ttfb_ms",
            "Average server time to first byte of a topology node in milliseconds",
            &with(&["id", "node_type", "chain"]),
        )?;

        Ok(Self {
            registry,
            label_keys,
            up: Arc::new(up),
            scrape_duration_seconds: Arc::new(scrape_duration_seconds),
            module_success: Arc::new(module_success),
            topology_node: Arc::new(topology_node),
            topology_edge: Arc::new(topology_edge),
            topology_node_health: Arc::new(topology_node_health),
            topology_node_requests_total: Arc::new(topology_node_requests_total),
            topology_node_connections: Arc::new(topology_node_connections),
            topology_node_state: Arc::new(topology_node_state),
            topology_node_ttfb_ms: Arc::new(topology_node_ttfb_ms),
            families: Mutex::new(HashMap::new()),
        })
    }

    /// Base label values for `target` followed by `extra`.
    pub fn labels<'a>(&'a self, target: &'a Target, extra: &[&'a str]) -> Vec<&'a str> {
        let mut values = Vec::with_capacity(1 + self.label_keys.len() + extra.len());
        values.push(target.instance());
        for key in &self.label_keys {
            values.push(target.labels.get(key).map(String::as_str).unwrap_or(""));
        }
        values.extend_from_slice(extra);
        values
    }

    /// Set one series of a declared family
    pub fn set(&self, family: &GaugeVec, target: &Target, extra: &[&str], value: f64) {
        match family.get_metric_with_label_values(&self.labels(target, extra)) {
            Ok(gauge) => gauge.set(value),
            Err(e) => warn!("Rejected series for {}: {}", target.instance(), e),
        }
    }

    /// Family for one published field, declared on first use
    pub fn field_family(
        &self,
        name: &'static str,
        help: &'static str,
        extra_labels: &[&str],
    ) -> anyhow::Result<GaugeVec> {
        let mut families = self.families.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(family) = families.get(name) {
            return Ok(family.clone());
        }

        let names: Vec<String> = base_label_names(&self.label_keys)
            .into_iter()
            .chain(extra_labels.iter().map(|s| s.to_string()))
            .collect();
        let family = register(&self.registry, name, help, &names)?;
        families.insert(name, family.clone());
        Ok(family)
    }

    /// Set a field gauge, declaring its family if needed
    pub fn set_gauge(
        &self,
        name: &'static str,
        help: &'static str,
        target: &Target,
        extra: &[(&str, &str)],
        value: f64,
    ) {
        let names: Vec<&str> = extra.iter().map(|(n, _)| *n).collect();
        let values: Vec<&str> = extra.iter().map(|(_, v)| *v).collect();
        match self.field_family(name, help, &names) {
            Ok(family) => self.set(&family, target, &values, value),
            Err(e) => warn!("Failed to declare {}: {}", name, e),
        }
    }

    /// Publish every field of `item` that has a numeric value.
    pub fn publish_fields<T>(
        &self,
        target: &Target,
        fields: &[GaugeField<T>],
        item: &T,
        extra: &[(&str, &str)],
    ) {
        for field in fields {
            if let Some(value) = (field.value)(item) {
                self.set_gauge(field.name, field.help, target, extra, value);
            }
        }
    }

    /// Record the outcome of one module
    pub fn set_module_success(&self, target: &Target, module: &str, success: bool) {
        self.set(
            &self.module_success,
            target,
            &[module],
            if success { 1.0 } else { 0.0 },
        );
    }

    /// Render metrics in Prometheus text format
    pub fn render(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

fn base_label_names(label_keys: &[String]) -> Vec<String> {
    std::iter::once(INSTANCE_LABEL.to_string())
        .chain(label_keys.iter().cloned())
        .collect()
}

fn register(registry: &Registry, name: &str, help: &str, labels: &[String]) -> anyhow::Result<GaugeVec> {
    let names: Vec<&str> = labels.iter().map(String::as_str).collect();
    let family = GaugeVec::new(Opts::new(name, help).namespace(NAMESPACE), &names)?;
    registry.register(Box::new(family.clone()))?;
    Ok(family)
}
