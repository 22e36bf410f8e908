//! Multi-target collection
//!
//! Every `/metrics` request builds a fresh [`MetricsCollector`] and scrapes all
//! configured targets concurrently, one [`ScrapeOrchestrator`] run per target.
//! Each target's own fan-out is bounded by its semaphore; the target level is not.
//!
//! Clients outlive a single collection so sessions are reused across requests.

use crate::collectors::modules_for;
use crate::config::{Config, Target, TargetKind};
use crate::metrics::MetricsCollector;
use crate::netscaler::NitroClient;
use crate::scrape::{Module, ScrapeOrchestrator, ScrapeReport};
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

struct ScrapeTarget {
    target: Arc<Target>,
    /// Client construction failure (unreadable CA file, ...) is kept and reported
    /// as a failed login on every collection.
    client: Result<Arc<NitroClient>, String>,
    modules: Vec<Module>,
}

/// Result of one collection across every target
pub struct Collection {
    pub metrics: Arc<MetricsCollector>,
    pub reports: Vec<ScrapeReport>,
}

pub struct Exporter {
    targets: Vec<ScrapeTarget>,
    label_keys: Vec<String>,
    orchestrator: ScrapeOrchestrator,
}

impl Exporter {
    pub fn new(config: &Config) -> Self {
        let orchestrator = ScrapeOrchestrator::new(
            config.scrape.parallelism,
            Duration::from_secs(config.scrape.timeout_seconds),
        );
        Self::with_modules(
            config.resolve_targets(),
            config.label_keys(),
            orchestrator,
            modules_for,
        )
    }

    /// Build an exporter whose module set per target kind comes from `modules`.
    pub fn with_modules<F>(
        targets: Vec<Target>,
        label_keys: Vec<String>,
        orchestrator: ScrapeOrchestrator,
        modules: F,
    ) -> Self
    where
        F: Fn(TargetKind) -> Vec<Module>,
    {
        let targets = targets
            .into_iter()
            .map(|target| {
                let target = Arc::new(target);
                let client = NitroClient::new(target.clone())
                    .map(Arc::new)
                    .map_err(|e| {
                        error!(target_url = %target.instance(), "Failed to build client: {}", e);
                        e.to_string()
                    });
                ScrapeTarget {
                    modules: modules(target.kind),
                    target,
                    client,
                }
            })
            .collect();

        Self {
            targets,
            label_keys,
            orchestrator,
        }
    }

    pub fn target_count(&self) -> usize {
        self.targets.len()
    }

    /// Scrape every target into a new metric sink.
    pub async fn collect(&self) -> anyhow::Result<Collection> {
        let metrics = Arc::new(MetricsCollector::new(&self.label_keys)?);
        info!("Collecting metrics from {} targets", self.targets.len());

        let reports = join_all(self.targets.iter().map(|t| self.scrape_one(t, metrics.clone()))).await;

        // join_all keeps input order
        for (target, report) in self.targets.iter().zip(&reports) {
            let up = if report.is_up() { 1.0 } else { 0.0 };
            metrics.set(&metrics.up, &target.target, &[], up);
            metrics.set(
                &metrics.scrape_duration_seconds,
                &target.target,
                &[],
                report.duration.as_secs_f64(),
            );
        }

        Ok(Collection { metrics, reports })
    }

    async fn scrape_one(&self, target: &ScrapeTarget, metrics: Arc<MetricsCollector>) -> ScrapeReport {
        match &target.client {
            Ok(client) => {
                self.orchestrator
                    .scrape(client.clone(), metrics, &target.modules)
                    .await
            }
            Err(e) => ScrapeReport {
                target: target.target.instance().to_string(),
                login_error: Some(e.clone()),
                ..Default::default()
            },
        }
    }

    /// Release pooled connections of every client.
    pub fn close(&self) {
        for target in &self.targets {
            if let Ok(client) = &target.client {
                if let Err(e) = client.close() {
                    warn!(target_url = %target.target.instance(), "Failed to close client: {}", e);
                }
            }
        }
    }
}
