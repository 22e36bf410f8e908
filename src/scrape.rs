//! Per-target scrape orchestration
//!
//! One scrape logs in, runs the `topology` module to completion, then fans the
//! remaining modules out onto a [`JoinSet`]. Every module holds one slot of a
//! semaphore of width `parallelism` while it runs; a single deadline bounds the
//! whole scrape. When the deadline passes the shared [`CancellationToken`] is
//! cancelled, unfinished tasks are aborted and named in the log, and whatever
//! finished in time stays published.

use crate::collectors::{CollectionResult, CollectionStatus};
use crate::config::Target;
use crate::metrics::MetricsCollector;
use crate::netscaler::NitroClient;
use crate::topology::TopologyState;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use std::collections::BTreeSet;
use std::future::Future;
use std::ops::Deref;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Name of the module that must finish before any other starts
pub const TOPOLOGY_MODULE: &str = "topology";

/// A named collection module
#[derive(Clone)]
pub struct Module {
    name: String,
    run: Arc<dyn Fn(CollectionContext) -> BoxFuture<'static, CollectionResult> + Send + Sync>,
}

impl Module {
    pub fn new<F, Fut>(name: impl Into<String>, run: F) -> Self
    where
        F: Fn(CollectionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CollectionResult> + Send + 'static,
    {
        Self {
            name: name.into(),
            run: Arc::new(move |ctx| run(ctx).boxed()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Module").field("name", &self.name).finish()
    }
}

/// State shared by every module of one target scrape
#[derive(Clone)]
pub struct ScrapeContext {
    pub target: Arc<Target>,
    pub client: Arc<NitroClient>,
    pub metrics: Arc<MetricsCollector>,
    pub topology: Arc<TopologyState>,
    limiter: Arc<Semaphore>,
    cancel: CancellationToken,
}

impl ScrapeContext {
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Run `fut` while holding one concurrency slot. `None` when the scrape was
    /// cancelled before a slot became free.
    pub async fn gated<F: Future>(&self, fut: F) -> Option<F::Output> {
        let _permit = self.acquire_slot().await?;
        Some(fut.await)
    }

    async fn acquire_slot(&self) -> Option<OwnedSemaphorePermit> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            permit = self.limiter.clone().acquire_owned() => permit.ok(),
        }
    }
}

/// What a module receives: the shared scrape state plus its own slot
pub struct CollectionContext {
    scrape: ScrapeContext,
    slot: Option<OwnedSemaphorePermit>,
}

impl CollectionContext {
    /// Give the module's slot back, for modules that spend the rest of their run
    /// waiting on [`ScrapeContext::gated`] work of their own.
    pub fn release_slot(&mut self) {
        self.slot.take();
    }

    pub fn scrape(&self) -> &ScrapeContext {
        &self.scrape
    }
}

impl Deref for CollectionContext {
    type Target = ScrapeContext;

    fn deref(&self) -> &ScrapeContext {
        &self.scrape
    }
}

/// Outcome of one target scrape
#[derive(Debug, Clone, Default)]
pub struct ScrapeReport {
    pub target: String,
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
    /// Modules that were cancelled or still running at the deadline
    pub timed_out: Vec<String>,
    /// Set when login failed; no module ran
    pub login_error: Option<String>,
    pub duration: Duration,
}

impl ScrapeReport {
    pub fn is_up(&self) -> bool {
        self.login_error.is_none() && !self.succeeded.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct ScrapeOrchestrator {
    parallelism: usize,
    timeout: Duration,
}

impl ScrapeOrchestrator {
    pub fn new(parallelism: usize, timeout: Duration) -> Self {
        Self {
            parallelism: parallelism.max(1),
            timeout,
        }
    }

    /// Scrape one target with the given module set. Modules disabled for the
    /// target are skipped.
    pub async fn scrape(
        &self,
        client: Arc<NitroClient>,
        metrics: Arc<MetricsCollector>,
        modules: &[Module],
    ) -> ScrapeReport {
        let started = Instant::now();
        let deadline = tokio::time::Instant::now() + self.timeout;
        let target = client.target().clone();
        let mut report = ScrapeReport {
            target: target.instance().to_string(),
            ..Default::default()
        };

        let login = match tokio::time::timeout_at(deadline, client.login()).await {
            Ok(result) => result.map_err(|e| e.to_string()),
            Err(_) => Err("login timed out".to_string()),
        };
        if let Err(e) = login {
            error!(target_url = %target.instance(), "Login failed, skipping target: {}", e);
            report.login_error = Some(e);
            report.duration = started.elapsed();
            return report;
        }

        let enabled: Vec<&Module> = modules
            .iter()
            .filter(|m| {
                let disabled = target.is_module_disabled(m.name());
                if disabled {
                    debug!(target_url = %target.instance(), module = m.name(), "Module disabled");
                }
                !disabled
            })
            .collect();
        let topology = enabled.iter().find(|m| m.name() == TOPOLOGY_MODULE);

        let scrape = ScrapeContext {
            target: target.clone(),
            client,
            metrics: metrics.clone(),
            topology: Arc::new(TopologyState::new(topology.is_some())),
            limiter: Arc::new(Semaphore::new(self.parallelism)),
            cancel: CancellationToken::new(),
        };

        if let Some(module) = topology {
            let ctx = CollectionContext {
                scrape: scrape.clone(),
                slot: None,
            };
            match tokio::time::timeout_at(deadline, guarded((module.run)(ctx))).await {
                Ok(result) => record(&mut report, &metrics, &target, module.name(), result),
                Err(_) => {
                    scrape.cancel.cancel();
                    warn!(target_url = %target.instance(), module = module.name(), "Module did not complete before the deadline");
                    metrics.set_module_success(&target, module.name(), false);
                    report.timed_out.push(module.name().to_string());
                }
            }
        }

        let mut tasks = JoinSet::new();
        let mut pending = BTreeSet::new();
        for module in enabled.iter().filter(|m| m.name() != TOPOLOGY_MODULE) {
            let scrape = scrape.clone();
            let run = module.run.clone();
            let name = module.name().to_string();
            pending.insert(name.clone());
            tasks.spawn(async move {
                let Some(slot) = scrape.acquire_slot().await else {
                    return (name, None);
                };
                let ctx = CollectionContext {
                    scrape,
                    slot: Some(slot),
                };
                let result = guarded(run(ctx)).await;
                (name, Some(result))
            });
        }

        let drained = tokio::time::timeout_at(deadline, async {
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok((name, Some(result))) => {
                        pending.remove(&name);
                        record(&mut report, &metrics, &target, &name, result);
                    }
                    // Cancelled before a slot was free; reported with the stragglers.
                    Ok((_, None)) => {}
                    Err(e) => error!(target_url = %target.instance(), "Module task failed to join: {}", e),
                }
            }
        })
        .await;

        if drained.is_err() {
            scrape.cancel.cancel();
            tasks.abort_all();
        }
        for name in pending {
            warn!(target_url = %target.instance(), module = %name, "Module did not complete before the deadline");
            metrics.set_module_success(&target, &name, false);
            report.timed_out.push(name);
        }

        scrape.topology.conclude(&metrics, &target);

        report.duration = started.elapsed();
        info!(
            target_url = %target.instance(),
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            timed_out = report.timed_out.len(),
            "Scrape finished in {:.3}s",
            report.duration.as_secs_f64()
        );
        report
    }
}

/// Convert a panicking module into a failed one.
async fn guarded(fut: BoxFuture<'static, CollectionResult>) -> CollectionResult {
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(result) => result,
        Err(_) => Err(anyhow::anyhow!("module panicked")),
    }
}

fn record(
    report: &mut ScrapeReport,
    metrics: &MetricsCollector,
    target: &Target,
    name: &str,
    result: CollectionResult,
) {
    let success = match result {
        Ok(CollectionStatus::Success) => true,
        Ok(CollectionStatus::Failed) => false,
        Err(e) => {
            error!(target_url = %target.instance(), module = name, "Module failed: {:#}", e);
            false
        }
    };
    metrics.set_module_success(target, name, success);
    if success {
        report.succeeded.push(name.to_string());
    } else {
        report.failed.push(name.to_string());
    }
}
