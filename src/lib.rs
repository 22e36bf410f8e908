//! NetScaler Prometheus Exporter
//!
//! A Prometheus metrics exporter for Citrix NetScaler ADC appliances and Citrix
//! ADM (MPS) instances.
//!
//! # Overview
//!
//! Each `/metrics` request scrapes every configured target through the Nitro REST
//! API. Per target, a set of independently disableable collection modules runs
//! under a bounded concurrency budget and one deadline; a topology module first
//! reconstructs the content switch -> load balancer -> service routing graph so
//! the other modules can label their nodes with the chains they belong to.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐   Nitro REST (v1/v2)  ┌──────────────────────┐
//! │  NetScaler  │ ◄──────────────────►  │       Exporter       │
//! │  ADC / ADM  │   session / Basic     │  ┌────────────────┐  │      HTTP      ┌────────────┐
//! └─────────────┘                       │  │ Orchestrator   │  │ ◄────────────► │ Prometheus │
//!                                       │  │  + modules     │  │   /metrics     └────────────┘
//!                                       │  └────────────────┘  │
//!                                       │  ┌────────────────┐  │
//!                                       │  │ Topology       │  │
//!                                       │  └────────────────┘  │
//!                                       └──────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`netscaler`] - Nitro client with session handling, and wire types
//! - [`scrape`] - per-target orchestration (concurrency, deadline, isolation)
//! - [`topology`] - binding resolution, chain membership and graph publication
//! - [`collectors`] - per-category collection modules
//! - [`exporter`] - multi-target collection
//! - [`metrics`] - Prometheus metric sink
//! - [`server`] - HTTP server
//! - [`config`] - Configuration management
//! - [`error`] - Error types
//!
//! # Quick Start
//!
//! ```no_run
//! use netscaler_exporter::{config::Config, server};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/Default.toml")?;
//!     config.validate()?;
//!     server::start(config).await?;
//!     Ok(())
//! }
//! ```

pub mod collectors;
pub mod config;
pub mod error;
pub mod exporter;
pub mod metrics;
pub mod netscaler;
pub mod scrape;
pub mod server;
pub mod topology;
