use anyhow::{Context, Result};
use clap::Parser;
use netscaler_exporter::{config::Config, server};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/Default.toml")]
    config: String,

    /// Inline TOML or JSON configuration, used instead of the file
    #[arg(long, env = "NETSCALER_CONFIG_INLINE", conflicts_with = "config")]
    config_inline: Option<String>,

    /// Port to listen on for metrics (overrides config)
    #[arg(short, long, env = "EXPORTER_PORT")]
    port: Option<u16>,

    /// Address to bind to (overrides config)
    #[arg(short, long, env = "EXPORTER_ADDR")]
    addr: Option<String>,

    /// Maximum concurrent API requests per target (overrides config)
    #[arg(long, env = "NETSCALER_PARALLELISM")]
    parallelism: Option<usize>,

    /// Default username for targets without their own
    #[arg(long, env = "NETSCALER_USERNAME")]
    username: Option<String>,

    /// Default password for targets without their own
    #[arg(long, env = "NETSCALER_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Skip TLS certificate verification
    #[arg(long, env = "NETSCALER_IGNORE_CERT")]
    ignore_cert: Option<bool>,

    /// PEM file with an additional root certificate
    #[arg(long, env = "NETSCALER_CA_FILE")]
    ca_file: Option<String>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting NetScaler Prometheus Exporter v{}",
        env!("CARGO_PKG_VERSION")
    );

    let mut config = match &args.config_inline {
        Some(document) => Config::load_inline(document)?,
        None => Config::load(&args.config)?,
    };

    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(addr) = args.addr {
        config.server.addr = addr;
    }
    if let Some(parallelism) = args.parallelism {
        config.scrape.parallelism = parallelism;
    }
    if let Some(username) = args.username {
        config.credentials.username = Some(username);
    }
    if let Some(password) = args.password {
        config.credentials.password = Some(secrecy::SecretString::from(password));
    }
    if let Some(ignore_cert) = args.ignore_cert {
        config.credentials.ignore_cert = ignore_cert;
    }
    if let Some(ca_file) = args.ca_file {
        config.credentials.ca_file = Some(ca_file);
    }

    config.validate().context("Invalid configuration")?;

    info!("Configuration loaded successfully");
    info!("Targets: {}", config.targets.len());
    info!(
        "Metrics endpoint: http://{}:{}/metrics",
        config.server.addr, config.server.port
    );

    if let Err(e) = server::start(config).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
