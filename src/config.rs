use crate::metrics::{is_valid_label_name, RESERVED_LABELS};
use anyhow::{bail, Context, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub scrape: ScrapeConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    /// Static labels attached to every series of every target
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub targets: Vec<TargetConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_addr")]
    pub addr: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScrapeConfig {
    /// Maximum concurrent API requests per target
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default)]
    pub disabled_modules: Vec<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CredentialsConfig {
    pub username: Option<String>,
    pub password: Option<SecretString>,
    #[serde(default)]
    pub ignore_cert: bool,
    pub ca_file: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    /// NetScaler ADC, Nitro v1 with session login
    #[default]
    Adc,
    /// Citrix ADM, Nitro v2 with Basic credentials
    Mps,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TargetConfig {
    pub url: String,
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: TargetKind,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    pub username: Option<String>,
    pub password: Option<SecretString>,
    pub ignore_cert: Option<bool>,
    pub ca_file: Option<String>,
    #[serde(default)]
    pub disabled_modules: Vec<String>,
}

/// Username and password used against one appliance
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

/// A fully resolved scrape target. Read-only for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct Target {
    pub url: String,
    pub name: String,
    pub kind: TargetKind,
    pub labels: BTreeMap<String, String>,
    pub credentials: Option<Credentials>,
    pub ignore_cert: bool,
    pub ca_file: Option<String>,
    pub disabled_modules: BTreeSet<String>,
}

impl Target {
    /// Minimal ADC target, mostly useful in tests and tooling.
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            name: url.clone(),
            url,
            kind: TargetKind::Adc,
            labels: BTreeMap::new(),
            credentials: None,
            ignore_cert: false,
            ca_file: None,
            disabled_modules: BTreeSet::new(),
        }
    }

    pub fn with_credentials(mut self, username: &str, password: &str) -> Self {
        self.credentials = Some(Credentials {
            username: username.to_string(),
            password: SecretString::from(password.to_string()),
        });
        self
    }

    pub fn is_module_disabled(&self, name: &str) -> bool {
        self.disabled_modules.contains(name)
    }

    /// Value of the `ns_instance` label
    pub fn instance(&self) -> &str {
        &self.url
    }
}

fn default_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9280
}

fn default_parallelism() -> usize {
    5
}

fn default_timeout_seconds() -> u64 {
    60
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            port: default_port(),
        }
    }
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            parallelism: default_parallelism(),
            timeout_seconds: default_timeout_seconds(),
            disabled_modules: Vec::new(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        Self::layered(config::File::with_name(path).required(false))
    }

    /// Load from a document passed on the command line. JSON when it opens
    /// with `{`, TOML otherwise. Environment overrides still apply.
    pub fn load_inline(document: &str) -> Result<Self> {
        let format = if document.trim_start().starts_with('{') {
            config::FileFormat::Json
        } else {
            config::FileFormat::Toml
        };
        Self::layered(config::File::from_str(document, format))
    }

    fn layered<S>(source: S) -> Result<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        // Load environment variables from .env if present
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(source)
            .add_source(config::Environment::with_prefix("NETSCALER_EXPORTER").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    pub fn validate(&self) -> Result<()> {
        if self.targets.is_empty() {
            bail!("at least one target must be configured");
        }
        if self.scrape.parallelism == 0 {
            bail!("scrape.parallelism must be at least 1");
        }
        if self.scrape.timeout_seconds == 0 {
            bail!("scrape.timeout_seconds must be at least 1");
        }
        for key in self.label_keys() {
            if !is_valid_label_name(&key) {
                bail!("invalid label key {:?}: must match [a-zA-Z_][a-zA-Z0-9_]*", key);
            }
            if RESERVED_LABELS.contains(&key.as_str()) {
                bail!("label key {:?} is reserved for exporter series", key);
            }
        }
        for target in &self.targets {
            let url = reqwest::Url::parse(target.url.trim())
                .with_context(|| format!("invalid target url {:?}", target.url))?;
            if url.scheme() != "http" && url.scheme() != "https" {
                bail!("target url {:?} must use http or https", target.url);
            }
        }
        Ok(())
    }

    /// Sorted union of every configured label key, global and per-target.
    pub fn label_keys(&self) -> Vec<String> {
        let keys: BTreeSet<&String> = self
            .labels
            .keys()
            .chain(self.targets.iter().flat_map(|t| t.labels.keys()))
            .collect();
        keys.into_iter().cloned().collect()
    }

    /// Resolve per-target overrides against the global sections.
    pub fn resolve_targets(&self) -> Vec<Target> {
        self.targets
            .iter()
            .map(|t| {
                let mut labels = self.labels.clone();
                labels.extend(t.labels.clone());

                let username = t
                    .username
                    .clone()
                    .or_else(|| self.credentials.username.clone())
                    .filter(|u| !u.is_empty());
                let password = t
                    .password
                    .clone()
                    .or_else(|| self.credentials.password.clone())
                    .unwrap_or_else(|| SecretString::from(String::new()));
                let credentials = username.map(|username| Credentials { username, password });

                let disabled_modules = self
                    .scrape
                    .disabled_modules
                    .iter()
                    .chain(t.disabled_modules.iter())
                    .map(|m| m.trim().to_string())
                    .filter(|m| !m.is_empty())
                    .collect();

                Target {
                    url: t.url.trim().to_string(),
                    name: t.name.clone().unwrap_or_else(|| t.url.trim().to_string()),
                    kind: t.kind,
                    labels,
                    credentials,
                    ignore_cert: t.ignore_cert.unwrap_or(self.credentials.ignore_cert),
                    ca_file: t.ca_file.clone().or_else(|| self.credentials.ca_file.clone()),
                    disabled_modules,
                }
            })
            .collect()
    }
}
