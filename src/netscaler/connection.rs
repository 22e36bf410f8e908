//! Nitro Session Management
//!
//! This module owns the single authenticated channel to one appliance. The session
//! token is created lazily on the first read, cached across scrapes, and renewed
//! transparently when the appliance reports expiry in-band (HTTP 200 with
//! `errorcode` 444 or 1027). A renewed request is retried exactly once.

use crate::config::{Target, TargetKind};
use crate::error::{ExporterError, NitroErrorCode, Result};
use crate::netscaler::types::{LoginResponse, NitroEnvelope};
use reqwest::header::{ACCEPT, COOKIE};
use secrecy::ExposeSecret;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const IDLE_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_IDLE_PER_HOST: usize = 20;

/// Outcome of one GET before session handling is applied
enum Reply {
    Body(Vec<u8>),
    Expired,
}

/// Manages the session lifecycle against one Nitro endpoint
pub struct NitroConnection {
    target: Arc<Target>,
    base_url: String,
    http: RwLock<reqwest::Client>,
    /// Current session token. Held across the login call so concurrent
    /// callers that need a session wait for the one login in flight.
    session: Mutex<Option<String>>,
}

impl NitroConnection {
    pub fn new(target: Arc<Target>) -> Result<Self> {
        let http = build_http_client(&target)?;
        let base_url = base_url(&target.url, target.kind);
        Ok(Self {
            target,
            base_url,
            http: RwLock::new(http),
            session: Mutex::new(None),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn http(&self) -> reqwest::Client {
        self.http
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// True when a session token is cached
    pub async fn has_session(&self) -> bool {
        self.session.lock().await.is_some()
    }

    /// Authenticate if needed.
    ///
    /// No-op when a session already exists, when no credentials are configured,
    /// or for ADM targets that send Basic credentials on every request.
    pub async fn login(&self) -> Result<()> {
        if self.target.kind == TargetKind::Mps {
            return Ok(());
        }
        let Some(credentials) = self.target.credentials.as_ref() else {
            return Ok(());
        };

        let mut session = self.session.lock().await;
        if session.is_some() {
            return Ok(());
        }

        let payload = serde_json::json!({
            "login": {
                "username": credentials.username,
                "password": credentials.password.expose_secret(),
            }
        });

        debug!(target_url = %self.target.url, "Logging in to Nitro API");
        let response = self
            .http()
            .post(format!("{}config/login", self.base_url))
            .header(ACCEPT, "application/json")
            .json(&payload)
            .send()
            .await?;
        let status = response.status();
        let body = response.bytes().await?;

        let login: LoginResponse = match serde_json::from_slice(&body) {
            Ok(login) => login,
            Err(_) if !status.is_success() => {
                return Err(ExporterError::Status {
                    status,
                    body: String::from_utf8_lossy(&body).into_owned(),
                })
            }
            Err(e) => return Err(e.into()),
        };

        if login.errorcode != 0 {
            return Err(ExporterError::Auth(format!(
                "{} (errorcode: {})",
                login.message, login.errorcode
            )));
        }

        match login.sessionid.filter(|s| !s.is_empty()) {
            Some(token) => {
                *session = Some(token);
                info!(target_url = %self.target.url, "Session login successful");
                Ok(())
            }
            None => Err(ExporterError::Auth(
                "login response carried no session id".to_string(),
            )),
        }
    }

    /// Clear the session, but only if it is still the token the failed
    /// request carried. A caller holding a stale token leaves a fresher
    /// session from a concurrent re-login untouched.
    async fn invalidate(&self, used: Option<&str>) {
        let mut session = self.session.lock().await;
        if session.as_deref() == used {
            *session = None;
        }
    }

    async fn current_session(&self) -> Option<String> {
        self.session.lock().await.clone()
    }

    /// Read one resource, renewing the session at most once.
    pub async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Vec<u8>> {
        self.login().await?;

        let token = self.current_session().await;
        match self.send(path, query, token.as_deref()).await? {
            Reply::Body(body) => Ok(body),
            Reply::Expired => {
                info!(target_url = %self.target.url, path, "Session expired, logging in again");
                self.invalidate(token.as_deref()).await;
                self.login().await?;

                let token = self.current_session().await;
                match self.send(path, query, token.as_deref()).await? {
                    Reply::Body(body) => Ok(body),
                    Reply::Expired => {
                        warn!(target_url = %self.target.url, path, "Session expired again after re-login");
                        Err(ExporterError::SessionExpired)
                    }
                }
            }
        }
    }

    async fn send(&self, path: &str, query: &[(&str, &str)], token: Option<&str>) -> Result<Reply> {
        let mut request = self
            .http()
            .get(format!("{}{}", self.base_url, path))
            .header(ACCEPT, "application/json");
        if !query.is_empty() {
            request = request.query(query);
        }

        match (self.target.kind, &self.target.credentials, token) {
            (TargetKind::Mps, Some(credentials), _) => {
                request = request.basic_auth(
                    &credentials.username,
                    Some(credentials.password.expose_secret()),
                );
            }
            (TargetKind::Adc, _, Some(token)) => {
                request = request.header(COOKIE, format!("sessionid={token}"));
            }
            _ => {}
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?.to_vec();

        if !status.is_success() {
            return Err(ExporterError::Status {
                status,
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        if let Ok(envelope) = serde_json::from_slice::<NitroEnvelope>(&body) {
            match NitroErrorCode::from_code(envelope.errorcode) {
                NitroErrorCode::Ok => {}
                code if code.is_session_expiry() && self.target.kind == TargetKind::Adc => {
                    return Ok(Reply::Expired);
                }
                _ if envelope.severity.eq_ignore_ascii_case("WARNING") => {
                    debug!(path, message = %envelope.message, "Nitro warning");
                }
                _ => {
                    return Err(ExporterError::NitroApi {
                        code: envelope.errorcode,
                        message: envelope.message,
                    })
                }
            }
        }

        Ok(Reply::Body(body))
    }

    /// Drop pooled connections. The session survives, so a later read reuses it.
    pub fn close(&self) -> Result<()> {
        let fresh = build_http_client(&self.target)?;
        *self.http.write().unwrap_or_else(PoisonError::into_inner) = fresh;
        Ok(())
    }
}

/// `<url trimmed of spaces and '/'>/nitro/v1/` (ADC) or `/nitro/v2/` (ADM)
pub fn base_url(url: &str, kind: TargetKind) -> String {
    let trimmed = url.trim_matches(|c| c == ' ' || c == '/');
    match kind {
        TargetKind::Adc => format!("{trimmed}/nitro/v1/"),
        TargetKind::Mps => format!("{trimmed}/nitro/v2/"),
    }
}

fn build_http_client(target: &Target) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .pool_idle_timeout(IDLE_TIMEOUT)
        .pool_max_idle_per_host(MAX_IDLE_PER_HOST);

    if target.ignore_cert {
        builder = builder.danger_accept_invalid_certs(true);
    } else if let Some(ca_file) = target.ca_file.as_deref().filter(|f| !f.is_empty()) {
        let pem = std::fs::read(ca_file)?;
        let certificate = reqwest::Certificate::from_pem(&pem)?;
        builder = builder.add_root_certificate(certificate);
    }

    Ok(builder.build()?)
}
