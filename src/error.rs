use thiserror::Error;

/// Application error codes the Nitro API embeds in 200-level response bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NitroErrorCode {
    /// `errorcode` 0 or absent
    Ok,
    /// 444: the session cookie is no longer valid
    SessionExpired,
    /// 1027: authentication timed out on the appliance
    AuthTimeout,
    Other(i64),
}

impl NitroErrorCode {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Self::Ok,
            0x1BC => Self::SessionExpired,
            0x403 => Self::AuthTimeout,
            other => Self::Other(other),
        }
    }

    /// True when the session must be renewed before the request can succeed.
    pub fn is_session_expiry(self) -> bool {
        matches!(self, Self::SessionExpired | Self::AuthTimeout)
    }
}

#[derive(Debug, Error)]
pub enum ExporterError {
    #[error("Nitro API error: {message} (errorcode: {code})")]
    NitroApi { code: i64, message: String },

    #[error("Session expired again after re-login")]
    SessionExpired,

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request failed: {status} ({body})")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ExporterError>;
