//! Graph client configuration loaded from environment variables or built
//! programmatically.
//!
//! # Environment variables
//!
//! - `GRAPH_ACCESS_TOKEN` (required)
//! - `GRAPH_APP_ID`, `GRAPH_APP_SECRET` (optional; the secret enables `appsecret_proof`)
//! - `GRAPH_API_VERSION` (default [`DEFAULT_API_VERSION`])
//! - `GRAPH_BASE_URL` (default [`DEFAULT_GRAPH_URL`])
//! - `GRAPH_TIMEOUT_SECS`, `GRAPH_PROXY`
//! - `GRAPH_ACCOUNT_ID` (must begin with `act_`)
//! - `GRAPH_DEBUG` (log a curl line per call)

use crate::errors::{ConfigError, env_flag, env_opt, env_opt_u64, must_env};

/// Graph API version used when none is configured.
pub const DEFAULT_API_VERSION: &str = "v21.0";

/// Public Graph endpoint.
pub const DEFAULT_GRAPH_URL: &str = "https://graph.facebook.com";

/// Version string reported in the `User-Agent` header.
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Runtime configuration for a Graph session.
#[derive(Clone)]
pub struct GraphConfig {
    pub app_id: Option<String>,
    pub app_secret: Option<String>,
    pub access_token: String,
    /// Version segment inserted in every path, e.g. `v21.0`.
    pub api_version: String,
    /// API base without version, e.g. `https://graph.facebook.com`.
    pub base_url: String,
    pub timeout_secs: Option<u64>,
    pub proxy: Option<String>,
    /// Account used by callers that need a default `act_<id>` parent.
    pub default_account_id: Option<String>,
    /// Logs a curl equivalent of every call at debug level.
    pub debug: bool,
}

impl std::fmt::Debug for GraphConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphConfig")
            .field("app_id", &self.app_id)
            .field("app_secret", &self.app_secret.as_ref().map(|_| "<redacted>"))
            .field("access_token", &"<redacted>")
            .field("api_version", &self.api_version)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("proxy", &self.proxy)
            .field("default_account_id", &self.default_account_id)
            .field("debug", &self.debug)
            .finish()
    }
}

impl GraphConfig {
    /// Config with defaults for everything except the token.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            app_id: None,
            app_secret: None,
            access_token: access_token.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            base_url: DEFAULT_GRAPH_URL.to_string(),
            timeout_secs: None,
            proxy: None,
            default_account_id: None,
            debug: false,
        }
    }

    /// Loads the config strictly from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut cfg = Self::new(must_env("GRAPH_ACCESS_TOKEN")?);
        cfg.app_id = env_opt("GRAPH_APP_ID");
        cfg.app_secret = env_opt("GRAPH_APP_SECRET");
        if let Some(v) = env_opt("GRAPH_API_VERSION") {
            cfg.api_version = v;
        }
        if let Some(url) = env_opt("GRAPH_BASE_URL") {
            cfg.base_url = url;
        }
        cfg.timeout_secs = env_opt_u64("GRAPH_TIMEOUT_SECS")?;
        cfg.proxy = env_opt("GRAPH_PROXY");
        cfg.default_account_id = env_opt("GRAPH_ACCOUNT_ID");
        cfg.debug = env_flag("GRAPH_DEBUG");

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn with_app_secret(mut self, app_id: Option<String>, app_secret: impl Into<String>) -> Self {
        self.app_id = app_id;
        self.app_secret = Some(app_secret.into());
        self
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_default_account_id(mut self, account_id: impl Into<String>) -> Self {
        self.default_account_id = Some(account_id.into());
        self
    }

    /// Validates config values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.access_token.trim().is_empty() {
            return Err(ConfigError::MissingVar("GRAPH_ACCESS_TOKEN"));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidFormat {
                var: "GRAPH_BASE_URL",
                reason: "must start with http:// or https://",
            });
        }
        if !is_valid_api_version(&self.api_version) {
            return Err(ConfigError::InvalidApiVersion(self.api_version.clone()));
        }
        if let Some(account) = &self.default_account_id {
            validate_account_id(account)?;
        }
        Ok(())
    }
}

/// True when `version` contains `v<digits>.<digits>`.
pub fn is_valid_api_version(version: &str) -> bool {
    let bytes = version.as_bytes();
    (0..bytes.len()).any(|start| {
        if bytes[start] != b'v' {
            return false;
        }
        let major = count_digits(&bytes[start + 1..]);
        if major == 0 {
            return false;
        }
        let dot = start + 1 + major;
        bytes.get(dot) == Some(&b'.') && count_digits(&bytes[dot + 1..]) > 0
    })
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}

/// Ad account ids are only accepted in their `act_<id>` form.
pub fn validate_account_id(account_id: &str) -> Result<(), ConfigError> {
    if account_id.contains("act_") {
        Ok(())
    } else {
        Err(ConfigError::InvalidAccountId(account_id.to_string()))
    }
}
