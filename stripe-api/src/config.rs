//! Client configuration and per-call overrides.
//!
//! # Environment variables
//!
//! - `STRIPE_API_KEY` (required)
//! - `STRIPE_ACCOUNT` (sent as `Stripe-Account`)
//! - `STRIPE_VERSION` (sent as `Stripe-Version`, default [`DEFAULT_STRIPE_VERSION`])
//! - `STRIPE_API_BASE` (default [`DEFAULT_API_BASE`])
//! - `STRIPE_TIMEOUT_SECS`

use crate::errors::{ConfigError, env_opt, env_opt_u64, must_env};

pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";

/// API version pinned when neither the client nor the call names one.
pub const DEFAULT_STRIPE_VERSION: &str = "2024-06-20";

/// Reported in `User-Agent` and `X-Stripe-Client-User-Agent`.
pub const BINDINGS_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Clone, Default)]
pub struct StripeConfig {
    pub api_key: Option<String>,
    pub stripe_account: Option<String>,
    pub stripe_version: Option<String>,
    /// Scheme and host, no trailing slash.
    pub api_base: String,
    pub timeout_secs: Option<u64>,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("stripe_account", &self.stripe_account)
            .field("stripe_version", &self.stripe_version)
            .field("api_base", &self.api_base)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl StripeConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Self::without_key()
        }
    }

    /// Config whose calls must carry a key in their [`RequestOptions`].
    pub fn without_key() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            ..Default::default()
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let mut cfg = Self::new(must_env("STRIPE_API_KEY")?);
        cfg.stripe_account = env_opt("STRIPE_ACCOUNT");
        cfg.stripe_version = env_opt("STRIPE_VERSION");
        if let Some(base) = env_opt("STRIPE_API_BASE") {
            cfg.api_base = base;
        }
        cfg.timeout_secs = env_opt_u64("STRIPE_TIMEOUT_SECS")?;

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.stripe_account = Some(account.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.stripe_version = Some(version.into());
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.api_base.starts_with("http://") || self.api_base.starts_with("https://")) {
            return Err(ConfigError::InvalidFormat {
                var: "STRIPE_API_BASE",
                reason: "must start with http:// or https://",
            });
        }
        Ok(())
    }
}

/// Per-call overrides. Unset fields fall back to the client config.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub api_key: Option<String>,
    pub stripe_account: Option<String>,
    pub stripe_version: Option<String>,
    pub idempotency_key: Option<String>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn stripe_account(mut self, account: impl Into<String>) -> Self {
        self.stripe_account = Some(account.into());
        self
    }

    pub fn stripe_version(mut self, version: impl Into<String>) -> Self {
        self.stripe_version = Some(version.into());
        self
    }

    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    /// Fills unset fields from `cfg`.
    pub(crate) fn merged_with(&self, cfg: &StripeConfig) -> RequestOptions {
        let non_empty = |v: &Option<String>| v.clone().filter(|s| !s.trim().is_empty());
        RequestOptions {
            api_key: non_empty(&self.api_key).or_else(|| non_empty(&cfg.api_key)),
            stripe_account: non_empty(&self.stripe_account).or_else(|| cfg.stripe_account.clone()),
            stripe_version: non_empty(&self.stripe_version)
                .or_else(|| non_empty(&cfg.stripe_version))
                .or_else(|| Some(DEFAULT_STRIPE_VERSION.to_string())),
            idempotency_key: non_empty(&self.idempotency_key),
        }
    }
}
