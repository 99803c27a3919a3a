//! Authenticated HTTP session: transport plus the auth query parameters
//! attached to every call.

use std::sync::Arc;
use std::time::Duration;

use http_transport::{ReqwestTransport, Transport, TransportConfig};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{debug, warn};

use crate::config::{GraphConfig, SDK_VERSION};
use crate::errors::{GraphApiError, GraphApiResult};

type HmacSha256 = Hmac<Sha256>;

/// Transport and credentials shared by every call of a [`crate::GraphApi`].
#[derive(Clone)]
pub struct Session {
    transport: Arc<dyn Transport>,
    base_url: String,
    access_token: String,
    appsecret_proof: Option<String>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.base_url)
            .field("appsecret_proof", &self.appsecret_proof.is_some())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Builds a session over a reqwest transport configured from `cfg`.
    pub fn new(cfg: &GraphConfig) -> GraphApiResult<Self> {
        let transport = ReqwestTransport::new(&TransportConfig {
            timeout: cfg.timeout_secs.map(Duration::from_secs),
            proxy: cfg.proxy.clone(),
            user_agent: format!("fbbizsdk-rust-{SDK_VERSION}"),
        })?;
        Ok(Self::with_transport(cfg, Arc::new(transport)))
    }

    /// Builds a session over an arbitrary transport (tests, custom clients).
    pub fn with_transport(cfg: &GraphConfig, transport: Arc<dyn Transport>) -> Self {
        let appsecret_proof = cfg
            .app_secret
            .as_deref()
            .and_then(|secret| match appsecret_proof(secret, &cfg.access_token) {
                Ok(proof) => Some(proof),
                Err(e) => {
                    warn!(error = %e, "appsecret_proof not attached");
                    None
                }
            });

        debug!(
            base_url = %cfg.base_url,
            with_proof = appsecret_proof.is_some(),
            "graph session created"
        );

        Self {
            transport,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            access_token: cfg.access_token.clone(),
            appsecret_proof,
        }
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Graph base URL without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn appsecret_proof(&self) -> Option<&str> {
        self.appsecret_proof.as_deref()
    }

    /// Query parameters that authenticate every request.
    pub fn auth_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("access_token".to_string(), self.access_token.clone())];
        if let Some(proof) = &self.appsecret_proof {
            params.push(("appsecret_proof".to_string(), proof.clone()));
        }
        params
    }
}

/// Hex-encoded HMAC-SHA256 of the access token keyed by the app secret.
pub fn appsecret_proof(app_secret: &str, access_token: &str) -> GraphApiResult<String> {
    let mac = HmacSha256::new_from_slice(app_secret.as_bytes())
        .map_err(|e| GraphApiError::BadParameter(format!("app secret rejected: {e}")))?
        .chain_update(access_token.as_bytes());
    Ok(format!("{:x}", mac.finalize().into_bytes()))
}
