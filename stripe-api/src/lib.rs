//! Async Stripe client.
//!
//! [`StripeClient`] owns an [`ApiRequestor`] and hands out one service per
//! resource. Params are anything that serializes to a map (typed structs or
//! `serde_json::json!`) and are sent bracket form-encoded; replies decode
//! into typed resources or a classified [`StripeError`].

pub mod config;
pub mod encode;
pub mod errors;
pub mod list;
pub mod requestor;
pub mod services;
pub mod telemetry;

use std::sync::Arc;

use http_transport::Transport;

pub use config::{DEFAULT_STRIPE_VERSION, RequestOptions, StripeConfig};
pub use errors::{ErrorDetails, OAuthErrorKind, StripeError, StripeResult};
pub use list::{HasId, ListObject, SearchResult};
pub use requestor::ApiRequestor;
pub use services::{
    PaymentIntent, PaymentIntentService, PaymentIntentStatus, Reader, ReaderService, ReaderStatus,
    ReaderTestHelpers,
};

#[derive(Debug, Clone)]
pub struct StripeClient {
    requestor: ApiRequestor,
}

impl StripeClient {
    pub fn new(config: StripeConfig) -> StripeResult<Self> {
        Ok(Self {
            requestor: ApiRequestor::new(config)?,
        })
    }

    /// Client configured from `STRIPE_*` variables.
    pub fn from_env() -> StripeResult<Self> {
        Self::new(StripeConfig::from_env()?)
    }

    pub fn with_transport(config: StripeConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            requestor: ApiRequestor::with_transport(config, transport),
        }
    }

    pub fn requestor(&self) -> &ApiRequestor {
        &self.requestor
    }

    pub fn payment_intents(&self) -> PaymentIntentService<'_> {
        PaymentIntentService::new(&self.requestor)
    }

    pub fn terminal_readers(&self) -> ReaderService<'_> {
        ReaderService::new(&self.requestor)
    }
}
