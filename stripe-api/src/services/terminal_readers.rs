use std::collections::BTreeMap;

use http_transport::HttpMethod;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::RequestOptions;
use crate::encode::sanitize_id;
use crate::errors::StripeResult;
use crate::list::{HasId, ListObject};
use crate::requestor::ApiRequestor;

use super::list_page;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReaderStatus {
    Online,
    Offline,
}

/// A physical device for accepting payment details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reader {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub serial_number: String,
    pub device_type: Option<String>,
    pub device_sw_version: Option<String>,
    pub ip_address: Option<String>,
    /// Location id, or the expanded location object.
    pub location: Option<Value>,
    /// The action the reader is currently running, if any.
    pub action: Option<Value>,
    pub status: Option<ReaderStatus>,
    #[serde(default)]
    pub livemode: bool,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// Set on the reply to a delete.
    pub deleted: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl HasId for Reader {
    fn id(&self) -> Option<&str> {
        Some(&self.id)
    }
}

/// `/v1/terminal/readers`.
#[derive(Debug, Clone, Copy)]
pub struct ReaderService<'a> {
    requestor: &'a ApiRequestor,
}

impl<'a> ReaderService<'a> {
    pub(crate) fn new(requestor: &'a ApiRequestor) -> Self {
        Self { requestor }
    }

    /// Test-mode helpers that simulate reader interactions.
    pub fn test_helpers(&self) -> ReaderTestHelpers<'a> {
        ReaderTestHelpers {
            requestor: self.requestor,
        }
    }

    pub async fn create<P: Serialize + ?Sized>(
        &self,
        params: &P,
        options: &RequestOptions,
    ) -> StripeResult<Reader> {
        self.requestor
            .request(HttpMethod::Post, "/v1/terminal/readers", params, options)
            .await
    }

    pub async fn retrieve<P: Serialize + ?Sized>(
        &self,
        reader: &str,
        params: &P,
        options: &RequestOptions,
    ) -> StripeResult<Reader> {
        self.requestor
            .request(HttpMethod::Get, &reader_path(reader), params, options)
            .await
    }

    pub async fn update<P: Serialize + ?Sized>(
        &self,
        reader: &str,
        params: &P,
        options: &RequestOptions,
    ) -> StripeResult<Reader> {
        self.requestor
            .request(HttpMethod::Post, &reader_path(reader), params, options)
            .await
    }

    pub async fn delete<P: Serialize + ?Sized>(
        &self,
        reader: &str,
        params: &P,
        options: &RequestOptions,
    ) -> StripeResult<Reader> {
        self.requestor
            .request(HttpMethod::Delete, &reader_path(reader), params, options)
            .await
    }

    pub async fn list<P: Serialize + ?Sized>(
        &self,
        params: &P,
        options: &RequestOptions,
    ) -> StripeResult<ListObject<Reader>> {
        list_page(self.requestor, "/v1/terminal/readers", params, options).await
    }

    pub async fn cancel_action<P: Serialize + ?Sized>(
        &self,
        reader: &str,
        params: &P,
        options: &RequestOptions,
    ) -> StripeResult<Reader> {
        self.action(reader, "cancel_action", params, options).await
    }

    pub async fn process_payment_intent<P: Serialize + ?Sized>(
        &self,
        reader: &str,
        params: &P,
        options: &RequestOptions,
    ) -> StripeResult<Reader> {
        self.action(reader, "process_payment_intent", params, options)
            .await
    }

    pub async fn process_setup_intent<P: Serialize + ?Sized>(
        &self,
        reader: &str,
        params: &P,
        options: &RequestOptions,
    ) -> StripeResult<Reader> {
        self.action(reader, "process_setup_intent", params, options)
            .await
    }

    pub async fn refund_payment<P: Serialize + ?Sized>(
        &self,
        reader: &str,
        params: &P,
        options: &RequestOptions,
    ) -> StripeResult<Reader> {
        self.action(reader, "refund_payment", params, options).await
    }

    pub async fn set_reader_display<P: Serialize + ?Sized>(
        &self,
        reader: &str,
        params: &P,
        options: &RequestOptions,
    ) -> StripeResult<Reader> {
        self.action(reader, "set_reader_display", params, options)
            .await
    }

    async fn action<P: Serialize + ?Sized>(
        &self,
        reader: &str,
        action: &str,
        params: &P,
        options: &RequestOptions,
    ) -> StripeResult<Reader> {
        let path = format!("{}/{action}", reader_path(reader));
        self.requestor
            .request(HttpMethod::Post, &path, params, options)
            .await
    }
}

/// `/v1/test_helpers/terminal/readers`.
#[derive(Debug, Clone, Copy)]
pub struct ReaderTestHelpers<'a> {
    requestor: &'a ApiRequestor,
}

impl ReaderTestHelpers<'_> {
    /// Presents a payment method on a simulated reader.
    pub async fn present_payment_method<P: Serialize + ?Sized>(
        &self,
        reader: &str,
        params: &P,
        options: &RequestOptions,
    ) -> StripeResult<Reader> {
        let path = format!(
            "/v1/test_helpers/terminal/readers/{}/present_payment_method",
            sanitize_id(reader)
        );
        self.requestor
            .request(HttpMethod::Post, &path, params, options)
            .await
    }
}

fn reader_path(reader: &str) -> String {
    format!("/v1/terminal/readers/{}", sanitize_id(reader))
}
