use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use http_transport::HttpMethod;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::RequestOptions;
use crate::encode::sanitize_id;
use crate::errors::StripeResult;
use crate::list::{HasId, ListObject, SearchResult};
use crate::requestor::ApiRequestor;

use super::{list_page, search_page};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentIntentStatus {
    Canceled,
    Processing,
    RequiresAction,
    RequiresCapture,
    RequiresConfirmation,
    RequiresPaymentMethod,
    Succeeded,
    #[serde(other)]
    Unknown,
}

/// A payment in progress, from creation through checkout.
///
/// Fields not modelled here stay available in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    #[serde(default)]
    pub amount: i64,
    #[serde(default)]
    pub amount_capturable: i64,
    #[serde(default)]
    pub amount_received: i64,
    #[serde(default)]
    pub currency: String,
    pub status: Option<PaymentIntentStatus>,
    pub customer: Option<Value>,
    pub client_secret: Option<String>,
    pub created: Option<i64>,
    #[serde(default)]
    pub livemode: bool,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PaymentIntent {
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created.and_then(|secs| DateTime::from_timestamp(secs, 0))
    }
}

impl HasId for PaymentIntent {
    fn id(&self) -> Option<&str> {
        Some(&self.id)
    }
}

/// `/v1/payment_intents`.
#[derive(Debug, Clone, Copy)]
pub struct PaymentIntentService<'a> {
    requestor: &'a ApiRequestor,
}

impl<'a> PaymentIntentService<'a> {
    pub(crate) fn new(requestor: &'a ApiRequestor) -> Self {
        Self { requestor }
    }

    pub async fn create<P: Serialize + ?Sized>(
        &self,
        params: &P,
        options: &RequestOptions,
    ) -> StripeResult<PaymentIntent> {
        self.requestor
            .request(HttpMethod::Post, "/v1/payment_intents", params, options)
            .await
    }

    pub async fn retrieve<P: Serialize + ?Sized>(
        &self,
        intent: &str,
        params: &P,
        options: &RequestOptions,
    ) -> StripeResult<PaymentIntent> {
        self.requestor
            .request(HttpMethod::Get, &intent_path(intent), params, options)
            .await
    }

    pub async fn update<P: Serialize + ?Sized>(
        &self,
        intent: &str,
        params: &P,
        options: &RequestOptions,
    ) -> StripeResult<PaymentIntent> {
        self.requestor
            .request(HttpMethod::Post, &intent_path(intent), params, options)
            .await
    }

    pub async fn list<P: Serialize + ?Sized>(
        &self,
        params: &P,
        options: &RequestOptions,
    ) -> StripeResult<ListObject<PaymentIntent>> {
        list_page(self.requestor, "/v1/payment_intents", params, options).await
    }

    /// Search query language, e.g. `status:'succeeded' AND metadata['order_id']:'6735'`.
    pub async fn search<P: Serialize + ?Sized>(
        &self,
        params: &P,
        options: &RequestOptions,
    ) -> StripeResult<SearchResult<PaymentIntent>> {
        search_page(self.requestor, "/v1/payment_intents/search", params, options).await
    }

    pub async fn cancel<P: Serialize + ?Sized>(
        &self,
        intent: &str,
        params: &P,
        options: &RequestOptions,
    ) -> StripeResult<PaymentIntent> {
        self.action(intent, "cancel", params, options).await
    }

    pub async fn capture<P: Serialize + ?Sized>(
        &self,
        intent: &str,
        params: &P,
        options: &RequestOptions,
    ) -> StripeResult<PaymentIntent> {
        self.action(intent, "capture", params, options).await
    }

    pub async fn confirm<P: Serialize + ?Sized>(
        &self,
        intent: &str,
        params: &P,
        options: &RequestOptions,
    ) -> StripeResult<PaymentIntent> {
        self.action(intent, "confirm", params, options).await
    }

    pub async fn increment_authorization<P: Serialize + ?Sized>(
        &self,
        intent: &str,
        params: &P,
        options: &RequestOptions,
    ) -> StripeResult<PaymentIntent> {
        self.action(intent, "increment_authorization", params, options)
            .await
    }

    pub async fn apply_customer_balance<P: Serialize + ?Sized>(
        &self,
        intent: &str,
        params: &P,
        options: &RequestOptions,
    ) -> StripeResult<PaymentIntent> {
        self.action(intent, "apply_customer_balance", params, options)
            .await
    }

    pub async fn verify_microdeposits<P: Serialize + ?Sized>(
        &self,
        intent: &str,
        params: &P,
        options: &RequestOptions,
    ) -> StripeResult<PaymentIntent> {
        self.action(intent, "verify_microdeposits", params, options)
            .await
    }

    async fn action<P: Serialize + ?Sized>(
        &self,
        intent: &str,
        action: &str,
        params: &P,
        options: &RequestOptions,
    ) -> StripeResult<PaymentIntent> {
        let path = format!("{}/{action}", intent_path(intent));
        self.requestor
            .request(HttpMethod::Post, &path, params, options)
            .await
    }
}

fn intent_path(intent: &str) -> String {
    format!("/v1/payment_intents/{}", sanitize_id(intent))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StripeClient;
    use crate::config::StripeConfig;
    use futures::TryStreamExt;
    use http_transport::{RequestBody, ScriptedTransport};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;

    fn client(transport: &ScriptedTransport) -> StripeClient {
        StripeClient::with_transport(
            StripeConfig::new("sk_test").with_api_base("https://stripe.test"),
            Arc::new(transport.clone()),
        )
    }

    fn intent(id: &str, status: &str) -> Value {
        json!({"id": id, "object": "payment_intent", "amount": 2000, "currency": "usd",
               "status": status, "created": 1_700_000_000, "livemode": false,
               "metadata": {"order": "42"}, "payment_method_types": ["card"]})
    }

    #[tokio::test]
    async fn create_decodes_the_intent() {
        let transport =
            ScriptedTransport::new().respond_with(200, intent("pi_1", "requires_payment_method").to_string());
        let pi = client(&transport)
            .payment_intents()
            .create(
                &json!({"amount": 2000, "currency": "usd", "automatic_payment_methods": {"enabled": true}}),
                &RequestOptions::new(),
            )
            .await
            .unwrap();

        assert_eq!(pi.id, "pi_1");
        assert_eq!(pi.status, Some(PaymentIntentStatus::RequiresPaymentMethod));
        assert_eq!(pi.metadata.get("order").map(String::as_str), Some("42"));
        assert_eq!(pi.extra["payment_method_types"], json!(["card"]));
        assert_eq!(pi.created_at().map(|t| t.timestamp()), Some(1_700_000_000));

        let sent = &transport.requests()[0];
        assert_eq!(sent.url, "https://stripe.test/v1/payment_intents");
        assert_eq!(
            sent.body,
            RequestBody::RawForm(
                "amount=2000&automatic_payment_methods[enabled]=true&currency=usd".into()
            )
        );
    }

    #[tokio::test]
    async fn actions_post_to_their_own_path() {
        let transport = ScriptedTransport::new()
            .respond_with(200, intent("pi_1", "requires_capture").to_string())
            .respond_with(200, intent("pi_1", "succeeded").to_string())
            .respond_with(200, intent("pi_1", "canceled").to_string());
        let client = client(&transport);
        let service = client.payment_intents();
        let opts = RequestOptions::new();

        service
            .confirm("pi_1", &json!({"payment_method": "pm_card_visa"}), &opts)
            .await
            .unwrap();
        let captured = service
            .capture("pi_1", &json!({"amount_to_capture": 1500}), &opts)
            .await
            .unwrap();
        let canceled = service.cancel("pi_1", &(), &opts).await.unwrap();

        assert_eq!(captured.status, Some(PaymentIntentStatus::Succeeded));
        assert_eq!(canceled.status, Some(PaymentIntentStatus::Canceled));
        let urls: Vec<String> = transport.requests().into_iter().map(|r| r.url).collect();
        assert_eq!(
            urls,
            vec![
                "https://stripe.test/v1/payment_intents/pi_1/confirm",
                "https://stripe.test/v1/payment_intents/pi_1/capture",
                "https://stripe.test/v1/payment_intents/pi_1/cancel",
            ]
        );
    }

    #[tokio::test]
    async fn unknown_status_does_not_fail_decoding() {
        let transport =
            ScriptedTransport::new().respond_with(200, intent("pi_9", "brand_new_state").to_string());
        let pi = client(&transport)
            .payment_intents()
            .retrieve("pi_9", &(), &RequestOptions::new())
            .await
            .unwrap();
        assert_eq!(pi.status, Some(PaymentIntentStatus::Unknown));
    }

    #[tokio::test]
    async fn list_auto_pages_typed_intents() {
        let transport = ScriptedTransport::new()
            .respond_with(
                200,
                json!({"object": "list", "url": "/v1/payment_intents", "has_more": true,
                       "data": [intent("pi_1", "succeeded")]})
                .to_string(),
            )
            .respond_with(
                200,
                json!({"object": "list", "url": "/v1/payment_intents", "has_more": false,
                       "data": [intent("pi_2", "processing")]})
                .to_string(),
            );
        let list = client(&transport)
            .payment_intents()
            .list(&json!({"limit": 1, "customer": "cus_1"}), &RequestOptions::new())
            .await
            .unwrap();

        let all: Vec<PaymentIntent> = list.auto_paging().try_collect().await.unwrap();
        let ids: Vec<&str> = all.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["pi_1", "pi_2"]);
        assert_eq!(
            transport.requests()[1].url,
            "https://stripe.test/v1/payment_intents?customer=cus_1&limit=1&starting_after=pi_1"
        );
    }
}
