//! Resource services. Each method is one REST call.

mod payment_intents;
mod terminal_readers;

use http_transport::HttpMethod;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::RequestOptions;
use crate::errors::StripeResult;
use crate::list::{ListObject, PageContext, SearchResult};
use crate::requestor::ApiRequestor;

pub use payment_intents::{PaymentIntent, PaymentIntentService, PaymentIntentStatus};
pub use terminal_readers::{Reader, ReaderService, ReaderStatus, ReaderTestHelpers};

/// GETs the first page of a list and arms it for auto-paging.
async fn list_page<T, P>(
    requestor: &ApiRequestor,
    path: &str,
    params: &P,
    options: &RequestOptions,
) -> StripeResult<ListObject<T>>
where
    T: DeserializeOwned,
    P: Serialize + ?Sized,
{
    let page: ListObject<T> = requestor
        .request(HttpMethod::Get, path, params, options)
        .await?;
    let context = PageContext::new(requestor, serde_json::to_value(params)?, options);
    Ok(page.with_context(context))
}

async fn search_page<T, P>(
    requestor: &ApiRequestor,
    path: &str,
    params: &P,
    options: &RequestOptions,
) -> StripeResult<SearchResult<T>>
where
    T: DeserializeOwned,
    P: Serialize + ?Sized,
{
    let page: SearchResult<T> = requestor
        .request(HttpMethod::Get, path, params, options)
        .await?;
    let context = PageContext::new(requestor, serde_json::to_value(params)?, options);
    Ok(page.with_context(context))
}
