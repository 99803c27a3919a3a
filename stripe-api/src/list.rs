//! List and search pages with transparent auto-pagination.
//!
//! A page remembers the params and options it was fetched with. Following
//! pages reuse them with `starting_after` (or `ending_before` when walking
//! backwards) for lists and `page` for search results.

use std::collections::VecDeque;

use futures::Stream;
use futures::stream;
use http_transport::HttpMethod;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::config::RequestOptions;
use crate::errors::StripeResult;
use crate::requestor::ApiRequestor;

/// Resources that can anchor a list cursor.
pub trait HasId {
    fn id(&self) -> Option<&str>;
}

impl HasId for Value {
    fn id(&self) -> Option<&str> {
        self.get("id").and_then(Value::as_str)
    }
}

/// Where a page came from; needed to fetch its neighbours.
#[derive(Debug, Clone)]
pub(crate) struct PageContext {
    requestor: ApiRequestor,
    params: Map<String, Value>,
    options: RequestOptions,
}

impl PageContext {
    pub(crate) fn new(requestor: &ApiRequestor, params: Value, options: &RequestOptions) -> Self {
        let params = match params {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            requestor: requestor.clone(),
            params,
            options: options.clone(),
        }
    }

    async fn fetch<P: DeserializeOwned>(&self, url: &str, key: &str, cursor: &str) -> StripeResult<P> {
        let mut params = self.params.clone();
        params.insert(key.to_string(), Value::String(cursor.to_string()));
        self.requestor
            .request(HttpMethod::Get, url, &params, &self.options)
            .await
    }
}

/// One page of a `/v1/...` list endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ListObject<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub url: String,
    #[serde(skip)]
    context: Option<PageContext>,
}

impl<T> ListObject<T> {
    pub(crate) fn with_context(mut self, context: PageContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn empty_page(&self) -> Self {
        Self {
            data: Vec::new(),
            has_more: false,
            url: self.url.clone(),
            context: self.context.clone(),
        }
    }

    /// True when the first page was requested with `ending_before` only.
    fn walks_backwards(&self) -> bool {
        self.context.as_ref().is_some_and(|ctx| {
            ctx.params.contains_key("ending_before") && !ctx.params.contains_key("starting_after")
        })
    }
}

impl<T: DeserializeOwned + HasId> ListObject<T> {
    /// Page after the last item; empty when there is none.
    pub async fn next_page(&self) -> StripeResult<ListObject<T>> {
        match self.continuation(false) {
            Some((key, cursor)) => self.fetch(key, &cursor).await,
            None => Ok(self.empty_page()),
        }
    }

    /// Page before the first item; empty when there is none.
    pub async fn previous_page(&self) -> StripeResult<ListObject<T>> {
        match self.continuation(true) {
            Some((key, cursor)) => self.fetch(key, &cursor).await,
            None => Ok(self.empty_page()),
        }
    }

    /// Every item of this page and of all following pages.
    ///
    /// Lists started with `ending_before` are walked backwards, each page in
    /// reverse order.
    pub fn auto_paging(self) -> impl Stream<Item = StripeResult<T>> {
        let backwards = self.walks_backwards();
        stream::try_unfold(self.into_pager(backwards), move |mut pager| async move {
            loop {
                if let Some(item) = pager.items.pop_front() {
                    return Ok(Some((item, pager)));
                }
                let Some((page, key, cursor)) = pager.pending.take() else {
                    return Ok(None);
                };
                pager = match page.fetch(key, &cursor).await {
                    Ok(next) => next.into_pager(backwards),
                    Err(e) => return Err(e),
                };
            }
        })
    }

    fn continuation(&self, backwards: bool) -> Option<(&'static str, String)> {
        if !self.has_more || self.context.is_none() {
            return None;
        }
        let (key, anchor) = if backwards {
            ("ending_before", self.data.first())
        } else {
            ("starting_after", self.data.last())
        };
        anchor.and_then(HasId::id).map(|id| (key, id.to_string()))
    }

    async fn fetch(&self, key: &str, cursor: &str) -> StripeResult<ListObject<T>> {
        let Some(ctx) = &self.context else {
            return Ok(self.empty_page());
        };
        let page: ListObject<T> = ctx.fetch(&self.url, key, cursor).await?;
        Ok(page.with_context(ctx.clone()))
    }

    fn into_pager(mut self, backwards: bool) -> Pager<ListObject<T>, T> {
        let pending = self
            .continuation(backwards)
            .map(|(key, cursor)| (self.empty_page(), key, cursor));
        let mut items = std::mem::take(&mut self.data);
        if backwards {
            items.reverse();
        }
        Pager {
            items: items.into(),
            pending,
        }
    }
}

/// One page of a `/v1/.../search` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResult<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_page: Option<String>,
    #[serde(default)]
    pub total_count: Option<u64>,
    #[serde(default)]
    pub url: String,
    #[serde(skip)]
    context: Option<PageContext>,
}

impl<T> SearchResult<T> {
    pub(crate) fn with_context(mut self, context: PageContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn empty_page(&self) -> Self {
        Self {
            data: Vec::new(),
            has_more: false,
            next_page: None,
            total_count: self.total_count,
            url: self.url.clone(),
            context: self.context.clone(),
        }
    }

    fn continuation(&self) -> Option<String> {
        match (&self.context, self.has_more) {
            (Some(_), true) => self.next_page.clone(),
            _ => None,
        }
    }
}

impl<T: DeserializeOwned> SearchResult<T> {
    pub async fn next_search_result_page(&self) -> StripeResult<SearchResult<T>> {
        match self.continuation() {
            Some(token) => self.fetch(&token).await,
            None => Ok(self.empty_page()),
        }
    }

    /// Every item of this page and of all following pages.
    pub fn auto_paging(self) -> impl Stream<Item = StripeResult<T>> {
        stream::try_unfold(self.into_pager(), |mut pager| async move {
            loop {
                if let Some(item) = pager.items.pop_front() {
                    return Ok(Some((item, pager)));
                }
                let Some((page, _, token)) = pager.pending.take() else {
                    return Ok(None);
                };
                pager = match page.fetch(&token).await {
                    Ok(next) => next.into_pager(),
                    Err(e) => return Err(e),
                };
            }
        })
    }

    async fn fetch(&self, token: &str) -> StripeResult<SearchResult<T>> {
        let Some(ctx) = &self.context else {
            return Ok(self.empty_page());
        };
        let page: SearchResult<T> = ctx.fetch(&self.url, "page", token).await?;
        Ok(page.with_context(ctx.clone()))
    }

    fn into_pager(mut self) -> Pager<SearchResult<T>, T> {
        let pending = self
            .continuation()
            .map(|token| (self.empty_page(), "page", token));
        let items = std::mem::take(&mut self.data);
        Pager {
            items: items.into(),
            pending,
        }
    }
}

/// Auto-paging state: items left on the current page plus the page to
/// continue from.
struct Pager<P, T> {
    items: VecDeque<T>,
    pending: Option<(P, &'static str, String)>,
}
