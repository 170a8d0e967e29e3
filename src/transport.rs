use anyhow::{Context, Result, anyhow, bail};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{CmrErrorResponse, format_cmr_error};

/// Response header carrying the cursor for the next page.
pub const SEARCH_AFTER_HEADER: &str = "CMR-Search-After";
/// Response header carrying the total hit count.
pub const HITS_HEADER: &str = "CMR-Hits";

/// One page request, fully resolved.
#[derive(Clone)]
pub struct PageRequest {
    pub url: String,
    /// Query pairs, including `page_size`.
    pub query: Vec<(String, String)>,
    pub search_after: Option<String>,
    /// Full `Authorization` header value.
    pub authorization: Option<String>,
}

impl std::fmt::Debug for PageRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageRequest")
            .field("url", &self.url)
            .field("query", &self.query)
            .field("search_after", &self.search_after)
            .field(
                "authorization",
                &self.authorization.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// One page of results.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub items: Vec<Value>,
    pub hits: Option<u64>,
    /// Cursor for the next page; `None` means there is no next page.
    pub search_after: Option<String>,
}

/// Fetches pages. [`HttpTransport`] talks to CMR; tests substitute their own.
pub trait Transport {
    fn fetch(&self, request: &PageRequest) -> Result<Page>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn fetch(&self, request: &PageRequest) -> Result<Page> {
        (**self).fetch(request)
    }
}

#[derive(Debug, serde::Deserialize)]
struct UmmResponse {
    #[serde(default)]
    hits: Option<u64>,
    items: Vec<Value>,
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: HttpClient,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("cmr-rs/{}", env!("CARGO_PKG_VERSION")))
                .unwrap_or(HeaderValue::from_static("cmr-rs")),
        );
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = HttpClient::builder()
            .default_headers(default_headers)
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { http })
    }
}

impl Transport for HttpTransport {
    fn fetch(&self, request: &PageRequest) -> Result<Page> {
        let mut req = self.http.get(&request.url).query(&request.query);
        if let Some(cursor) = &request.search_after {
            req = req.header(SEARCH_AFTER_HEADER, cursor.as_str());
        }
        if let Some(auth) = &request.authorization {
            // never echo the value: it carries the token
            let mut value = HeaderValue::from_str(auth)
                .map_err(|_| anyhow!("resolved token is not a valid HTTP header value"))?;
            value.set_sensitive(true);
            req = req.header(AUTHORIZATION, value);
        }

        let resp = req
            .send()
            .with_context(|| format!("could not connect to {}", request.url))?;

        let status = resp.status();
        let headers = resp.headers();
        let search_after = header_str(headers, SEARCH_AFTER_HEADER).map(str::to_string);
        let header_hits = header_str(headers, HITS_HEADER).and_then(|v| v.parse::<u64>().ok());

        let text = resp.text().unwrap_or_default();
        if !status.is_success() {
            if let Ok(err_json) = serde_json::from_str::<CmrErrorResponse>(&text) {
                return Err(format_cmr_error(status, &request.url, &err_json));
            }
            bail!(
                "CMR request failed: HTTP {} for url ({})\n{}",
                status,
                request.url,
                text
            );
        }

        let body: UmmResponse = serde_json::from_str(&text).with_context(|| {
            format!(
                "failed to parse CMR search response (url={}, status={})",
                request.url, status
            )
        })?;

        Ok(Page {
            items: body.items,
            hits: header_hits.or(body.hits),
            search_after,
        })
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
