//! Lazy, paged search.
//!
//! [`SearchResults`] walks CMR's `CMR-Search-After` cursor one page at a time
//! and hands out items one by one. A page is only requested once the previous
//! one has been fully consumed, so dropping the iterator early stops all
//! traffic.

use anyhow::Result;
use serde_json::Value;
use std::collections::VecDeque;
use std::iter::FusedIterator;
use tracing::debug;

use crate::client::Client;
use crate::transport::PageRequest;

/// Largest page CMR will serve.
pub const MAX_PAGE_SIZE: usize = 2000;

/// Searchable concept types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Concept {
    Collections,
    Granules,
}

impl Concept {
    pub fn as_str(&self) -> &'static str {
        match self {
            Concept::Collections => "collections",
            Concept::Granules => "granules",
        }
    }

    pub(crate) fn endpoint(&self) -> String {
        format!("search/{}.umm_json", self.as_str())
    }
}

/// The `meta.concept-id` of a result item.
pub fn concept_id(item: &Value) -> Option<&str> {
    item.pointer("/meta/concept-id").and_then(Value::as_str)
}

/// Iterator over search results, at most `limit` of them.
///
/// A failed page request is yielded once as `Err`, after which the iterator
/// is finished. Nothing is retried.
#[derive(Debug)]
pub struct SearchResults {
    client: Client,
    url: String,
    query: Vec<(String, String)>,
    limit: usize,
    count: usize,
    cursor: Option<String>,
    buffer: VecDeque<Value>,
    hits: Option<u64>,
    pages: usize,
    finished: bool,
}

impl SearchResults {
    pub(crate) fn new(
        client: Client,
        url: String,
        query: Vec<(String, String)>,
        limit: usize,
    ) -> Self {
        Self {
            client,
            url,
            query,
            limit,
            count: 0,
            cursor: None,
            buffer: VecDeque::new(),
            hits: None,
            pages: 0,
            finished: false,
        }
    }

    /// Number of page requests issued so far.
    pub fn pages_fetched(&self) -> usize {
        self.pages
    }

    /// Total hits reported by the most recent page, if any.
    pub fn hits(&self) -> Option<u64> {
        self.hits
    }

    fn fetch_page(&mut self) -> Result<()> {
        let remaining = self.limit - self.count;
        let page_size = remaining.min(self.client.page_size());

        let mut query = self.query.clone();
        query.push(("page_size".to_string(), page_size.to_string()));
        let request = PageRequest {
            url: self.url.clone(),
            query,
            search_after: self.cursor.clone(),
            authorization: self.client.authorization(),
        };

        debug!(
            url = %self.url,
            page = self.pages + 1,
            page_size,
            continued = request.search_after.is_some(),
            "requesting search page"
        );
        self.pages += 1;
        let page = self.client.transport().fetch(&request)?;

        let received = page.items.len();
        if page.hits.is_some() {
            self.hits = page.hits;
        }
        let all_seen = self
            .hits
            .is_some_and(|hits| (self.count + received) as u64 >= hits);

        self.buffer.extend(page.items.into_iter().take(remaining));
        match page.search_after {
            Some(cursor) if received > 0 && !all_seen => self.cursor = Some(cursor),
            _ => {
                debug!(url = %self.url, pages = self.pages, "search exhausted");
                self.finished = true;
                self.cursor = None;
            }
        }
        Ok(())
    }
}

impl Iterator for SearchResults {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.count >= self.limit {
                self.finished = true;
                self.buffer.clear();
                return None;
            }
            if let Some(item) = self.buffer.pop_front() {
                self.count += 1;
                return Some(Ok(item));
            }
            if self.finished {
                return None;
            }
            if let Err(e) = self.fetch_page() {
                self.finished = true;
                return Some(Err(e));
            }
        }
    }
}

impl FusedIterator for SearchResults {}
