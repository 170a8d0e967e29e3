use anyhow::{Context, Result, anyhow, bail};
use serde::Serialize;
use std::sync::Arc;

use crate::config::Config;
use crate::search::{Concept, MAX_PAGE_SIZE, SearchResults};
use crate::token::{TokenProvider, bearer, token_config, token_file};
use crate::transport::{HttpTransport, PageRequest, Transport};
use crate::util::{query_pairs, urljoin};

type SharedProvider = Arc<dyn TokenProvider + Send + Sync>;

/// CMR search client.
///
/// Cloning is cheap; clones share the HTTP connection pool.
#[derive(Clone)]
pub struct Client {
    config: Config,
    base_url: String,
    page_size: usize,
    providers: Vec<SharedProvider>,
    transport: Arc<dyn Transport + Send + Sync>,
}

impl Client {
    /// Creates a client from `.cmrrc` and `CMR_ENV`.
    ///
    /// This is equivalent to `Client::new(Config::load()?)`.
    pub fn from_env() -> Result<Self> {
        Self::new(Config::load()?)
    }

    /// Creates a client for the deployment named in `config`.
    ///
    /// Tokens are looked up with `token_config`, then `token_file`.
    pub fn new(config: Config) -> Result<Self> {
        let transport = HttpTransport::new(config.timeout())?;
        let providers: Vec<SharedProvider> = vec![
            Arc::new(token_config) as SharedProvider,
            Arc::new(token_file) as SharedProvider,
        ];

        Ok(Self {
            base_url: config.base_url(),
            config,
            page_size: MAX_PAGE_SIZE,
            providers,
            transport: Arc::new(transport),
        })
    }

    /// Replaces the token lookup chain with a single provider.
    pub fn with_token_provider<P>(mut self, provider: P) -> Self
    where
        P: TokenProvider + Send + Sync + 'static,
    {
        self.providers = vec![Arc::new(provider) as SharedProvider];
        self
    }

    /// Adds a provider to try after the current ones.
    pub fn with_fallback_provider<P>(mut self, provider: P) -> Self
    where
        P: TokenProvider + Send + Sync + 'static,
    {
        self.providers.push(Arc::new(provider));
        self
    }

    /// Caps the page size; values outside `1..=2000` are clamped.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    pub fn with_transport<T>(mut self, transport: T) -> Self
    where
        T: Transport + Send + Sync + 'static,
    {
        self.transport = Arc::new(transport);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Lazily searches `concept`, yielding at most `limit` items.
    ///
    /// `params` must serialize to a JSON object.
    pub fn search<T: Serialize + ?Sized>(
        &self,
        concept: Concept,
        params: &T,
        limit: usize,
    ) -> Result<SearchResults> {
        let query = self.encode_params(params)?;
        let url = urljoin(&self.base_url, &concept.endpoint());
        Ok(SearchResults::new(self.clone(), url, query, limit))
    }

    /// Total number of matches, without fetching any items.
    pub fn hits<T: Serialize + ?Sized>(&self, concept: Concept, params: &T) -> Result<u64> {
        let mut query = self.encode_params(params)?;
        query.push(("page_size".to_string(), "0".to_string()));
        let url = urljoin(&self.base_url, &concept.endpoint());

        let request = PageRequest {
            url,
            query,
            search_after: None,
            authorization: self.authorization(),
        };
        let page = self.transport.fetch(&request)?;
        page.hits
            .ok_or_else(|| anyhow!("CMR response carried no hit count ({})", request.url))
    }

    pub(crate) fn page_size(&self) -> usize {
        self.page_size
    }

    pub(crate) fn transport(&self) -> &(dyn Transport + Send + Sync) {
        self.transport.as_ref()
    }

    pub(crate) fn authorization(&self) -> Option<String> {
        let providers: Vec<&dyn TokenProvider> = self
            .providers
            .iter()
            .map(|p| p.as_ref() as &dyn TokenProvider)
            .collect();
        bearer(&providers, Some(&self.config))
    }

    fn encode_params<T: Serialize + ?Sized>(&self, params: &T) -> Result<Vec<(String, String)>> {
        let value = serde_json::to_value(params).context("failed to serialize search parameters")?;
        match value.as_object() {
            Some(map) => Ok(query_pairs(map)),
            None => bail!("search parameters must be a JSON object, got {}", value),
        }
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url)
            .field("page_size", &self.page_size)
            .field("providers", &self.providers.len())
            .finish()
    }
}

/// One-shot search with a fresh client built from `config`.
pub fn search<T: Serialize + ?Sized>(
    concept: Concept,
    params: &T,
    limit: usize,
    config: &Config,
) -> Result<SearchResults> {
    Client::new(config.clone())?.search(concept, params, limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::keys;
    use crate::token::token_literal;
    use serde_json::json;

    #[test]
    fn base_url_follows_config() {
        let client = Client::new(Config::new().with(keys::ENV, "uat")).unwrap();
        assert_eq!(client.base_url(), "https://cmr.uat.earthdata.nasa.gov");
    }

    #[test]
    fn default_chain_reads_config_token() {
        let config = Config::new().with(keys::TOKEN_VALUE, "cfg-token");
        let client = Client::new(config).unwrap();
        assert_eq!(client.authorization().as_deref(), Some("Bearer cfg-token"));
    }

    #[test]
    fn fallback_provider_is_tried_last() {
        let client = Client::new(Config::new())
            .unwrap()
            .with_token_provider(token_literal(None::<String>))
            .with_fallback_provider(token_literal(Some("late")));
        assert_eq!(client.authorization().as_deref(), Some("Bearer late"));
    }

    #[test]
    fn page_size_is_clamped() {
        let client = Client::new(Config::new()).unwrap();
        assert_eq!(client.clone().with_page_size(0).page_size(), 1);
        assert_eq!(client.with_page_size(10_000).page_size(), MAX_PAGE_SIZE);
    }

    #[test]
    fn non_object_params_are_rejected() {
        let client = Client::new(Config::new()).unwrap();
        let err = client.search(Concept::Granules, &json!(["a"]), 1).unwrap_err();
        assert!(err.to_string().contains("must be a JSON object"));
    }

    #[test]
    fn debug_hides_tokens() {
        let client = Client::new(Config::new().with(keys::TOKEN_VALUE, "secret"))
            .unwrap()
            .with_token_provider(token_literal(Some("also-secret")));
        let printed = format!("{:?}", client);
        assert!(!printed.contains("secret"));
    }
}
