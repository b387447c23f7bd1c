//! HTTP source acquisition
//!
//! Fetches module sources with GET requests against a base URL, appending the
//! configured cache-busting token as a `v` query parameter. Built for
//! deferred-mode engines running inside a tokio runtime.

use async_trait::async_trait;
use tracing::debug;

use super::{AcquireError, AcquiredSource, ResourceAcquirer};
use crate::config::ResolverConfig;

pub struct HttpAcquirer {
    base: String,
    cache_token: Option<String>,
    client: reqwest::Client,
}

impl HttpAcquirer {
    /// `base` is joined to resource ids by plain concatenation; include any
    /// trailing slash it needs.
    pub fn new(base: impl Into<String>) -> HttpAcquirer {
        HttpAcquirer {
            base: base.into(),
            cache_token: None,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_cache_token(mut self, token: impl Into<String>) -> HttpAcquirer {
        self.cache_token = Some(token.into());
        self
    }

    /// An acquirer that applies the engine's cache-busting token when the
    /// configuration carries one.
    pub fn from_config(base: impl Into<String>, config: &ResolverConfig) -> HttpAcquirer {
        let acquirer = HttpAcquirer::new(base);
        match &config.cache_token {
            Some(token) => acquirer.with_cache_token(token.clone()),
            None => acquirer,
        }
    }

    fn url_for(&self, resource: &str) -> String {
        let mut url = format!("{}{}", self.base, resource);
        if let Some(token) = &self.cache_token {
            url.push_str("?v=");
            url.push_str(token);
        }
        url
    }
}

#[async_trait]
impl ResourceAcquirer for HttpAcquirer {
    async fn acquire(&self, resource: &str) -> Result<AcquiredSource, AcquireError> {
        let url = self.url_for(resource);
        debug!("fetching module source from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| AcquireError::Transport {
                resource: resource.to_string(),
                detail: err.to_string(),
            })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AcquireError::NotFound(url));
        }
        let response = response
            .error_for_status()
            .map_err(|err| AcquireError::Transport {
                resource: resource.to_string(),
                detail: err.to_string(),
            })?;

        let text = response.text().await.map_err(|err| AcquireError::Transport {
            resource: resource.to_string(),
            detail: err.to_string(),
        })?;
        Ok(AcquiredSource::Text(text))
    }
}
