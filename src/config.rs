use reqwest::Url;
use tracing::{debug, info};

use crate::error::PublishError;
use crate::retry::RetryPolicy;

/// Production repository.
pub const DEFAULT_BASE_URL: &str = "https://zenodo.org";

/// Zenodo's sandbox instance, for dry runs with a sandbox token.
pub const SANDBOX_BASE_URL: &str = "https://sandbox.zenodo.org";

/// Explicit configuration handed to the client for every stage.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishConfig {
    /// Repository base URL without a trailing slash.
    pub base_url: String,
    pub retry: RetryPolicy,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

impl PublishConfig {
    /// Builds a config for `base_url`, rejecting anything that is not an absolute
    /// http(s) URL.
    pub fn new(base_url: &str, retry: RetryPolicy) -> Result<Self, PublishError> {
        let trimmed = base_url.trim().trim_end_matches('/');
        let parsed =
            Url::parse(trimmed).map_err(|e| PublishError::InvalidUrl(format!("{trimmed}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(PublishError::InvalidUrl(format!(
                "{trimmed}: unsupported scheme `{}`",
                parsed.scheme()
            )));
        }
        Ok(Self {
            base_url: trimmed.to_string(),
            retry,
        })
    }

    /// Resolves the base URL: explicit override first, then the sandbox switch,
    /// then the production default.
    pub fn resolve(
        base_url: Option<&str>,
        sandbox: bool,
        retry: RetryPolicy,
    ) -> Result<Self, PublishError> {
        let base = match base_url {
            Some(url) if !url.trim().is_empty() => url,
            _ if sandbox => SANDBOX_BASE_URL,
            _ => DEFAULT_BASE_URL,
        };
        let config = Self::new(base, retry)?;
        config.trace_loaded();
        Ok(config)
    }

    pub fn depositions_url(&self) -> String {
        format!("{}/api/deposit/depositions", self.base_url)
    }

    pub fn publish_url(&self, id: &str) -> String {
        format!("{}/api/deposit/depositions/{id}/actions/publish", self.base_url)
    }

    pub fn record_url(&self, id: &str) -> String {
        format!("{}/records/{id}", self.base_url)
    }

    pub fn trace_loaded(&self) {
        info!(
            base_url = %self.base_url,
            max_attempts = self.retry.max_attempts,
            "Loaded PublishConfig"
        );
        debug!(?self, "PublishConfig loaded (full debug)");
    }
}
