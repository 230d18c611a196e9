//! REST clients for the portal backend and the hosted prompt database

mod contacts;
mod introductions;
pub mod prompts;

use std::time::Duration;

use imp_common::config::ApiSection;
use imp_common::{Error, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

pub use prompts::PromptStoreClient;

const USER_AGENT: &str = concat!("imp-cm/", env!("CARGO_PKG_VERSION"));
const RETRY_DELAY_MS: u64 = 250;

/// Connection settings of the portal API
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout: Duration,
    /// Extra attempts after a transient failure
    pub retries: u32,
    pub bearer_token: Option<String>,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(10),
            retries: 1,
            bearer_token: None,
        }
    }

    pub fn from_section(section: &ApiSection) -> Self {
        Self {
            base_url: section.base_url.clone(),
            timeout: Duration::from_secs(section.timeout_secs),
            retries: section.retries,
            bearer_token: section.token.clone(),
        }
    }
}

/// Shared request plumbing: URL building, retries, status mapping
#[derive(Debug, Clone)]
pub(crate) struct RestClient {
    base_url: Url,
    http: reqwest::Client,
    retries: u32,
}

impl RestClient {
    pub(crate) fn new(
        base_url: &str,
        timeout: Duration,
        retries: u32,
        headers: HeaderMap,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url.trim())
            .map_err(|e| Error::Config(format!("invalid base URL {base_url:?}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!("{base_url} cannot be a base URL")));
        }

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self {
            base_url,
            http,
            retries,
        })
    }

    /// Base URL with `segments` appended, each percent-encoded
    pub(crate) fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("{} cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Send with retry on transient failures and decode a JSON body
    pub(crate) async fn send_json<T, F>(&self, build: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: Fn(&reqwest::Client) -> RequestBuilder,
    {
        let response = self.send(build).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| Error::Decode(e.to_string()))
    }

    /// Send with retry on transient failures; body is discarded
    pub(crate) async fn send_unit<F>(&self, build: F) -> Result<()>
    where
        F: Fn(&reqwest::Client) -> RequestBuilder,
    {
        self.send(build).await.map(|_| ())
    }

    async fn send<F>(&self, build: F) -> Result<Response>
    where
        F: Fn(&reqwest::Client) -> RequestBuilder,
    {
        let mut attempt = 0;
        loop {
            match self.send_once(&build).await {
                Err(e) if e.is_transient() && attempt < self.retries => {
                    attempt += 1;
                    warn!(attempt, error = %e, "Transient API failure, retrying");
                    tokio::time::sleep(Duration::from_millis(RETRY_DELAY_MS)).await;
                }
                other => return other,
            }
        }
    }

    async fn send_once<F>(&self, build: &F) -> Result<Response>
    where
        F: Fn(&reqwest::Client) -> RequestBuilder,
    {
        let request = build(&self.http)
            .build()
            .map_err(|e| Error::InvalidInput(e.to_string()))?;
        let method = request.method().clone();
        let url = request.url().clone();
        debug!(%method, url = %url, "API request");

        let response = self.http.execute(request).await.map_err(map_transport)?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            warn!(%method, url = %url, "API rejected credentials (401)");
            return Err(Error::Unauthorized);
        }

        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(url.path().to_string()));
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }
}

fn map_transport(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else if e.is_decode() {
        Error::Decode(e.to_string())
    } else {
        Error::Network(e.to_string())
    }
}

/// Client of the portal REST API
///
/// Implements [`crate::sources::ContactSource`],
/// [`crate::sources::MembershipSource`] and [`crate::sources::MatchSource`].
#[derive(Debug, Clone)]
pub struct ApiClient {
    rest: RestClient,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(token) = config.bearer_token.as_deref().filter(|t| !t.is_empty()) {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| Error::Config(format!("invalid API token: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }

        Ok(Self {
            rest: RestClient::new(&config.base_url, config.timeout, config.retries, headers)?,
        })
    }

    pub(crate) fn rest(&self) -> &RestClient {
        &self.rest
    }
}
