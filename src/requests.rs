use std::time::Duration;

use reqwest::{Client, ClientBuilder, Response};

use crate::error::CrawlError;
use crate::ratelimit::RateLimiter;

const USER_AGENT: &str = concat!("rookery/", env!("CARGO_PKG_VERSION"));

/// Anything that can turn a URL into an HTML body.
#[allow(async_fn_in_trait)]
pub trait Fetcher {
    async fn fetch(&self, url: &str) -> Result<String, CrawlError>;
}

/// Anything that can post a url-encoded form back and return the reply.
#[allow(async_fn_in_trait)]
pub trait FormPoster {
    async fn post_form(&self, url: &str, fields: &[(String, String)])
    -> Result<String, CrawlError>;
}

/// HTTP client for one crawl session. Carries its own cookie jar so the
/// search form's server-side state survives the GET/POST round trip.
pub struct RequestClient<'a> {
    client: Client,
    rate_limiter: &'a RateLimiter,
}

impl<'a> RequestClient<'a> {
    pub fn new(rate_limiter: &'a RateLimiter, timeout: Duration) -> anyhow::Result<Self> {
        let client = ClientBuilder::new()
            .cookie_store(true)
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            rate_limiter,
        })
    }

    pub async fn fetch_url_response(&self, url: &str) -> Result<Response, CrawlError> {
        // Wait (non-blocking) until we're allowed to make a request according
        // to our self-imposed rate-limiting policy.
        self.rate_limiter.wait_until_ready().await;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(Response::error_for_status)
            .map_err(|e| CrawlError::network(url, e))?;
        Ok(response)
    }

    pub async fn fetch_url_body(&self, url: &str) -> Result<String, CrawlError> {
        let response = self.fetch_url_response(url).await?;
        let body = response
            .text()
            .await
            .map_err(|e| CrawlError::network(url, e))?;
        Ok(body)
    }

    /// Submits a url-encoded form and returns the response body.
    pub async fn post_form(
        &self,
        url: &str,
        fields: &[(String, String)],
    ) -> Result<String, CrawlError> {
        self.rate_limiter.wait_until_ready().await;

        let response = self
            .client
            .post(url)
            .form(fields)
            .send()
            .await
            .and_then(Response::error_for_status)
            .map_err(|e| CrawlError::network(url, e))?;
        response
            .text()
            .await
            .map_err(|e| CrawlError::network(url, e))
    }
}

impl Fetcher for RequestClient<'_> {
    async fn fetch(&self, url: &str) -> Result<String, CrawlError> {
        self.fetch_url_body(url).await
    }
}

impl FormPoster for RequestClient<'_> {
    async fn post_form(
        &self,
        url: &str,
        fields: &[(String, String)],
    ) -> Result<String, CrawlError> {
        RequestClient::post_form(self, url, fields).await
    }
}
