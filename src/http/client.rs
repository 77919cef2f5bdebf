use crate::rate_limiter::RateLimiter;
use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

/// HTTP client with built-in rate limiting
pub struct RateLimitedClient {
    client: Client,
    rate_limiter: RateLimiter,
}

impl RateLimitedClient {
    pub fn new(user_agent: &str, timeout_secs: u64, rate_limit_ms: u64) -> Result<Self> {
        let client = Self::build_client(user_agent, timeout_secs)?;
        let rate_limiter = RateLimiter::new(rate_limit_ms);

        Ok(Self {
            client,
            rate_limiter,
        })
    }

    /// POST a JSON body. Non-2xx responses are errors carrying the status.
    pub async fn post_json<T: Serialize + ?Sized>(&mut self, url: &str, body: &T) -> Result<reqwest::Response> {
        self.rate_limiter.wait().await;
        let response = self.send_post_request(url, body).await?;
        response
            .error_for_status()
            .context("Webhook rejected the request")
    }

    /// Start a new batch; the first request of a batch is not delayed.
    pub fn reset(&mut self) {
        self.rate_limiter.reset();
    }

    fn build_client(user_agent: &str, timeout_secs: u64) -> Result<Client> {
        Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to build HTTP client")
    }

    async fn send_post_request<T: Serialize + ?Sized>(&self, url: &str, body: &T) -> Result<reqwest::Response> {
        self.client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send POST request")
    }
}
