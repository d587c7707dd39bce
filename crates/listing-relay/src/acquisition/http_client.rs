//! Thin shared HTTP client over `reqwest`.
//!
//! One `HttpClient` is built per run and cloned into every worker; the
//! underlying connection pool is shared.

use crate::error::{RelayError, Result};
use std::time::Duration;

const USER_AGENT: &str = concat!("listing-relay/", env!("CARGO_PKG_VERSION"));

/// A fully read HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as text, replacing invalid UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Shared HTTP client with a per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| RelayError::network("client", e))?;
        Ok(Self { client })
    }

    /// GET a URL and read the whole body. Any status is returned as-is;
    /// only transport failures are errors.
    pub async fn get(&self, url: &str) -> Result<HttpResponse> {
        self.send(url, self.client.get(url)).await
    }

    /// GET with a bearer token and query parameters.
    pub async fn get_authorized(
        &self,
        url: &str,
        token: &str,
        query: &[(&str, &str)],
    ) -> Result<HttpResponse> {
        let request = self.client.get(url).bearer_auth(token).query(query);
        self.send(url, request).await
    }

    /// POST an `application/x-www-form-urlencoded` body.
    pub async fn post_form(&self, url: &str, pairs: &[(String, String)]) -> Result<HttpResponse> {
        self.send(url, self.client.post(url).form(pairs)).await
    }

    async fn send(&self, url: &str, request: reqwest::RequestBuilder) -> Result<HttpResponse> {
        let response = request
            .send()
            .await
            .map_err(|e| RelayError::network(url, e))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| RelayError::network(url, e))?;

        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}
