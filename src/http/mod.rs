//! Minimal HTTPS GET client over hyper

use anyhow::{Context, Result};
use http_body_util::{BodyExt, Empty};
use hyper::body::Bytes;
use hyper::header::{HeaderMap, ACCEPT, AUTHORIZATION, USER_AGENT};
use hyper::{Method, Request, StatusCode};
use hyper_tls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use serde::de::DeserializeOwned;
use tracing::debug;


/// A fully read HTTP response
#[derive(Debug)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Response {
    /// Fail with the status and body text unless the status is 2xx
    pub fn error_for_status(self, url: &str) -> Result<Self> {
        if self.status.is_success() {
            return Ok(self);
        }
        let body = String::from_utf8_lossy(&self.body);
        anyhow::bail!(
            "GET {} returned {}: {}",
            url,
            self.status,
            body.trim()
        )
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).context("Failed to decode response body")
    }
}

#[derive(Clone)]
pub struct HttpClient {
    client: Client<HttpsConnector<HttpConnector>, Empty<Bytes>>,
    user_agent: String,
}

impl HttpClient {
    pub fn new() -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpsConnector::new());
        Self {
            client,
            user_agent: format!("disco/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// GET `url`, optionally with a bearer token and Accept header
    pub async fn get(&self, url: &str, token: Option<&str>, accept: &[&str]) -> Result<Response> {
        let mut builder = Request::builder()
            .method(Method::GET)
            .uri(url)
            .header(USER_AGENT, &self.user_agent);

        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        if !accept.is_empty() {
            builder = builder.header(ACCEPT, accept.join(", "));
        }

        let request = builder
            .body(Empty::<Bytes>::new())
            .with_context(|| format!("Failed to build request for {}", url))?;

        debug!("GET {}", url);
        let response = self
            .client
            .request(request)
            .await
            .with_context(|| format!("Request to {} failed", url))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .with_context(|| format!("Failed to read response body from {}", url))?
            .to_bytes();

        debug!("GET {} -> {} ({} bytes)", url, status, body.len());
        Ok(Response {
            status,
            headers,
            body,
        })
    }

    /// GET `url` and decode the JSON body, failing on non-2xx
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str, token: &str) -> Result<T> {
        self.get(url, Some(token), &["application/json"])
            .await?
            .error_for_status(url)?
            .json()
            .with_context(|| format!("Failed to decode response from {}", url))
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}
