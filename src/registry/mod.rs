use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::constants::media_type;
use crate::http::HttpClient;
use crate::image::ImageInfo;


const DIGEST_HEADER: &str = "docker-content-digest";

/// Reads image manifests from GCR and Artifact Registry
pub struct RegistryClient {
    http: HttpClient,
    endpoint: Option<String>,
}

impl RegistryClient {
    pub fn new(http: HttpClient) -> Self {
        Self {
            http,
            endpoint: None,
        }
    }

    /// Send manifest requests to `endpoint` (e.g. a mirror) instead of the image's host
    pub fn with_endpoint(mut self, endpoint: Option<String>) -> Self {
        self.endpoint = endpoint;
        self
    }

    fn manifest_url(&self, image: &ImageInfo) -> String {
        match &self.endpoint {
            Some(base) => format!("{}{}", base.trim_end_matches('/'), image.manifest_path()),
            None => image.manifest_url(),
        }
    }

    /// Resolve the manifest digest an image's tag currently points at
    pub async fn resolve_digest(&self, image: &ImageInfo, token: &str) -> Result<String> {
        let url = self.manifest_url(image);
        let digest = self
            .manifest_digest(&url, token)
            .await
            .with_context(|| format!("Failed to resolve digest for {}", image.deployed))?;
        info!("Resolved {} to {}", image.deployed, digest);
        Ok(digest)
    }

    /// Digest of the manifest served at `url`. Prefers the registry's
    /// `Docker-Content-Digest` header and falls back to hashing the body.
    pub async fn manifest_digest(&self, url: &str, token: &str) -> Result<String> {
        let accept = [
            media_type::OCI_INDEX,
            media_type::DOCKER_MANIFEST_LIST,
            media_type::OCI_MANIFEST,
            media_type::DOCKER_MANIFEST,
        ];

        let response = self
            .http
            .get(url, Some(token), &accept)
            .await?
            .error_for_status(url)?;

        if let Some(value) = response.headers.get(DIGEST_HEADER) {
            let digest = value
                .to_str()
                .context("Invalid Docker-Content-Digest header")?
                .trim()
                .to_string();
            if !digest.is_empty() {
                return Ok(digest);
            }
        }

        debug!("No digest header from {}, hashing manifest body", url);
        Ok(format!("sha256:{}", sha256::digest(response.body.as_ref())))
    }
}
