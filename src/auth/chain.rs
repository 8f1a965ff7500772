//! Chain of token sources tried in order

use super::{EnvTokenSource, GcloudTokenSource, TokenSource};
use anyhow::Result;
use tracing::debug;

/// Tries each source in order and returns the first token obtained
pub struct ChainTokenSource {
    sources: Vec<Box<dyn TokenSource>>,
}

impl ChainTokenSource {
    pub fn new(sources: Vec<Box<dyn TokenSource>>) -> Self {
        Self { sources }
    }
}

impl TokenSource for ChainTokenSource {
    fn name(&self) -> &str {
        "chain"
    }

    fn token(&self) -> Result<String> {
        let mut failures = Vec::new();
        for source in &self.sources {
            match source.token() {
                Ok(token) => {
                    debug!("Resolved access token from {}", source.name());
                    return Ok(token);
                }
                Err(e) => {
                    debug!("Token source {} failed: {}", source.name(), e);
                    failures.push(format!("{}: {}", source.name(), e));
                }
            }
        }

        anyhow::bail!(
            "No access token available (set GOOGLE_OAUTH_ACCESS_TOKEN or run `gcloud auth login`): {}",
            failures.join("; ")
        )
    }
}

/// Environment first, then gcloud
pub fn default_chain() -> ChainTokenSource {
    ChainTokenSource::new(vec![
        Box::new(EnvTokenSource::default()),
        Box::new(GcloudTokenSource::default()),
    ])
}
