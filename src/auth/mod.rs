//! Access token resolution for the cloud management APIs
//!
//! Tokens come from the environment or from the gcloud CLI, mirroring how
//! Docker credential helpers are consulted for registries.

use anyhow::{Context, Result};
use std::process::Command;
use tracing::debug;

use crate::constants::env;

mod chain;

pub use chain::{default_chain, ChainTokenSource};

/// Trait for types that can produce an OAuth access token
pub trait TokenSource: Send + Sync {
    /// Name used in log messages
    fn name(&self) -> &str;

    /// Get a bearer token
    fn token(&self) -> Result<String>;
}

/// Fixed token
pub struct StaticTokenSource {
    token: String,
}

impl StaticTokenSource {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl TokenSource for StaticTokenSource {
    fn name(&self) -> &str {
        "static"
    }

    fn token(&self) -> Result<String> {
        Ok(self.token.clone())
    }
}

/// Reads the token from the first non-empty environment variable
pub struct EnvTokenSource {
    vars: Vec<String>,
}

impl EnvTokenSource {
    pub fn new(vars: Vec<String>) -> Self {
        Self { vars }
    }
}

impl Default for EnvTokenSource {
    fn default() -> Self {
        Self::new(vec![
            env::ACCESS_TOKEN.to_string(),
            env::SDK_ACCESS_TOKEN.to_string(),
        ])
    }
}

impl TokenSource for EnvTokenSource {
    fn name(&self) -> &str {
        "environment"
    }

    fn token(&self) -> Result<String> {
        for var in &self.vars {
            if let Ok(value) = std::env::var(var) {
                let value = value.trim();
                if !value.is_empty() {
                    debug!("Using access token from {}", var);
                    return Ok(value.to_string());
                }
            }
        }
        anyhow::bail!("None of {} is set", self.vars.join(", "))
    }
}

/// Asks the gcloud CLI for the active account's access token
pub struct GcloudTokenSource {
    program: String,
}

impl GcloudTokenSource {
    pub fn new() -> Self {
        Self::with_program("gcloud")
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for GcloudTokenSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenSource for GcloudTokenSource {
    fn name(&self) -> &str {
        &self.program
    }

    fn token(&self) -> Result<String> {
        debug!("Executing {} auth print-access-token", self.program);

        let output = Command::new(&self.program)
            .args(["auth", "print-access-token"])
            .output()
            .with_context(|| format!("Failed to execute {}", self.program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("{} failed: {}", self.program, stderr.trim());
        }

        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if token.is_empty() {
            anyhow::bail!("{} returned an empty access token", self.program);
        }
        Ok(token)
    }
}

#[cfg(test)]
mod tests;
