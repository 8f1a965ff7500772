use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::constants::api;


#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Project to use when none is given on the command line
    pub default_project: Option<String>,

    /// Output format to use when none is given on the command line
    pub default_format: Option<String>,

    /// API whose enablement marks a project as worth walking
    #[serde(default = "default_run_api")]
    pub run_api: String,

    /// Local scanner configuration
    #[serde(default)]
    pub scanner: ScannerConfig,

    /// Cloud API base URLs
    #[serde(default)]
    pub endpoints: Endpoints,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Scanner binary, looked up on PATH
    #[serde(default = "default_scanner_program")]
    pub program: String,

    /// Arguments for vulnerability scans; `{image}` and `{output}` are substituted
    #[serde(default = "default_vulnerability_args")]
    pub vulnerability_args: Vec<String>,

    /// Arguments for license scans; `{image}` and `{output}` are substituted
    #[serde(default = "default_license_args")]
    pub license_args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoints {
    #[serde(default = "default_projects_url")]
    pub projects: String,
    #[serde(default = "default_run_url")]
    pub run: String,
    #[serde(default = "default_run_regional_url")]
    pub run_regional: String,
    #[serde(default = "default_usage_url")]
    pub usage: String,
    #[serde(default = "default_analysis_url")]
    pub analysis: String,
    /// Registry root used for manifest lookups instead of the image's own host
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,
}

fn default_run_api() -> String {
    api::CLOUD_RUN.to_string()
}

fn default_scanner_program() -> String {
    "trivy".to_string()
}

fn trivy_args(scanners: &str) -> Vec<String> {
    [
        "image",
        "--format",
        "json",
        "--no-progress",
        "--scanners",
        scanners,
        "--timeout",
        "5m",
        "--output",
        "{output}",
        "{image}",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_vulnerability_args() -> Vec<String> {
    trivy_args("vuln")
}

fn default_license_args() -> Vec<String> {
    trivy_args("license")
}

fn default_projects_url() -> String {
    api::PROJECTS_URL.to_string()
}

fn default_run_url() -> String {
    api::RUN_URL.to_string()
}

fn default_run_regional_url() -> String {
    api::RUN_REGIONAL_URL.to_string()
}

fn default_usage_url() -> String {
    api::USAGE_URL.to_string()
}

fn default_analysis_url() -> String {
    api::ANALYSIS_URL.to_string()
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            program: default_scanner_program(),
            vulnerability_args: default_vulnerability_args(),
            license_args: default_license_args(),
        }
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            projects: default_projects_url(),
            run: default_run_url(),
            run_regional: default_run_regional_url(),
            usage: default_usage_url(),
            analysis: default_analysis_url(),
            registry: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_project: None,
            default_format: None,
            run_api: default_run_api(),
            scanner: ScannerConfig::default(),
            endpoints: Endpoints::default(),
        }
    }
}

impl Config {
    /// Load from `path` when given, otherwise from `<config dir>/disco/config.toml`.
    /// A missing default file yields the defaults; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("disco").join("config.toml");
            if config_path.exists() {
                return Self::from_file(&config_path);
            }
        }
        Ok(Config::default())
    }

    fn from_file(path: &Path) -> anyhow::Result<Self> {
        debug!("Loading config from {}", path.display());
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }
}
